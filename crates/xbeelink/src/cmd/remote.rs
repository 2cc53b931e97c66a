use xbeelink_session::RemoteCommand;

use crate::cmd::RemoteArgs;
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_remote_response, OutputFormat};

pub async fn run(args: RemoteArgs, format: OutputFormat) -> CliResult<i32> {
    let request = RemoteCommand::new(&args.command, args.destination.destination()?)
        .map_err(|err| session_error("invalid command", err))?
        .with_parameter(args.parameter.bytes()?);

    let session = args.link.open()?;
    let outcome = session.remote_command(request).await;
    let closed = session.close().await;

    let response = outcome.map_err(|err| session_error("remote command failed", err))?;
    closed.map_err(|err| session_error("close failed", err))?;

    print_remote_response(&response, format);
    Ok(SUCCESS)
}
