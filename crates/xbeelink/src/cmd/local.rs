use xbeelink_session::LocalCommand;

use crate::cmd::LocalArgs;
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_command_data, OutputFormat};

pub async fn run(args: LocalArgs, format: OutputFormat) -> CliResult<i32> {
    let request = LocalCommand::new(&args.command)
        .map_err(|err| session_error("invalid command", err))?
        .with_parameter(args.parameter.bytes()?);

    let session = args.link.open()?;
    let outcome = session.local_command(request).await;
    let closed = session.close().await;

    let data = outcome.map_err(|err| session_error("local command failed", err))?;
    closed.map_err(|err| session_error("close failed", err))?;

    print_command_data(&args.command, &data, format);
    Ok(SUCCESS)
}
