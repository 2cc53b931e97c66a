use xbeelink_session::RemoteTransmit;

use crate::cmd::{parse_hex_bytes, TransmitArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_delivery, OutputFormat};

pub async fn run(args: TransmitArgs, format: OutputFormat) -> CliResult<i32> {
    let data = match (&args.data, &args.data_hex) {
        (Some(text), _) => text.as_bytes().to_vec(),
        (None, Some(hex)) => parse_hex_bytes(hex)?,
        (None, None) => Vec::new(),
    };
    let destination = args.destination.destination()?;
    let request = RemoteTransmit::new(&data, destination.clone())
        .map_err(|err| session_error("invalid transmit", err))?;

    let session = args.link.open()?;
    let outcome = session.remote_transmit(request).await;
    let closed = session.close().await;

    outcome.map_err(|err| session_error("transmit failed", err))?;
    closed.map_err(|err| session_error("close failed", err))?;

    print_delivery(&destination, data.len(), format);
    Ok(SUCCESS)
}
