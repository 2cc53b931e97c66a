use tracing::info;

use crate::cmd::{parse_duration, DiscoverArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_nodes, OutputFormat};

pub async fn run(args: DiscoverArgs, format: OutputFormat) -> CliResult<i32> {
    let explicit = args.window.as_deref().map(parse_duration).transpose()?;
    let timeout = args.link.timeout()?;

    let session = args.link.open()?;
    let window = match explicit {
        Some(window) => window,
        None => match session.discovery_window(timeout).await {
            Ok(window) => window,
            Err(err) => {
                let _ = session.close().await;
                return Err(session_error("reading NT failed", err));
            }
        },
    };
    info!(window_ms = window.as_millis() as u64, "discovering nodes");

    let outcome = session.discover_nodes(window).await;
    let closed = session.close().await;

    let nodes = outcome.map_err(|err| session_error("node discovery failed", err))?;
    closed.map_err(|err| session_error("close failed", err))?;

    print_nodes(&nodes, format);
    Ok(SUCCESS)
}
