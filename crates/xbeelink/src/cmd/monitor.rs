use tokio::sync::watch;
use tracing::info;

use crate::cmd::MonitorArgs;
use crate::exit::{session_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub async fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let (stop_tx, mut stop_rx) = watch::channel(false);
    install_ctrlc_handler(stop_tx)?;

    let session = args.link.open()?;
    let frames = session.frames();
    let mut frames = if args.transmissions {
        frames.transmissions()
    } else if args.io_samples {
        frames.io_samples()
    } else {
        frames
    };

    let mut printed = 0usize;
    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(frame) = frame else {
                    info!("radio link closed");
                    break;
                };
                print_frame(&frame, format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            _ = stop_rx.changed() => {
                info!(printed, "interrupted");
                break;
            }
        }
    }

    session
        .close()
        .await
        .map_err(|err| session_error("close failed", err))?;
    Ok(SUCCESS)
}

fn install_ctrlc_handler(stop: watch::Sender<bool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        let _ = stop.send(true);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
