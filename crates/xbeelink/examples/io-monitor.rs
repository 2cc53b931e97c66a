//! Print every I/O sample and data packet the radio reports until Ctrl-C.
//!
//! Run with:
//!   cargo run --example io-monitor -- /dev/ttyUSB0

#[cfg(unix)]
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use xbeelink::frame::Frame;
    use xbeelink::session::{to_hex, Session, SessionConfig};
    use xbeelink::transport::SerialConfig;

    let port = std::env::args()
        .nth(1)
        .ok_or("usage: io-monitor <PORT>")?;

    let session = Session::open_serial(&port, SerialConfig::default(), SessionConfig::default())?;
    let mut frames = session.frames();
    eprintln!("Watching {port}");

    loop {
        let frame = tokio::select! {
            frame = frames.recv() => frame,
            _ = tokio::signal::ctrl_c() => break,
        };
        match frame {
            Some(Frame::ZigbeeIoSample(sample)) => println!(
                "{} digital={:?} analog={:?}",
                to_hex(&sample.remote64),
                sample.digital_samples,
                sample.analog_samples
            ),
            Some(Frame::ZigbeeReceivePacket(packet)) => println!(
                "{} data={}",
                to_hex(&packet.remote64),
                to_hex(&packet.data)
            ),
            Some(_) => {}
            None => {
                eprintln!("Radio link closed");
                break;
            }
        }
    }

    session.close().await?;
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("io-monitor needs a Unix serial port");
}
