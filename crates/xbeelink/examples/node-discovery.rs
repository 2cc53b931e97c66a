//! Discover the nodes around a coordinator and resolve one of them by name.
//!
//! Run with:
//!   cargo run --example node-discovery -- /dev/ttyUSB0 [NODE_ID]

#[cfg(unix)]
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::time::Duration;

    use xbeelink::session::{to_hex, ModuleKind, Session, SessionConfig};
    use xbeelink::transport::SerialConfig;

    let mut args = std::env::args().skip(1);
    let port = args.next().ok_or("usage: node-discovery <PORT> [NODE_ID]")?;
    let wanted = args.next();

    let session = Session::open_serial(
        &port,
        SerialConfig::default(),
        SessionConfig::new(ModuleKind::ZigBee),
    )?;

    let window = session.discovery_window(Duration::from_secs(2)).await?;
    eprintln!("Discovering for {} ms", window.as_millis());

    for node in session.discover_nodes(window).await? {
        println!(
            "{:<20} {} {}",
            node.node_identifier,
            to_hex(&node.address64),
            to_hex(&node.address16)
        );
    }

    if let Some(name) = wanted {
        match session.resolve_node(&name, Duration::from_secs(5)).await {
            Ok(address) => println!("{name} resolves to {}", to_hex(&address)),
            Err(e) => eprintln!("Could not resolve {name}: {e}"),
        }
    }

    session.close().await?;
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("node-discovery needs a Unix serial port");
}
