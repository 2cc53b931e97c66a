//! Network node discovery (`ND`).

use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info};
use xbeelink_frame::{Address16, Address64, Frame, AT_COMMAND_RESPONSE, COMMAND_STATUS_OK};

use crate::config::check_timeout;
use crate::error::{Result, SessionError};
use crate::session::Session;

pub const NODE_DISCOVER_COMMAND: &str = "ND";
pub const DISCOVER_TIMEOUT_COMMAND: &str = "NT";

/// Grace period added to the radio's `NT` window.
pub const DISCOVERY_GRACE: Duration = Duration::from_secs(1);

/// One node that answered a discovery request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredNode {
    pub address16: Address16,
    pub address64: Address64,
    pub node_identifier: String,
    /// Parent network address (ZigBee only).
    pub parent16: Option<Address16>,
    /// 0 coordinator, 1 router, 2 end device (ZigBee only).
    pub device_type: Option<u8>,
}

impl DiscoveredNode {
    /// Decode the data of an `ND` response. Returns `None` for the empty
    /// reply that ends a discovery round or for truncated data.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 10 {
            return None;
        }
        let address16 = <Address16>::try_from(&data[0..2]).ok()?;
        let address64 = <Address64>::try_from(&data[2..10]).ok()?;

        let rest = &data[10..];
        let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        let node_identifier = String::from_utf8_lossy(&rest[..end]).into_owned();

        let tail = rest.get(end + 1..).unwrap_or_default();
        let parent16 = tail.get(0..2).and_then(|p| <Address16>::try_from(p).ok());
        let device_type = tail.get(2).copied();

        Some(Self {
            address16,
            address64,
            node_identifier,
            parent16,
            device_type,
        })
    }
}

impl Session {
    /// Read `NT` and return how long a discovery round lasts, plus a grace
    /// period.
    pub async fn discovery_window(&self, timeout: Duration) -> Result<Duration> {
        let data = self
            .at_command(DISCOVER_TIMEOUT_COMMAND, Bytes::new(), timeout)
            .await?;
        let tenths = match data.as_ref() {
            [hi, lo, ..] => u16::from_be_bytes([*hi, *lo]),
            [lo] => u16::from(*lo),
            [] => {
                return Err(SessionError::CommandFailed(
                    "empty NT response".to_string(),
                ))
            }
        };
        Ok(Duration::from_millis(u64::from(tenths) * 100) + DISCOVERY_GRACE)
    }

    /// Ask the radio to discover its neighbours and collect every reply that
    /// arrives within `window`.
    ///
    /// Replies are read from the raw frame stream, since one `ND` request
    /// yields many responses sharing a frame id. No replies at all is an
    /// empty list, not an error.
    pub async fn discover_nodes(&self, window: Duration) -> Result<Vec<DiscoveredNode>> {
        check_timeout(window)?;
        let mut replies = self.frames().of_type(AT_COMMAND_RESPONSE);
        let mut nodes: Vec<DiscoveredNode> = Vec::new();

        let gather = async {
            while let Some(frame) = replies.recv().await {
                let Frame::AtCommandResponse(response) = frame else {
                    continue;
                };
                if response.command != NODE_DISCOVER_COMMAND || response.status != COMMAND_STATUS_OK
                {
                    continue;
                }
                if let Some(node) = DiscoveredNode::parse(&response.data) {
                    if !nodes.iter().any(|n| n.address64 == node.address64) {
                        debug!(node = %node.node_identifier, "node discovered");
                        nodes.push(node);
                    }
                }
            }
        };
        let (_, command) = tokio::join!(
            tokio::time::timeout(window, gather),
            self.at_command(NODE_DISCOVER_COMMAND, Bytes::new(), window),
        );

        match command {
            Ok(_) | Err(SessionError::Timeout(_)) => {}
            Err(err) => return Err(err),
        }
        info!(found = nodes.len(), "node discovery finished");
        Ok(nodes)
    }
}
