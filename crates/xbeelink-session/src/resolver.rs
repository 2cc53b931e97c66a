//! Node identifier to 64-bit address resolution.
//!
//! A lookup sends `DN` with the identifier as parameter; the radio answers
//! with the node's 16-bit and 64-bit addresses, and the trailing eight bytes
//! are kept. Successful lookups are cached for the life of the session and
//! never expire. Failed lookups are not cached.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;
use xbeelink_frame::Address64;

use crate::config::check_timeout;
use crate::destination::to_hex;
use crate::error::{Result, SessionError};
use crate::session::Session;

/// AT command used to look a node up by identifier.
pub const NODE_LOOKUP_COMMAND: &str = "DN";

/// Identifier to address map shared by every request on a session.
#[derive(Debug, Default)]
pub(crate) struct DestinationCache {
    entries: Mutex<HashMap<String, Address64>>,
}

impl DestinationCache {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Address64>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn get(&self, identifier: &str) -> Option<Address64> {
        self.lock().get(identifier).copied()
    }

    pub(crate) fn insert(&self, identifier: &str, address: Address64) {
        self.lock().insert(identifier.to_string(), address);
    }

    pub(crate) fn remove(&self, identifier: &str) -> Option<Address64> {
        self.lock().remove(identifier)
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}

impl Session {
    /// Resolve a node identifier to its 64-bit address.
    ///
    /// A cached address is returned without touching the radio. Any lookup
    /// failure (timeout, error status, short reply) is reported as
    /// [`SessionError::NodeNotFound`].
    pub async fn resolve_node(&self, identifier: &str, timeout: Duration) -> Result<Address64> {
        check_timeout(timeout)?;
        if identifier.is_empty() {
            return Err(SessionError::Validation(
                "node identifier must not be empty".to_string(),
            ));
        }

        if let Some(address) = self.cache().get(identifier) {
            debug!(identifier, address = %to_hex(&address), "node address cached");
            return Ok(address);
        }

        debug!(identifier, "looking up node address");
        let data = self
            .at_command(
                NODE_LOOKUP_COMMAND,
                Bytes::copy_from_slice(identifier.as_bytes()),
                timeout,
            )
            .await
            .map_err(|err| {
                debug!(identifier, %err, "node lookup failed");
                SessionError::NodeNotFound(identifier.to_string())
            })?;

        let address = trailing_address(&data).ok_or_else(|| {
            debug!(identifier, len = data.len(), "node lookup reply too short");
            SessionError::NodeNotFound(identifier.to_string())
        })?;
        self.cache().insert(identifier, address);
        debug!(identifier, address = %to_hex(&address), "node address resolved");
        Ok(address)
    }

    /// Address cached for `identifier`, if any.
    pub fn cached_address(&self, identifier: &str) -> Option<Address64> {
        self.cache().get(identifier)
    }

    /// Drop a cached address so the next request looks it up again.
    pub fn forget_node(&self, identifier: &str) -> Option<Address64> {
        self.cache().remove(identifier)
    }

    /// Number of cached node addresses.
    pub fn cached_nodes(&self) -> usize {
        self.cache().len()
    }
}

fn trailing_address(data: &[u8]) -> Option<Address64> {
    let start = data.len().checked_sub(8)?;
    <Address64>::try_from(&data[start..]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_last_eight_bytes() {
        assert_eq!(
            trailing_address(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]),
            Some([3, 4, 5, 6, 7, 8, 9, 10])
        );
        assert_eq!(trailing_address(&[9; 8]), Some([9; 8]));
        assert_eq!(trailing_address(&[1, 2, 3]), None);
    }

    #[test]
    fn cache_is_keyed_by_exact_identifier() {
        let cache = DestinationCache::default();
        cache.insert("PUMP", [1; 8]);
        assert_eq!(cache.get("PUMP"), Some([1; 8]));
        assert_eq!(cache.get("pump"), None);
        assert_eq!(cache.remove("PUMP"), Some([1; 8]));
        assert_eq!(cache.len(), 0);
    }
}
