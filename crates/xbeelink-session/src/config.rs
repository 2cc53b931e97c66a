use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use xbeelink_frame::ApiMode;

use crate::error::{Result, SessionError};

/// Shortest per-request timeout accepted.
pub const MIN_TIMEOUT: Duration = Duration::from_millis(10);

/// Timeout applied when a request does not carry its own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default depth of the outbound write queue.
pub const DEFAULT_WRITE_QUEUE: usize = 64;

/// Default number of inbound frames buffered per subscriber.
pub const DEFAULT_FRAME_BUFFER: usize = 256;

/// Radio family. Decides which transmit frames are used and whether node
/// identifiers can be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModuleKind {
    /// Series 1 (802.15.4). No node identifier destinations.
    Series1,
    /// Series 2 ZNet 2.5.
    ZNet,
    /// Series 2 ZigBee.
    #[default]
    ZigBee,
}

impl ModuleKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Series1 => "802.15.4",
            Self::ZNet => "ZNet",
            Self::ZigBee => "ZigBee",
        }
    }

    /// Whether node identifiers may be used as destinations.
    pub fn supports_node_ids(self) -> bool {
        !matches!(self, Self::Series1)
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModuleKind {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "802.15.4" | "series1" | "s1" => Ok(Self::Series1),
            "znet" => Ok(Self::ZNet),
            "zigbee" | "series2" | "s2" => Ok(Self::ZigBee),
            other => Err(SessionError::Validation(format!(
                "unknown module '{other}' (expected 802.15.4, ZNet or ZigBee)"
            ))),
        }
    }
}

/// Session-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Radio family.
    pub module: ModuleKind,
    /// Framing mode; must match the radio's `AP` setting.
    pub api_mode: ApiMode,
    /// Timeout for requests that do not set one.
    pub default_timeout: Duration,
    /// Frames that may be queued for writing before senders wait.
    pub write_queue_capacity: usize,
    /// Inbound frames buffered for each frame subscriber before it lags.
    pub frame_buffer_capacity: usize,
}

impl SessionConfig {
    pub fn new(module: ModuleKind) -> Self {
        Self {
            module,
            ..Self::default()
        }
    }

    pub fn with_api_mode(mut self, api_mode: ApiMode) -> Self {
        self.api_mode = api_mode;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Check the settings before a session is started.
    pub fn validate(&self) -> Result<()> {
        check_timeout(self.default_timeout)?;
        if self.write_queue_capacity == 0 {
            return Err(SessionError::Validation(
                "write queue capacity must be at least 1".to_string(),
            ));
        }
        if self.frame_buffer_capacity == 0 {
            return Err(SessionError::Validation(
                "frame buffer capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            module: ModuleKind::default(),
            api_mode: ApiMode::default(),
            default_timeout: DEFAULT_TIMEOUT,
            write_queue_capacity: DEFAULT_WRITE_QUEUE,
            frame_buffer_capacity: DEFAULT_FRAME_BUFFER,
        }
    }
}

pub(crate) fn check_timeout(timeout: Duration) -> Result<()> {
    if timeout < MIN_TIMEOUT {
        return Err(SessionError::Validation(format!(
            "timeout must be at least {} ms, got {} ms",
            MIN_TIMEOUT.as_millis(),
            timeout.as_millis()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_names_parse_case_insensitively() {
        assert_eq!("802.15.4".parse::<ModuleKind>().unwrap(), ModuleKind::Series1);
        assert_eq!("znet".parse::<ModuleKind>().unwrap(), ModuleKind::ZNet);
        assert_eq!("ZigBee".parse::<ModuleKind>().unwrap(), ModuleKind::ZigBee);
        assert!("wifi".parse::<ModuleKind>().unwrap_err().is_validation());
    }

    #[test]
    fn timeout_floor_is_enforced() {
        assert!(check_timeout(Duration::from_millis(10)).is_ok());
        assert!(check_timeout(Duration::from_millis(9)).is_err());
        assert!(check_timeout(Duration::ZERO).is_err());
    }

    #[test]
    fn default_config_is_valid() {
        let config = SessionConfig::default();
        assert_eq!(config.default_timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_capacities_rejected() {
        let config = SessionConfig {
            frame_buffer_capacity: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SessionConfig {
            write_queue_capacity: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
