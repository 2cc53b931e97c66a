use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Args, Subcommand};
use xbeelink_frame::ApiMode;
use xbeelink_session::{Destination, ModuleKind, Session, SessionConfig};
use xbeelink_transport::SerialConfig;

use crate::exit::{session_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod discover;
pub mod local;
pub mod monitor;
pub mod remote;
pub mod transmit;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run an AT command on the local radio.
    Local(LocalArgs),
    /// Run an AT command on a remote radio.
    Remote(RemoteArgs),
    /// Send data to a remote radio.
    Transmit(TransmitArgs),
    /// Print frames reported by the radio until interrupted.
    Monitor(MonitorArgs),
    /// Discover nodes on the network.
    Discover(DiscoverArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    if let Command::Version(args) = command {
        return version::run(args);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime setup failed: {err}")))?;

    runtime.block_on(async move {
        match command {
            Command::Local(args) => local::run(args, format).await,
            Command::Remote(args) => remote::run(args, format).await,
            Command::Transmit(args) => transmit::run(args, format).await,
            Command::Monitor(args) => monitor::run(args, format).await,
            Command::Discover(args) => discover::run(args, format).await,
            Command::Version(args) => version::run(args),
        }
    })
}

/// Serial link and radio settings shared by every radio command.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial device the radio is attached to.
    #[arg(long, short = 'p', env = "XBEELINK_PORT")]
    pub port: PathBuf,
    /// Baud rate (must match the radio's BD setting).
    #[arg(long, env = "XBEELINK_BAUD", default_value_t = 9600)]
    pub baud: u32,
    /// Radio family: 802.15.4, ZNet or ZigBee.
    #[arg(long, env = "XBEELINK_MODULE", default_value = "ZigBee")]
    pub module: ModuleKind,
    /// API mode (the radio's AP setting): 1 unescaped, 2 escaped.
    #[arg(long, default_value_t = 1)]
    pub api_mode: u8,
    /// Per-request timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

impl LinkArgs {
    pub fn timeout(&self) -> CliResult<Duration> {
        parse_duration(&self.timeout)
    }

    pub fn session_config(&self) -> CliResult<SessionConfig> {
        let api_mode = ApiMode::from_ap(self.api_mode).ok_or_else(|| {
            CliError::new(
                USAGE,
                format!("--api-mode must be 1 or 2, got {}", self.api_mode),
            )
        })?;
        Ok(SessionConfig::new(self.module)
            .with_api_mode(api_mode)
            .with_default_timeout(self.timeout()?))
    }

    pub fn open(&self) -> CliResult<Session> {
        let serial = SerialConfig {
            baud_rate: self.baud,
            ..SerialConfig::default()
        };
        Session::open_serial(&self.port, serial, self.session_config()?)
            .map_err(|err| session_error("session setup failed", err))
    }
}

/// Exactly one destination per remote request.
#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("destination")
        .required(true)
        .args(["node_id", "dest64", "dest16", "broadcast"]),
))]
pub struct DestinationArgs {
    /// Node identifier (NI), resolved with DN.
    #[arg(long)]
    pub node_id: Option<String>,
    /// 64-bit address as 16 hex digits.
    #[arg(long)]
    pub dest64: Option<String>,
    /// 16-bit address as 4 hex digits.
    #[arg(long)]
    pub dest16: Option<String>,
    /// Broadcast to every node.
    #[arg(long)]
    pub broadcast: bool,
}

impl DestinationArgs {
    pub fn destination(&self) -> CliResult<Destination> {
        let destination = if let Some(node_id) = &self.node_id {
            Ok(Destination::node_id(node_id.clone()))
        } else if let Some(hex) = &self.dest64 {
            Destination::address64_hex(hex)
        } else if let Some(hex) = &self.dest16 {
            Destination::address16_hex(hex)
        } else {
            Ok(Destination::Broadcast)
        };
        destination.map_err(|err| session_error("invalid destination", err))
    }
}

/// Command parameter, as text or hex.
#[derive(Args, Debug)]
pub struct ParameterArgs {
    /// Parameter as a string.
    #[arg(long, conflicts_with = "param_hex")]
    pub param: Option<String>,
    /// Parameter as hex digits.
    #[arg(long)]
    pub param_hex: Option<String>,
}

impl ParameterArgs {
    pub fn bytes(&self) -> CliResult<Vec<u8>> {
        match (&self.param, &self.param_hex) {
            (Some(text), _) => Ok(text.as_bytes().to_vec()),
            (None, Some(hex)) => parse_hex_bytes(hex),
            (None, None) => Ok(Vec::new()),
        }
    }
}

#[derive(Args, Debug)]
pub struct LocalArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Two-character AT command, e.g. NI.
    pub command: String,
    #[command(flatten)]
    pub parameter: ParameterArgs,
}

#[derive(Args, Debug)]
pub struct RemoteArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Two-character AT command, e.g. D0.
    pub command: String,
    #[command(flatten)]
    pub parameter: ParameterArgs,
    #[command(flatten)]
    pub destination: DestinationArgs,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("payload").required(true).args(["data", "data_hex"])))]
pub struct TransmitArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Payload as a string.
    #[arg(long)]
    pub data: Option<String>,
    /// Payload as hex digits.
    #[arg(long)]
    pub data_hex: Option<String>,
    #[command(flatten)]
    pub destination: DestinationArgs,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Only show data packets received from remote nodes.
    #[arg(long, conflicts_with = "io_samples")]
    pub transmissions: bool,
    /// Only show I/O sample reports.
    #[arg(long)]
    pub io_samples: bool,
    /// Exit after printing N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// How long to collect replies (e.g. 6s). Default: the radio's NT plus 1s.
    #[arg(long)]
    pub window: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

pub fn parse_hex_bytes(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CliError::new(
            USAGE,
            format!("invalid hex string: {input}"),
        ));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| CliError::new(USAGE, format!("invalid hex string: {input}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("6s").unwrap(), Duration::from_secs(6));
        assert_eq!(parse_duration("2").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("0ms").unwrap_err().code, USAGE);
        assert_eq!(parse_duration("soon").unwrap_err().code, USAGE);
    }

    #[test]
    fn parses_hex_with_spaces() {
        assert_eq!(parse_hex_bytes("7E 00 0a").unwrap(), vec![0x7E, 0x00, 0x0A]);
        assert!(parse_hex_bytes("7E0").is_err());
        assert!(parse_hex_bytes("zz").is_err());
    }

    #[test]
    fn builds_session_config_from_flags() {
        let link = LinkArgs {
            port: PathBuf::from("/dev/ttyUSB0"),
            baud: 9600,
            module: ModuleKind::Series1,
            api_mode: 2,
            timeout: "250ms".to_string(),
        };
        let config = link.session_config().unwrap();
        assert_eq!(config.module, ModuleKind::Series1);
        assert_eq!(config.api_mode, ApiMode::Escaped);
        assert_eq!(config.default_timeout, Duration::from_millis(250));

        let bad = LinkArgs { api_mode: 3, ..link };
        assert_eq!(bad.session_config().unwrap_err().code, USAGE);
    }
}
