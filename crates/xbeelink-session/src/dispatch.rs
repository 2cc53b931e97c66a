//! Typed AT command and transmit requests.

use std::time::Duration;

use bytes::Bytes;
use tracing::debug;
use xbeelink_frame::{
    command_status_name, delivery_status_name, Address16, Address64, AtCommand, Frame,
    FrameError, RemoteAtCommandRequest, RemoteCommandResponse, TxRequest16, TxRequest64,
    ZigbeeTransmitRequest, AT_COMMAND_RESPONSE, BROADCAST_ADDRESS_16, BROADCAST_ADDRESS_64,
    COMMAND_STATUS_OK, DELIVERY_STATUS_SUCCESS, REMOTE_COMMAND_RESPONSE,
    REMOTE_OPTION_APPLY_CHANGES, TX_STATUS, UNKNOWN_ADDRESS_16, UNKNOWN_ADDRESS_64,
    ZIGBEE_TRANSMIT_STATUS,
};

use crate::config::ModuleKind;
use crate::destination::Destination;
use crate::error::{Result, SessionError};
use crate::session::Session;

/// An AT command for the local radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCommand {
    command: String,
    parameter: Bytes,
    timeout: Option<Duration>,
}

impl LocalCommand {
    /// `command` must be two ASCII characters, e.g. `"NI"`.
    pub fn new(command: &str) -> Result<Self> {
        check_command(command)?;
        Ok(Self {
            command: command.to_string(),
            parameter: Bytes::new(),
            timeout: None,
        })
    }

    pub fn with_parameter(mut self, parameter: impl AsRef<[u8]>) -> Self {
        self.parameter = Bytes::copy_from_slice(parameter.as_ref());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

/// An AT command executed on a remote radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    command: String,
    parameter: Bytes,
    destination: Destination,
    timeout: Option<Duration>,
}

impl RemoteCommand {
    pub fn new(command: &str, destination: Destination) -> Result<Self> {
        check_command(command)?;
        Ok(Self {
            command: command.to_string(),
            parameter: Bytes::new(),
            destination,
            timeout: None,
        })
    }

    pub fn with_parameter(mut self, parameter: impl AsRef<[u8]>) -> Self {
        self.parameter = Bytes::copy_from_slice(parameter.as_ref());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }
}

/// A data payload for a remote radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTransmit {
    data: Bytes,
    destination: Destination,
    timeout: Option<Duration>,
}

impl RemoteTransmit {
    pub fn new(data: impl AsRef<[u8]>, destination: Destination) -> Result<Self> {
        let data = data.as_ref();
        if data.is_empty() {
            return Err(SessionError::Validation(
                "transmit data must not be empty".to_string(),
            ));
        }
        Ok(Self {
            data: Bytes::copy_from_slice(data),
            destination,
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }
}

/// A destination after node identifiers have been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Long(Address64),
    Short(Address16),
    Broadcast,
}

impl Route {
    /// 64/16-bit pair for remote AT and ZigBee transmit frames.
    fn address_pair(self) -> (Address64, Address16) {
        match self {
            Self::Long(address) => (address, UNKNOWN_ADDRESS_16),
            Self::Short(address) => (UNKNOWN_ADDRESS_64, address),
            Self::Broadcast => (BROADCAST_ADDRESS_64, UNKNOWN_ADDRESS_16),
        }
    }
}

impl Session {
    /// Run an AT command on the local radio and return its data.
    pub async fn local_command(&self, request: LocalCommand) -> Result<Bytes> {
        let timeout = self.effective_timeout(request.timeout)?;
        debug!(command = %request.command, "local command");
        self.at_command(&request.command, request.parameter, timeout)
            .await
    }

    /// Run an AT command on a remote radio and return the whole response,
    /// including which node answered.
    pub async fn remote_command(&self, request: RemoteCommand) -> Result<RemoteCommandResponse> {
        let timeout = self.effective_timeout(request.timeout)?;
        request.destination.check(self.config().module)?;
        debug!(command = %request.command, destination = %request.destination, "remote command");

        let (destination64, destination16) = self
            .route(&request.destination, timeout)
            .await?
            .address_pair();
        let frame = Frame::RemoteAtCommandRequest(RemoteAtCommandRequest {
            id: 0,
            destination64,
            destination16,
            options: REMOTE_OPTION_APPLY_CHANGES,
            command: request.command,
            parameter: request.parameter,
        });

        match self
            .send_and_await(frame, REMOTE_COMMAND_RESPONSE, timeout)
            .await?
        {
            Frame::RemoteCommandResponse(response) => {
                check_command_status(response.status)?;
                Ok(response)
            }
            other => Err(unexpected(&other)),
        }
    }

    /// Send data to a remote radio and wait for its delivery status.
    pub async fn remote_transmit(&self, request: RemoteTransmit) -> Result<()> {
        let timeout = self.effective_timeout(request.timeout)?;
        request.destination.check(self.config().module)?;
        debug!(
            destination = %request.destination,
            len = request.data.len(),
            "remote transmit"
        );

        let route = self.route(&request.destination, timeout).await?;
        let (frame, response_type) = transmit_frame(self.config().module, route, request.data);

        let delivery_status = match self
            .send_and_await(frame, response_type, timeout)
            .await?
        {
            Frame::TxStatus(status) => status.delivery_status,
            Frame::ZigbeeTransmitStatus(status) => status.delivery_status,
            other => return Err(unexpected(&other)),
        };
        if delivery_status != DELIVERY_STATUS_SUCCESS {
            return Err(SessionError::CommandFailed(
                delivery_status_name(delivery_status).to_string(),
            ));
        }
        Ok(())
    }

    /// Local AT round trip shared by commands, lookups and discovery.
    pub(crate) async fn at_command(
        &self,
        command: &str,
        parameter: Bytes,
        timeout: Duration,
    ) -> Result<Bytes> {
        let frame = Frame::AtCommand(AtCommand {
            id: 0,
            command: command.to_string(),
            parameter,
        });
        match self
            .send_and_await(frame, AT_COMMAND_RESPONSE, timeout)
            .await?
        {
            Frame::AtCommandResponse(response) => {
                check_command_status(response.status)?;
                Ok(response.data)
            }
            other => Err(unexpected(&other)),
        }
    }

    async fn route(&self, destination: &Destination, timeout: Duration) -> Result<Route> {
        Ok(match destination {
            Destination::NodeId(identifier) => {
                Route::Long(self.resolve_node(identifier, timeout).await?)
            }
            Destination::Address64(address) => Route::Long(*address),
            Destination::Address16(address) => Route::Short(*address),
            Destination::Broadcast => Route::Broadcast,
        })
    }
}

fn transmit_frame(module: ModuleKind, route: Route, data: Bytes) -> (Frame, u8) {
    match module {
        ModuleKind::Series1 => {
            let frame = match route {
                Route::Long(destination64) => Frame::TxRequest64(TxRequest64 {
                    id: 0,
                    destination64,
                    options: 0,
                    data,
                }),
                Route::Short(destination16) => Frame::TxRequest16(TxRequest16 {
                    id: 0,
                    destination16,
                    options: 0,
                    data,
                }),
                Route::Broadcast => Frame::TxRequest16(TxRequest16 {
                    id: 0,
                    destination16: BROADCAST_ADDRESS_16,
                    options: 0,
                    data,
                }),
            };
            (frame, TX_STATUS)
        }
        ModuleKind::ZNet | ModuleKind::ZigBee => {
            let (destination64, destination16) = route.address_pair();
            let frame = Frame::ZigbeeTransmitRequest(ZigbeeTransmitRequest {
                id: 0,
                destination64,
                destination16,
                broadcast_radius: 0,
                options: 0,
                data,
            });
            (frame, ZIGBEE_TRANSMIT_STATUS)
        }
    }
}

fn check_command(command: &str) -> Result<()> {
    if command.len() != 2 || !command.is_ascii() {
        return Err(SessionError::Validation(format!(
            "command must be 2 ASCII characters, got {command:?}"
        )));
    }
    Ok(())
}

fn check_command_status(status: u8) -> Result<()> {
    if status == COMMAND_STATUS_OK {
        Ok(())
    } else {
        Err(SessionError::CommandFailed(
            command_status_name(status).to_string(),
        ))
    }
}

fn unexpected(frame: &Frame) -> SessionError {
    SessionError::Frame(FrameError::Malformed {
        frame_type: frame.frame_type(),
        reason: "unexpected response kind".to_string(),
    })
}
