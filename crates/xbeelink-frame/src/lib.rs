//! XBee API frame model and wire codec.
//!
//! Every API frame on the serial line is framed as:
//! - A 1-byte start delimiter (`0x7E`)
//! - A 2-byte big-endian length of the frame data
//! - The frame data (type byte followed by type-specific fields)
//! - A 1-byte checksum
//!
//! API mode 2 additionally escapes control bytes. The `async` feature adds a
//! `tokio_util` codec for use with `FramedRead`/`FramedWrite`.

pub mod codec;
pub mod error;
pub mod frame;
pub mod frame_type;
pub mod status;
#[cfg(feature = "async")]
pub mod xbee_codec;

pub use codec::{checksum, decode_frame, encode_frame, ApiMode, START_DELIMITER};
pub use error::{FrameError, Result};
pub use frame::{
    Address16, Address64, AtCommand, AtCommandResponse, Frame, ModemStatus,
    RemoteAtCommandRequest, RemoteCommandResponse, TxRequest16, TxRequest64, TxStatus,
    ZigbeeIoSample, ZigbeeReceivePacket, ZigbeeTransmitRequest, ZigbeeTransmitStatus,
    BROADCAST_ADDRESS_16, BROADCAST_ADDRESS_64, REMOTE_OPTION_APPLY_CHANGES, UNKNOWN_ADDRESS_16,
    UNKNOWN_ADDRESS_64,
};
pub use frame_type::*;
pub use status::{
    command_status_name, delivery_status_name, COMMAND_STATUS_OK, DELIVERY_STATUS_SUCCESS,
};
#[cfg(feature = "async")]
pub use xbee_codec::XBeeCodec;
