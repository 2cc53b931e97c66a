//! Decoded API frames.
//!
//! [`Frame`] is the unit the rest of the stack works with. The codec turns
//! the frame data (everything between the length field and the checksum)
//! into a `Frame` with [`Frame::parse`] and back with [`Frame::write_data`].

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::error::{FrameError, Result};
use crate::frame_type::*;

/// 64-bit hardware (serial number) address.
pub type Address64 = [u8; 8];

/// 16-bit network address.
pub type Address16 = [u8; 2];

/// 64-bit broadcast address.
pub const BROADCAST_ADDRESS_64: Address64 = [0, 0, 0, 0, 0, 0, 0xFF, 0xFF];

/// 16-bit broadcast address (802.15.4 modules).
pub const BROADCAST_ADDRESS_16: Address16 = [0xFF, 0xFF];

/// 64-bit placeholder used when addressing by 16-bit address.
pub const UNKNOWN_ADDRESS_64: Address64 = [0xFF; 8];

/// 16-bit placeholder used when addressing by 64-bit address.
pub const UNKNOWN_ADDRESS_16: Address16 = [0xFF, 0xFE];

/// Remote AT option: apply changes immediately.
pub const REMOTE_OPTION_APPLY_CHANGES: u8 = 0x02;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AtCommand {
    pub id: u8,
    pub command: String,
    pub parameter: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AtCommandResponse {
    pub id: u8,
    pub command: String,
    pub status: u8,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteAtCommandRequest {
    pub id: u8,
    pub destination64: Address64,
    pub destination16: Address16,
    pub options: u8,
    pub command: String,
    pub parameter: Bytes,
}

/// Reply to a [`RemoteAtCommandRequest`], including which node answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteCommandResponse {
    pub id: u8,
    pub remote64: Address64,
    pub remote16: Address16,
    pub command: String,
    pub status: u8,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZigbeeTransmitRequest {
    pub id: u8,
    pub destination64: Address64,
    pub destination16: Address16,
    pub broadcast_radius: u8,
    pub options: u8,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZigbeeTransmitStatus {
    pub id: u8,
    pub remote16: Address16,
    pub retry_count: u8,
    pub delivery_status: u8,
    pub discovery_status: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxRequest64 {
    pub id: u8,
    pub destination64: Address64,
    pub options: u8,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxRequest16 {
    pub id: u8,
    pub destination16: Address16,
    pub options: u8,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxStatus {
    pub id: u8,
    pub delivery_status: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModemStatus {
    pub status: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZigbeeReceivePacket {
    pub remote64: Address64,
    pub remote16: Address16,
    pub options: u8,
    pub data: Bytes,
}

/// A single I/O sample report from a remote node.
///
/// `digital_samples` is present only when at least one digital line is
/// enabled; `analog_samples` holds one reading per bit set in `analog_mask`,
/// lowest bit first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZigbeeIoSample {
    pub remote64: Address64,
    pub remote16: Address16,
    pub options: u8,
    pub sample_count: u8,
    pub digital_mask: u16,
    pub analog_mask: u8,
    pub digital_samples: Option<u16>,
    pub analog_samples: Vec<u16>,
}

/// A decoded API frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Frame {
    AtCommand(AtCommand),
    AtCommandResponse(AtCommandResponse),
    RemoteAtCommandRequest(RemoteAtCommandRequest),
    RemoteCommandResponse(RemoteCommandResponse),
    ZigbeeTransmitRequest(ZigbeeTransmitRequest),
    ZigbeeTransmitStatus(ZigbeeTransmitStatus),
    TxRequest64(TxRequest64),
    TxRequest16(TxRequest16),
    TxStatus(TxStatus),
    ModemStatus(ModemStatus),
    ZigbeeReceivePacket(ZigbeeReceivePacket),
    ZigbeeIoSample(ZigbeeIoSample),
    /// Any frame type this crate does not model; `data` excludes the type byte.
    Unknown { frame_type: u8, data: Bytes },
}

impl Frame {
    /// The API frame type byte.
    pub fn frame_type(&self) -> u8 {
        match self {
            Frame::AtCommand(_) => AT_COMMAND,
            Frame::AtCommandResponse(_) => AT_COMMAND_RESPONSE,
            Frame::RemoteAtCommandRequest(_) => REMOTE_AT_COMMAND_REQUEST,
            Frame::RemoteCommandResponse(_) => REMOTE_COMMAND_RESPONSE,
            Frame::ZigbeeTransmitRequest(_) => ZIGBEE_TRANSMIT_REQUEST,
            Frame::ZigbeeTransmitStatus(_) => ZIGBEE_TRANSMIT_STATUS,
            Frame::TxRequest64(_) => TX_REQUEST_64,
            Frame::TxRequest16(_) => TX_REQUEST_16,
            Frame::TxStatus(_) => TX_STATUS,
            Frame::ModemStatus(_) => MODEM_STATUS,
            Frame::ZigbeeReceivePacket(_) => ZIGBEE_RECEIVE_PACKET,
            Frame::ZigbeeIoSample(_) => ZIGBEE_IO_DATA_SAMPLE_RX,
            Frame::Unknown { frame_type, .. } => *frame_type,
        }
    }

    /// The correlation id, for kinds that carry one.
    pub fn frame_id(&self) -> Option<u8> {
        match self {
            Frame::AtCommand(f) => Some(f.id),
            Frame::AtCommandResponse(f) => Some(f.id),
            Frame::RemoteAtCommandRequest(f) => Some(f.id),
            Frame::RemoteCommandResponse(f) => Some(f.id),
            Frame::ZigbeeTransmitRequest(f) => Some(f.id),
            Frame::ZigbeeTransmitStatus(f) => Some(f.id),
            Frame::TxRequest64(f) => Some(f.id),
            Frame::TxRequest16(f) => Some(f.id),
            Frame::TxStatus(f) => Some(f.id),
            Frame::Unknown { frame_type, data } if carries_frame_id(*frame_type) => {
                data.first().copied()
            }
            _ => None,
        }
    }

    /// Stamp a correlation id. Returns false, leaving the frame untouched,
    /// for kinds without an id field.
    pub fn set_frame_id(&mut self, id: u8) -> bool {
        match self {
            Frame::AtCommand(f) => f.id = id,
            Frame::AtCommandResponse(f) => f.id = id,
            Frame::RemoteAtCommandRequest(f) => f.id = id,
            Frame::RemoteCommandResponse(f) => f.id = id,
            Frame::ZigbeeTransmitRequest(f) => f.id = id,
            Frame::ZigbeeTransmitStatus(f) => f.id = id,
            Frame::TxRequest64(f) => f.id = id,
            Frame::TxRequest16(f) => f.id = id,
            Frame::TxStatus(f) => f.id = id,
            Frame::Unknown { frame_type, data } if carries_frame_id(*frame_type) => {
                let Some((_, rest)) = data.split_first() else {
                    return false;
                };
                let mut stamped = BytesMut::with_capacity(data.len());
                stamped.put_u8(id);
                stamped.put_slice(rest);
                *data = stamped.freeze();
            }
            _ => return false,
        }
        true
    }

    /// Parse frame data (type byte first, checksum excluded).
    pub fn parse(data: &[u8]) -> Result<Frame> {
        let Some((&frame_type, body)) = data.split_first() else {
            return Err(FrameError::Malformed {
                frame_type: 0,
                reason: "empty frame data".to_string(),
            });
        };
        let mut r = FieldReader::new(frame_type, body);

        let frame = match frame_type {
            AT_COMMAND => Frame::AtCommand(AtCommand {
                id: r.u8()?,
                command: r.command()?,
                parameter: r.rest(),
            }),
            AT_COMMAND_RESPONSE => Frame::AtCommandResponse(AtCommandResponse {
                id: r.u8()?,
                command: r.command()?,
                status: r.u8()?,
                data: r.rest(),
            }),
            REMOTE_AT_COMMAND_REQUEST => Frame::RemoteAtCommandRequest(RemoteAtCommandRequest {
                id: r.u8()?,
                destination64: r.array()?,
                destination16: r.array()?,
                options: r.u8()?,
                command: r.command()?,
                parameter: r.rest(),
            }),
            REMOTE_COMMAND_RESPONSE => Frame::RemoteCommandResponse(RemoteCommandResponse {
                id: r.u8()?,
                remote64: r.array()?,
                remote16: r.array()?,
                command: r.command()?,
                status: r.u8()?,
                data: r.rest(),
            }),
            ZIGBEE_TRANSMIT_REQUEST => Frame::ZigbeeTransmitRequest(ZigbeeTransmitRequest {
                id: r.u8()?,
                destination64: r.array()?,
                destination16: r.array()?,
                broadcast_radius: r.u8()?,
                options: r.u8()?,
                data: r.rest(),
            }),
            ZIGBEE_TRANSMIT_STATUS => Frame::ZigbeeTransmitStatus(ZigbeeTransmitStatus {
                id: r.u8()?,
                remote16: r.array()?,
                retry_count: r.u8()?,
                delivery_status: r.u8()?,
                discovery_status: r.u8()?,
            }),
            TX_REQUEST_64 => Frame::TxRequest64(TxRequest64 {
                id: r.u8()?,
                destination64: r.array()?,
                options: r.u8()?,
                data: r.rest(),
            }),
            TX_REQUEST_16 => Frame::TxRequest16(TxRequest16 {
                id: r.u8()?,
                destination16: r.array()?,
                options: r.u8()?,
                data: r.rest(),
            }),
            TX_STATUS => Frame::TxStatus(TxStatus {
                id: r.u8()?,
                delivery_status: r.u8()?,
            }),
            MODEM_STATUS => Frame::ModemStatus(ModemStatus { status: r.u8()? }),
            ZIGBEE_RECEIVE_PACKET => Frame::ZigbeeReceivePacket(ZigbeeReceivePacket {
                remote64: r.array()?,
                remote16: r.array()?,
                options: r.u8()?,
                data: r.rest(),
            }),
            ZIGBEE_IO_DATA_SAMPLE_RX => Frame::ZigbeeIoSample(parse_io_sample(&mut r)?),
            other => Frame::Unknown {
                frame_type: other,
                data: r.rest(),
            },
        };

        Ok(frame)
    }

    /// Serialize frame data (type byte first, no length or checksum).
    pub fn write_data(&self, dst: &mut BytesMut) {
        dst.put_u8(self.frame_type());
        match self {
            Frame::AtCommand(f) => {
                dst.put_u8(f.id);
                dst.put_slice(f.command.as_bytes());
                dst.put_slice(&f.parameter);
            }
            Frame::AtCommandResponse(f) => {
                dst.put_u8(f.id);
                dst.put_slice(f.command.as_bytes());
                dst.put_u8(f.status);
                dst.put_slice(&f.data);
            }
            Frame::RemoteAtCommandRequest(f) => {
                dst.put_u8(f.id);
                dst.put_slice(&f.destination64);
                dst.put_slice(&f.destination16);
                dst.put_u8(f.options);
                dst.put_slice(f.command.as_bytes());
                dst.put_slice(&f.parameter);
            }
            Frame::RemoteCommandResponse(f) => {
                dst.put_u8(f.id);
                dst.put_slice(&f.remote64);
                dst.put_slice(&f.remote16);
                dst.put_slice(f.command.as_bytes());
                dst.put_u8(f.status);
                dst.put_slice(&f.data);
            }
            Frame::ZigbeeTransmitRequest(f) => {
                dst.put_u8(f.id);
                dst.put_slice(&f.destination64);
                dst.put_slice(&f.destination16);
                dst.put_u8(f.broadcast_radius);
                dst.put_u8(f.options);
                dst.put_slice(&f.data);
            }
            Frame::ZigbeeTransmitStatus(f) => {
                dst.put_u8(f.id);
                dst.put_slice(&f.remote16);
                dst.put_u8(f.retry_count);
                dst.put_u8(f.delivery_status);
                dst.put_u8(f.discovery_status);
            }
            Frame::TxRequest64(f) => {
                dst.put_u8(f.id);
                dst.put_slice(&f.destination64);
                dst.put_u8(f.options);
                dst.put_slice(&f.data);
            }
            Frame::TxRequest16(f) => {
                dst.put_u8(f.id);
                dst.put_slice(&f.destination16);
                dst.put_u8(f.options);
                dst.put_slice(&f.data);
            }
            Frame::TxStatus(f) => {
                dst.put_u8(f.id);
                dst.put_u8(f.delivery_status);
            }
            Frame::ModemStatus(f) => dst.put_u8(f.status),
            Frame::ZigbeeReceivePacket(f) => {
                dst.put_slice(&f.remote64);
                dst.put_slice(&f.remote16);
                dst.put_u8(f.options);
                dst.put_slice(&f.data);
            }
            Frame::ZigbeeIoSample(f) => {
                dst.put_slice(&f.remote64);
                dst.put_slice(&f.remote16);
                dst.put_u8(f.options);
                dst.put_u8(f.sample_count);
                dst.put_u16(f.digital_mask);
                dst.put_u8(f.analog_mask);
                if let Some(digital) = f.digital_samples {
                    dst.put_u16(digital);
                }
                for analog in &f.analog_samples {
                    dst.put_u16(*analog);
                }
            }
            Frame::Unknown { data, .. } => dst.put_slice(data),
        }
    }
}

fn parse_io_sample(r: &mut FieldReader<'_>) -> Result<ZigbeeIoSample> {
    let remote64 = r.array()?;
    let remote16 = r.array()?;
    let options = r.u8()?;
    let sample_count = r.u8()?;
    let digital_mask = r.u16()?;
    let analog_mask = r.u8()?;
    let digital_samples = if digital_mask != 0 {
        Some(r.u16()?)
    } else {
        None
    };
    let mut analog_samples = Vec::with_capacity(analog_mask.count_ones() as usize);
    for _ in 0..analog_mask.count_ones() {
        analog_samples.push(r.u16()?);
    }

    Ok(ZigbeeIoSample {
        remote64,
        remote16,
        options,
        sample_count,
        digital_mask,
        analog_mask,
        digital_samples,
        analog_samples,
    })
}

/// Bounds-checked big-endian field reader over frame data.
struct FieldReader<'a> {
    frame_type: u8,
    buf: &'a [u8],
}

impl<'a> FieldReader<'a> {
    fn new(frame_type: u8, buf: &'a [u8]) -> Self {
        Self { frame_type, buf }
    }

    fn take(&mut self, len: usize, field: &str) -> Result<&'a [u8]> {
        if self.buf.len() < len {
            return Err(FrameError::Malformed {
                frame_type: self.frame_type,
                reason: format!("truncated before {field}"),
            });
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1, "u8 field")?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let bytes = self.take(2, "u16 field")?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, "address")?);
        Ok(out)
    }

    fn command(&mut self) -> Result<String> {
        let bytes = self.take(2, "AT command")?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn rest(&mut self) -> Bytes {
        let rest = Bytes::copy_from_slice(self.buf);
        self.buf = &[];
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_of(frame: &Frame) -> Vec<u8> {
        let mut buf = BytesMut::new();
        frame.write_data(&mut buf);
        buf.to_vec()
    }

    #[test]
    fn at_command_layout() {
        let frame = Frame::AtCommand(AtCommand {
            id: 0x52,
            command: "NJ".to_string(),
            parameter: Bytes::new(),
        });
        assert_eq!(data_of(&frame), vec![0x08, 0x52, b'N', b'J']);
    }

    #[test]
    fn parses_at_command_response() {
        let data = [0x88, 0x01, b'S', b'L', 0x00, 64, 159, 115, 3];
        let frame = Frame::parse(&data).unwrap();

        assert_eq!(frame.frame_type(), AT_COMMAND_RESPONSE);
        assert_eq!(frame.frame_id(), Some(1));
        match frame {
            Frame::AtCommandResponse(resp) => {
                assert_eq!(resp.command, "SL");
                assert_eq!(resp.status, 0);
                assert_eq!(resp.data.as_ref(), &[64, 159, 115, 3]);
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn parses_remote_command_response() {
        let mut data = vec![0x97, 0x07];
        data.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        data.extend_from_slice(&[0xAB, 0xCD]);
        data.extend_from_slice(b"MY");
        data.push(0x00);
        data.extend_from_slice(&[0x12, 0x34]);

        let frame = Frame::parse(&data).unwrap();
        let Frame::RemoteCommandResponse(resp) = frame else {
            panic!("expected remote command response");
        };
        assert_eq!(resp.id, 7);
        assert_eq!(resp.remote64, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(resp.remote16, [0xAB, 0xCD]);
        assert_eq!(resp.data.as_ref(), &[0x12, 0x34]);
    }

    #[test]
    fn parses_io_sample_with_digital_and_analog() {
        let mut data = vec![0x92];
        data.extend_from_slice(&[0, 0x13, 0xA2, 0, 0x40, 0x52, 0x2B, 0xAA]);
        data.extend_from_slice(&[0x7D, 0x84]);
        data.push(0x01); // options
        data.push(0x01); // sample count
        data.extend_from_slice(&[0x00, 0x1C]); // digital mask
        data.push(0x02); // analog mask: AD1
        data.extend_from_slice(&[0x00, 0x14]); // digital samples
        data.extend_from_slice(&[0x02, 0x25]); // AD1

        let Frame::ZigbeeIoSample(sample) = Frame::parse(&data).unwrap() else {
            panic!("expected io sample");
        };
        assert_eq!(sample.digital_mask, 0x001C);
        assert_eq!(sample.digital_samples, Some(0x0014));
        assert_eq!(sample.analog_samples, vec![0x0225]);

        let mut again = BytesMut::new();
        Frame::ZigbeeIoSample(sample).write_data(&mut again);
        assert_eq!(again.as_ref(), data.as_slice());
    }

    #[test]
    fn truncated_frame_is_malformed() {
        let err = Frame::parse(&[0x8B, 0x01, 0xFF]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Malformed {
                frame_type: ZIGBEE_TRANSMIT_STATUS,
                ..
            }
        ));
    }

    #[test]
    fn empty_data_is_malformed() {
        assert!(matches!(
            Frame::parse(&[]),
            Err(FrameError::Malformed { .. })
        ));
    }

    #[test]
    fn unknown_type_is_preserved() {
        let frame = Frame::parse(&[0x95, 1, 2, 3]).unwrap();
        assert_eq!(
            frame,
            Frame::Unknown {
                frame_type: 0x95,
                data: Bytes::from_static(&[1, 2, 3]),
            }
        );
        assert_eq!(frame.frame_id(), None);
        assert_eq!(data_of(&frame), vec![0x95, 1, 2, 3]);
    }

    #[test]
    fn set_frame_id_only_touches_correlated_kinds() {
        let mut request = Frame::TxRequest16(TxRequest16 {
            id: 0,
            destination16: [1, 2],
            options: 0,
            data: Bytes::from_static(b"hi"),
        });
        assert!(request.set_frame_id(9));
        assert_eq!(request.frame_id(), Some(9));

        let mut status = Frame::ModemStatus(ModemStatus { status: 6 });
        assert!(!status.set_frame_id(9));
        assert_eq!(status.frame_id(), None);
    }

    #[test]
    fn set_frame_id_stamps_unparsed_correlated_kinds() {
        let mut frame = Frame::Unknown {
            frame_type: AT_COMMAND,
            data: Bytes::from_static(&[0, b'N', b'I']),
        };
        assert!(frame.set_frame_id(4));
        assert_eq!(frame.frame_id(), Some(4));
        assert_eq!(data_of(&frame), vec![AT_COMMAND, 4, b'N', b'I']);

        let mut empty = Frame::Unknown {
            frame_type: AT_COMMAND,
            data: Bytes::new(),
        };
        assert!(!empty.set_frame_id(4));

        let mut opaque = Frame::Unknown {
            frame_type: 0x11,
            data: Bytes::from_static(&[0, 1, 2]),
        };
        assert!(!opaque.set_frame_id(4));
        assert_eq!(data_of(&opaque), vec![0x11, 0, 1, 2]);
    }
}
