use bytes::{Buf, BufMut, BytesMut};
use tracing::trace;

use crate::error::{FrameError, Result};
use crate::frame::Frame;

/// Start delimiter opening every API frame.
pub const START_DELIMITER: u8 = 0x7E;

/// Escape marker (API mode 2).
pub const ESCAPE: u8 = 0x7D;

const XON: u8 = 0x11;
const XOFF: u8 = 0x13;
const ESCAPE_XOR: u8 = 0x20;

/// Envelope overhead: delimiter (1) + length (2) + checksum (1), unescaped.
pub const ENVELOPE_SIZE: usize = 4;

/// Largest frame data the 16-bit length field can describe.
pub const MAX_FRAME_DATA: usize = u16::MAX as usize;

/// Radio API operating mode (`AP` parameter).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApiMode {
    /// `AP=1`: frames are sent verbatim.
    #[default]
    Unescaped,
    /// `AP=2`: control bytes after the start delimiter are escaped.
    Escaped,
}

impl ApiMode {
    /// Map the radio's numeric `AP` value.
    pub fn from_ap(value: u8) -> Option<Self> {
        match value {
            1 => Some(ApiMode::Unescaped),
            2 => Some(ApiMode::Escaped),
            _ => None,
        }
    }

    /// The radio's numeric `AP` value.
    pub fn ap(self) -> u8 {
        match self {
            ApiMode::Unescaped => 1,
            ApiMode::Escaped => 2,
        }
    }
}

/// Compute the API checksum over frame data.
pub fn checksum(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    0xFF - sum
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬──────────────┬──────────────────────┬──────────┐
/// │ 0x7E (1B)  │ Length       │ Frame data           │ Checksum │
/// │            │ (2B BE)      │ type + fields        │ (1B)     │
/// └────────────┴──────────────┴──────────────────────┴──────────┘
/// ```
///
/// In [`ApiMode::Escaped`] every byte after the delimiter that equals
/// `0x7E`, `0x7D`, `0x11` or `0x13` is written as `0x7D, byte ^ 0x20`.
pub fn encode_frame(frame: &Frame, mode: ApiMode, dst: &mut BytesMut) -> Result<()> {
    let mut data = BytesMut::new();
    frame.write_data(&mut data);

    if data.len() > MAX_FRAME_DATA {
        return Err(FrameError::PayloadTooLarge {
            size: data.len(),
            max: MAX_FRAME_DATA,
        });
    }

    let len = (data.len() as u16).to_be_bytes();
    let sum = checksum(&data);

    dst.reserve(ENVELOPE_SIZE + data.len());
    dst.put_u8(START_DELIMITER);
    for byte in len.iter().chain(data.iter()).chain(std::iter::once(&sum)) {
        put_escaped(dst, *byte, mode);
    }
    Ok(())
}

fn put_escaped(dst: &mut BytesMut, byte: u8, mode: ApiMode) {
    if mode == ApiMode::Escaped && needs_escape(byte) {
        dst.put_u8(ESCAPE);
        dst.put_u8(byte ^ ESCAPE_XOR);
    } else {
        dst.put_u8(byte);
    }
}

fn needs_escape(byte: u8) -> bool {
    matches!(byte, START_DELIMITER | ESCAPE | XON | XOFF)
}

/// Decode a frame from a buffer.
///
/// Bytes preceding the first start delimiter are discarded. Returns
/// `Ok(None)` if the buffer doesn't contain a complete frame yet, leaving it
/// untouched from the delimiter on. A corrupt frame is consumed and reported
/// as a recoverable error so the caller can carry on with the next one.
pub fn decode_frame(src: &mut BytesMut, mode: ApiMode) -> Result<Option<Frame>> {
    match src.iter().position(|b| *b == START_DELIMITER) {
        Some(0) => {}
        Some(offset) => {
            trace!(discarded = offset, "skipping bytes before start delimiter");
            src.advance(offset);
        }
        None => {
            if !src.is_empty() {
                trace!(discarded = src.len(), "no start delimiter in buffer");
                src.clear();
            }
            return Ok(None);
        }
    }

    match scan(&src[1..], mode) {
        Scan::Incomplete => Ok(None),
        Scan::Interrupted { at } => {
            src.advance(1 + at);
            Err(FrameError::Malformed {
                frame_type: 0,
                reason: "frame interrupted by start delimiter".to_string(),
            })
        }
        Scan::Complete {
            data,
            checksum: actual,
            consumed,
        } => {
            src.advance(1 + consumed);
            let expected = checksum(&data);
            if expected != actual {
                return Err(FrameError::ChecksumMismatch { expected, actual });
            }
            trace!(len = data.len(), "decoded frame data");
            Frame::parse(&data).map(Some)
        }
    }
}

enum Scan {
    Incomplete,
    Interrupted {
        at: usize,
    },
    Complete {
        data: Vec<u8>,
        checksum: u8,
        consumed: usize,
    },
}

/// Walk the bytes after a start delimiter, unescaping as needed.
fn scan(raw: &[u8], mode: ApiMode) -> Scan {
    let mut cursor = Unescape { raw, pos: 0, mode };

    let mut len = [0u8; 2];
    for slot in len.iter_mut() {
        match cursor.next() {
            Step::Byte(b) => *slot = b,
            Step::NeedMore => return Scan::Incomplete,
            Step::Delimiter(at) => return Scan::Interrupted { at },
        }
    }

    let len = u16::from_be_bytes(len) as usize;
    let mut data = Vec::with_capacity(len);
    while data.len() < len {
        match cursor.next() {
            Step::Byte(b) => data.push(b),
            Step::NeedMore => return Scan::Incomplete,
            Step::Delimiter(at) => return Scan::Interrupted { at },
        }
    }

    match cursor.next() {
        Step::Byte(checksum) => Scan::Complete {
            data,
            checksum,
            consumed: cursor.pos,
        },
        Step::NeedMore => Scan::Incomplete,
        Step::Delimiter(at) => Scan::Interrupted { at },
    }
}

enum Step {
    Byte(u8),
    NeedMore,
    /// Unescaped start delimiter at this offset (escaped mode only).
    Delimiter(usize),
}

struct Unescape<'a> {
    raw: &'a [u8],
    pos: usize,
    mode: ApiMode,
}

impl Unescape<'_> {
    fn next(&mut self) -> Step {
        let Some(&byte) = self.raw.get(self.pos) else {
            return Step::NeedMore;
        };

        if self.mode == ApiMode::Escaped {
            if byte == START_DELIMITER {
                return Step::Delimiter(self.pos);
            }
            if byte == ESCAPE {
                let Some(&next) = self.raw.get(self.pos + 1) else {
                    return Step::NeedMore;
                };
                self.pos += 2;
                return Step::Byte(next ^ ESCAPE_XOR);
            }
        }

        self.pos += 1;
        Step::Byte(byte)
    }
}
