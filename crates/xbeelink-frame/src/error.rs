/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame data exceeds what the 16-bit length field can describe.
    #[error("frame data too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The trailing checksum byte does not match the frame data.
    #[error("checksum mismatch (expected 0x{expected:02X}, got 0x{actual:02X})")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// The frame is structurally invalid for its type.
    #[error("malformed frame (type 0x{frame_type:02X}): {reason}")]
    Malformed { frame_type: u8, reason: String },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// True for errors confined to a single corrupt frame; the stream can continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FrameError::ChecksumMismatch { .. } | FrameError::Malformed { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
