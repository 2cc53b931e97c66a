/// Errors returned by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A request was rejected before anything was sent.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Transport-level error (open, write or drain failure).
    #[error("transport error: {0}")]
    Transport(#[from] xbeelink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] xbeelink_frame::FrameError),

    /// No matching response arrived in time.
    #[error("request timed out after {} ms", .0.as_millis())]
    Timeout(std::time::Duration),

    /// The radio answered with a non-success status.
    #[error("command failed: {0}")]
    CommandFailed(String),

    /// A node identifier could not be resolved to an address.
    #[error("node '{0}' not found")]
    NodeNotFound(String),

    /// Every frame id is held by an outstanding request.
    #[error("{0} requests already awaiting responses")]
    TooManyPending(usize),

    /// The session was closed or its transport went away.
    #[error("session closed")]
    Closed,
}

impl SessionError {
    /// Whether the error was raised before any frame was written.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
