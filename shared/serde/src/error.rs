use thiserror::Error;

/// The bit stream ended early or contained a value that cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("failed to decode bit stream: truncated or invalid data")]
pub struct SerdeErr;
