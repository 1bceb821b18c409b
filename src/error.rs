//! Error types shared by the RTSP client, the capture stage and target construction.

use std::io;
use thiserror::Error;

use crate::modules::rtsp::Status;

/// Rejected while building a target. Never coerced, always surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("'{0}' does not appear to be an IPv4 or IPv6 address")]
    InvalidAddress(String),

    #[error("{0} is not a valid port")]
    InvalidPort(u32),

    #[error("block larger than {0} addresses")]
    BlockTooLarge(u128),

    #[error("host bits set")]
    HostBitsSet,
}

/// Outcome of a failed connect/authorize attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RtspError {
    #[error("not connected")]
    NotConnected,

    #[error("timed out")]
    Timeout,

    #[error("transport failure: {0}")]
    Unidentified(String),

    #[error("empty response")]
    EmptyResponse,
}

impl RtspError {
    /// Classify an I/O failure the way the client records it in `Status`.
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => RtspError::Timeout,
            _ => RtspError::Unidentified(err.to_string()),
        }
    }

    pub fn status(&self) -> Status {
        match self {
            RtspError::Timeout => Status::Timeout,
            RtspError::Unidentified(_) => Status::Unidentified,
            RtspError::NotConnected | RtspError::EmptyResponse => Status::None,
        }
    }

    /// True for failures of the transport itself rather than of the exchange.
    pub fn is_transport(&self) -> bool {
        matches!(self, RtspError::Timeout | RtspError::Unidentified(_))
    }
}

/// The screenshot collaborator could not produce an image.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to spawn ffmpeg: {0}")]
    Spawn(#[source] io::Error),

    #[error("capture timed out after {0}s")]
    Timeout(u64),

    #[error("ffmpeg failed: {0}")]
    Failed(String),

    #[error("stream produced no frame")]
    NoFrame,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
