//! Screenshot capture for confirmed streams, plus near-duplicate suppression
//! for DVRs that expose one camera on many channels.

pub mod channels;
pub mod ffmpeg;
pub mod fingerprint;

use std::path::PathBuf;

use crate::error::CaptureError;

pub use channels::{ChannelPattern, ChannelScan};
pub use ffmpeg::FfmpegCapture;
pub use fingerprint::{DHash, Fingerprint, Fingerprinter};

/// Turns a stream URL into a saved still image.
///
/// Implementations may be slow and flaky; they own their own timeouts.
pub trait Capture: Send + Sync {
    fn capture(&self, url: &str) -> Result<PathBuf, CaptureError>;
}
