mod source;
mod stub;
mod webcam;

pub use source::{CaptureSource, SourceState};
pub use stub::StubDevice;
pub use webcam::WebcamDevice;

use crate::frame::FrameBuffer;
use anyhow::Result;

/// Trait for raw video devices
///
/// Implementations are created and driven on the capture reader thread, so
/// they do not need to be `Send`.
pub trait Device {
    /// Grab the most recent frame in the device's native layout.
    ///
    /// `Ok(None)` means the device produced no data for this read.
    fn capture_frame(&mut self) -> Result<Option<FrameBuffer>>;

    /// Get the resolution of captured frames
    fn resolution(&self) -> (u32, u32);

    /// Give the device handle back to the system
    fn release(&mut self) {}
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("capture device unavailable: {reason}")]
    Unavailable {
        /// Webcam index, when the device was opened by index
        index: Option<u32>,
        reason: String,
    },
    #[error("capture source was already opened")]
    AlreadyOpened,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// Transient: the device returned nothing or did not answer in time.
    #[error("capture device returned an empty frame")]
    EmptyFrame,
    #[error("capture source is closed")]
    Closed,
    #[error("capture source was never opened")]
    NotOpened,
}
