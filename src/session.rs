use crate::capture::{CaptureError, CaptureSource, DeviceError};
use crate::frame::FrameBuffer;
use crate::hasher::{self, Digest};
use crate::reducer::{self, Range, RangeError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("invalid range: minimum {min} is greater than maximum {max}")]
    InvalidRange { min: i32, max: i32 },
    #[error("capture failed: {0}")]
    CaptureFailed(#[from] CaptureError),
}

impl From<RangeError> for SessionError {
    fn from(err: RangeError) -> Self {
        match err {
            RangeError::Inverted { min, max } => SessionError::InvalidRange { min, max },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Upper bound on a single device read
    pub read_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(500),
        }
    }
}

/// A frame together with the digest computed from it
#[derive(Debug, Clone)]
struct Captured {
    frame: FrameBuffer,
    digest: Digest,
}

/// Stateful owner of the capture source and the last captured frame.
///
/// Every method takes `&self`; a periodic preview poller and user actions can
/// share one session across threads.
pub struct Session {
    source: CaptureSource,
    last: Mutex<Option<Captured>>,
    displayed: Mutex<Option<FrameBuffer>>,
    streaming: AtomicBool,
}

impl Session {
    /// Open the webcam at `device_index` and start streaming
    pub fn open(device_index: u32, options: SessionOptions) -> Result<Self, DeviceError> {
        let source = CaptureSource::open(device_index, options.read_timeout)?;
        Ok(Self::with_source(source))
    }

    /// Wrap an already opened source
    pub fn with_source(source: CaptureSource) -> Self {
        Self {
            source,
            last: Mutex::new(None),
            displayed: Mutex::new(None),
            streaming: AtomicBool::new(true),
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }

    /// Called by the preview poller on every tick.
    ///
    /// While streaming, reads a fresh frame and shows it. After a capture has
    /// frozen the view, returns the frozen frame without touching the device.
    /// An empty read yields `Ok(None)` so the poller just tries again next tick.
    pub fn refresh_preview(&self) -> Result<Option<FrameBuffer>, SessionError> {
        if !self.is_streaming() {
            return Ok(self.current_preview());
        }

        match self.source.read_frame() {
            Ok(frame) => {
                let mut displayed = lock(&self.displayed);
                // A capture that started during this read owns the view now.
                if !self.is_streaming() {
                    return Ok(displayed.clone());
                }
                *displayed = Some(frame.clone());
                Ok(Some(frame))
            }
            Err(CaptureError::EmptyFrame) => {
                tracing::debug!("Preview read returned no frame");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Most recently displayed frame, without reading the device
    pub fn current_preview(&self) -> Option<FrameBuffer> {
        lock(&self.displayed).clone()
    }

    /// Freeze the preview, read a frame and hash it.
    ///
    /// The frame and digest replace the previous pair under a single lock.
    pub fn capture(&self) -> Result<(FrameBuffer, Digest), SessionError> {
        self.streaming.store(false, Ordering::Release);

        let frame = self.source.read_frame()?;
        let digest = hasher::hash(&frame).map_err(|_| CaptureError::EmptyFrame)?;

        *lock(&self.last) = Some(Captured {
            frame: frame.clone(),
            digest,
        });
        *lock(&self.displayed) = Some(frame.clone());

        tracing::info!(
            "Captured {}x{} frame, hash {}",
            frame.width(),
            frame.height(),
            digest
        );

        Ok((frame, digest))
    }

    /// Last captured frame and its digest
    pub fn last_capture(&self) -> Option<(FrameBuffer, Digest)> {
        lock(&self.last)
            .as_ref()
            .map(|captured| (captured.frame.clone(), captured.digest))
    }

    /// Capture a fresh frame and reduce its digest into `range`.
    ///
    /// An inverted range is rejected before the device is read.
    pub fn generate_number(&self, range: Range) -> Result<i32, SessionError> {
        range.validate()?;

        let (_, digest) = self.capture()?;
        let value = reducer::reduce(&digest, range)?;

        tracing::info!(
            "Generated {} in [{}, {}]",
            value,
            range.min,
            range.max
        );
        Ok(value)
    }

    /// Go back to live preview after a capture
    pub fn resume(&self) {
        self.streaming.store(true, Ordering::Release);
    }

    /// Stop streaming and release the device
    pub fn stop(&self) {
        self.streaming.store(false, Ordering::Release);
        self.source.release();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
