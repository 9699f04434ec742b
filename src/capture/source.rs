use super::{CaptureError, Device, DeviceError, WebcamDevice};
use crate::frame::FrameBuffer;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Lifecycle of a [`CaptureSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Unopened,
    Opened,
    Released,
}

type Reply = (u64, Option<FrameBuffer>);

/// Handle to the reader thread that owns the device
struct Reader {
    requests: Sender<u64>,
    replies: Receiver<Reply>,
    next_seq: u64,
    resolution: (u32, u32),
    worker: JoinHandle<()>,
}

enum State {
    Unopened,
    Opened(Reader),
    Released,
}

/// Exclusive owner of one video device.
///
/// The device lives on a dedicated reader thread. Reads are serialized by the
/// state mutex and bounded by `read_timeout`; a read that takes longer is
/// reported as [`CaptureError::EmptyFrame`] and its late answer is dropped.
pub struct CaptureSource {
    state: Mutex<State>,
    read_timeout: Duration,
    open_timeout: Duration,
}

const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(5);

impl CaptureSource {
    pub fn new(read_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(State::Unopened),
            read_timeout,
            open_timeout: DEFAULT_OPEN_TIMEOUT,
        }
    }

    /// Upper bound on how long opening the device may take
    pub fn with_open_timeout(mut self, open_timeout: Duration) -> Self {
        self.open_timeout = open_timeout;
        self
    }

    /// Open the webcam at `device_index`
    pub fn open(device_index: u32, read_timeout: Duration) -> Result<Self, DeviceError> {
        let source = Self::new(read_timeout);
        source
            .open_with(move || WebcamDevice::open(device_index))
            .map_err(|err| match err {
                DeviceError::Unavailable { reason, .. } => DeviceError::Unavailable {
                    index: Some(device_index),
                    reason,
                },
                other => other,
            })?;
        Ok(source)
    }

    /// Open a device built by `opener` on the reader thread.
    pub fn open_with<D, F>(&self, opener: F) -> Result<(), DeviceError>
    where
        D: Device + 'static,
        F: FnOnce() -> anyhow::Result<D> + Send + 'static,
    {
        let mut state = self.lock();
        if !matches!(*state, State::Unopened) {
            return Err(DeviceError::AlreadyOpened);
        }

        let (ready_tx, ready_rx) = bounded::<Result<(u32, u32), String>>(1);
        let (requests, request_rx) = bounded::<u64>(1);
        let (reply_tx, replies) = bounded::<Reply>(1);

        let worker = thread::Builder::new()
            .name("capture-reader".into())
            .spawn(move || {
                let mut device = match opener() {
                    Ok(device) => device,
                    Err(err) => {
                        let _ = ready_tx.send(Err(format!("{err:#}")));
                        return;
                    }
                };
                if ready_tx.send(Ok(device.resolution())).is_err() {
                    // Opening timed out and nobody is waiting for this device.
                    device.release();
                    return;
                }
                reader_loop(device, request_rx, reply_tx);
            })
            .map_err(|err| DeviceError::Unavailable {
                index: None,
                reason: format!("failed to spawn capture reader: {err}"),
            })?;

        let resolution = match ready_rx.recv_timeout(self.open_timeout) {
            Ok(Ok(resolution)) => resolution,
            Ok(Err(reason)) => {
                let _ = worker.join();
                tracing::warn!("Failed to open capture device: {}", reason);
                return Err(DeviceError::Unavailable {
                    index: None,
                    reason,
                });
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    "Capture device did not open within {:?}",
                    self.open_timeout
                );
                return Err(DeviceError::Unavailable {
                    index: None,
                    reason: format!("device did not open within {:?}", self.open_timeout),
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = worker.join();
                return Err(DeviceError::Unavailable {
                    index: None,
                    reason: "capture reader exited while opening the device".into(),
                });
            }
        };

        tracing::info!(
            "Capture device opened at {}x{}",
            resolution.0,
            resolution.1
        );

        *state = State::Opened(Reader {
            requests,
            replies,
            next_seq: 0,
            resolution,
            worker,
        });
        Ok(())
    }

    /// Read the most recent frame, converted to BGRA.
    pub fn read_frame(&self) -> Result<FrameBuffer, CaptureError> {
        let mut state = self.lock();
        let reader = match &mut *state {
            State::Opened(reader) => reader,
            State::Unopened => return Err(CaptureError::NotOpened),
            State::Released => return Err(CaptureError::Closed),
        };

        let deadline = Instant::now() + self.read_timeout;
        let seq = reader.next_seq;
        reader.next_seq += 1;

        if reader.requests.send_deadline(seq, deadline).is_err() {
            tracing::warn!("Capture device busy, dropping read {}", seq);
            return Err(CaptureError::EmptyFrame);
        }

        loop {
            match reader.replies.recv_deadline(deadline) {
                Ok((reply_seq, frame)) if reply_seq == seq => {
                    return frame.ok_or(CaptureError::EmptyFrame);
                }
                Ok((stale, _)) => {
                    tracing::debug!("Discarding late frame from read {}", stale);
                }
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        "Capture read {} timed out after {:?}",
                        seq,
                        self.read_timeout
                    );
                    return Err(CaptureError::EmptyFrame);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!("Capture reader stopped unexpectedly");
                    return Err(CaptureError::EmptyFrame);
                }
            }
        }
    }

    /// Release the device. Calling this more than once is a no-op.
    pub fn release(&self) {
        let mut state = self.lock();
        match std::mem::replace(&mut *state, State::Released) {
            State::Opened(reader) => reader.shutdown(self.read_timeout),
            State::Unopened | State::Released => {}
        }
    }

    pub fn state(&self) -> SourceState {
        match *self.lock() {
            State::Unopened => SourceState::Unopened,
            State::Opened(_) => SourceState::Opened,
            State::Released => SourceState::Released,
        }
    }

    /// Resolution reported by the device when it was opened
    pub fn resolution(&self) -> Option<(u32, u32)> {
        match &*self.lock() {
            State::Opened(reader) => Some(reader.resolution),
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        self.release();
    }
}

impl Reader {
    fn shutdown(self, timeout: Duration) {
        let Reader {
            requests,
            replies,
            worker,
            ..
        } = self;
        drop(requests);

        let deadline = Instant::now() + timeout;
        loop {
            match replies.recv_deadline(deadline) {
                Ok((seq, _)) => tracing::debug!("Discarding frame from read {} on release", seq),
                Err(RecvTimeoutError::Disconnected) => {
                    if worker.join().is_err() {
                        tracing::warn!("Capture reader panicked");
                    }
                    tracing::info!("Capture device released");
                    return;
                }
                Err(RecvTimeoutError::Timeout) => {
                    // The detached reader releases the device once its pending read returns.
                    tracing::warn!(
                        "Capture device still busy after {:?}, releasing in the background",
                        timeout
                    );
                    return;
                }
            }
        }
    }
}

fn reader_loop<D: Device>(mut device: D, requests: Receiver<u64>, replies: Sender<Reply>) {
    for seq in requests.iter() {
        let frame = match device.capture_frame() {
            Ok(Some(frame)) if !frame.is_empty() => Some(frame.to_bgra()),
            Ok(_) => {
                tracing::debug!("Device returned no data for read {}", seq);
                None
            }
            Err(err) => {
                tracing::warn!("Device read {} failed: {:#}", seq, err);
                None
            }
        };

        if replies.send((seq, frame)).is_err() {
            break;
        }
    }

    device.release();
}
