use super::Device;
use crate::frame::{FrameBuffer, PixelFormat};
use anyhow::Result;
use std::time::Duration;

type Generator = Box<dyn FnMut(u64) -> Option<FrameBuffer> + Send>;

/// Scripted device for running without a camera.
///
/// The generator receives the zero-based read count and returns the frame for
/// that read, or `None` to simulate a device that produced no data.
pub struct StubDevice {
    generator: Generator,
    reads: u64,
    delay: Duration,
    resolution: (u32, u32),
}

impl StubDevice {
    pub fn from_fn<F>(resolution: (u32, u32), generator: F) -> Self
    where
        F: FnMut(u64) -> Option<FrameBuffer> + Send + 'static,
    {
        Self {
            generator: Box::new(generator),
            reads: 0,
            delay: Duration::ZERO,
            resolution,
        }
    }

    /// Always returns the same frame
    pub fn fixed(frame: FrameBuffer) -> Self {
        Self::from_fn(frame.dimensions(), move |_| Some(frame.clone()))
    }

    /// Gray noise that changes on every read
    pub fn pattern(width: u32, height: u32) -> Self {
        Self::from_fn((width, height), move |read| {
            let mut state = read.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
            let pixels: Vec<u8> = (0..width as usize * height as usize)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    (state >> 56) as u8
                })
                .collect();
            FrameBuffer::new(width, height, PixelFormat::Gray, pixels).ok()
        })
    }

    /// Sleep this long before answering every read
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Device for StubDevice {
    fn capture_frame(&mut self) -> Result<Option<FrameBuffer>> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let frame = (self.generator)(self.reads);
        self.reads += 1;
        Ok(frame)
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_changes_between_reads() {
        let mut device = StubDevice::pattern(8, 8);
        let first = device.capture_frame().unwrap().unwrap();
        let second = device.capture_frame().unwrap().unwrap();
        assert_eq!(first.bytes().len(), 64);
        assert_ne!(first.bytes(), second.bytes());
    }

    #[test]
    fn fixed_reports_frame_resolution() {
        let frame = FrameBuffer::new(2, 3, PixelFormat::Bgr, vec![0u8; 18]).unwrap();
        let mut device = StubDevice::fixed(frame.clone());
        assert_eq!(device.resolution(), (2, 3));
        assert_eq!(device.capture_frame().unwrap(), Some(frame));
    }
}
