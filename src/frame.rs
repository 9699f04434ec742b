use std::sync::Arc;

/// Pixel layout of a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Gray,
    Bgr,
    Rgb,
    Bgra,
    Rgba,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Bgr | PixelFormat::Rgb => 3,
            PixelFormat::Bgra | PixelFormat::Rgba => 4,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame is {width}x{height} {format:?} ({expected} bytes) but got {got} bytes")]
    SizeMismatch {
        width: u32,
        height: u32,
        format: PixelFormat,
        expected: usize,
        got: usize,
    },
}

/// One captured image.
///
/// The pixel bytes are shared and never mutated, so cloning a frame to hand it
/// to a preview consumer does not copy pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    bytes: Arc<[u8]>,
}

impl FrameBuffer {
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<Self, FrameError> {
        let bytes = bytes.into();
        let expected = width as usize * height as usize * format.channels();
        if bytes.len() != expected {
            return Err(FrameError::SizeMismatch {
                width,
                height,
                format,
                expected,
                got: bytes.len(),
            });
        }

        Ok(Self {
            width,
            height,
            format,
            bytes,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw pixel bytes, row-major
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Additive checksum over the pixel bytes
    pub fn checksum(&self) -> u64 {
        self.bytes.iter().map(|&b| b as u64).sum()
    }

    /// Convert to BGRA, the layout every downstream consumer works with.
    ///
    /// A frame that is already BGRA is returned as-is, sharing its bytes.
    pub fn to_bgra(&self) -> FrameBuffer {
        let bytes: Vec<u8> = match self.format {
            PixelFormat::Bgra => return self.clone(),
            PixelFormat::Gray => self.bytes.iter().flat_map(|&v| [v, v, v, 255]).collect(),
            PixelFormat::Bgr => self
                .bytes
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
            PixelFormat::Rgb => self
                .bytes
                .chunks_exact(3)
                .flat_map(|p| [p[2], p[1], p[0], 255])
                .collect(),
            PixelFormat::Rgba => self
                .bytes
                .chunks_exact(4)
                .flat_map(|p| [p[2], p[1], p[0], p[3]])
                .collect(),
        };

        FrameBuffer {
            width: self.width,
            height: self.height,
            format: PixelFormat::Bgra,
            bytes: bytes.into(),
        }
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        let err = FrameBuffer::new(4, 4, PixelFormat::Bgr, vec![0u8; 47]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::SizeMismatch {
                expected: 48,
                got: 47,
                ..
            }
        ));
    }

    #[test]
    fn zero_sized_frame_is_empty() {
        let frame = FrameBuffer::new(0, 0, PixelFormat::Bgra, Vec::new()).unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn rgb_to_bgra_swaps_and_adds_alpha() {
        let frame = FrameBuffer::new(2, 1, PixelFormat::Rgb, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let bgra = frame.to_bgra();
        assert_eq!(bgra.format(), PixelFormat::Bgra);
        assert_eq!(bgra.bytes(), &[3, 2, 1, 255, 6, 5, 4, 255]);
    }

    #[test]
    fn bgr_to_bgra_keeps_order() {
        let frame = FrameBuffer::new(1, 1, PixelFormat::Bgr, vec![10, 20, 30]).unwrap();
        assert_eq!(frame.to_bgra().bytes(), &[10, 20, 30, 255]);
    }

    #[test]
    fn gray_expands_to_bgra() {
        let frame = FrameBuffer::new(2, 1, PixelFormat::Gray, vec![7, 9]).unwrap();
        assert_eq!(frame.to_bgra().bytes(), &[7, 7, 7, 255, 9, 9, 9, 255]);
    }

    #[test]
    fn rgba_keeps_alpha() {
        let frame = FrameBuffer::new(1, 1, PixelFormat::Rgba, vec![1, 2, 3, 128]).unwrap();
        assert_eq!(frame.to_bgra().bytes(), &[3, 2, 1, 128]);
    }

    #[test]
    fn bgra_is_passed_through() {
        let bytes: Vec<u8> = (0..12).collect();
        let frame = FrameBuffer::new(3, 1, PixelFormat::Bgra, bytes).unwrap();
        let converted = frame.to_bgra();
        assert_eq!(converted, frame);
        assert_eq!(converted.dimensions(), (3, 1));
    }

    #[test]
    fn checksum_sums_bytes() {
        let bytes: Vec<u8> = (0..12).collect();
        let frame = FrameBuffer::new(3, 1, PixelFormat::Bgra, bytes).unwrap();
        assert_eq!(frame.checksum(), 66);
    }
}
