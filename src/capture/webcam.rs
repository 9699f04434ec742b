use super::Device;
use crate::frame::{FrameBuffer, PixelFormat};
use anyhow::{Context, Result};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

pub struct WebcamDevice {
    camera: Camera,
    index: u32,
}

impl WebcamDevice {
    pub fn open(device_index: u32) -> Result<Self> {
        tracing::info!("Initializing webcam {}", device_index);

        let index = CameraIndex::Index(device_index);
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);

        let mut camera = Camera::new(index, requested)
            .with_context(|| format!("Failed to open camera {device_index}"))?;

        camera
            .open_stream()
            .context("Failed to open camera stream")?;

        tracing::info!("Webcam {} initialized successfully", device_index);

        Ok(Self {
            camera,
            index: device_index,
        })
    }
}

impl Device for WebcamDevice {
    fn capture_frame(&mut self) -> Result<Option<FrameBuffer>> {
        let frame = self
            .camera
            .frame()
            .context("Failed to capture frame")?;

        let decoded: RgbImage = frame
            .decode_image::<RgbFormat>()
            .context("Failed to decode frame")?;

        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Ok(None);
        }

        let frame = FrameBuffer::new(width, height, PixelFormat::Rgb, decoded.into_raw())?;
        Ok(Some(frame))
    }

    fn resolution(&self) -> (u32, u32) {
        let resolution = self.camera.resolution();
        (resolution.width(), resolution.height())
    }

    fn release(&mut self) {
        if let Err(err) = self.camera.stop_stream() {
            tracing::warn!("Failed to stop webcam {} stream: {}", self.index, err);
        }
    }
}
