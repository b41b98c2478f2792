//! Camera snapshots via nokhwa.
//!
//! The model does not need live video; a scaled-down JPEG once a second is
//! enough visual context and keeps the upstream bandwidth small.

use crate::defaults;
use crate::error::{FluentFlowError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, ImageBuffer, Rgb};
use nokhwa::Camera;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};

/// A camera held open for periodic snapshots.
pub struct CameraSnapshotter {
    camera: Camera,
    scale: f32,
    jpeg_quality: u8,
}

impl CameraSnapshotter {
    /// Open camera `index` and start its stream.
    ///
    /// # Errors
    /// Returns `FluentFlowError::Camera` if the device cannot be opened.
    pub fn new(index: u32) -> Result<Self> {
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
        let mut camera = Camera::new(CameraIndex::Index(index), requested).map_err(|e| {
            FluentFlowError::Camera {
                message: format!("failed to open camera {}: {}", index, e),
            }
        })?;

        camera.open_stream().map_err(|e| FluentFlowError::Camera {
            message: format!("failed to start camera stream: {}", e),
        })?;

        Ok(Self {
            camera,
            scale: defaults::SNAPSHOT_SCALE,
            jpeg_quality: defaults::SNAPSHOT_JPEG_QUALITY,
        })
    }

    /// Grab one frame, downscale it, and return it as base64 JPEG.
    pub fn snapshot(&mut self) -> Result<String> {
        let frame = self.camera.frame().map_err(|e| FluentFlowError::Camera {
            message: format!("failed to grab frame: {}", e),
        })?;

        let rgb = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| FluentFlowError::Camera {
                message: format!("failed to decode frame: {}", e),
            })?;

        encode_snapshot(&rgb, self.scale, self.jpeg_quality)
    }

    /// Stop the camera stream. Called automatically on drop.
    pub fn close(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            log::warn!("failed to stop camera stream: {}", e);
        }
    }
}

impl Drop for CameraSnapshotter {
    fn drop(&mut self) {
        self.close();
    }
}

/// Downscale an RGB frame and encode it as base64 JPEG.
fn encode_snapshot(
    rgb: &ImageBuffer<Rgb<u8>, Vec<u8>>,
    scale: f32,
    jpeg_quality: u8,
) -> Result<String> {
    let width = ((rgb.width() as f32 * scale) as u32).max(1);
    let height = ((rgb.height() as f32 * scale) as u32).max(1);
    let scaled = image::imageops::resize(rgb, width, height, FilterType::Triangle);

    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, jpeg_quality);
    encoder
        .encode(&scaled, width, height, ColorType::Rgb8)
        .map_err(|e| FluentFlowError::Camera {
            message: format!("JPEG encoding failed: {}", e),
        })?;

    Ok(STANDARD.encode(&jpeg))
}
