//! A captured screen frame.
//!
//! Frames are produced by the screenshot acquirer and shared read-only with
//! anything that needs screen state. A new capture replaces the previous
//! frame wholesale; nothing mutates pixels in place.

use chrono::{DateTime, Utc};
use image::RgbImage;

use crate::color::Color;
use crate::error::{DeviceError, Result};
use crate::geometry::Region;

/// One captured screen image plus its capture timestamp.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
    captured_at: DateTime<Utc>,
}

impl Frame {
    /// Wrap an already-decoded image, stamped with the current time.
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            captured_at: Utc::now(),
        }
    }

    /// Decode a PNG capture (both backends produce PNG).
    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
            .map_err(|e| DeviceError::Decode(e.to_string()))?;
        Ok(Self::new(image.to_rgb8()))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Validate that a region lies within this frame.
    pub fn check_region(&self, region: Region) -> Result<()> {
        if region.fits_within(self.width(), self.height()) {
            Ok(())
        } else {
            Err(DeviceError::InvalidTarget(format!(
                "region {region} outside {}x{} frame",
                self.width(),
                self.height()
            )))
        }
    }

    /// Copy out the pixels of a region.
    pub fn crop(&self, region: Region) -> Result<RgbImage> {
        self.check_region(region)?;
        let view = image::imageops::crop_imm(
            &self.image,
            region.x1 as u32,
            region.y1 as u32,
            region.width() as u32,
            region.height() as u32,
        );
        Ok(view.to_image())
    }

    /// Mean color over a region, rounded per channel.
    pub fn mean_color(&self, region: Region) -> Result<Color> {
        self.check_region(region)?;
        let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
        for y in region.y1 as u32..region.y2 as u32 {
            for x in region.x1 as u32..region.x2 as u32 {
                let px = self.image.get_pixel(x, y);
                r += u64::from(px[0]);
                g += u64::from(px[1]);
                b += u64::from(px[2]);
            }
        }
        let count = (region.width() as u64) * (region.height() as u64);
        Ok(Color(
            ((r as f64 / count as f64).round()) as u8,
            ((g as f64 / count as f64).round()) as u8,
            ((b as f64 / count as f64).round()) as u8,
        ))
    }
}
