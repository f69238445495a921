//! Template matching seam.
//!
//! Normalized cross-correlation (or whatever else scores patch
//! similarity) lives outside this crate; only the scoring contract is
//! consumed here. Used for buttons whose appearance cannot be reduced
//! to one flat color.

use image::RgbImage;

use droidpilot_core::button::Button;
use droidpilot_core::error::{DeviceError, Result};
use droidpilot_core::frame::Frame;

/// Scores how well a template patch matches an image.
pub trait TemplateMatcher: Send + Sync {
    /// Similarity in `[0, 1]`; 1 is a perfect match.
    fn similarity(&self, image: &RgbImage, template: &RgbImage) -> f32;
}

/// Whether the button's template matches its detection area in the
/// frame at or above `threshold`.
///
/// The template comes from the button's cached observed patch, or is
/// loaded from its template file. A button with neither is an
/// [`DeviceError::InvalidTarget`].
pub fn match_template(
    frame: &Frame,
    button: &Button,
    matcher: &dyn TemplateMatcher,
    threshold: f32,
) -> Result<bool> {
    let patch = frame.crop(button.area())?;
    let template = template_image(button)?;
    let score = matcher.similarity(&patch, &template);
    Ok(score >= threshold)
}

fn template_image(button: &Button) -> Result<RgbImage> {
    if let Some(observed) = button.observed() {
        return Ok(observed.patch.clone());
    }
    let path = button.template_path().ok_or_else(|| {
        DeviceError::InvalidTarget(format!("button '{}' has no template", button.name()))
    })?;
    let img = image::open(path)
        .map_err(|e| DeviceError::InvalidTarget(format!("template {}: {e}", path.display())))?;
    Ok(img.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use droidpilot_core::geometry::Region;
    use image::Rgb;

    /// Scores 1.0 when mean brightness matches, 0.0 otherwise.
    struct BrightnessMatcher;

    impl TemplateMatcher for BrightnessMatcher {
        fn similarity(&self, image: &RgbImage, template: &RgbImage) -> f32 {
            let mean = |img: &RgbImage| {
                let sum: u64 = img.pixels().map(|p| u64::from(p[0])).sum();
                sum / img.pixels().count().max(1) as u64
            };
            if mean(image) == mean(template) {
                1.0
            } else {
                0.0
            }
        }
    }

    fn frame(luma: u8) -> Frame {
        Frame::new(RgbImage::from_pixel(100, 100, Rgb([luma, luma, luma])))
    }

    #[test]
    fn observed_patch_is_preferred_as_template() {
        let area = Region::new(10, 10, 40, 40).unwrap();
        let mut button = Button::new(area).with_name("ICON");
        button.capture(&frame(200)).unwrap();

        assert!(match_template(&frame(200), &button, &BrightnessMatcher, 0.9).unwrap());
        assert!(!match_template(&frame(10), &button, &BrightnessMatcher, 0.9).unwrap());
    }

    #[test]
    fn templateless_button_is_invalid() {
        let button = Button::new(Region::new(0, 0, 10, 10).unwrap()).with_name("BARE");
        let err = match_template(&frame(0), &button, &BrightnessMatcher, 0.5).unwrap_err();
        assert!(matches!(err, DeviceError::InvalidTarget(_)));
    }
}
