//! Named UI regions with an expected appearance.
//!
//! A [`Button`] pairs a detection region (where to look and what color to
//! expect) with an optional click region (where to tap). Color sampling
//! always uses the detection region; point sampling always uses the click
//! region. Identity is by name.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::color::Color;
use crate::error::Result;
use crate::frame::Frame;
use crate::geometry::Region;

/// Appearance observed on a live frame by [`Button::capture`].
#[derive(Debug, Clone)]
pub struct ObservedAppearance {
    pub color: Color,
    pub patch: RgbImage,
}

/// A named screen region with an expected appearance.
#[derive(Debug, Clone)]
pub struct Button {
    name: String,
    /// Where the button is detected (color sampling).
    area: Region,
    /// Color the detection region is expected to show.
    color: Option<Color>,
    /// Where to tap. Defaults to the detection region.
    click: Option<Region>,
    /// Reference patch on disk, for template matching.
    template: Option<PathBuf>,
    /// Appearance captured from a live frame. The only field mutated
    /// after construction.
    observed: Option<ObservedAppearance>,
}

impl Button {
    pub fn new(area: Region) -> Self {
        Self {
            name: String::new(),
            area,
            color: None,
            click: None,
            template: None,
            observed: None,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_click(mut self, click: Region) -> Self {
        self.click = Some(click);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.template = Some(path.into());
        self
    }

    /// Button name. Falls back to the template file stem, then "BUTTON".
    pub fn name(&self) -> &str {
        if !self.name.is_empty() {
            return &self.name;
        }
        self.template
            .as_deref()
            .and_then(Path::file_stem)
            .and_then(|s| s.to_str())
            .unwrap_or("BUTTON")
    }

    pub fn area(&self) -> Region {
        self.area
    }

    pub fn expected_color(&self) -> Option<Color> {
        self.color
    }

    /// The region to tap: the explicit click region when set, the
    /// detection region otherwise.
    pub fn click_region(&self) -> Region {
        self.click.unwrap_or(self.area)
    }

    pub fn template_path(&self) -> Option<&Path> {
        self.template.as_deref()
    }

    pub fn observed(&self) -> Option<&ObservedAppearance> {
        self.observed.as_ref()
    }

    /// Does the detection region currently show the expected color?
    ///
    /// Buttons with no expected color never match by color; use template
    /// matching for those.
    pub fn appears_on(&self, frame: &Frame, threshold: f64) -> Result<bool> {
        let Some(expected) = self.color else {
            return Ok(false);
        };
        let actual = frame.mean_color(self.area)?;
        Ok(actual.similar_to(expected, threshold))
    }

    /// Record the appearance the detection region currently has.
    ///
    /// Returns the observed mean color. Useful for turning a live screen
    /// into button definitions.
    pub fn capture(&mut self, frame: &Frame) -> Result<Color> {
        let color = frame.mean_color(self.area)?;
        let patch = frame.crop(self.area)?;
        self.observed = Some(ObservedAppearance { color, patch });
        Ok(color)
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl PartialEq for Button {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for Button {}

impl Hash for Button {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}
