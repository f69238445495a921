//! Text recognition plumbing.
//!
//! The recognition engine itself is external: anything implementing
//! [`TextRecognizer`] can be installed process-wide and is shared by
//! every device. Recognizers never fail loudly; an engine that cannot
//! read a frame returns no spans and the caller treats that as "text
//! not present."

use std::sync::{Arc, RwLock};

use image::RgbImage;
use regex::Regex;
use tracing::debug;

use droidpilot_core::error::{DeviceError, Result};
use droidpilot_core::frame::Frame;
use droidpilot_core::geometry::Region;

/// One recognized fragment of text and where it sits on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    pub region: Region,
}

/// Black-box text recognition over an RGB image.
///
/// Implementations must be cheap to call repeatedly from polling
/// loops; heavyweight engines should hold their model handles
/// internally so installation happens once.
pub trait TextRecognizer: Send + Sync {
    /// Recognize text fragments in scan order. Returns an empty list
    /// when nothing is readable; never errors.
    fn recognize(&self, image: &RgbImage) -> Vec<TextSpan>;
}

static RECOGNIZER: RwLock<Option<Arc<dyn TextRecognizer>>> = RwLock::new(None);

/// Install the process-wide recognizer, replacing any previous one.
pub fn install_recognizer(recognizer: Arc<dyn TextRecognizer>) {
    if let Ok(mut slot) = RECOGNIZER.write() {
        *slot = Some(recognizer);
    }
}

/// The currently installed recognizer, if any.
pub fn recognizer() -> Option<Arc<dyn TextRecognizer>> {
    RECOGNIZER.read().ok().and_then(|slot| slot.clone())
}

/// Drop the process-wide recognizer, releasing whatever it holds.
pub fn teardown_recognizer() {
    if let Ok(mut slot) = RECOGNIZER.write() {
        *slot = None;
    }
}

/// How a wanted string is matched against recognized fragments.
///
/// When several fragments match, the first in scan order wins.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TextMatchPolicy {
    /// Either string containing the other counts as a match. Tolerant
    /// of engines that merge or split fragments.
    #[default]
    Substring,
    Exact,
    /// The wanted string is a regular expression.
    Regex,
}

impl TextMatchPolicy {
    /// Whether a recognized fragment matches the wanted text.
    pub fn matches(&self, fragment: &str, wanted: &str) -> Result<bool> {
        Ok(match self {
            TextMatchPolicy::Substring => {
                fragment.contains(wanted) || wanted.contains(fragment)
            }
            TextMatchPolicy::Exact => fragment == wanted,
            TextMatchPolicy::Regex => Regex::new(wanted)
                .map_err(|e| DeviceError::InvalidTarget(format!("bad text pattern: {e}")))?
                .is_match(fragment),
        })
    }
}

/// Recognition scoped to an optional sub-region of the frame.
#[derive(Debug, Clone, Default)]
pub struct Ocr {
    region: Option<Region>,
}

impl Ocr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(region: Region) -> Self {
        Self {
            region: Some(region),
        }
    }

    fn spans(&self, frame: &Frame, recognizer: &dyn TextRecognizer) -> Result<Vec<TextSpan>> {
        let spans = match self.region {
            Some(region) => {
                let patch = frame.crop(region)?;
                // Span coordinates come back relative to the crop.
                recognizer
                    .recognize(&patch)
                    .into_iter()
                    .map(|span| TextSpan {
                        region: span.region.offset(region.x1, region.y1),
                        text: span.text,
                    })
                    .collect()
            }
            None => recognizer.recognize(frame.image()),
        };
        Ok(spans)
    }

    /// All recognized text in scan order, joined with spaces.
    pub fn text(&self, frame: &Frame, recognizer: &dyn TextRecognizer) -> Result<String> {
        let spans = self.spans(frame, recognizer)?;
        debug!(fragments = spans.len(), "ocr");
        Ok(spans
            .iter()
            .map(|span| span.text.as_str())
            .collect::<Vec<_>>()
            .join(" "))
    }

    /// Like [`text`](Self::text) but keeps only the first line, for
    /// regions known to contain a single label.
    pub fn text_single_line(&self, frame: &Frame, recognizer: &dyn TextRecognizer) -> Result<String> {
        let text = self.text(frame, recognizer)?;
        Ok(text.lines().next().unwrap_or_default().to_string())
    }

    /// Find the first fragment matching `wanted` under the policy.
    pub fn find(
        &self,
        frame: &Frame,
        recognizer: &dyn TextRecognizer,
        wanted: &str,
        policy: &TextMatchPolicy,
    ) -> Result<Option<TextSpan>> {
        for span in self.spans(frame, recognizer)? {
            if policy.matches(&span.text, wanted)? {
                return Ok(Some(span));
            }
        }
        Ok(None)
    }
}
