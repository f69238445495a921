//! RGB color model and the similarity predicate used for region matching.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An 8-bit-per-channel RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    /// Euclidean distance over the three channels.
    pub fn distance_to(&self, other: Color) -> f64 {
        let dr = f64::from(self.0) - f64::from(other.0);
        let dg = f64::from(self.1) - f64::from(other.1);
        let db = f64::from(self.2) - f64::from(other.2);
        (dr * dr + dg * dg + db * db).sqrt()
    }

    /// Similarity predicate: distance strictly below `threshold`.
    ///
    /// Symmetric, since Euclidean distance is.
    pub fn similar_to(&self, other: Color, threshold: f64) -> bool {
        self.distance_to(other) < threshold
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0, self.1, self.2)
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self(r, g, b)
    }
}
