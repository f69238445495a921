//! Screen-pixel geometry: points, regions, and randomized point sampling.
//!
//! Taps should not land on the exact same pixel every time. The sampler in
//! [`Region::random_point`] averages several uniform draws per axis, which
//! concentrates points around the center of the region while guaranteeing
//! they stay inside its bounds.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{DeviceError, Result};

/// A point in screen-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in screen-pixel coordinates.
///
/// Invariant: `x1 < x2` and `y1 < y2`, enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Region {
    /// Create a region, rejecting degenerate rectangles.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Result<Self> {
        if x1 >= x2 || y1 >= y2 {
            return Err(DeviceError::InvalidTarget(format!(
                "degenerate region ({x1}, {y1}, {x2}, {y2})"
            )));
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Center point, rounded down.
    pub fn center(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }

    /// Move the region by an offset.
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
    }

    /// Shrink the region inward by `pad` pixels on every side.
    pub fn pad(&self, pad: i32) -> Result<Self> {
        Self::new(self.x1 + pad, self.y1 + pad, self.x2 - pad, self.y2 - pad)
    }

    /// Shrink by independent x/y insets. Used to derive the safe start
    /// area for vector swipes.
    pub fn shrink(&self, inset_x: i32, inset_y: i32) -> Result<Self> {
        Self::new(
            self.x1 + inset_x,
            self.y1 + inset_y,
            self.x2 - inset_x,
            self.y2 - inset_y,
        )
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x1 && p.x <= self.x2 && p.y >= self.y1 && p.y <= self.y2
    }

    /// True when the region lies entirely within a frame of the given size.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x1 >= 0 && self.y1 >= 0 && self.x2 <= width as i32 && self.y2 <= height as i32
    }

    /// Clamp a point into this region.
    pub fn clamp(&self, p: Point) -> Point {
        Point::new(p.x.clamp(self.x1, self.x2), p.y.clamp(self.y1, self.y2))
    }

    /// Pick a randomized strike point inside the region.
    ///
    /// Each axis is sampled independently as the rounded average of three
    /// uniform draws over the span, so points cluster near the center but
    /// never leave the rectangle.
    pub fn random_point(&self) -> Point {
        Point::new(
            random_normal_int(self.x1, self.x2, 3),
            random_normal_int(self.y1, self.y2, 3),
        )
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x1, self.y1, self.x2, self.y2)
    }
}

/// Low-variance random integer in `[a, b]`: the rounded average of `n`
/// uniform draws. With `n = 1` this is plain uniform; larger `n` pulls
/// the distribution toward the midpoint.
pub fn random_normal_int(a: i32, b: i32, n: u32) -> i32 {
    debug_assert!(n > 0);
    if a >= b {
        return b;
    }
    let mut rng = rand::rng();
    let total: i64 = (0..n).map(|_| i64::from(rng.random_range(a..=b))).sum();
    let avg = total as f64 / f64::from(n);
    avg.round() as i32
}

/// Humanized duration in `[min, max]`, sampled with the same
/// low-variance averaging as strike points. Gestures issued with a
/// fixed duration look scripted; jittered ones do not.
pub fn jitter_duration(min: Duration, max: Duration) -> Duration {
    let lo = min.as_millis() as i32;
    let hi = max.as_millis() as i32;
    Duration::from_millis(random_normal_int(lo, hi, 3).max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_regions() {
        assert!(Region::new(10, 10, 10, 20).is_err());
        assert!(Region::new(10, 10, 20, 10).is_err());
        assert!(Region::new(30, 10, 20, 40).is_err());
        assert!(Region::new(0, 0, 1, 1).is_ok());
    }

    #[test]
    fn random_point_always_inside() {
        let regions = [
            Region::new(0, 0, 1, 1).unwrap(),
            Region::new(100, 200, 300, 400).unwrap(),
            Region::new(-50, -50, 50, 50).unwrap(),
            Region::new(0, 0, 1920, 1080).unwrap(),
        ];
        for region in regions {
            for _ in 0..1000 {
                let p = region.random_point();
                assert!(region.contains(p), "point {p} escaped region {region}");
            }
        }
    }

    #[test]
    fn random_normal_int_degenerate_interval() {
        assert_eq!(random_normal_int(5, 5, 3), 5);
        assert_eq!(random_normal_int(7, 3, 3), 3);
    }

    #[test]
    fn pad_shrinks_inward() {
        let region = Region::new(0, 0, 100, 100).unwrap();
        let padded = region.pad(10).unwrap();
        assert_eq!(padded, Region::new(10, 10, 90, 90).unwrap());
        // Padding past the middle degenerates.
        assert!(region.pad(60).is_err());
    }

    #[test]
    fn clamp_limits_point_into_region() {
        let region = Region::new(10, 10, 20, 20).unwrap();
        assert_eq!(region.clamp(Point::new(0, 15)), Point::new(10, 15));
        assert_eq!(region.clamp(Point::new(25, 25)), Point::new(20, 20));
        assert_eq!(region.clamp(Point::new(15, 15)), Point::new(15, 15));
    }

    #[test]
    fn fits_within_frame_bounds() {
        let region = Region::new(100, 200, 300, 400).unwrap();
        assert!(region.fits_within(1080, 1920));
        assert!(!region.fits_within(250, 1920));
        assert!(!Region::new(-1, 0, 10, 10).unwrap().fits_within(100, 100));
    }

    #[test]
    fn jittered_duration_stays_in_range() {
        let min = Duration::from_millis(100);
        let max = Duration::from_millis(300);
        for _ in 0..500 {
            let d = jitter_duration(min, max);
            assert!(d >= min && d <= max, "sampled {d:?}");
        }
        assert_eq!(jitter_duration(max, max), max);
    }

    #[test]
    fn distance_between_points() {
        let d = Point::new(0, 0).distance_to(Point::new(3, 4));
        assert!((d - 5.0).abs() < 1e-9);
    }
}
