use imageproc::point::Point;
use serde::{Deserialize, Serialize};

use crate::detection::contours::min_enclosing_circle;

/// Integer circle in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Circle {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
}

impl Circle {
    pub fn new(x: i32, y: i32, radius: i32) -> Self {
        Self { x, y, radius }
    }

    /// Round a floating point circle to the integer grid
    pub fn from_f32(x: f32, y: f32, radius: f32) -> Self {
        Self {
            x: x.round() as i32,
            y: y.round() as i32,
            radius: radius.round() as i32,
        }
    }

    pub fn center(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Euclidean distance from this circle's center to a point
    pub fn distance_to(&self, x: i32, y: i32) -> f32 {
        let dx = (self.x - x) as f32;
        let dy = (self.y - y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn center_distance(&self, other: &Circle) -> f32 {
        self.distance_to(other.x, other.y)
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)`, inclusive, clamped to the frame.
    /// `None` when the circle does not touch the frame at all.
    pub fn clamped_bounds(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        if width == 0 || height == 0 {
            return None;
        }
        let r = self.radius.max(0);
        let min_x = (self.x - r).max(0);
        let min_y = (self.y - r).max(0);
        let max_x = (self.x + r).min(width as i32 - 1);
        let max_y = (self.y + r).min(height as i32 - 1);
        if min_x > max_x || min_y > max_y {
            return None;
        }
        Some((min_x as u32, min_y as u32, max_x as u32, max_y as u32))
    }

    /// Whether a pixel lies on the filled disc of this circle
    pub fn covers(&self, x: u32, y: u32) -> bool {
        let dx = x as i64 - self.x as i64;
        let dy = y as i64 - self.y as i64;
        let r = self.radius.max(0) as i64;
        dx * dx + dy * dy <= r * r
    }
}

/// Where the reference disk geometry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskSource {
    /// Hough transform succeeded at the given accumulator threshold
    Hough { threshold: u32 },
    /// Minimum enclosing circle of the largest dilated edge contour
    EdgeContour,
    /// Synthetic disk at the image center
    Fallback,
}

/// The board boundary. Every reported hole lies strictly inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDisk {
    pub circle: Circle,
    pub source: DiskSource,
}

impl ReferenceDisk {
    /// Image center with a third of the shorter side as radius
    pub fn fallback(width: u32, height: u32) -> Self {
        Self {
            circle: Circle::new(
                (width / 2) as i32,
                (height / 2) as i32,
                (width.min(height) / 3) as i32,
            ),
            source: DiskSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == DiskSource::Fallback
    }

    /// Strict containment of a point: distance to the disk center < radius
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.circle.distance_to(x, y) < self.circle.radius as f32
    }
}

/// Raw output of a single candidate generator
pub type CandidateSet = Vec<Circle>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoleStatus {
    Filled,
    Empty,
}

impl std::fmt::Display for HoleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HoleStatus::Filled => write!(f, "Filled"),
            HoleStatus::Empty => write!(f, "Empty"),
        }
    }
}

/// Intensity statistics sampled inside one circle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoleStats {
    pub mean_intensity: f64,
    pub std_dev: f64,
    /// Darkest non-zero sample, 255 when there is none
    pub min_value: u8,
}

/// One classified hole in the final report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoleRecord {
    /// 1-based, follows the fused candidate order
    pub id: usize,
    pub position: (i32, i32),
    pub radius: i32,
    pub status: HoleStatus,
    pub mean_intensity: f64,
    pub std_dev: f64,
    pub min_value: u8,
}

impl HoleRecord {
    pub fn circle(&self) -> Circle {
        Circle::new(self.position.0, self.position.1, self.radius)
    }
}

/// External border traced from a binary mask
#[derive(Debug, Clone)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    /// Polygon area of the border (shoelace over pixel centers)
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut twice = 0i64;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            twice += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
        }
        twice.abs() as f64 / 2.0
    }

    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        imageproc::geometry::arc_length(&self.points, true)
    }

    /// 4π·area / perimeter², 1.0 for a perfect disc, 0.0 for degenerate borders
    pub fn circularity(&self) -> f64 {
        let perimeter = self.perimeter();
        if perimeter == 0.0 {
            return 0.0;
        }
        4.0 * std::f64::consts::PI * self.area() / (perimeter * perimeter)
    }

    /// Smallest circle enclosing every border point, as `(x, y, radius)`
    pub fn enclosing_circle(&self) -> Option<(f32, f32, f32)> {
        min_enclosing_circle(&self.points)
    }
}
