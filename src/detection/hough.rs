//! Gradient Hough transform for circles.
//!
//! Every Canny edge point votes along both directions of its Sobel gradient
//! for each radius of the band. Accumulator cells are `dp` pixels wide.
//! Local maxima above the accumulator threshold become center candidates,
//! visited from strongest to weakest; the radius of each accepted center is
//! the best supported distance to the edge points.

use image::GrayImage;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use serde::{Deserialize, Serialize};

use crate::detection::preprocessing::{detect_edges, ensure_non_empty};
use crate::error::PrimitiveError;
use crate::models::Circle;

/// Parameters for one Hough pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoughParams {
    /// Inverse accumulator resolution (1.0 = one cell per pixel)
    pub dp: f32,
    /// Minimum distance between accepted centers
    pub min_dist: f32,
    /// Upper Canny threshold, the lower one is half of it
    pub canny_high: f32,
    /// Votes a center needs; lower finds more circles
    pub accumulator_threshold: u32,
    pub min_radius: u32,
    pub max_radius: u32,
}

impl HoughParams {
    /// Same pass with a different accumulator threshold
    pub fn with_threshold(mut self, accumulator_threshold: u32) -> Self {
        self.accumulator_threshold = accumulator_threshold;
        self
    }

    fn validate(&self) -> Result<(), PrimitiveError> {
        if !(self.dp >= 1.0) {
            return Err(PrimitiveError::InvalidParameter(format!(
                "hough dp must be >= 1, got {}",
                self.dp
            )));
        }
        if self.max_radius == 0 || self.min_radius > self.max_radius {
            return Err(PrimitiveError::InvalidParameter(format!(
                "hough radius band [{}, {}] is empty",
                self.min_radius, self.max_radius
            )));
        }
        Ok(())
    }
}

/// Detect circles with the gradient Hough transform.
///
/// Returned circles are ordered by accumulator votes, strongest first, and
/// their radii always lie within `[min_radius, max_radius]`.
pub fn hough_circles(img: &GrayImage, params: &HoughParams) -> Result<Vec<Circle>, PrimitiveError> {
    ensure_non_empty("hough circles", img)?;
    params.validate()?;

    let (width, height) = img.dimensions();
    let edges = detect_edges(img, params.canny_high / 2.0, params.canny_high);
    let gx = horizontal_sobel(img);
    let gy = vertical_sobel(img);

    let acc_w = (width as f32 / params.dp).ceil() as usize + 1;
    let acc_h = (height as f32 / params.dp).ceil() as usize + 1;
    let mut acc = vec![0u32; acc_w * acc_h];
    let mut points: Vec<(f32, f32)> = Vec::new();

    for (x, y, edge) in edges.enumerate_pixels() {
        if edge[0] == 0 {
            continue;
        }
        let gxv = gx.get_pixel(x, y)[0] as f32;
        let gyv = gy.get_pixel(x, y)[0] as f32;
        let mag = (gxv * gxv + gyv * gyv).sqrt();
        if mag < 1.0 {
            continue;
        }
        points.push((x as f32, y as f32));

        let (ux, uy) = (gxv / mag, gyv / mag);
        for sign in [-1.0f32, 1.0] {
            for r in params.min_radius..=params.max_radius {
                let ax = ((x as f32 + sign * ux * r as f32) / params.dp).round();
                let ay = ((y as f32 + sign * uy * r as f32) / params.dp).round();
                if ax < 0.0 || ay < 0.0 {
                    continue;
                }
                let (ax, ay) = (ax as usize, ay as usize);
                if ax < acc_w && ay < acc_h {
                    acc[ay * acc_w + ax] += 1;
                }
            }
        }
    }

    if points.is_empty() {
        return Ok(Vec::new());
    }

    let mut centers = Vec::new();
    for ay in 1..acc_h.saturating_sub(1) {
        for ax in 1..acc_w.saturating_sub(1) {
            let i = ay * acc_w + ax;
            let v = acc[i];
            if v > params.accumulator_threshold
                && v > acc[i - 1]
                && v >= acc[i + 1]
                && v > acc[i - acc_w]
                && v >= acc[i + acc_w]
            {
                centers.push((v, ax, ay));
            }
        }
    }
    // strongest first, raster order among equals
    centers.sort_by(|a, b| b.0.cmp(&a.0).then(a.2.cmp(&b.2)).then(a.1.cmp(&b.1)));

    let band = (params.max_radius - params.min_radius + 1) as usize;
    let mut found: Vec<(f32, f32, u32)> = Vec::new();

    for (_, ax, ay) in centers {
        // cell centers sit on multiples of dp
        let cx = ax as f32 * params.dp;
        let cy = ay as f32 * params.dp;
        let too_close = found.iter().any(|&(fx, fy, _)| {
            let dx = fx - cx;
            let dy = fy - cy;
            (dx * dx + dy * dy).sqrt() < params.min_dist
        });
        if too_close {
            continue;
        }

        let mut hist = vec![0u32; band];
        for &(px, py) in &points {
            let d = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt().round() as u32;
            if d >= params.min_radius && d <= params.max_radius {
                hist[(d - params.min_radius) as usize] += 1;
            }
        }

        let mut best = (0u32, 0usize);
        for i in 0..band {
            let support = hist[i]
                + if i > 0 { hist[i - 1] } else { 0 }
                + if i + 1 < band { hist[i + 1] } else { 0 };
            if support > best.0 {
                best = (support, i);
            }
        }
        if best.0 <= params.accumulator_threshold {
            continue;
        }

        found.push((cx, cy, params.min_radius + best.1 as u32));
    }

    Ok(found
        .into_iter()
        .map(|(x, y, r)| Circle::from_f32(x, y, r as f32))
        .collect())
}
