use image::GrayImage;
use log::{debug, warn};

use crate::config::DiskLocatorConfig;
use crate::detection::contours::find_external_contours;
use crate::detection::hough::hough_circles;
use crate::detection::preprocessing::{apply_blur, detect_edges, dilate, ensure_non_empty};
use crate::error::PrimitiveError;
use crate::models::{Circle, DiskSource, ReferenceDisk};

/// Locate the board boundary, falling back to a synthetic disk at the image
/// center when neither the Hough ladder nor the edge contour finds one.
pub fn locate_reference_disk(
    enhanced: &GrayImage,
    config: &DiskLocatorConfig,
) -> Result<ReferenceDisk, PrimitiveError> {
    match find_disk(enhanced, config)? {
        Some(disk) => Ok(disk),
        None => {
            let (width, height) = enhanced.dimensions();
            let disk = ReferenceDisk::fallback(width, height);
            warn!(
                "no reference disk detected, using center fallback ({}, {}) r={}",
                disk.circle.x, disk.circle.y, disk.circle.radius
            );
            Ok(disk)
        }
    }
}

/// Largest Hough circle at the first threshold that yields any, else the
/// minimum enclosing circle of the largest dilated edge contour.
pub fn find_disk(
    enhanced: &GrayImage,
    config: &DiskLocatorConfig,
) -> Result<Option<ReferenceDisk>, PrimitiveError> {
    ensure_non_empty("reference disk", enhanced)?;
    let blurred = apply_blur(enhanced, config.blur_sigma);

    for &threshold in &config.thresholds {
        let circles = hough_circles(&blurred, &config.hough.with_threshold(threshold))?;
        if let Some(circle) = largest_circle(&circles) {
            debug!(
                "reference disk at ({}, {}) r={} (hough threshold {})",
                circle.x, circle.y, circle.radius, threshold
            );
            return Ok(Some(ReferenceDisk {
                circle,
                source: DiskSource::Hough { threshold },
            }));
        }
    }

    debug!("hough found no reference disk, trying edge contours");
    let edges = detect_edges(&blurred, config.canny_low, config.canny_high);
    let dilated = dilate(&edges, config.dilate_radius);
    let contours = find_external_contours(&dilated);

    let mut largest: Option<(f64, usize)> = None;
    for (i, contour) in contours.iter().enumerate() {
        let area = contour.area();
        if largest.is_none_or(|(best, _)| area > best) {
            largest = Some((area, i));
        }
    }

    let circle = largest
        .and_then(|(_, i)| contours[i].enclosing_circle())
        .map(|(x, y, r)| Circle::new(x as i32, y as i32, r as i32))
        .filter(|c| c.radius > 0);

    if let Some(circle) = circle {
        debug!(
            "reference disk from edge contour at ({}, {}) r={}",
            circle.x, circle.y, circle.radius
        );
    }
    Ok(circle.map(|circle| ReferenceDisk {
        circle,
        source: DiskSource::EdgeContour,
    }))
}

/// Largest radius wins; on equal radii the first one is kept
pub fn largest_circle(circles: &[Circle]) -> Option<Circle> {
    circles.iter().copied().fold(None, |best, c| match best {
        Some(b) if b.radius >= c.radius => Some(b),
        _ => Some(c),
    })
}
