use image::GrayImage;

use crate::config::ClassifierConfig;
use crate::models::{Circle, HoleRecord, HoleStats, HoleStatus};

/// Sample the grayscale frame inside `circle`.
///
/// Pixels of value 0 count towards mean and deviation but not towards
/// `min_value`. An empty sample yields mean 0 and `min_value` 255.
pub fn hole_stats(gray: &GrayImage, circle: &Circle) -> HoleStats {
    let (width, height) = gray.dimensions();
    let mut count = 0u64;
    let mut sum = 0u64;
    let mut sum_sq = 0u64;
    let mut min_value = u8::MAX;

    if let Some((min_x, min_y, max_x, max_y)) = circle.clamped_bounds(width, height) {
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                if !circle.covers(x, y) {
                    continue;
                }
                let v = gray.get_pixel(x, y)[0];
                count += 1;
                sum += v as u64;
                sum_sq += (v as u64) * (v as u64);
                if v > 0 && v < min_value {
                    min_value = v;
                }
            }
        }
    }

    let n = count.max(1) as f64;
    let mean = sum as f64 / n;
    let variance = (sum_sq as f64 / n - mean * mean).max(0.0);

    HoleStats {
        mean_intensity: mean,
        std_dev: variance.sqrt(),
        min_value,
    }
}

/// Filled when any of the three signals fires
pub fn classify(stats: &HoleStats, config: &ClassifierConfig) -> HoleStatus {
    if stats.mean_intensity < config.mean_below
        || stats.min_value < config.min_value_below
        || stats.std_dev > config.std_dev_above
    {
        HoleStatus::Filled
    } else {
        HoleStatus::Empty
    }
}

/// Classify every fused candidate, numbering from 1 in the given order
pub fn classify_holes(gray: &GrayImage, circles: &[Circle], config: &ClassifierConfig) -> Vec<HoleRecord> {
    circles
        .iter()
        .enumerate()
        .map(|(i, circle)| {
            let stats = hole_stats(gray, circle);
            HoleRecord {
                id: i + 1,
                position: circle.center(),
                radius: circle.radius,
                status: classify(&stats, config),
                mean_intensity: stats.mean_intensity,
                std_dev: stats.std_dev,
                min_value: stats.min_value,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Luma;
    use imageproc::drawing::draw_filled_circle_mut;

    fn stats(mean: f64, std_dev: f64, min_value: u8) -> HoleStats {
        HoleStats {
            mean_intensity: mean,
            std_dev,
            min_value,
        }
    }

    #[test]
    fn test_classify_thresholds_are_strict() {
        let config = ClassifierConfig::default();
        assert_eq!(classify(&stats(119.0, 0.0, 255), &config), HoleStatus::Filled);
        assert_eq!(classify(&stats(120.0, 0.0, 255), &config), HoleStatus::Empty);
        assert_eq!(classify(&stats(200.0, 0.0, 49), &config), HoleStatus::Filled);
        assert_eq!(classify(&stats(200.0, 0.0, 50), &config), HoleStatus::Empty);
        assert_eq!(classify(&stats(200.0, 40.5, 200), &config), HoleStatus::Filled);
        assert_eq!(classify(&stats(200.0, 40.0, 200), &config), HoleStatus::Empty);
    }

    #[test]
    fn test_uniform_region_stats() {
        let gray = GrayImage::from_pixel(40, 40, Luma([180]));
        let s = hole_stats(&gray, &Circle::new(20, 20, 6));
        assert_relative_eq!(s.mean_intensity, 180.0);
        assert_relative_eq!(s.std_dev, 0.0);
        assert_eq!(s.min_value, 180);
    }

    #[test]
    fn test_zero_pixels_skip_min_value() {
        let gray = GrayImage::new(30, 30);
        let s = hole_stats(&gray, &Circle::new(15, 15, 5));
        assert_relative_eq!(s.mean_intensity, 0.0);
        assert_eq!(s.min_value, 255);
    }

    #[test]
    fn test_circle_off_frame_is_empty_sample() {
        let gray = GrayImage::from_pixel(10, 10, Luma([90]));
        let s = hole_stats(&gray, &Circle::new(-50, -50, 4));
        assert_relative_eq!(s.mean_intensity, 0.0);
        assert_eq!(s.min_value, 255);
    }

    #[test]
    fn test_classify_holes_numbers_from_one() {
        let mut gray = GrayImage::from_pixel(100, 60, Luma([230]));
        draw_filled_circle_mut(&mut gray, (25, 30), 8, Luma([20]));
        let circles = [Circle::new(25, 30, 8), Circle::new(75, 30, 8)];

        let records = classify_holes(&gray, &circles, &ClassifierConfig::default());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].status, HoleStatus::Filled);
        assert_eq!(records[0].min_value, 20);
        assert_eq!(records[1].id, 2);
        assert_eq!(records[1].position, (75, 30));
        assert_eq!(records[1].status, HoleStatus::Empty);
    }
}
