//! Independent circle candidate generators.
//!
//! Each generator reads a [`PreparedFrame`] and returns its own candidate
//! set. They share no state, so the detector may run them on separate
//! threads and fuse the results afterwards.

use std::sync::Arc;

use log::{debug, warn};

use crate::config::{ContourConfig, HoughEnsembleConfig, ScanConfig, TemplateConfig};
use crate::detection::contours::find_external_contours;
use crate::detection::frame::PreparedFrame;
use crate::detection::hough::hough_circles;
use crate::detection::preprocessing::apply_mask;
use crate::detection::template::{match_template_normed, ring_template};
use crate::error::PrimitiveError;
use crate::models::{CandidateSet, Circle};

/// Trait that all candidate generators must implement
pub trait CandidateGenerator: Send + Sync {
    fn generate(&self, frame: &PreparedFrame) -> Result<CandidateSet, PrimitiveError>;

    /// Human-readable name for this generator (used in log output)
    fn name(&self) -> &str;
}

/// The stock ensemble: Hough passes, ring templates, contour circularity
pub fn default_generators(config: &ScanConfig) -> Vec<Arc<dyn CandidateGenerator>> {
    vec![
        Arc::new(HoughEnsemble {
            config: config.hough.clone(),
        }),
        Arc::new(TemplateCorrelation {
            config: config.template.clone(),
        }),
        Arc::new(ContourCircularity {
            config: config.contour.clone(),
        }),
    ]
}

/// Run every generator and collect the sets in generator order.
///
/// A generator that errors or panics contributes an empty set.
pub fn run_generators(
    generators: &[Arc<dyn CandidateGenerator>],
    frame: &PreparedFrame,
    parallel: bool,
) -> Vec<CandidateSet> {
    let settle = |name: &str, outcome: Option<Result<CandidateSet, PrimitiveError>>| match outcome {
        Some(Ok(set)) => {
            debug!("{}: {} candidates", name, set.len());
            set
        }
        Some(Err(e)) => {
            warn!("{} failed, treating as empty: {}", name, e);
            Vec::new()
        }
        None => {
            warn!("{} panicked, treating as empty", name);
            Vec::new()
        }
    };

    if !parallel {
        return generators
            .iter()
            .map(|g| {
                let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| g.generate(frame)));
                settle(g.name(), outcome.ok())
            })
            .collect();
    }

    std::thread::scope(|s| {
        let handles: Vec<_> = generators
            .iter()
            .map(|g| s.spawn(move || g.generate(frame)))
            .collect();
        handles
            .into_iter()
            .zip(generators)
            .map(|(handle, g)| settle(g.name(), handle.join().ok()))
            .collect()
    })
}

/// Several Hough passes of increasing permissiveness, each hit checked
/// against the edge map and the dark-region mask
pub struct HoughEnsemble {
    pub config: HoughEnsembleConfig,
}

impl HoughEnsemble {
    /// Keep a hit when it lies fully inside the frame and either its
    /// perimeter touches enough edge pixels or its disc enough dark pixels.
    fn accept(&self, c: &Circle, frame: &PreparedFrame) -> bool {
        let (width, height) = frame.dimensions();
        let r = c.radius;
        if r <= 0 || c.x < r || c.y < r || c.x > width as i32 - r || c.y > height as i32 - r {
            return false;
        }
        let Some((min_x, min_y, max_x, max_y)) = c.clamped_bounds(width, height) else {
            return false;
        };

        let mut ring_edges = 0u32;
        let mut dark = 0u32;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let d = c.distance_to(x as i32, y as i32);
                if (d - r as f32).abs() <= 1.0 && frame.edges.get_pixel(x, y)[0] > 0 {
                    ring_edges += 1;
                }
                if c.covers(x, y) && frame.cleaned.get_pixel(x, y)[0] > 0 {
                    dark += 1;
                }
            }
        }

        let r = r as f32;
        let edge_ratio = ring_edges as f32 / (2.0 * std::f32::consts::PI * r);
        let dark_ratio = dark as f32 / (std::f32::consts::PI * r * r);
        edge_ratio > self.config.min_edge_ratio || dark_ratio > self.config.min_dark_ratio
    }
}

impl CandidateGenerator for HoughEnsemble {
    fn generate(&self, frame: &PreparedFrame) -> Result<CandidateSet, PrimitiveError> {
        let mut raw = Vec::new();
        for pass in &self.config.passes {
            let hits = hough_circles(&frame.enhanced, pass)?;
            debug!("hough pass (threshold {}): {} hits", pass.accumulator_threshold, hits.len());
            raw.extend(hits);
        }

        if raw.len() < self.config.permissive_below {
            let pass = &self.config.permissive_pass;
            let hits = hough_circles(&frame.enhanced, pass)?;
            debug!("permissive hough pass (threshold {}): {} hits", pass.accumulator_threshold, hits.len());
            raw.extend(hits);
        }

        Ok(raw.into_iter().filter(|c| self.accept(c, frame)).collect())
    }

    fn name(&self) -> &str {
        "Hough Ensemble"
    }
}

/// Ring templates of several radii correlated against the disk region
pub struct TemplateCorrelation {
    pub config: TemplateConfig,
}

impl CandidateGenerator for TemplateCorrelation {
    fn generate(&self, frame: &PreparedFrame) -> Result<CandidateSet, PrimitiveError> {
        let masked = apply_mask(&frame.gray, &frame.disk_mask)?;
        let (width, height) = masked.dimensions();
        let mut candidates = Vec::new();

        for &radius in &self.config.radii {
            let template = ring_template(radius, self.config.padding);
            if template.width() > width || template.height() > height {
                debug!("skipping ring template r={}: larger than frame", radius);
                continue;
            }
            let offset = (radius + self.config.padding) as i32;
            let scores = match_template_normed(&masked, &template)?;
            for (x, y, score) in scores.enumerate_pixels() {
                if score[0] >= self.config.score_threshold {
                    candidates.push(Circle::new(x as i32 + offset, y as i32 + offset, radius as i32));
                }
            }
        }

        Ok(candidates)
    }

    fn name(&self) -> &str {
        "Template Correlation"
    }
}

/// Round external contours of the cleaned dark-region mask
pub struct ContourCircularity {
    pub config: ContourConfig,
}

impl CandidateGenerator for ContourCircularity {
    fn generate(&self, frame: &PreparedFrame) -> Result<CandidateSet, PrimitiveError> {
        let contours = find_external_contours(&frame.cleaned);
        let mut candidates = Vec::new();

        for contour in &contours {
            if contour.area() < self.config.min_area {
                continue;
            }
            if contour.circularity() <= self.config.min_circularity {
                continue;
            }
            let Some((x, y, r)) = contour.enclosing_circle() else {
                continue;
            };
            let circle = Circle::new(x as i32, y as i32, r as i32);
            if circle.radius >= self.config.min_radius && circle.radius <= self.config.max_radius {
                candidates.push(circle);
            }
        }

        Ok(candidates)
    }

    fn name(&self) -> &str {
        "Contour Circularity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::hough::HoughParams;
    use crate::detection::preprocessing::{circle_mask, detect_edges, otsu_threshold_inv};
    use crate::models::{DiskSource, ReferenceDisk};
    use image::{GrayImage, Luma};
    use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut};
    use imageproc::rect::Rect;

    fn frame_from(gray: GrayImage, cleaned: GrayImage) -> PreparedFrame {
        let (w, h) = gray.dimensions();
        let disk = ReferenceDisk {
            circle: Circle::new(w as i32 / 2, h as i32 / 2, w.max(h) as i32),
            source: DiskSource::EdgeContour,
        };
        PreparedFrame {
            edges: detect_edges(&gray, 30.0, 100.0),
            enhanced: gray.clone(),
            disk_mask: circle_mask(w, h, &disk.circle),
            gray,
            cleaned,
            disk,
        }
    }

    struct Failing;

    impl CandidateGenerator for Failing {
        fn generate(&self, _frame: &PreparedFrame) -> Result<CandidateSet, PrimitiveError> {
            Err(PrimitiveError::InvalidParameter("boom".into()))
        }

        fn name(&self) -> &str {
            "Failing"
        }
    }

    struct Panicking;

    impl CandidateGenerator for Panicking {
        fn generate(&self, _frame: &PreparedFrame) -> Result<CandidateSet, PrimitiveError> {
            panic!("generator bug")
        }

        fn name(&self) -> &str {
            "Panicking"
        }
    }

    struct Fixed(Vec<Circle>);

    impl CandidateGenerator for Fixed {
        fn generate(&self, _frame: &PreparedFrame) -> Result<CandidateSet, PrimitiveError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "Fixed"
        }
    }

    #[test]
    fn test_hough_ensemble_finds_dark_hole() {
        let mut gray = GrayImage::from_pixel(100, 100, Luma([200]));
        draw_filled_circle_mut(&mut gray, (50, 50), 8, Luma([30]));
        let cleaned = otsu_threshold_inv(&gray);
        let frame = frame_from(gray, cleaned);

        let generator = HoughEnsemble {
            config: HoughEnsembleConfig::default(),
        };
        let found = generator.generate(&frame).unwrap();
        assert!(!found.is_empty());
        assert!(found.iter().any(|c| c.distance_to(50, 50) <= 2.0));
        for c in &found {
            assert!((4..=20).contains(&c.radius), "{c:?}");
        }
    }

    /// Ensemble whose permissive pass only looks for radii 19 and 20
    fn ensemble_with_marked_permissive_pass() -> HoughEnsemble {
        let mut config = HoughEnsembleConfig::default();
        config.permissive_pass = HoughParams {
            min_radius: 19,
            max_radius: 20,
            ..config.permissive_pass
        };
        HoughEnsemble { config }
    }

    #[test]
    fn test_permissive_pass_runs_on_low_yield() {
        let mut gray = GrayImage::from_pixel(100, 100, Luma([200]));
        draw_filled_circle_mut(&mut gray, (50, 50), 20, Luma([30]));
        let cleaned = otsu_threshold_inv(&gray);
        let frame = frame_from(gray, cleaned);

        let found = ensemble_with_marked_permissive_pass().generate(&frame).unwrap();
        assert!(
            found.iter().any(|c| (19..=20).contains(&c.radius) && c.distance_to(50, 50) <= 1.5),
            "{found:?}"
        );
    }

    #[test]
    fn test_permissive_pass_skipped_on_high_yield() {
        let mut gray = GrayImage::from_pixel(240, 220, Luma([200]));
        for (x, y) in [(40, 40), (120, 40), (200, 40), (40, 100), (120, 100), (200, 100)] {
            draw_filled_circle_mut(&mut gray, (x, y), 10, Luma([30]));
        }
        draw_filled_circle_mut(&mut gray, (120, 170), 20, Luma([30]));
        let cleaned = otsu_threshold_inv(&gray);
        let frame = frame_from(gray, cleaned);

        let found = ensemble_with_marked_permissive_pass().generate(&frame).unwrap();
        assert!(found.len() >= 6, "{found:?}");
        assert!(!found.iter().any(|c| c.radius >= 19), "{found:?}");
    }

    #[test]
    fn test_hough_rejects_hits_at_frame_border() {
        let gray = GrayImage::from_pixel(60, 60, Luma([200]));
        let frame = frame_from(gray.clone(), GrayImage::new(60, 60));
        let generator = HoughEnsemble {
            config: HoughEnsembleConfig::default(),
        };
        assert!(!generator.accept(&Circle::new(3, 30, 8), &frame));
        assert!(!generator.accept(&Circle::new(30, 30, 8), &frame));

        let mut cleaned = GrayImage::new(60, 60);
        draw_filled_circle_mut(&mut cleaned, (30, 30), 8, Luma([255u8]));
        let frame = frame_from(gray, cleaned);
        assert!(generator.accept(&Circle::new(30, 30, 8), &frame));
    }

    #[test]
    fn test_template_finds_ring() {
        let mut gray = GrayImage::from_pixel(80, 80, Luma([0]));
        draw_hollow_circle_mut(&mut gray, (40, 40), 10, Luma([255u8]));
        let frame = frame_from(gray, GrayImage::new(80, 80));

        let generator = TemplateCorrelation {
            config: TemplateConfig::default(),
        };
        let found = generator.generate(&frame).unwrap();
        assert!(found.contains(&Circle::new(40, 40, 10)), "{found:?}");
    }

    #[test]
    fn test_template_skips_oversized_radii() {
        let gray = GrayImage::from_pixel(20, 20, Luma([90]));
        let frame = frame_from(gray, GrayImage::new(20, 20));
        let generator = TemplateCorrelation {
            config: TemplateConfig::default(),
        };
        assert!(generator.generate(&frame).unwrap().is_empty());
    }

    #[test]
    fn test_contour_filters_area_shape_and_radius() {
        let mut cleaned = GrayImage::new(160, 120);
        draw_filled_circle_mut(&mut cleaned, (30, 30), 8, Luma([255u8]));
        draw_filled_circle_mut(&mut cleaned, (110, 60), 25, Luma([255u8]));
        draw_filled_rect_mut(&mut cleaned, Rect::at(10, 100).of_size(60, 3), Luma([255u8]));
        draw_filled_rect_mut(&mut cleaned, Rect::at(60, 20).of_size(3, 3), Luma([255u8]));
        let frame = frame_from(GrayImage::new(160, 120), cleaned);

        let generator = ContourCircularity {
            config: ContourConfig::default(),
        };
        let found = generator.generate(&frame).unwrap();
        assert_eq!(found.len(), 1, "{found:?}");
        assert!(found[0].distance_to(30, 30) <= 1.0);
        assert!((5..=15).contains(&found[0].radius));
    }

    #[test]
    fn test_failures_degrade_to_empty_sets() {
        let frame = frame_from(GrayImage::new(30, 30), GrayImage::new(30, 30));
        let generators: Vec<Arc<dyn CandidateGenerator>> = vec![
            Arc::new(Failing),
            Arc::new(Fixed(vec![Circle::new(5, 5, 3)])),
            Arc::new(Panicking),
        ];

        for parallel in [true, false] {
            let sets = run_generators(&generators, &frame, parallel);
            assert_eq!(sets.len(), 3);
            assert!(sets[0].is_empty());
            assert_eq!(sets[1], vec![Circle::new(5, 5, 3)]);
            assert!(sets[2].is_empty());
        }
    }
}
