pub mod classify;
pub mod contours;
pub mod disk;
pub mod frame;
pub mod fusion;
pub mod generators;
pub mod hough;
pub mod preprocessing;
pub mod template;

use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};
use log::{debug, info, warn};
use serde::Serialize;

use crate::config::ScanConfig;
use crate::error::{ScanError, ScanResult};
use crate::models::{HoleRecord, HoleStatus, ReferenceDisk};
use crate::pipeline::{DebugImages, PipelineContext};
use generators::CandidateGenerator;

const FILLED_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const EMPTY_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const DISK_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

/// Everything one scan produces
#[derive(Debug, Clone)]
pub struct ScanOutput {
    /// Input frame with the disk and every classified hole drawn on top
    pub annotated: RgbImage,
    pub holes: Vec<HoleRecord>,
    /// Dark-region mask after morphology, restricted to the disk
    pub cleaned_mask: GrayImage,
    pub disk: ReferenceDisk,
}

/// Hole counts of one scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub total: usize,
    pub filled: usize,
    pub empty: usize,
}

impl ScanOutput {
    pub fn summary(&self) -> ScanSummary {
        let filled = self.holes.iter().filter(|h| h.status == HoleStatus::Filled).count();
        ScanSummary {
            total: self.holes.len(),
            filled,
            empty: self.holes.len() - filled,
        }
    }

    pub fn save_annotated(&self, path: &Path) -> ScanResult<()> {
        self.annotated.save(path).map_err(|source| ScanError::Output {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_mask(&self, path: &Path) -> ScanResult<()> {
        self.cleaned_mask.save(path).map_err(|source| ScanError::Output {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Hole detection orchestrator: prepare, generate, fuse, classify
pub struct HoleDetector {
    config: ScanConfig,
    generators: Vec<Arc<dyn CandidateGenerator>>,
}

impl HoleDetector {
    pub fn new(config: ScanConfig) -> Self {
        let generators = generators::default_generators(&config);
        Self { config, generators }
    }

    /// Replace the candidate generator ensemble
    pub fn with_generators(mut self, generators: Vec<Arc<dyn CandidateGenerator>>) -> Self {
        self.generators = generators;
        self
    }

    /// Load an image from disk and scan it
    pub fn process_image(&self, path: &Path) -> ScanResult<ScanOutput> {
        let img = image::open(path).map_err(|source| ScanError::ImageNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("loaded {} ({}x{})", path.display(), img.width(), img.height());
        self.detect(&img)
    }

    pub fn detect(&self, img: &DynamicImage) -> ScanResult<ScanOutput> {
        self.run(img, PipelineContext::silent())
    }

    /// Scan and collect every intermediate stage image into `debug`
    pub fn detect_with_debug(&self, img: &DynamicImage, debug: &mut DebugImages) -> ScanResult<ScanOutput> {
        self.run(img, PipelineContext::new(Some(debug)))
    }

    fn run(&self, img: &DynamicImage, mut ctx: PipelineContext<'_>) -> ScanResult<ScanOutput> {
        let frame = frame::prepare_frame(img, &self.config.preprocess, &self.config.disk, &mut ctx)?;

        let sets = generators::run_generators(&self.generators, &frame, self.config.parallel);
        let circles = fusion::fuse(&sets, &frame.disk, self.config.fusion.duplicates);
        if circles.is_empty() {
            warn!("no hole candidates detected");
        }

        let holes = classify::classify_holes(&frame.gray, &circles, &self.config.classifier);
        let annotated = annotate(img, &frame.disk, &holes);

        let output = ScanOutput {
            annotated,
            holes,
            cleaned_mask: frame.cleaned,
            disk: frame.disk,
        };
        let summary = output.summary();
        info!(
            "{} holes: {} filled, {} empty",
            summary.total, summary.filled, summary.empty
        );
        Ok(output)
    }
}

impl Default for HoleDetector {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

/// Scan an image file with the stock configuration
pub fn process_image(path: &Path) -> ScanResult<ScanOutput> {
    HoleDetector::default().process_image(path)
}

/// Draw the disk outline and one colored ring plus center dot per hole
fn annotate(img: &DynamicImage, disk: &ReferenceDisk, holes: &[HoleRecord]) -> RgbImage {
    let mut canvas = img.to_rgb8();
    let c = disk.circle;
    draw_hollow_circle_mut(&mut canvas, (c.x, c.y), c.radius, DISK_COLOR);

    for hole in holes {
        let color = match hole.status {
            HoleStatus::Filled => FILLED_COLOR,
            HoleStatus::Empty => EMPTY_COLOR,
        };
        let (x, y) = hole.position;
        draw_hollow_circle_mut(&mut canvas, (x, y), hole.radius, color);
        draw_hollow_circle_mut(&mut canvas, (x, y), hole.radius + 1, color);
        draw_filled_circle_mut(&mut canvas, (x, y), 2, color);
    }
    canvas
}
