//! Tunable parameters for every stage of the scan.
//!
//! `ScanConfig::default()` carries the stock parameter sets. A JSON file may
//! override any subset of fields; missing fields keep their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detection::fusion::DuplicatePolicy;
use crate::detection::hough::HoughParams;
use crate::error::{ScanError, ScanResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub preprocess: PreprocessConfig,
    pub disk: DiskLocatorConfig,
    pub hough: HoughEnsembleConfig,
    pub template: TemplateConfig,
    pub contour: ContourConfig,
    pub fusion: FusionConfig,
    pub classifier: ClassifierConfig,
    /// Run the candidate generators on separate threads
    pub parallel: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            preprocess: PreprocessConfig::default(),
            disk: DiskLocatorConfig::default(),
            hough: HoughEnsembleConfig::default(),
            template: TemplateConfig::default(),
            contour: ContourConfig::default(),
            fusion: FusionConfig::default(),
            classifier: ClassifierConfig::default(),
            parallel: true,
        }
    }
}

impl ScanConfig {
    /// Load a configuration from a JSON file and validate it
    pub fn from_json_file(path: &Path) -> ScanResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ScanError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ScanConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations the primitives cannot run with
    pub fn validate(&self) -> ScanResult<()> {
        let p = &self.preprocess;
        if p.adaptive_block_size < 3 || p.adaptive_block_size % 2 == 0 {
            return Err(ScanError::Config(format!(
                "adaptive_block_size must be odd and >= 3, got {}",
                p.adaptive_block_size
            )));
        }
        if p.clahe_tiles.0 == 0 || p.clahe_tiles.1 == 0 {
            return Err(ScanError::Config("clahe_tiles must be non-zero".into()));
        }
        if self.disk.thresholds.is_empty() {
            return Err(ScanError::Config("disk.thresholds must not be empty".into()));
        }
        let passes = self
            .hough
            .passes
            .iter()
            .chain(std::iter::once(&self.hough.permissive_pass))
            .chain(std::iter::once(&self.disk.hough));
        for pass in passes {
            if pass.dp < 1.0 || pass.min_radius > pass.max_radius || pass.max_radius == 0 {
                return Err(ScanError::Config(format!("invalid hough pass {pass:?}")));
            }
        }
        if self.template.radii.contains(&0) {
            return Err(ScanError::Config("template radii must be positive".into()));
        }
        if self.contour.min_radius > self.contour.max_radius {
            return Err(ScanError::Config(format!(
                "contour radius band [{}, {}] is empty",
                self.contour.min_radius, self.contour.max_radius
            )));
        }
        Ok(())
    }
}

/// Frame enhancement and binarization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub blur_sigma: f32,
    /// Median filter radius, 0 disables denoising
    pub denoise_radius: u32,
    pub clahe_clip_limit: f32,
    pub clahe_tiles: (u32, u32),
    pub adaptive_block_size: u32,
    pub adaptive_c: f32,
    /// Square kernel radius for the open/close cleanup (1 = 3x3)
    pub morph_radius: u8,
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            denoise_radius: 1,
            clahe_clip_limit: 3.0,
            clahe_tiles: (8, 8),
            adaptive_block_size: 11,
            adaptive_c: 2.0,
            morph_radius: 1,
            canny_low: 30.0,
            canny_high: 100.0,
        }
    }
}

/// Reference disk search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskLocatorConfig {
    pub blur_sigma: f32,
    /// Hough pass template; its threshold is replaced by each of `thresholds`
    pub hough: HoughParams,
    /// Accumulator thresholds tried in order, strictest first
    pub thresholds: Vec<u32>,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Dilation radius that closes gaps in the edge fallback (2 = 5x5)
    pub dilate_radius: u8,
}

impl Default for DiskLocatorConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.7,
            hough: HoughParams {
                dp: 1.2,
                min_dist: 100.0,
                canny_high: 50.0,
                accumulator_threshold: 30,
                min_radius: 50,
                max_radius: 200,
            },
            thresholds: vec![30, 25, 20, 15],
            canny_low: 30.0,
            canny_high: 100.0,
            dilate_radius: 2,
        }
    }
}

/// Multi-pass Hough candidate generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughEnsembleConfig {
    /// Passes that always run
    pub passes: Vec<HoughParams>,
    /// Extra pass run only when the regular passes are short of hits
    pub permissive_pass: HoughParams,
    /// Hit count below which the permissive pass runs
    pub permissive_below: usize,
    /// Minimum fraction of the perimeter covered by edge pixels
    pub min_edge_ratio: f32,
    /// Minimum fraction of the disc covered by the cleaned binary mask
    pub min_dark_ratio: f32,
}

impl Default for HoughEnsembleConfig {
    fn default() -> Self {
        Self {
            passes: vec![
                HoughParams {
                    dp: 1.2,
                    min_dist: 20.0,
                    canny_high: 40.0,
                    accumulator_threshold: 22,
                    min_radius: 6,
                    max_radius: 15,
                },
                HoughParams {
                    dp: 1.5,
                    min_dist: 15.0,
                    canny_high: 30.0,
                    accumulator_threshold: 18,
                    min_radius: 5,
                    max_radius: 18,
                },
            ],
            permissive_pass: HoughParams {
                dp: 1.0,
                min_dist: 10.0,
                canny_high: 25.0,
                accumulator_threshold: 15,
                min_radius: 4,
                max_radius: 20,
            },
            permissive_below: 6,
            min_edge_ratio: 0.05,
            min_dark_ratio: 0.05,
        }
    }
}

/// Ring template correlation generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub radii: Vec<u32>,
    /// Black border around the ring inside the template
    pub padding: u32,
    pub score_threshold: f32,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            radii: vec![6, 8, 10, 12, 14],
            padding: 2,
            score_threshold: 0.5,
        }
    }
}

/// Contour circularity generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourConfig {
    pub min_area: f64,
    /// Contours must be strictly more circular than this
    pub min_circularity: f64,
    pub min_radius: i32,
    pub max_radius: i32,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            min_area: 30.0,
            min_circularity: 0.4,
            min_radius: 5,
            max_radius: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FusionConfig {
    pub duplicates: DuplicatePolicy,
}

/// Filled/empty decision thresholds. Any single signal marks a hole filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Filled when the mean intensity is below this
    pub mean_below: f64,
    /// Filled when the darkest non-zero pixel is below this
    pub min_value_below: u8,
    /// Filled when the standard deviation is above this
    pub std_dev_above: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            mean_below: 120.0,
            min_value_below: 50,
            std_dev_above: 40.0,
        }
    }
}
