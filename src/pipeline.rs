use std::path::Path;

use anyhow::Result;
use image::{DynamicImage, GrayImage};

/// Intermediate images collected during one scan, in the order they were produced.
///
/// Owned by the caller and handed to the scan by reference, so nothing
/// outlives the call that filled it.
#[derive(Default, Clone)]
pub struct DebugImages {
    stages: Vec<(String, DynamicImage)>,
}

impl DebugImages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stage image; a repeated name replaces the earlier image in place
    pub fn push(&mut self, name: impl Into<String>, image: impl Into<DynamicImage>) {
        let name = name.into();
        let image = image.into();
        match self.stages.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = image,
            None => self.stages.push((name, image)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DynamicImage> {
        self.stages.iter().find(|(n, _)| n == name).map(|(_, img)| img)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Create `output_dir` if missing, fail if it already has entries.
    /// Call before scanning so a bad directory is reported up front.
    pub fn prepare_output_dir(output_dir: &Path) -> Result<()> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(output_dir)?;
        }
        Ok(())
    }

    /// Write every stage as `NN_name.png` into `output_dir`.
    /// The directory must be empty or non-existent.
    pub fn save_to(&self, output_dir: &Path) -> Result<usize> {
        Self::prepare_output_dir(output_dir)?;

        for (idx, (name, image)) in self.stages.iter().enumerate() {
            let filename = format!("{:02}_{}.png", idx, name.to_lowercase().replace(' ', "_"));
            let output_path = output_dir.join(&filename);
            image
                .save(&output_path)
                .map_err(|e| anyhow::anyhow!("Failed to save debug image {}: {}", filename, e))?;
            log::debug!("saved debug image {}", output_path.display());
        }

        Ok(self.stages.len())
    }
}

/// Context available to every stage of a scan
pub struct PipelineContext<'a> {
    debug: Option<&'a mut DebugImages>,
}

impl<'a> PipelineContext<'a> {
    pub fn new(debug: Option<&'a mut DebugImages>) -> Self {
        Self { debug }
    }

    pub fn silent() -> Self {
        Self { debug: None }
    }

    /// Copy a stage image into the debug accumulator, if one is attached
    pub fn record(&mut self, name: &str, image: &GrayImage) {
        if let Some(debug) = self.debug.as_deref_mut() {
            debug.push(name, image.clone());
        }
    }
}
