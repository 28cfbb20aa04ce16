use image::{DynamicImage, GrayImage};
use log::debug;

use crate::config::{DiskLocatorConfig, PreprocessConfig};
use crate::detection::disk::locate_reference_disk;
use crate::detection::preprocessing::{
    adaptive_threshold_inv, apply_blur, apply_mask, bitwise_or, circle_mask, denoise,
    detect_edges, enhance_contrast, morph_close, morph_open, otsu_threshold_inv, to_grayscale,
};
use crate::error::PrimitiveError;
use crate::models::ReferenceDisk;
use crate::pipeline::PipelineContext;

/// Read-only inputs shared by all candidate generators
#[derive(Debug, Clone)]
pub struct PreparedFrame {
    /// Unprocessed grayscale, used for template matching and statistics
    pub gray: GrayImage,
    /// Blurred, denoised, contrast enhanced grayscale
    pub enhanced: GrayImage,
    /// Canny edges of `enhanced`, restricted to the disk
    pub edges: GrayImage,
    /// Dark-region binary mask after open/close cleanup, restricted to the disk
    pub cleaned: GrayImage,
    pub disk_mask: GrayImage,
    pub disk: ReferenceDisk,
}

impl PreparedFrame {
    pub fn dimensions(&self) -> (u32, u32) {
        self.gray.dimensions()
    }
}

/// Enhance the frame, locate the reference disk and derive the masks every
/// generator works from.
pub fn prepare_frame(
    img: &DynamicImage,
    preprocess: &PreprocessConfig,
    disk_config: &DiskLocatorConfig,
    ctx: &mut PipelineContext<'_>,
) -> Result<PreparedFrame, PrimitiveError> {
    let gray = to_grayscale(img);
    ctx.record("gray", &gray);

    let blurred = apply_blur(&gray, preprocess.blur_sigma);
    ctx.record("blurred", &blurred);

    let denoised = denoise(&blurred, preprocess.denoise_radius);
    ctx.record("denoised", &denoised);

    let enhanced = enhance_contrast(&denoised, preprocess.clahe_clip_limit, preprocess.clahe_tiles)?;
    ctx.record("enhanced", &enhanced);

    let disk = locate_reference_disk(&enhanced, disk_config)?;
    let (width, height) = gray.dimensions();
    let disk_mask = circle_mask(width, height, &disk.circle);
    ctx.record("disk_mask", &disk_mask);

    let adaptive = adaptive_threshold_inv(&enhanced, preprocess.adaptive_block_size, preprocess.adaptive_c)?;
    ctx.record("adaptive_binary", &adaptive);

    let otsu = otsu_threshold_inv(&enhanced);
    ctx.record("otsu_binary", &otsu);

    let combined = bitwise_or(&adaptive, &otsu)?;
    let masked = apply_mask(&combined, &disk_mask)?;
    ctx.record("masked_binary", &masked);

    let cleaned = morph_close(&morph_open(&masked, preprocess.morph_radius), preprocess.morph_radius);
    ctx.record("morphology", &cleaned);

    let edges = apply_mask(
        &detect_edges(&enhanced, preprocess.canny_low, preprocess.canny_high),
        &disk_mask,
    )?;
    ctx.record("edges", &edges);

    debug!(
        "prepared {}x{} frame, disk ({}, {}) r={} via {:?}",
        width, height, disk.circle.x, disk.circle.y, disk.circle.radius, disk.source
    );

    Ok(PreparedFrame {
        gray,
        enhanced,
        edges,
        cleaned,
        disk_mask,
        disk,
    })
}
