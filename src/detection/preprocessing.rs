use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_filled_circle_mut;
use imageproc::edges::canny;
use imageproc::filter::{gaussian_blur_f32, median_filter};
use imageproc::morphology;

use crate::error::PrimitiveError;
use crate::models::Circle;

pub(crate) fn ensure_non_empty(operation: &'static str, img: &GrayImage) -> Result<(), PrimitiveError> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(PrimitiveError::EmptyFrame { operation, width, height });
    }
    Ok(())
}

pub(crate) fn ensure_same_size(
    operation: &'static str,
    left: &GrayImage,
    right: &GrayImage,
) -> Result<(), PrimitiveError> {
    if left.dimensions() != right.dimensions() {
        return Err(PrimitiveError::SizeMismatch {
            operation,
            left: left.dimensions(),
            right: right.dimensions(),
        });
    }
    Ok(())
}

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Apply Gaussian blur to reduce noise. A non-positive sigma leaves the image as is.
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return img.clone();
    }
    gaussian_blur_f32(img, sigma)
}

/// Median denoising; radius 0 disables it
pub fn denoise(img: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 {
        return img.clone();
    }
    median_filter(img, radius, radius)
}

/// Contrast limited adaptive histogram equalization.
///
/// The frame is split into a `tiles.0 x tiles.1` grid. Each tile gets an
/// equalization table whose histogram is clipped at `clip_limit` times the
/// mean bin height, with the clipped excess spread over all bins. Output
/// pixels blend the tables of the four nearest tile centers bilinearly.
pub fn enhance_contrast(
    img: &GrayImage,
    clip_limit: f32,
    tiles: (u32, u32),
) -> Result<GrayImage, PrimitiveError> {
    ensure_non_empty("clahe", img)?;
    if tiles.0 == 0 || tiles.1 == 0 {
        return Err(PrimitiveError::InvalidParameter(format!(
            "clahe tile grid must be non-zero, got {}x{}",
            tiles.0, tiles.1
        )));
    }

    let (width, height) = img.dimensions();
    let tile_w = width.div_ceil(tiles.0.min(width));
    let tile_h = height.div_ceil(tiles.1.min(height));
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[img.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            luts.push(clipped_equalization(&mut hist, (x1 - x0) * (y1 - y0), clip_limit));
        }
    }

    let neighbours = |pos: u32, size: u32, count: u32| -> (usize, usize, f32) {
        let f = (pos as f32 + 0.5) / size as f32 - 0.5;
        let base = f.floor();
        let weight = f - base;
        let last = count as i64 - 1;
        let lo = (base as i64).clamp(0, last) as usize;
        let hi = (base as i64 + 1).clamp(0, last) as usize;
        (lo, hi, weight)
    };

    let stride = tiles_x as usize;
    Ok(GrayImage::from_fn(width, height, |x, y| {
        let v = img.get_pixel(x, y)[0] as usize;
        let (tx0, tx1, wx) = neighbours(x, tile_w, tiles_x);
        let (ty0, ty1, wy) = neighbours(y, tile_h, tiles_y);

        let top = (1.0 - wx) * luts[ty0 * stride + tx0][v] as f32
            + wx * luts[ty0 * stride + tx1][v] as f32;
        let bottom = (1.0 - wx) * luts[ty1 * stride + tx0][v] as f32
            + wx * luts[ty1 * stride + tx1][v] as f32;
        let value = (1.0 - wy) * top + wy * bottom;
        Luma([value.round().clamp(0.0, 255.0) as u8])
    }))
}

fn clipped_equalization(hist: &mut [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    let clip = if clip_limit > 0.0 {
        ((clip_limit * area as f32 / 256.0) as u32).max(1)
    } else {
        u32::MAX
    };

    let mut excess = 0u32;
    for count in hist.iter_mut() {
        if *count > clip {
            excess += *count - clip;
            *count = clip;
        }
    }

    let per_bin = excess / 256;
    let residual = (excess % 256) as usize;
    for count in hist.iter_mut() {
        *count += per_bin;
    }
    if residual > 0 {
        let step = (256 / residual).max(1);
        for i in (0..256).step_by(step).take(residual) {
            hist[i] += 1;
        }
    }

    let scale = 255.0 / area.max(1) as f32;
    let mut lut = [0u8; 256];
    let mut sum = 0u32;
    for (i, count) in hist.iter().enumerate() {
        sum += count;
        lut[i] = (sum as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Inverted adaptive threshold against a Gaussian weighted local mean.
///
/// A pixel becomes 255 when it is not brighter than the local mean minus `c`.
/// `block_size` must be odd and at least 3; it sets the Gaussian sigma the
/// same way a `block_size x block_size` kernel would.
pub fn adaptive_threshold_inv(
    img: &GrayImage,
    block_size: u32,
    c: f32,
) -> Result<GrayImage, PrimitiveError> {
    ensure_non_empty("adaptive threshold", img)?;
    if block_size < 3 || block_size % 2 == 0 {
        return Err(PrimitiveError::InvalidParameter(format!(
            "adaptive threshold block size must be odd and >= 3, got {block_size}"
        )));
    }

    let sigma = 0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let local_mean: image::ImageBuffer<Luma<f32>, Vec<f32>> = image::ImageBuffer::from_fn(
        img.width(),
        img.height(),
        |x, y| Luma([img.get_pixel(x, y)[0] as f32]),
    );
    let local_mean = gaussian_blur_f32(&local_mean, sigma);

    Ok(GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let value = img.get_pixel(x, y)[0] as f32;
        if value > local_mean.get_pixel(x, y)[0] - c {
            Luma([0])
        } else {
            Luma([255])
        }
    }))
}

/// Inverted global threshold at Otsu's level
pub fn otsu_threshold_inv(img: &GrayImage) -> GrayImage {
    let level = otsu_level(img);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if img.get_pixel(x, y)[0] > level {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Erosion followed by dilation with a `(2r+1)` square kernel
pub fn morph_open(mask: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    morphology::open(mask, Norm::LInf, radius)
}

/// Dilation followed by erosion with a `(2r+1)` square kernel
pub fn morph_close(mask: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    morphology::close(mask, Norm::LInf, radius)
}

pub fn dilate(mask: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    morphology::dilate(mask, Norm::LInf, radius)
}

/// Detect edges using Canny edge detector
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    canny(img, low_threshold, high_threshold)
}

/// Pixelwise maximum of two binary masks
pub fn bitwise_or(a: &GrayImage, b: &GrayImage) -> Result<GrayImage, PrimitiveError> {
    ensure_same_size("bitwise or", a, b)?;
    Ok(GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y)[0] | b.get_pixel(x, y)[0]])
    }))
}

/// Keep pixels of `img` where `mask` is set, zero elsewhere
pub fn apply_mask(img: &GrayImage, mask: &GrayImage) -> Result<GrayImage, PrimitiveError> {
    ensure_same_size("apply mask", img, mask)?;
    Ok(GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if mask.get_pixel(x, y)[0] > 0 {
            *img.get_pixel(x, y)
        } else {
            Luma([0])
        }
    }))
}

/// Filled circle mask of the given frame size
pub fn circle_mask(width: u32, height: u32, circle: &Circle) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    draw_filled_circle_mut(&mut mask, circle.center(), circle.radius, Luma([255u8]));
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clahe_uniform_frame_stays_uniform() {
        let img = GrayImage::from_pixel(64, 64, Luma([120]));
        let enhanced = enhance_contrast(&img, 3.0, (8, 8)).unwrap();
        let first = enhanced.get_pixel(0, 0)[0];
        assert!(enhanced.pixels().all(|p| p[0] == first));
    }

    #[test]
    fn test_clahe_rejects_empty_grid() {
        let img = GrayImage::from_pixel(16, 16, Luma([10]));
        assert!(enhance_contrast(&img, 3.0, (0, 8)).is_err());
        assert!(enhance_contrast(&GrayImage::new(0, 0), 3.0, (8, 8)).is_err());
    }

    #[test]
    fn test_clahe_stretches_low_contrast() {
        let img = GrayImage::from_fn(64, 64, |x, _| Luma([if x < 32 { 100 } else { 110 }]));
        let enhanced = enhance_contrast(&img, 40.0, (1, 1)).unwrap();
        let left = enhanced.get_pixel(2, 32)[0] as i32;
        let right = enhanced.get_pixel(61, 32)[0] as i32;
        assert!(right - left > 30);
    }

    #[test]
    fn test_binaries_are_two_valued() {
        let img = GrayImage::from_fn(40, 40, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]));
        let adaptive = adaptive_threshold_inv(&img, 11, 2.0).unwrap();
        let otsu = otsu_threshold_inv(&img);
        assert!(adaptive.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert!(otsu.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_adaptive_marks_dark_spot() {
        let mut img = GrayImage::from_pixel(30, 30, Luma([200]));
        img.put_pixel(15, 15, Luma([20]));
        let binary = adaptive_threshold_inv(&img, 11, 2.0).unwrap();
        assert_eq!(binary.get_pixel(15, 15)[0], 255);
        assert_eq!(binary.get_pixel(2, 2)[0], 0);
    }

    #[test]
    fn test_adaptive_rejects_even_block() {
        let img = GrayImage::new(10, 10);
        assert!(adaptive_threshold_inv(&img, 10, 2.0).is_err());
    }

    #[test]
    fn test_otsu_inverts_dark_region() {
        let img = GrayImage::from_fn(20, 20, |x, _| Luma([if x < 10 { 30 } else { 220 }]));
        let binary = otsu_threshold_inv(&img);
        assert_eq!(binary.get_pixel(5, 5)[0], 255);
        assert_eq!(binary.get_pixel(15, 5)[0], 0);
    }

    #[test]
    fn test_open_removes_speck() {
        let mut mask = GrayImage::new(20, 20);
        mask.put_pixel(10, 10, Luma([255]));
        assert!(morph_open(&mask, 1).pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_mask_and_or() {
        let img = GrayImage::from_pixel(10, 10, Luma([90]));
        let mask = circle_mask(10, 10, &Circle::new(5, 5, 2));
        let masked = apply_mask(&img, &mask).unwrap();
        assert_eq!(masked.get_pixel(5, 5)[0], 90);
        assert_eq!(masked.get_pixel(0, 0)[0], 0);

        let merged = bitwise_or(&mask, &GrayImage::new(10, 10)).unwrap();
        assert_eq!(merged, mask);
        assert!(bitwise_or(&mask, &GrayImage::new(9, 10)).is_err());
    }
}
