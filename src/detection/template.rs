use image::{GrayImage, ImageBuffer, Luma};
use imageproc::drawing::draw_hollow_circle_mut;
use imageproc::integral_image::{integral_image, integral_squared_image};

use crate::detection::preprocessing::ensure_non_empty;
use crate::error::PrimitiveError;

/// Correlation scores, one per template placement (top-left corner)
pub type ScoreMap = ImageBuffer<Luma<f32>, Vec<f32>>;

/// One pixel wide bright ring of the given radius on a black square of side
/// `2 * (radius + padding) + 1`, centered at `(radius + padding, radius + padding)`.
pub fn ring_template(radius: u32, padding: u32) -> GrayImage {
    let side = 2 * (radius + padding) + 1;
    let center = (radius + padding) as i32;
    let mut template = GrayImage::new(side, side);
    draw_hollow_circle_mut(&mut template, (center, center), radius as i32, Luma([255u8]));
    template
}

/// Zero-mean normalized cross-correlation of a template over every placement.
///
/// Scores lie in `[-1, 1]`. Placements where the frame window has no variance
/// score 0.
pub fn match_template_normed(img: &GrayImage, template: &GrayImage) -> Result<ScoreMap, PrimitiveError> {
    ensure_non_empty("template match", img)?;
    ensure_non_empty("template match", template)?;
    let (width, height) = img.dimensions();
    let (tw, th) = template.dimensions();
    if tw > width || th > height {
        return Err(PrimitiveError::TemplateTooLarge {
            template: (tw, th),
            frame: (width, height),
        });
    }

    let n = (tw * th) as f64;
    let taps: Vec<(u32, u32, f64)> = template
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] > 0)
        .map(|(x, y, p)| (x, y, p[0] as f64))
        .collect();
    let t_sum: f64 = taps.iter().map(|t| t.2).sum();
    let t_sq_sum: f64 = taps.iter().map(|t| t.2 * t.2).sum();
    let t_mean = t_sum / n;
    let t_var = t_sq_sum - n * t_mean * t_mean;

    let out_w = width - tw + 1;
    let out_h = height - th + 1;
    if t_var <= f64::EPSILON {
        return Ok(ScoreMap::new(out_w, out_h));
    }

    let sums = integral_image::<_, u64>(img);
    let squares = integral_squared_image::<_, u64>(img);
    let window = |ii: &ImageBuffer<Luma<u64>, Vec<u64>>, x: u32, y: u32| -> f64 {
        let total = ii.get_pixel(x + tw, y + th)[0] + ii.get_pixel(x, y)[0];
        let cut = ii.get_pixel(x, y + th)[0] + ii.get_pixel(x + tw, y)[0];
        (total - cut) as f64
    };

    Ok(ScoreMap::from_fn(out_w, out_h, |x, y| {
        let i_sum = window(&sums, x, y);
        let i_var = window(&squares, x, y) - i_sum * i_sum / n;
        if i_var <= 1e-6 {
            return Luma([0.0]);
        }
        let cross: f64 = taps
            .iter()
            .map(|&(tx, ty, t)| t * img.get_pixel(x + tx, y + ty)[0] as f64)
            .sum();
        let score = (cross - t_mean * i_sum) / (t_var * i_var).sqrt();
        Luma([score.clamp(-1.0, 1.0) as f32])
    }))
}
