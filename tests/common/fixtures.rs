use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_circle_mut;
use tempfile::NamedTempFile;

/// Board disk geometry of the synthetic scene
pub const BOARD: (i32, i32, i32) = (200, 200, 150);
/// Dark (filled) hole center and radius
pub const DARK_HOLE: (i32, i32, i32) = (180, 190, 8);
/// Light (empty) hole center and radius
pub const LIGHT_HOLE: (i32, i32, i32) = (220, 210, 8);

/// 400x400 scene: background 40, board disk 170, one dark and one light hole.
pub fn board_with_two_holes() -> GrayImage {
    let mut img = GrayImage::from_pixel(400, 400, Luma([40]));
    draw_filled_circle_mut(&mut img, (BOARD.0, BOARD.1), BOARD.2, Luma([170]));
    draw_filled_circle_mut(&mut img, (DARK_HOLE.0, DARK_HOLE.1), DARK_HOLE.2, Luma([20]));
    draw_filled_circle_mut(&mut img, (LIGHT_HOLE.0, LIGHT_HOLE.1), LIGHT_HOLE.2, Luma([240]));
    img
}

/// Featureless frame, nothing for the disk locator to find
pub fn blank_frame(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([128]))
}

/// Saves the image as a PNG temp file.
/// The file will be automatically cleaned up when dropped.
pub fn save_png(img: &GrayImage) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    img.save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// Record whose center is closest to `(x, y)`
pub fn nearest_record(holes: &[screwhole::HoleRecord], x: i32, y: i32) -> &screwhole::HoleRecord {
    holes
        .iter()
        .min_by_key(|h| (h.position.0 - x).pow(2) + (h.position.1 - y).pow(2))
        .expect("report is empty")
}
