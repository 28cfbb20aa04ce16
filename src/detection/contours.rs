use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;

use crate::models::Contour;

/// Outermost borders of the foreground (non-zero) regions of a binary mask
pub fn find_external_contours(binary: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| Contour::new(c.points))
        .collect()
}

/// Smallest circle containing all points, as `(x, y, radius)`.
///
/// Incremental Welzl construction. Points are visited in a strided order so
/// border-ordered input does not hit the quadratic-rebuild worst case.
pub fn min_enclosing_circle(points: &[Point<i32>]) -> Option<(f32, f32, f32)> {
    let n = points.len();
    if n == 0 {
        return None;
    }

    let step = coprime_step(n);
    let pts: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            let p = points[(i * step) % n];
            (p.x as f64, p.y as f64)
        })
        .collect();

    let mut c = (pts[0].0, pts[0].1, 0.0);
    for i in 1..n {
        if inside(c, pts[i]) {
            continue;
        }
        c = (pts[i].0, pts[i].1, 0.0);
        for j in 0..i {
            if inside(c, pts[j]) {
                continue;
            }
            c = circle_from_two(pts[i], pts[j]);
            for k in 0..j {
                if !inside(c, pts[k]) {
                    c = circle_from_three(pts[i], pts[j], pts[k]);
                }
            }
        }
    }

    Some((c.0 as f32, c.1 as f32, c.2 as f32))
}

fn coprime_step(n: usize) -> usize {
    fn gcd(a: usize, b: usize) -> usize {
        if b == 0 { a } else { gcd(b, a % b) }
    }
    let mut step = n / 2 + 1;
    while step > 1 && gcd(step, n) != 1 {
        step += 1;
    }
    step.max(1)
}

fn inside(c: (f64, f64, f64), p: (f64, f64)) -> bool {
    let d = ((p.0 - c.0).powi(2) + (p.1 - c.1).powi(2)).sqrt();
    d <= c.2 + 1e-7
}

fn circle_from_two(a: (f64, f64), b: (f64, f64)) -> (f64, f64, f64) {
    let cx = (a.0 + b.0) / 2.0;
    let cy = (a.1 + b.1) / 2.0;
    let r = ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt() / 2.0;
    (cx, cy, r)
}

fn circle_from_three(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> (f64, f64, f64) {
    let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
    if d.abs() < 1e-12 {
        // collinear: the widest pair spans the other point
        let candidates = [circle_from_two(a, b), circle_from_two(a, c), circle_from_two(b, c)];
        return candidates
            .into_iter()
            .fold((0.0, 0.0, -1.0), |best, cand| if cand.2 > best.2 { cand } else { best });
    }
    let a2 = a.0 * a.0 + a.1 * a.1;
    let b2 = b.0 * b.0 + b.1 * b.1;
    let c2 = c.0 * c.0 + c.1 * c.1;
    let ux = (a2 * (b.1 - c.1) + b2 * (c.1 - a.1) + c2 * (a.1 - b.1)) / d;
    let uy = (a2 * (c.0 - b.0) + b2 * (a.0 - c.0) + c2 * (b.0 - a.0)) / d;
    let r = ((a.0 - ux).powi(2) + (a.1 - uy).powi(2)).sqrt();
    (ux, uy, r)
}
