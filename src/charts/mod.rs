//! Charts module - Chart rendering

mod plotter;
mod renderer;

pub use plotter::{ChartData, ChartPlotter};
pub use renderer::{RenderError, StaticChartRenderer};

use crate::stats::Significance;

/// Point colors per class (RGB)
pub const UP_RGB: (u8, u8, u8) = (231, 76, 60); // Red
pub const DOWN_RGB: (u8, u8, u8) = (46, 204, 113); // Green
pub const NOT_SIGNIFICANT_RGB: (u8, u8, u8) = (52, 152, 219); // Blue

pub fn significance_rgb(class: Significance) -> (u8, u8, u8) {
    match class {
        Significance::Up => UP_RGB,
        Significance::Down => DOWN_RGB,
        Significance::NotSignificant => NOT_SIGNIFICANT_RGB,
    }
}

pub fn significance_name(class: Significance) -> &'static str {
    match class {
        Significance::Up => "Up-regulated",
        Significance::Down => "Down-regulated",
        Significance::NotSignificant => "Not significant",
    }
}

/// Diverging blue-white-red scale for coefficients in [-1, 1]. NaN is gray.
pub fn correlation_rgb(r: f64) -> (u8, u8, u8) {
    const NEG: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const POS: (f64, f64, f64) = (180.0, 4.0, 38.0);
    const MID: (f64, f64, f64) = (247.0, 247.0, 247.0);

    if r.is_nan() {
        return (200, 200, 200);
    }
    let r = r.clamp(-1.0, 1.0);
    let (end, t) = if r < 0.0 { (NEG, -r) } else { (POS, r) };
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    (lerp(MID.0, end.0), lerp(MID.1, end.1), lerp(MID.2, end.2))
}

/// Dark text on light cells, white on saturated ones.
pub fn correlation_text_is_light(r: f64) -> bool {
    r.abs() > 0.6
}

/// Axis extents for a volcano plot: symmetric x, y from zero.
pub fn volcano_bounds(points: &[(f64, f64)], fold_change: f64, p_line: Option<f64>) -> ((f64, f64), (f64, f64)) {
    let max_x = points
        .iter()
        .map(|p| p.0.abs())
        .fold(fold_change, f64::max);
    let max_y = points
        .iter()
        .map(|p| p.1)
        .chain(p_line)
        .fold(1.0, f64::max);

    let x = max_x * 1.1 + 0.5;
    ((-x, x), (0.0, max_y * 1.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_scale_endpoints() {
        assert_eq!(correlation_rgb(-1.0), (59, 76, 192));
        assert_eq!(correlation_rgb(0.0), (247, 247, 247));
        assert_eq!(correlation_rgb(1.0), (180, 4, 38));
        assert_eq!(correlation_rgb(2.0), correlation_rgb(1.0));
        assert_eq!(correlation_rgb(f64::NAN), (200, 200, 200));
    }

    #[test]
    fn bounds_cover_points_and_thresholds() {
        let ((x0, x1), (y0, y1)) = volcano_bounds(&[(2.0, 3.0), (-4.0, 1.0)], 1.5, Some(1.3));
        assert_eq!(x0, -x1);
        assert!(x1 > 4.0);
        assert_eq!(y0, 0.0);
        assert!(y1 > 3.0);

        let ((_, x1), (_, y1)) = volcano_bounds(&[], 1.5, None);
        assert!(x1 > 1.5);
        assert!(y1 >= 1.0);
    }
}
