//! Static Chart Renderer
//! Generates PNG/SVG images of the volcano plot and correlation heatmap.
//!
//! Volcano layout:
//! 1. Title "Volcano Plot" centered
//! 2. Scatter of log2 fold change vs -log10 p, colored by class
//! 3. Dashed threshold lines and a legend in the upper right
//!
//! Heatmap layout: column labels above, row labels left, annotated cells.

use super::{
    correlation_rgb, correlation_text_is_light, significance_name, significance_rgb,
    volcano_bounds,
};
use crate::config::{DisplaySettings, ExportSettings};
use crate::stats::{CorrelationMatrix, Significance, StatsCalculator, Thresholds, VolcanoResult};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;
use thiserror::Error;

const FONT: &str = "sans-serif";
const DASH: f64 = 0.012; // fraction of the axis span

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing failed: {0}")]
    Drawing(String),
    #[error("Unsupported image format '{0}' (use .png or .svg)")]
    UnsupportedFormat(String),
    #[error("Nothing to render")]
    Empty,
}

fn drawing_err<E: std::error::Error + Send + Sync>(e: DrawingAreaErrorKind<E>) -> RenderError {
    RenderError::Drawing(e.to_string())
}

fn rgb(c: (u8, u8, u8)) -> RGBColor {
    RGBColor(c.0, c.1, c.2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageFormat {
    Png,
    Svg,
}

impl ImageFormat {
    fn from_path(path: &Path) -> Result<Self, RenderError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "png" => Ok(ImageFormat::Png),
            "svg" => Ok(ImageFormat::Svg),
            other => Err(RenderError::UnsupportedFormat(other.to_string())),
        }
    }
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Write the volcano plot to `path`; the extension picks PNG or SVG.
    pub fn render_volcano(
        path: &Path,
        result: &VolcanoResult,
        thresholds: &Thresholds,
        display: &DisplaySettings,
        size: &ExportSettings,
    ) -> Result<(), RenderError> {
        let dims = (size.width, size.height);
        match ImageFormat::from_path(path)? {
            ImageFormat::Png => {
                let root = BitMapBackend::new(path, dims).into_drawing_area();
                Self::draw_volcano(&root, result, thresholds, display)
            }
            ImageFormat::Svg => {
                let root = SVGBackend::new(path, dims).into_drawing_area();
                Self::draw_volcano(&root, result, thresholds, display)
            }
        }?;
        log::info!("Volcano plot written to {}", path.display());
        Ok(())
    }

    /// Write the correlation heatmap to `path`; the extension picks PNG or SVG.
    pub fn render_heatmap(
        path: &Path,
        matrix: &CorrelationMatrix,
        size: &ExportSettings,
    ) -> Result<(), RenderError> {
        if matrix.size() == 0 {
            return Err(RenderError::Empty);
        }
        let dims = (size.width, size.height);
        match ImageFormat::from_path(path)? {
            ImageFormat::Png => {
                let root = BitMapBackend::new(path, dims).into_drawing_area();
                Self::draw_heatmap(&root, matrix)
            }
            ImageFormat::Svg => {
                let root = SVGBackend::new(path, dims).into_drawing_area();
                Self::draw_heatmap(&root, matrix)
            }
        }?;
        log::info!("Heatmap written to {}", path.display());
        Ok(())
    }

    /// Heatmap SVG as a string (no filesystem access).
    pub fn heatmap_svg_string(
        matrix: &CorrelationMatrix,
        size: &ExportSettings,
    ) -> Result<String, RenderError> {
        if matrix.size() == 0 {
            return Err(RenderError::Empty);
        }
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (size.width, size.height))
                .into_drawing_area();
            Self::draw_heatmap(&root, matrix)?;
        }
        Ok(svg)
    }

    fn draw_volcano<DB: DrawingBackend>(
        root: &DrawingArea<DB, Shift>,
        result: &VolcanoResult,
        thresholds: &Thresholds,
        display: &DisplaySettings,
    ) -> Result<(), RenderError> {
        root.fill(&WHITE).map_err(drawing_err)?;

        let coords: Vec<(f64, f64)> = result.points.iter().filter_map(|p| p.plot_coords()).collect();
        let p_line =
            StatsCalculator::neg_log10(thresholds.p_value).filter(|_| thresholds.p_value > 0.0);
        let ((x_min, x_max), (y_min, y_max)) =
            volcano_bounds(&coords, thresholds.fold_change, p_line);

        let mut chart = ChartBuilder::on(root)
            .caption("Volcano Plot", (FONT, 28))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(drawing_err)?;

        chart
            .configure_mesh()
            .x_desc("log2(Fold Change)")
            .y_desc("-log10(P value)")
            .axis_desc_style((FONT, 18))
            .draw()
            .map_err(drawing_err)?;

        let radius = display.point_radius.round().max(1.0) as u32;
        for class in [
            Significance::NotSignificant,
            Significance::Down,
            Significance::Up,
        ] {
            let color = rgb(significance_rgb(class));
            let points: Vec<(f64, f64)> = result
                .points
                .iter()
                .filter(|p| p.classify(thresholds) == class)
                .filter_map(|p| p.plot_coords())
                .collect();

            chart
                .draw_series(
                    points
                        .into_iter()
                        .map(|xy| Circle::new(xy, radius, color.mix(0.8).filled())),
                )
                .map_err(drawing_err)?
                .label(significance_name(class))
                .legend(move |(x, y)| Circle::new((x + 10, y), 5, color.filled()));
        }

        // Dashed threshold lines
        let dash_style = BLACK.stroke_width(1);
        let mut segments = Vec::new();
        if let Some(y) = p_line {
            segments.extend(dash_segments((x_min, y), (x_max, y), (x_max - x_min) * DASH));
        }
        for x in [-thresholds.fold_change, thresholds.fold_change] {
            segments.extend(dash_segments((x, y_min), (x, y_max), (y_max - y_min) * DASH));
        }
        chart
            .draw_series(
                segments
                    .into_iter()
                    .map(|seg| PathElement::new(vec![seg.0, seg.1], dash_style)),
            )
            .map_err(drawing_err)?;

        if display.show_labels {
            let labels: Vec<(String, (f64, f64))> = result
                .points
                .iter()
                .filter(|p| p.classify(thresholds) != Significance::NotSignificant)
                .filter_map(|p| p.plot_coords().map(|xy| (p.label.clone(), xy)))
                .collect();
            chart
                .draw_series(
                    labels
                        .into_iter()
                        .map(|(label, xy)| Text::new(label, xy, (FONT, 13).into_font())),
                )
                .map_err(drawing_err)?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.85))
            .border_style(&BLACK)
            .label_font((FONT, 14))
            .draw()
            .map_err(drawing_err)?;

        root.present().map_err(drawing_err)?;
        Ok(())
    }

    fn draw_heatmap<DB: DrawingBackend>(
        root: &DrawingArea<DB, Shift>,
        matrix: &CorrelationMatrix,
    ) -> Result<(), RenderError> {
        root.fill(&WHITE).map_err(drawing_err)?;

        let (width, height) = root.dim_in_pixel();
        let n = matrix.size() as i32;
        let title_h = 50;
        let label_space = 120;
        let grid = ((width as i32 - label_space - 20).min(height as i32 - label_space - title_h - 20))
            .max(n * 10);
        let cell = grid / n;
        let origin = (label_space, title_h + label_space - 20);

        let title_style = TextStyle::from((FONT, 26).into_font())
            .pos(Pos::new(HPos::Center, VPos::Top));
        root.draw(&Text::new(
            "Correlation Heatmap",
            (width as i32 / 2, 10),
            title_style,
        ))
        .map_err(drawing_err)?;

        let label_font = (FONT, (cell / 4).clamp(11, 18)).into_font();
        let row_style = TextStyle::from(label_font.clone()).pos(Pos::new(HPos::Right, VPos::Center));
        let col_style = TextStyle::from(label_font.clone()).pos(Pos::new(HPos::Center, VPos::Bottom));

        for (i, label) in matrix.labels.iter().enumerate() {
            let mid = cell * i as i32 + cell / 2;
            root.draw(&Text::new(
                label.clone(),
                (origin.0 - 8, origin.1 + mid),
                row_style.clone(),
            ))
            .map_err(drawing_err)?;
            root.draw(&Text::new(
                label.clone(),
                (origin.0 + mid, origin.1 - 8),
                col_style.clone(),
            ))
            .map_err(drawing_err)?;
        }

        for i in 0..matrix.size() {
            for j in 0..matrix.size() {
                let r = matrix.get(i, j);
                let x0 = origin.0 + cell * j as i32;
                let y0 = origin.1 + cell * i as i32;
                root.draw(&Rectangle::new(
                    [(x0 + 1, y0 + 1), (x0 + cell - 1, y0 + cell - 1)],
                    rgb(correlation_rgb(r)).filled(),
                ))
                .map_err(drawing_err)?;

                let text_color = if correlation_text_is_light(r) { WHITE } else { BLACK };
                let value = if r.is_nan() { "-".to_string() } else { format!("{r:.2}") };
                let style = TextStyle::from(label_font.clone())
                    .color(&text_color)
                    .pos(Pos::new(HPos::Center, VPos::Center));
                root.draw(&Text::new(value, (x0 + cell / 2, y0 + cell / 2), style))
                    .map_err(drawing_err)?;
            }
        }

        root.present().map_err(drawing_err)?;
        Ok(())
    }
}

/// Split a line into dash segments of `dash` length with equal gaps.
fn dash_segments(from: (f64, f64), to: (f64, f64), dash: f64) -> Vec<((f64, f64), (f64, f64))> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 || dash <= 0.0 || !length.is_finite() {
        return Vec::new();
    }

    let (ux, uy) = (dx / length, dy / length);
    let mut segments = Vec::new();
    let mut t = 0.0;
    while t < length {
        let end = (t + dash).min(length);
        segments.push((
            (from.0 + ux * t, from.1 + uy * t),
            (from.0 + ux * end, from.1 + uy * end),
        ));
        t += dash * 2.0;
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_segments_cover_line() {
        let segs = dash_segments((0.0, 0.0), (10.0, 0.0), 1.0);
        assert_eq!(segs.len(), 5);
        assert_eq!(segs[0], ((0.0, 0.0), (1.0, 0.0)));
        assert_eq!(segs[4], ((8.0, 0.0), (9.0, 0.0)));
        assert!(dash_segments((1.0, 1.0), (1.0, 1.0), 1.0).is_empty());
    }

    #[test]
    fn format_is_chosen_by_extension() {
        assert_eq!(ImageFormat::from_path(Path::new("a.PNG")).unwrap(), ImageFormat::Png);
        assert_eq!(ImageFormat::from_path(Path::new("a.svg")).unwrap(), ImageFormat::Svg);
        assert!(matches!(
            ImageFormat::from_path(Path::new("a.jpg")),
            Err(RenderError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn empty_heatmap_is_rejected() {
        let empty = CorrelationMatrix {
            labels: Vec::new(),
            values: Vec::new(),
        };
        assert!(matches!(
            StaticChartRenderer::heatmap_svg_string(&empty, &ExportSettings::default()),
            Err(RenderError::Empty)
        ));
    }
}
