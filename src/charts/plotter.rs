//! Chart Plotter Module
//! Creates interactive visualizations using egui_plot.

use super::{
    correlation_rgb, correlation_text_is_light, significance_name, significance_rgb,
    volcano_bounds,
};
use crate::config::DisplaySettings;
use crate::stats::{
    CorrelationMatrix, Significance, StatsCalculator, Thresholds, VolcanoResult,
};
use egui::{Align2, Color32, FontId, RichText, ScrollArea, Sense};
use egui_plot::{HLine, Legend, LineStyle, Plot, PlotPoint, PlotPoints, Points, Text, VLine};

const THRESHOLD_COLOR: Color32 = Color32::from_rgb(60, 60, 60);
const SIGNIFICANT_TEXT: Color32 = Color32::from_rgb(220, 53, 69);

/// Everything one analysis run produces.
#[derive(Clone)]
pub struct ChartData {
    pub source_name: String,
    pub volcano: VolcanoResult,
    pub correlation: Option<CorrelationMatrix>,
}

pub fn color32(rgb: (u8, u8, u8)) -> Color32 {
    Color32::from_rgb(rgb.0, rgb.1, rgb.2)
}

/// Creates scientific visualization charts using egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    pub fn significance_color(class: Significance) -> Color32 {
        color32(significance_rgb(class))
    }

    /// Draw the volcano scatter with dashed threshold lines.
    pub fn draw_volcano_chart(
        ui: &mut egui::Ui,
        result: &VolcanoResult,
        thresholds: &Thresholds,
        display: &DisplaySettings,
        height: f32,
    ) {
        let coords: Vec<(f64, f64)> = result.points.iter().filter_map(|p| p.plot_coords()).collect();
        let p_line = StatsCalculator::neg_log10(thresholds.p_value).filter(|_| thresholds.p_value > 0.0);
        let ((x_min, x_max), (y_min, y_max)) =
            volcano_bounds(&coords, thresholds.fold_change, p_line);

        let labels: Vec<(f64, f64, String)> = result
            .points
            .iter()
            .filter_map(|p| p.plot_coords().map(|(x, y)| (x, y, p.label.clone())))
            .collect();

        Plot::new("volcano_plot")
            .height(height)
            .legend(Legend::default())
            .x_axis_label("log2(Fold Change)")
            .y_axis_label("-log10(P value)")
            .include_x(x_min)
            .include_x(x_max)
            .include_y(y_min)
            .include_y(y_max)
            .allow_scroll(false)
            .label_formatter(move |name, value| {
                // Show the row label of the nearest point on hover
                let nearest = labels.iter().min_by(|a, b| {
                    let da = (a.0 - value.x).powi(2) + (a.1 - value.y).powi(2);
                    let db = (b.0 - value.x).powi(2) + (b.1 - value.y).powi(2);
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                });
                match nearest {
                    Some((x, y, label)) if !name.is_empty() => {
                        format!("{label}\nlog2FC = {x:.3}\n-log10 p = {y:.3}")
                    }
                    _ => format!("x = {:.3}\ny = {:.3}", value.x, value.y),
                }
            })
            .show(ui, |plot_ui| {
                for class in [
                    Significance::NotSignificant,
                    Significance::Down,
                    Significance::Up,
                ] {
                    let points: PlotPoints = result
                        .points
                        .iter()
                        .filter(|p| p.classify(thresholds) == class)
                        .filter_map(|p| p.plot_coords())
                        .map(|(x, y)| [x, y])
                        .collect();

                    plot_ui.points(
                        Points::new(points)
                            .radius(display.point_radius)
                            .color(Self::significance_color(class))
                            .name(significance_name(class)),
                    );
                }

                if let Some(y) = p_line {
                    plot_ui.hline(
                        HLine::new(y)
                            .color(THRESHOLD_COLOR)
                            .style(LineStyle::dashed_dense()),
                    );
                }
                for x in [-thresholds.fold_change, thresholds.fold_change] {
                    plot_ui.vline(
                        VLine::new(x)
                            .color(THRESHOLD_COLOR)
                            .style(LineStyle::dashed_dense()),
                    );
                }

                if display.show_labels {
                    for point in &result.points {
                        if point.classify(thresholds) == Significance::NotSignificant {
                            continue;
                        }
                        if let Some((x, y)) = point.plot_coords() {
                            plot_ui.text(
                                Text::new(
                                    PlotPoint::new(x, y),
                                    RichText::new(&point.label).size(11.0),
                                )
                                .anchor(Align2::LEFT_BOTTOM),
                            );
                        }
                    }
                }
            });
    }

    /// Summary line: class counts and the pair-mode t-test.
    pub fn draw_summary(ui: &mut egui::Ui, result: &VolcanoResult, thresholds: &Thresholds) {
        let counts = result.counts(thresholds);
        ui.horizontal_wrapped(|ui| {
            for (class, n) in [
                (Significance::Up, counts.up),
                (Significance::Down, counts.down),
                (Significance::NotSignificant, counts.not_significant),
            ] {
                let (rect, _) = ui.allocate_exact_size(egui::vec2(12.0, 12.0), Sense::hover());
                ui.painter()
                    .rect_filled(rect, 3.0, Self::significance_color(class));
                ui.label(RichText::new(format!("{}: {}", significance_name(class), n)).size(13.0));
                ui.add_space(10.0);
            }
            if counts.undefined > 0 {
                ui.label(
                    RichText::new(format!("Undefined ratio: {}", counts.undefined))
                        .size(13.0)
                        .color(Color32::GRAY),
                );
            }
        });

        if let Some(test) = &result.pair_test {
            ui.label(
                RichText::new(format!(
                    "{} t-test, {} vs {}: t = {:.4}, df = {:.2}, p = {:.4e}",
                    result.ttest_kind.label(),
                    result.group_a,
                    result.group_b,
                    test.statistic,
                    test.df,
                    test.p_value
                ))
                .size(12.0)
                .color(Color32::GRAY),
            );
        }
    }

    /// Draw the correlation matrix as a colored grid with coefficients.
    pub fn draw_heatmap(ui: &mut egui::Ui, matrix: &CorrelationMatrix) {
        let n = matrix.size();
        if n == 0 {
            ui.label("No numeric columns");
            return;
        }

        let label_space = 110.0;
        let avail = (ui.available_width() - label_space).min(ui.available_height() - label_space);
        let cell = (avail / n as f32).clamp(28.0, 90.0);
        let size = egui::vec2(label_space + cell * n as f32, label_space + cell * n as f32);
        let (response, painter) = ui.allocate_painter(size, Sense::hover());
        let origin = response.rect.min + egui::vec2(label_space, label_space);
        let text_color = ui.visuals().text_color();
        let font = FontId::proportional((cell * 0.28).clamp(10.0, 14.0));

        for (i, label) in matrix.labels.iter().enumerate() {
            // Row labels on the left, column labels above
            painter.text(
                egui::pos2(origin.x - 6.0, origin.y + cell * (i as f32 + 0.5)),
                Align2::RIGHT_CENTER,
                label,
                font.clone(),
                text_color,
            );
            painter.text(
                egui::pos2(origin.x + cell * (i as f32 + 0.5), origin.y - 6.0),
                Align2::CENTER_BOTTOM,
                label,
                font.clone(),
                text_color,
            );
        }

        for i in 0..n {
            for j in 0..n {
                let r = matrix.get(i, j);
                let min = origin + egui::vec2(cell * j as f32, cell * i as f32);
                let rect = egui::Rect::from_min_size(min, egui::vec2(cell, cell));
                painter.rect_filled(rect.shrink(1.0), 2.0, color32(correlation_rgb(r)));

                let value = if r.is_nan() { "-".to_string() } else { format!("{r:.2}") };
                let color = if correlation_text_is_light(r) {
                    Color32::WHITE
                } else {
                    Color32::BLACK
                };
                painter.text(rect.center(), Align2::CENTER_CENTER, value, font.clone(), color);
            }
        }

        if let Some(pos) = response.hover_pos() {
            let rel = pos - origin;
            if rel.x >= 0.0 && rel.y >= 0.0 {
                let (i, j) = ((rel.y / cell) as usize, (rel.x / cell) as usize);
                if i < n && j < n {
                    response.on_hover_text(format!(
                        "{} vs {}: r = {:.4}",
                        matrix.labels[i],
                        matrix.labels[j],
                        matrix.get(i, j)
                    ));
                }
            }
        }
    }

    /// Draw the derived-column table.
    pub fn draw_results_table(ui: &mut egui::Ui, result: &VolcanoResult, thresholds: &Thresholds) {
        let col_widths = [160.0, 110.0, 110.0, 110.0, 70.0];
        let header = ["Label", "log2 FC", "P-value", "-log10 P", "Class"];

        ui.horizontal(|ui| {
            for (title, width) in header.iter().zip(col_widths) {
                ui.add_sized([width, 18.0], egui::Label::new(RichText::new(*title).strong()));
            }
        });
        ui.separator();

        let row_height = 20.0;
        let default_text_color = ui.visuals().text_color();
        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show_rows(ui, row_height, result.points.len(), |ui, row_range| {
                for point in &result.points[row_range] {
                    let class = point.classify(thresholds);
                    let text_color = if class == Significance::NotSignificant {
                        default_text_color
                    } else {
                        SIGNIFICANT_TEXT
                    };
                    let cells = [
                        point.label.clone(),
                        fmt_opt(point.log2_fold_change, 3),
                        point
                            .p_value
                            .map(|p| format!("{p:.4e}"))
                            .unwrap_or_else(|| "-".to_string()),
                        fmt_opt(point.neg_log10_p, 3),
                        class.label().to_string(),
                    ];

                    ui.horizontal(|ui| {
                        for (cell, width) in cells.iter().zip(col_widths) {
                            ui.add_sized(
                                [width, row_height],
                                egui::Label::new(RichText::new(cell).size(12.0).color(text_color)),
                            );
                        }
                    });
                }
            });
    }
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{v:.decimals$}"))
        .unwrap_or_else(|| "-".to_string())
}
