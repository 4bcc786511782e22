//! Chart Viewer Widget
//! Central panel with one page per view: volcano plot, correlation heatmap, table.

use crate::charts::{ChartData, ChartPlotter};
use crate::config::DisplaySettings;
use crate::stats::Thresholds;
use egui::{RichText, ScrollArea};

const PAGE_SPACING: f32 = 10.0;
const MIN_PLOT_HEIGHT: f32 = 320.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Volcano,
    Correlation,
    Table,
}

impl Page {
    const ALL: [Page; 3] = [Page::Volcano, Page::Correlation, Page::Table];

    fn title(&self) -> &'static str {
        match self {
            Page::Volcano => "🌋 Volcano Plot",
            Page::Correlation => "🔥 Correlation",
            Page::Table => "📋 Table",
        }
    }
}

/// Multi-page display of the latest analysis.
#[derive(Default)]
pub struct ChartViewer {
    pub chart_data: Option<ChartData>,
    pub page: Page,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all charts
    pub fn clear(&mut self) {
        self.chart_data = None;
    }

    pub fn set_chart_data(&mut self, chart_data: ChartData) {
        if chart_data.correlation.is_none() && self.page == Page::Correlation {
            self.page = Page::Volcano;
        }
        self.chart_data = Some(chart_data);
    }

    /// Draw the page strip and the active page
    pub fn show(&mut self, ui: &mut egui::Ui, thresholds: &Thresholds, display: &DisplaySettings) {
        ui.horizontal(|ui| {
            for page in Page::ALL {
                ui.selectable_value(&mut self.page, page, RichText::new(page.title()).size(15.0));
            }
        });
        ui.separator();

        let Some(data) = &self.chart_data else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No Data").size(20.0));
            });
            return;
        };

        match self.page {
            Page::Volcano => {
                ui.label(
                    RichText::new(format!("Volcano Plot: {}", data.source_name))
                        .size(18.0)
                        .strong(),
                );
                ui.add_space(PAGE_SPACING / 2.0);
                ChartPlotter::draw_summary(ui, &data.volcano, thresholds);
                ui.add_space(PAGE_SPACING);

                let height = (ui.available_height() - PAGE_SPACING).max(MIN_PLOT_HEIGHT);
                ChartPlotter::draw_volcano_chart(ui, &data.volcano, thresholds, display, height);
            }
            Page::Correlation => match &data.correlation {
                Some(matrix) => {
                    ui.label(RichText::new("Correlation Heatmap").size(18.0).strong());
                    ui.label(
                        RichText::new("Pearson coefficients over the table's numeric columns")
                            .size(12.0)
                            .color(egui::Color32::GRAY),
                    );
                    ui.add_space(PAGE_SPACING);
                    ScrollArea::both()
                        .auto_shrink([false, false])
                        .show(ui, |ui| ChartPlotter::draw_heatmap(ui, matrix));
                }
                None => {
                    ui.centered_and_justified(|ui| {
                        ui.label(RichText::new("No correlation matrix").size(16.0));
                    });
                }
            },
            Page::Table => {
                ChartPlotter::draw_results_table(ui, &data.volcano, thresholds);
            }
        }
    }
}
