//! Control Panel Widget
//! Left side panel with data source, column assignment, sliders and exports.

use crate::config::{
    AppConfig, DisplaySettings, FOLD_CHANGE_RANGE, POINT_RADIUS_RANGE, P_VALUE_RANGE,
};
use crate::data::{AnalysisMode, ColumnSelection, DataSource};
use crate::stats::{TTestKind, Thresholds};
use egui::{Color32, ComboBox, RichText, ScrollArea};

/// Which group a numeric column belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupAssignment {
    #[default]
    Unused,
    A,
    B,
}

/// User settings for analysis
#[derive(Clone, Default)]
pub struct UserSettings {
    pub source: DataSource,
    pub mode: AnalysisMode,
    pub ttest: TTestKind,
    pub thresholds: Thresholds,
    pub display: DisplaySettings,
}

/// Left side control panel with file selection and processing controls.
pub struct ControlPanel {
    pub settings: UserSettings,
    pub numeric_columns: Vec<String>,
    pub assignments: Vec<GroupAssignment>,
    pub precomputed_available: bool,
    pub row_count: usize,
    pub progress: f32,
    pub status: String,
    pub has_results: bool,
    pub has_correlation: bool,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            settings: UserSettings::default(),
            numeric_columns: Vec::new(),
            assignments: Vec::new(),
            precomputed_available: false,
            row_count: 0,
            progress: 0.0,
            status: "Ready".to_string(),
            has_results: false,
            has_correlation: false,
        }
    }
}

impl ControlPanel {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            settings: UserSettings {
                ttest: config.ttest,
                thresholds: config.thresholds,
                display: config.display.clone(),
                ..UserSettings::default()
            },
            ..Self::default()
        }
    }

    /// Update available columns after a table load
    pub fn update_columns(
        &mut self,
        source: DataSource,
        numeric_columns: Vec<String>,
        row_count: usize,
        mode: AnalysisMode,
        selection: &ColumnSelection,
        precomputed_available: bool,
    ) {
        self.settings.source = source;
        self.settings.mode = mode;
        self.row_count = row_count;
        self.precomputed_available = precomputed_available;
        self.assignments = numeric_columns
            .iter()
            .map(|c| {
                if selection.group_a.contains(c) {
                    GroupAssignment::A
                } else if selection.group_b.contains(c) {
                    GroupAssignment::B
                } else {
                    GroupAssignment::Unused
                }
            })
            .collect();
        self.numeric_columns = numeric_columns;
        self.has_results = false;
        self.has_correlation = false;
    }

    /// Current group assignment as a column selection
    pub fn selection(&self) -> ColumnSelection {
        let pick = |which: GroupAssignment| -> Vec<String> {
            self.numeric_columns
                .iter()
                .zip(&self.assignments)
                .filter(|(_, &a)| a == which)
                .map(|(c, _)| c.clone())
                .collect()
        };
        ColumnSelection {
            group_a: pick(GroupAssignment::A),
            group_b: pick(GroupAssignment::B),
        }
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        // Title
        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🌋 Volcano Explorer")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("Two-group differential analysis")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Data Source Section =====
        ui.label(RichText::new("📁 Data Source").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new(self.settings.source.display_name())
                            .size(12.0)
                            .color(ui.visuals().text_color()),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("📂 Upload").clicked() {
                            action = ControlPanelAction::BrowseFile;
                        }
                        if self.settings.source != DataSource::Example
                            && ui.button("Example").clicked()
                        {
                            action = ControlPanelAction::UseExample;
                        }
                    });
                });
                ui.label(
                    RichText::new(format!(
                        "{} rows, {} numeric columns",
                        self.row_count,
                        self.numeric_columns.len()
                    ))
                    .size(11.0)
                    .color(Color32::GRAY),
                );
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Analysis Mode Section =====
        ui.label(RichText::new("⚙️ Analysis").size(14.0).strong());
        ui.add_space(5.0);

        let previous_mode = self.settings.mode;
        ui.horizontal(|ui| {
            ui.radio_value(&mut self.settings.mode, AnalysisMode::Pair, AnalysisMode::Pair.label());
            ui.radio_value(
                &mut self.settings.mode,
                AnalysisMode::Replicates,
                AnalysisMode::Replicates.label(),
            );
            ui.add_enabled_ui(self.precomputed_available, |ui| {
                ui.radio_value(
                    &mut self.settings.mode,
                    AnalysisMode::Precomputed,
                    AnalysisMode::Precomputed.label(),
                );
            });
        });
        if self.settings.mode != previous_mode {
            action = ControlPanelAction::ModeChanged;
        }

        if self.settings.mode != AnalysisMode::Precomputed {
            ui.add_space(5.0);
            let previous_ttest = self.settings.ttest;
            ComboBox::from_label("t-test")
                .selected_text(self.settings.ttest.label())
                .show_ui(ui, |ui| {
                    for kind in [TTestKind::Student, TTestKind::Welch] {
                        ui.selectable_value(&mut self.settings.ttest, kind, kind.label());
                    }
                });
            if self.settings.ttest != previous_ttest && action == ControlPanelAction::None {
                action = ControlPanelAction::Recalculate;
            }

            ui.add_space(8.0);
            if self.show_column_assignment(ui) && action == ControlPanelAction::None {
                action = ControlPanelAction::Recalculate;
            }
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Thresholds Section =====
        ui.label(RichText::new("🎚 Thresholds").size(14.0).strong());
        ui.add_space(5.0);

        ui.add(
            egui::Slider::new(
                &mut self.settings.thresholds.fold_change,
                FOLD_CHANGE_RANGE.0..=FOLD_CHANGE_RANGE.1,
            )
            .step_by(0.1)
            .text("Fold change"),
        );
        ui.add(
            egui::Slider::new(
                &mut self.settings.thresholds.p_value,
                P_VALUE_RANGE.0..=P_VALUE_RANGE.1,
            )
            .step_by(0.01)
            .text("P-value"),
        );

        ui.add_space(10.0);
        ui.label(RichText::new("🎨 Display").size(14.0).strong());
        ui.add_space(5.0);
        ui.add(
            egui::Slider::new(
                &mut self.settings.display.point_radius,
                POINT_RADIUS_RANGE.0..=POINT_RADIUS_RANGE.1,
            )
            .step_by(0.5)
            .text("Point size"),
        );
        ui.checkbox(&mut self.settings.display.show_labels, "Label significant points");

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Export Buttons =====
        ui.label(RichText::new("💾 Export").size(14.0).strong());
        ui.add_space(5.0);
        ui.add_enabled_ui(self.has_results, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Volcano image").clicked() {
                    action = ControlPanelAction::ExportVolcanoImage;
                }
                if ui.button("Results CSV").clicked() {
                    action = ControlPanelAction::ExportResultsCsv;
                }
            });
        });
        ui.add_enabled_ui(self.has_correlation, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Heatmap image").clicked() {
                    action = ControlPanelAction::ExportHeatmapImage;
                }
                if ui.button("Correlation CSV").clicked() {
                    action = ControlPanelAction::ExportCorrelationCsv;
                }
            });
            if ui.small_button("Copy heatmap SVG").clicked() {
                action = ControlPanelAction::CopyHeatmapSvg;
            }
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Progress Section =====
        ui.label(RichText::new("📊 Progress").size(14.0).strong());
        ui.add_space(5.0);

        ui.add(
            egui::ProgressBar::new(self.progress / 100.0)
                .show_percentage()
                .animate(self.progress > 0.0 && self.progress < 100.0),
        );

        ui.add_space(5.0);

        let status_color = if self.status.contains("Error") {
            Color32::from_rgb(220, 53, 69)
        } else if self.status.contains("Complete") {
            Color32::from_rgb(40, 167, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    /// Per-column A/B/unused selectors. Returns true when anything changed.
    fn show_column_assignment(&mut self, ui: &mut egui::Ui) -> bool {
        let mut changed = false;
        ui.label("Column groups:");
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(5.0)
            .show(ui, |ui| {
                ScrollArea::vertical().max_height(160.0).show(ui, |ui| {
                    egui::Grid::new("column_groups")
                        .num_columns(2)
                        .spacing([8.0, 4.0])
                        .show(ui, |ui| {
                            for (col, assignment) in
                                self.numeric_columns.iter().zip(self.assignments.iter_mut())
                            {
                                ui.label(col);
                                ui.horizontal(|ui| {
                                    for (value, text) in [
                                        (GroupAssignment::A, "A"),
                                        (GroupAssignment::B, "B"),
                                        (GroupAssignment::Unused, "-"),
                                    ] {
                                        if ui.selectable_value(assignment, value, text).changed() {
                                            changed = true;
                                        }
                                    }
                                });
                                ui.end_row();
                            }
                        });
                });
            });

        let selection = self.selection();
        ui.label(
            RichText::new(format!(
                "A: {}  |  B: {}",
                selection.group_a.len(),
                selection.group_b.len()
            ))
            .size(11.0)
            .color(Color32::GRAY),
        );
        changed
    }

    /// Set progress and status
    pub fn set_progress(&mut self, progress: f32, status: &str) {
        self.progress = progress;
        self.status = status.to_string();
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    BrowseFile,
    UseExample,
    ModeChanged,
    Recalculate,
    ExportVolcanoImage,
    ExportHeatmapImage,
    ExportResultsCsv,
    ExportCorrelationCsv,
    CopyHeatmapSvg,
}
