//! Volcano Explorer Main Application
//! Main window with control panel and chart viewer.

use crate::charts::{ChartData, StaticChartRenderer};
use crate::config::{AppConfig, ExportSettings};
use crate::data::{AnalysisMode, ColumnSelection, DataLoader, DataProcessor, DataSource};
use crate::export::CsvExporter;
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction};
use crate::stats::{CorrelationMatrix, StatsCalculator, TTestKind};
use egui::SidePanel;
use polars::prelude::DataFrame;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread;

/// Calculation result from background thread
enum CalcResult {
    Progress(f32, String),
    Complete(Box<ChartData>),
    Error(String),
}

/// Table loading result from background thread
enum LoadResult {
    Progress(String),
    Complete { df: DataFrame, path: PathBuf },
    Error(String),
}

/// Everything a calculation thread needs
struct CalcJob {
    df: DataFrame,
    source_name: String,
    mode: AnalysisMode,
    selection: ColumnSelection,
    ttest: TTestKind,
}

/// Main application window.
pub struct VolcanoApp {
    loader: DataLoader,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,
    export: ExportSettings,

    // Async calculation
    calc_rx: Option<Receiver<CalcResult>>,
    is_calculating: bool,

    // Async table loading
    load_rx: Option<Receiver<LoadResult>>,
    is_loading: bool,
}

impl VolcanoApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let mut app = Self::with_config(config);
        app.handle_use_example();
        app
    }

    fn with_config(config: AppConfig) -> Self {
        Self {
            loader: DataLoader::new(),
            control_panel: ControlPanel::new(&config),
            chart_viewer: ChartViewer::new(),
            export: config.export,
            calc_rx: None,
            is_calculating: false,
            load_rx: None,
            is_loading: false,
        }
    }

    fn handle_action(&mut self, action: ControlPanelAction, ctx: &egui::Context) {
        match action {
            ControlPanelAction::BrowseFile => self.handle_browse_file(),
            ControlPanelAction::UseExample => self.handle_use_example(),
            ControlPanelAction::ModeChanged => self.handle_mode_changed(),
            // Replacing calc_rx supersedes a run still in flight
            ControlPanelAction::Recalculate => self.start_calculation(),
            ControlPanelAction::CopyHeatmapSvg => self.handle_copy_heatmap_svg(ctx),
            ControlPanelAction::None => {}
            export => self.handle_export(export),
        }
    }

    /// Switch to the built-in table and analyse it
    fn handle_use_example(&mut self) {
        match DataLoader::example_dataframe() {
            Ok(df) => self.accept_table(df, DataSource::Example),
            Err(e) => {
                log::error!("Example table unavailable: {e}");
                self.control_panel
                    .set_progress(0.0, &format!("Error: {}", e));
            }
        }
    }

    /// Handle file upload - loads on a background thread
    fn handle_browse_file(&mut self) {
        if self.is_loading {
            return; // Already loading
        }

        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Delimited text", &["csv", "tsv", "txt"])
            .pick_file()
        {
            self.control_panel.set_progress(0.0, "Loading table...");
            self.is_loading = true;

            let (tx, rx) = channel();
            self.load_rx = Some(rx);

            thread::spawn(move || {
                let _ = tx.send(LoadResult::Progress("Reading file...".to_string()));

                match DataLoader::read_table(&path) {
                    Ok(df) => {
                        let _ = tx.send(LoadResult::Complete { df, path });
                    }
                    Err(e) => {
                        let _ = tx.send(LoadResult::Error(e.to_string()));
                    }
                }
            });
        }
    }

    fn check_load_results(&mut self) {
        for result in drain(&mut self.load_rx) {
            match result {
                LoadResult::Progress(status) => self.control_panel.set_progress(0.0, &status),
                LoadResult::Complete { df, path } => {
                    self.is_loading = false;
                    self.load_rx = None;
                    self.accept_table(df, DataSource::Uploaded(path));
                }
                LoadResult::Error(error) => {
                    log::error!("Load failed: {error}");
                    self.control_panel.set_progress(0.0, &format!("Error: {error}"));
                    self.is_loading = false;
                    self.load_rx = None;
                }
            }
        }
        if self.load_rx.is_none() {
            self.is_loading = false;
        }
    }

    /// Validate a freshly loaded table, pick defaults and start the analysis.
    fn accept_table(&mut self, df: DataFrame, source: DataSource) {
        let numeric = match DataProcessor::validate(&df) {
            Ok(numeric) => numeric,
            Err(e) => {
                log::warn!("Rejected {}: {e}", source.display_name());
                self.chart_viewer.clear();
                self.control_panel.has_results = false;
                self.control_panel.has_correlation = false;
                self.control_panel.set_progress(0.0, &format!("Error: {}", e));
                return;
            }
        };

        let mode = DataProcessor::detect_mode(&df);
        let selection = DataProcessor::default_selection(&df, mode);
        let precomputed = DataProcessor::precomputed_columns(&df).is_some();
        log::info!(
            "{}: {} rows, {} of {} columns numeric, mode {:?}",
            source.display_name(),
            df.height(),
            numeric.len(),
            df.width(),
            mode
        );

        self.loader.set_dataframe(df, source.clone());
        self.control_panel.update_columns(
            source,
            numeric,
            self.loader.get_row_count(),
            mode,
            &selection,
            precomputed,
        );
        self.chart_viewer.clear();
        self.start_calculation();
    }

    /// Mode radio changed: reset the column groups to that mode's defaults
    fn handle_mode_changed(&mut self) {
        let Some(df) = self.loader.get_dataframe() else {
            return;
        };
        let mode = self.control_panel.settings.mode;
        let selection = DataProcessor::default_selection(df, mode);
        let precomputed = DataProcessor::precomputed_columns(df).is_some();

        self.control_panel.update_columns(
            self.loader.source().clone(),
            self.loader.get_numeric_columns(),
            self.loader.get_row_count(),
            mode,
            &selection,
            precomputed,
        );
        self.start_calculation();
    }

    /// Start calculation in background thread
    fn start_calculation(&mut self) {
        // Get DataFrame clone
        let Some(df) = self.loader.get_dataframe().cloned() else {
            self.control_panel.set_progress(0.0, "No data loaded");
            return;
        };

        let settings = &self.control_panel.settings;
        let job = CalcJob {
            df,
            source_name: self.loader.source().display_name(),
            mode: settings.mode,
            selection: self.control_panel.selection(),
            ttest: settings.ttest,
        };

        let (tx, rx) = channel();
        self.calc_rx = Some(rx);
        self.is_calculating = true;
        self.control_panel.set_progress(5.0, "Processing data...");

        // Run calculation in background thread
        thread::spawn(move || {
            Self::run_calculation(tx, job);
        });
    }

    /// Run calculation (called from background thread)
    fn run_calculation(tx: Sender<CalcResult>, job: CalcJob) {
        let _ = tx.send(CalcResult::Progress(10.0, "Processing data...".to_string()));

        let input = match DataProcessor::prepare(&job.df, job.mode, &job.selection) {
            Ok(input) => input,
            Err(e) => {
                let _ = tx.send(CalcResult::Error(e.to_string()));
                return;
            }
        };

        let _ = tx.send(CalcResult::Progress(
            30.0,
            format!("Testing {} rows...", input.row_count()),
        ));
        let volcano = StatsCalculator::compute_volcano(&input, job.ttest);

        let _ = tx.send(CalcResult::Progress(
            70.0,
            "Computing correlations...".to_string(),
        ));
        let correlation = match DataProcessor::numeric_table(&job.df) {
            Ok(columns) if columns.len() >= 2 => Some(CorrelationMatrix::compute(&columns)),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Correlation skipped: {e}");
                None
            }
        };

        let _ = tx.send(CalcResult::Complete(Box::new(ChartData {
            source_name: job.source_name,
            volcano,
            correlation,
        })));
    }

    fn check_calculation_results(&mut self) {
        for result in drain(&mut self.calc_rx) {
            match result {
                CalcResult::Progress(progress, status) => {
                    self.control_panel.set_progress(progress, &status);
                }
                CalcResult::Complete(chart_data) => {
                    let rows = chart_data.volcano.points.len();
                    log::info!("Analysis complete: {rows} rows, mode {:?}", chart_data.volcano.mode);
                    self.control_panel.has_results = true;
                    self.control_panel.has_correlation = chart_data.correlation.is_some();
                    self.chart_viewer.set_chart_data(*chart_data);
                    self.control_panel
                        .set_progress(100.0, &format!("Complete! {rows} rows analysed"));
                    self.is_calculating = false;
                    self.calc_rx = None;
                }
                CalcResult::Error(error) => {
                    log::warn!("Analysis failed: {error}");
                    self.chart_viewer.clear();
                    self.control_panel.has_results = false;
                    self.control_panel.has_correlation = false;
                    self.control_panel.set_progress(0.0, &format!("Error: {error}"));
                    self.is_calculating = false;
                    self.calc_rx = None;
                }
            }
        }
        if self.calc_rx.is_none() {
            self.is_calculating = false;
        }
    }

    fn save_dialog(filter: &str, extensions: &[&str], file_name: &str) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .add_filter(filter, extensions)
            .set_file_name(file_name)
            .save_file()
    }

    fn handle_export(&mut self, action: ControlPanelAction) {
        let Some(data) = &self.chart_viewer.chart_data else {
            self.control_panel.set_progress(0.0, "Nothing to export");
            return;
        };
        let settings = &self.control_panel.settings;

        let outcome: Result<Option<PathBuf>, String> = match action {
            ControlPanelAction::ExportVolcanoImage => {
                match Self::save_dialog("Image", &["png", "svg"], "volcano_plot.png") {
                    Some(path) => StaticChartRenderer::render_volcano(
                        &path,
                        &data.volcano,
                        &settings.thresholds,
                        &settings.display,
                        &self.export,
                    )
                    .map(|_| Some(path))
                    .map_err(|e| e.to_string()),
                    None => Ok(None),
                }
            }
            ControlPanelAction::ExportResultsCsv => {
                match Self::save_dialog("CSV", &["csv"], "volcano_results.csv") {
                    Some(path) => {
                        CsvExporter::save_results(&path, &data.volcano, &settings.thresholds)
                            .map(|_| Some(path))
                            .map_err(|e| e.to_string())
                    }
                    None => Ok(None),
                }
            }
            ControlPanelAction::ExportHeatmapImage => match &data.correlation {
                None => Err("No correlation matrix to export".to_string()),
                Some(matrix) => {
                    match Self::save_dialog("Image", &["png", "svg"], "correlation_heatmap.png") {
                        Some(path) => {
                            StaticChartRenderer::render_heatmap(&path, matrix, &self.export)
                                .map(|_| Some(path))
                                .map_err(|e| e.to_string())
                        }
                        None => Ok(None),
                    }
                }
            },
            ControlPanelAction::ExportCorrelationCsv => match &data.correlation {
                None => Err("No correlation matrix to export".to_string()),
                Some(matrix) => {
                    match Self::save_dialog("CSV", &["csv"], "correlation_matrix.csv") {
                        Some(path) => CsvExporter::save_correlation(&path, matrix)
                            .map(|_| Some(path))
                            .map_err(|e| e.to_string()),
                        None => Ok(None),
                    }
                }
            },
            _ => Ok(None),
        };

        match outcome {
            Ok(Some(path)) => self.control_panel.set_progress(
                100.0,
                &format!("Complete! Exported {}", path.display()),
            ),
            Ok(None) => {} // User cancelled
            Err(e) => {
                log::error!("Export failed: {e}");
                self.control_panel
                    .set_progress(0.0, &format!("Error: {}", e));
            }
        }
    }

    fn handle_copy_heatmap_svg(&mut self, ctx: &egui::Context) {
        let Some(matrix) = self
            .chart_viewer
            .chart_data
            .as_ref()
            .and_then(|d| d.correlation.as_ref())
        else {
            return;
        };
        match StaticChartRenderer::heatmap_svg_string(matrix, &self.export) {
            Ok(svg) => {
                ctx.copy_text(svg);
                self.control_panel
                    .set_progress(100.0, "Complete! Heatmap SVG copied");
            }
            Err(e) => self
                .control_panel
                .set_progress(0.0, &format!("Error: {}", e)),
        }
    }
}

/// Pending messages from a worker. A disconnected worker clears the slot.
fn drain<T>(slot: &mut Option<Receiver<T>>) -> Vec<T> {
    let Some(rx) = slot else {
        return Vec::new();
    };
    let mut messages = Vec::new();
    let disconnected = loop {
        match rx.try_recv() {
            Ok(message) => messages.push(message),
            Err(TryRecvError::Empty) => break false,
            Err(TryRecvError::Disconnected) => break true,
        }
    };
    if disconnected {
        *slot = None;
    }
    messages
}

impl eframe::App for VolcanoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for background results
        self.check_load_results();
        self.check_calculation_results();

        // Request repaint while loading or calculating
        if self.is_loading || self.is_calculating {
            ctx.request_repaint();
        }

        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(360.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);
                    self.handle_action(action, ctx);
                });
            });

        // Central panel - Chart Viewer
        let settings = self.control_panel.settings.clone();
        egui::CentralPanel::default().show(ctx, |ui| {
            self.chart_viewer
                .show(ui, &settings.thresholds, &settings.display);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use std::time::{Duration, Instant};

    fn wait_for_results(app: &mut VolcanoApp) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while app.is_calculating && Instant::now() < deadline {
            app.check_calculation_results();
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!app.is_calculating, "calculation did not finish");
    }

    #[test]
    fn recalculate_during_a_run_uses_latest_settings() {
        let mut app = VolcanoApp::with_config(AppConfig::default());
        let df = df!(
            "control" => [10.1, 9.8, 10.4, 10.0, 10.2],
            "treated" => [12.3, 11.9, 12.8, 12.1, 12.5]
        )
        .unwrap();

        // Starts a Student run
        app.accept_table(df, DataSource::Example);
        assert!(app.is_calculating);

        app.control_panel.settings.ttest = TTestKind::Welch;
        app.handle_action(ControlPanelAction::Recalculate, &egui::Context::default());
        wait_for_results(&mut app);

        let data = app.chart_viewer.chart_data.as_ref().unwrap();
        assert_eq!(data.volcano.ttest_kind, TTestKind::Welch);
        assert_eq!(data.volcano.points.len(), 5);
    }

    #[test]
    fn single_column_table_is_rejected_without_running() {
        let mut app = VolcanoApp::with_config(AppConfig::default());
        let df = df!("gene" => ["a", "b"], "value" => [1.0, 2.0]).unwrap();

        app.accept_table(df, DataSource::Example);

        assert!(!app.is_calculating);
        assert!(app.chart_viewer.chart_data.is_none());
        assert!(app
            .control_panel
            .status
            .contains("at least two numeric columns (found 1)"));
    }
}
