//! CSV Export Module
//! Writes the derived-column table and the correlation matrix to disk.

use crate::stats::{csv_field, CorrelationMatrix, Thresholds, VolcanoResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// CSV writers for analysis results
pub struct CsvExporter;

impl CsvExporter {
    /// One line per row: label, log2 fold change, p-value, -log10 p, class.
    pub fn write_results<W: Write>(
        mut out: W,
        result: &VolcanoResult,
        thresholds: &Thresholds,
    ) -> std::io::Result<()> {
        writeln!(out, "label,log2_fold_change,p_value,neg_log10_p,significance")?;
        for point in &result.points {
            writeln!(
                out,
                "{},{},{},{},{}",
                csv_field(&point.label),
                opt(point.log2_fold_change),
                opt(point.p_value),
                opt(point.neg_log10_p),
                point.classify(thresholds).label()
            )?;
        }
        out.flush()
    }

    pub fn save_results(
        path: &Path,
        result: &VolcanoResult,
        thresholds: &Thresholds,
    ) -> Result<(), ExportError> {
        let file = File::create(path).map_err(|e| io_err(path, e))?;
        Self::write_results(BufWriter::new(file), result, thresholds).map_err(|e| io_err(path, e))?;
        log::info!(
            "Exported {} rows to {}",
            result.points.len(),
            path.display()
        );
        Ok(())
    }

    pub fn save_correlation(path: &Path, matrix: &CorrelationMatrix) -> Result<(), ExportError> {
        let file = File::create(path).map_err(|e| io_err(path, e))?;
        let mut out = BufWriter::new(file);
        matrix.write_csv(&mut out).map_err(|e| io_err(path, e))?;
        out.flush().map_err(|e| io_err(path, e))?;
        log::info!(
            "Exported {0}x{0} correlation matrix to {1}",
            matrix.size(),
            path.display()
        );
        Ok(())
    }
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn io_err(path: &Path, source: std::io::Error) -> ExportError {
    ExportError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AnalysisMode;
    use crate::data::NamedColumn;
    use crate::stats::{TTestKind, VolcanoPoint};

    fn result() -> VolcanoResult {
        VolcanoResult {
            mode: AnalysisMode::Pair,
            group_a: "A".into(),
            group_b: "B".into(),
            ttest_kind: TTestKind::Student,
            pair_test: None,
            points: vec![
                VolcanoPoint {
                    label: "row 1".into(),
                    log2_fold_change: Some(2.0),
                    p_value: Some(0.01),
                    neg_log10_p: Some(2.0),
                },
                VolcanoPoint {
                    label: "a,b".into(),
                    log2_fold_change: None,
                    p_value: Some(0.01),
                    neg_log10_p: Some(2.0),
                },
            ],
        }
    }

    #[test]
    fn results_csv_layout() {
        let mut buf = Vec::new();
        CsvExporter::write_results(&mut buf, &result(), &Thresholds::default()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "label,log2_fold_change,p_value,neg_log10_p,significance");
        assert_eq!(lines[1], "row 1,2,0.01,2,up");
        assert_eq!(lines[2], "\"a,b\",,0.01,2,ns");
    }

    #[test]
    fn saves_files_to_disk() {
        let dir = tempfile::tempdir().unwrap();

        let results_path = dir.path().join("results.csv");
        CsvExporter::save_results(&results_path, &result(), &Thresholds::default()).unwrap();
        assert_eq!(
            std::fs::read_to_string(&results_path).unwrap().lines().count(),
            3
        );

        let matrix = CorrelationMatrix::compute(&[
            NamedColumn {
                name: "A".into(),
                values: vec![1.0, 2.0, 3.0],
            },
            NamedColumn {
                name: "B".into(),
                values: vec![2.0, 4.0, 7.0],
            },
        ]);
        let corr_path = dir.path().join("correlation.csv");
        CsvExporter::save_correlation(&corr_path, &matrix).unwrap();
        let text = std::fs::read_to_string(&corr_path).unwrap();
        assert!(text.starts_with(",A,B\nA,1,"));
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let err = CsvExporter::save_results(
            Path::new("/nonexistent-dir/results.csv"),
            &result(),
            &Thresholds::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("results.csv"));
    }
}
