//! Data Processor Module
//! Turns a loaded table into group A / group B columns ready for analysis.

use super::loader::{label_column, numeric_columns};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Column names recognised as precomputed fold changes
const FOLD_CHANGE_NAMES: [&str; 4] = ["log2foldchange", "log2fc", "log2_fold_change", "logfc"];
/// Column names recognised as precomputed p-values
const P_VALUE_NAMES: [&str; 3] = ["pvalue", "p_value", "pval"];

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Uploaded table must contain at least two numeric columns (found {0})")]
    TooFewColumns(usize),
    #[error("Pair mode needs exactly one column per group (got {a} and {b})")]
    PairNeedsOnePerGroup { a: usize, b: usize },
    #[error("Replicate mode needs at least two columns per group (got {a} and {b})")]
    TooFewReplicates { a: usize, b: usize },
    #[error("Column '{0}' is assigned to both groups")]
    OverlappingGroups(String),
    #[error("Column '{0}' is not a numeric column of the table")]
    UnknownColumn(String),
    #[error("Table has no log2 fold change / p-value columns")]
    MissingPrecomputedColumns,
}

/// How fold change and p-value are obtained for each row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnalysisMode {
    /// One column per group; one t-test across the two columns
    #[default]
    Pair,
    /// Several replicate columns per group; one t-test per row
    Replicates,
    /// Table already carries log2 fold change and p-value columns
    Precomputed,
}

impl AnalysisMode {
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisMode::Pair => "Two columns",
            AnalysisMode::Replicates => "Replicates",
            AnalysisMode::Precomputed => "Precomputed",
        }
    }
}

/// Which columns make up each group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSelection {
    pub group_a: Vec<String>,
    pub group_b: Vec<String>,
}

/// A numeric column extracted from the table. Nulls become NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedColumn {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputKind {
    Groups {
        group_a: Vec<NamedColumn>,
        group_b: Vec<NamedColumn>,
    },
    Precomputed {
        log2_fold_change: Vec<f64>,
        p_value: Vec<f64>,
    },
}

/// Analysis-ready rows: labels plus per-group values.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisInput {
    pub labels: Vec<String>,
    pub kind: InputKind,
}

impl AnalysisInput {
    pub fn row_count(&self) -> usize {
        self.labels.len()
    }

    pub fn mode(&self) -> AnalysisMode {
        match &self.kind {
            InputKind::Precomputed { .. } => AnalysisMode::Precomputed,
            InputKind::Groups { group_a, group_b } if group_a.len() == 1 && group_b.len() == 1 => {
                AnalysisMode::Pair
            }
            InputKind::Groups { .. } => AnalysisMode::Replicates,
        }
    }
}

/// Handles validation and column extraction.
pub struct DataProcessor;

impl DataProcessor {
    /// The one user-facing validation: at least two numeric columns.
    pub fn validate(df: &DataFrame) -> Result<Vec<String>, ProcessorError> {
        let numeric = numeric_columns(df);
        if numeric.len() < 2 {
            return Err(ProcessorError::TooFewColumns(numeric.len()));
        }
        Ok(numeric)
    }

    /// Pick the mode that best fits the table's columns.
    pub fn detect_mode(df: &DataFrame) -> AnalysisMode {
        if Self::precomputed_columns(df).is_some() {
            AnalysisMode::Precomputed
        } else if numeric_columns(df).len() >= 4 {
            AnalysisMode::Replicates
        } else {
            AnalysisMode::Pair
        }
    }

    /// Default group assignment for a mode.
    ///
    /// Pair takes the first two numeric columns; Replicates splits the
    /// numeric columns in half, first half being group A.
    pub fn default_selection(df: &DataFrame, mode: AnalysisMode) -> ColumnSelection {
        let numeric = numeric_columns(df);
        match mode {
            AnalysisMode::Pair => ColumnSelection {
                group_a: numeric.first().cloned().into_iter().collect(),
                group_b: numeric.get(1).cloned().into_iter().collect(),
            },
            AnalysisMode::Replicates => {
                let half = numeric.len() / 2;
                ColumnSelection {
                    group_a: numeric[..half].to_vec(),
                    group_b: numeric[half..half * 2].to_vec(),
                }
            }
            AnalysisMode::Precomputed => match Self::precomputed_columns(df) {
                Some((fc, p)) => ColumnSelection {
                    group_a: vec![fc],
                    group_b: vec![p],
                },
                None => ColumnSelection::default(),
            },
        }
    }

    /// Find the (fold change, p-value) column pair, matched case-insensitively.
    pub fn precomputed_columns(df: &DataFrame) -> Option<(String, String)> {
        let numeric = numeric_columns(df);
        let find = |names: &[&str]| {
            numeric
                .iter()
                .find(|c| names.contains(&c.to_ascii_lowercase().as_str()))
                .cloned()
        };
        Some((find(&FOLD_CHANGE_NAMES[..])?, find(&P_VALUE_NAMES[..])?))
    }

    /// Build the analysis input for a mode and column assignment.
    pub fn prepare(
        df: &DataFrame,
        mode: AnalysisMode,
        selection: &ColumnSelection,
    ) -> Result<AnalysisInput, ProcessorError> {
        let numeric = Self::validate(df)?;
        let labels = Self::row_labels(df)?;

        let kind = match mode {
            AnalysisMode::Precomputed => {
                let (fc, p) =
                    Self::precomputed_columns(df).ok_or(ProcessorError::MissingPrecomputedColumns)?;
                InputKind::Precomputed {
                    log2_fold_change: Self::column_values(df, &fc)?,
                    p_value: Self::column_values(df, &p)?,
                }
            }
            AnalysisMode::Pair | AnalysisMode::Replicates => {
                let (a, b) = (selection.group_a.len(), selection.group_b.len());
                if mode == AnalysisMode::Pair && (a != 1 || b != 1) {
                    return Err(ProcessorError::PairNeedsOnePerGroup { a, b });
                }
                if mode == AnalysisMode::Replicates && (a < 2 || b < 2) {
                    return Err(ProcessorError::TooFewReplicates { a, b });
                }
                if let Some(dup) = selection
                    .group_a
                    .iter()
                    .find(|c| selection.group_b.contains(c))
                {
                    return Err(ProcessorError::OverlappingGroups(dup.clone()));
                }

                InputKind::Groups {
                    group_a: Self::named_columns(df, &numeric, &selection.group_a)?,
                    group_b: Self::named_columns(df, &numeric, &selection.group_b)?,
                }
            }
        };

        Ok(AnalysisInput { labels, kind })
    }

    /// Every numeric column of the table, for the correlation page.
    pub fn numeric_table(df: &DataFrame) -> Result<Vec<NamedColumn>, ProcessorError> {
        let numeric = numeric_columns(df);
        Self::named_columns(df, &numeric, &numeric)
    }

    /// Labels from the first string column, or `row N` (1-based).
    pub fn row_labels(df: &DataFrame) -> Result<Vec<String>, ProcessorError> {
        let Some(name) = label_column(df) else {
            return Ok((1..=df.height()).map(|i| format!("row {i}")).collect());
        };

        let labels = df
            .column(&name)?
            .str()?
            .into_iter()
            .enumerate()
            .map(|(i, v)| match v {
                Some(s) if !s.trim().is_empty() => s.to_string(),
                _ => format!("row {}", i + 1),
            })
            .collect();
        Ok(labels)
    }

    fn named_columns(
        df: &DataFrame,
        numeric: &[String],
        names: &[String],
    ) -> Result<Vec<NamedColumn>, ProcessorError> {
        names
            .iter()
            .map(|name| {
                if !numeric.contains(name) {
                    return Err(ProcessorError::UnknownColumn(name.clone()));
                }
                Ok(NamedColumn {
                    name: name.clone(),
                    values: Self::column_values(df, name)?,
                })
            })
            .collect()
    }

    fn column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>, ProcessorError> {
        let series = df.column(name)?.cast(&DataType::Float64)?;
        let values = series
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        Ok(values)
    }
}
