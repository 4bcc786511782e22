//! Stats module - t-tests, fold change and correlation

mod calculator;
mod correlation;

pub use calculator::{
    Significance, SignificanceCounts, StatsCalculator, TTestKind, TTestResult, Thresholds,
    VolcanoPoint, VolcanoResult,
};
pub use correlation::{csv_field, CorrelationMatrix};
