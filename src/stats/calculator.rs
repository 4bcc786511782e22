//! Statistics Calculator Module
//! Handles fold change, two-sample t-tests and significance classification.

use crate::data::{AnalysisInput, AnalysisMode, InputKind, NamedColumn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Which two-sample t-test to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TTestKind {
    /// Pooled variance (equal variances assumed)
    #[default]
    Student,
    /// Unequal variances, Welch-Satterthwaite degrees of freedom
    Welch,
}

impl TTestKind {
    pub fn label(&self) -> &'static str {
        match self {
            TTestKind::Student => "Student (equal var)",
            TTestKind::Welch => "Welch (unequal var)",
        }
    }
}

/// Outcome of a two-sample t-test. NaN fields mean the test was undefined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTestResult {
    pub statistic: f64,
    pub df: f64,
    pub p_value: f64,
}

impl TTestResult {
    fn undefined(df: f64) -> Self {
        Self {
            statistic: f64::NAN,
            df,
            p_value: f64::NAN,
        }
    }
}

/// Fold-change and p-value cut-offs driven by the sliders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub fold_change: f64,
    pub p_value: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            fold_change: 1.5,
            p_value: 0.05,
        }
    }
}

/// Volcano classification of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Significance {
    Up,
    Down,
    NotSignificant,
}

impl Significance {
    pub fn label(&self) -> &'static str {
        match self {
            Significance::Up => "up",
            Significance::Down => "down",
            Significance::NotSignificant => "ns",
        }
    }
}

/// Derived columns for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct VolcanoPoint {
    pub label: String,
    /// None when the ratio is undefined (zero or negative denominator/ratio)
    pub log2_fold_change: Option<f64>,
    pub p_value: Option<f64>,
    pub neg_log10_p: Option<f64>,
}

impl VolcanoPoint {
    pub fn classify(&self, thresholds: &Thresholds) -> Significance {
        StatsCalculator::classify(self.log2_fold_change, self.p_value, thresholds)
    }

    /// Both coordinates defined, so the point can be drawn.
    pub fn plot_coords(&self) -> Option<(f64, f64)> {
        Some((self.log2_fold_change?, self.neg_log10_p?))
    }
}

/// Row counts per class for the current thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignificanceCounts {
    pub up: usize,
    pub down: usize,
    pub not_significant: usize,
    pub undefined: usize,
}

/// Result of one analysis run.
#[derive(Debug, Clone)]
pub struct VolcanoResult {
    pub mode: AnalysisMode,
    pub group_a: String,
    pub group_b: String,
    pub ttest_kind: TTestKind,
    /// The single column-level test in pair mode
    pub pair_test: Option<TTestResult>,
    pub points: Vec<VolcanoPoint>,
}

impl VolcanoResult {
    pub fn counts(&self, thresholds: &Thresholds) -> SignificanceCounts {
        let mut counts = SignificanceCounts::default();
        for point in &self.points {
            if point.plot_coords().is_none() {
                counts.undefined += 1;
                continue;
            }
            match point.classify(thresholds) {
                Significance::Up => counts.up += 1,
                Significance::Down => counts.down += 1,
                Significance::NotSignificant => counts.not_significant += 1,
            }
        }
        counts
    }
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    pub fn mean(values: &[f64]) -> f64 {
        if values.is_empty() {
            return f64::NAN;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    /// Sample variance (n - 1 denominator).
    pub fn sample_variance(values: &[f64]) -> f64 {
        let n = values.len();
        if n < 2 {
            return f64::NAN;
        }
        let mean = Self::mean(values);
        values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
    }

    /// `log2(b / a)`; None when the ratio is undefined.
    pub fn fold_change(a: f64, b: f64) -> Option<f64> {
        if a == 0.0 || !a.is_finite() || !b.is_finite() {
            return None;
        }
        let ratio = b / a;
        if !ratio.is_finite() || ratio <= 0.0 {
            return None;
        }
        let fc = ratio.log2();
        fc.is_finite().then_some(fc)
    }

    /// `-log10(p)` for p in [0, 1]; p = 0 is clamped to the smallest normal f64.
    pub fn neg_log10(p: f64) -> Option<f64> {
        if !(0.0..=1.0).contains(&p) {
            return None;
        }
        Some(-p.max(f64::MIN_POSITIVE).log10())
    }

    pub fn classify(
        log2_fold_change: Option<f64>,
        p_value: Option<f64>,
        thresholds: &Thresholds,
    ) -> Significance {
        let (Some(fc), Some(p)) = (log2_fold_change, p_value) else {
            return Significance::NotSignificant;
        };
        if p > thresholds.p_value {
            Significance::NotSignificant
        } else if fc >= thresholds.fold_change {
            Significance::Up
        } else if fc <= -thresholds.fold_change {
            Significance::Down
        } else {
            Significance::NotSignificant
        }
    }

    pub fn ttest(kind: TTestKind, x: &[f64], y: &[f64]) -> TTestResult {
        match kind {
            TTestKind::Student => Self::student_ttest(x, y),
            TTestKind::Welch => Self::welch_ttest(x, y),
        }
    }

    /// Independent two-sample t-test with pooled variance.
    pub fn student_ttest(x: &[f64], y: &[f64]) -> TTestResult {
        let (x, y) = (finite(x), finite(y));
        let (n1, n2) = (x.len() as f64, y.len() as f64);
        if x.len() < 2 || y.len() < 2 {
            return TTestResult::undefined(f64::NAN);
        }

        let df = n1 + n2 - 2.0;
        let pooled = ((n1 - 1.0) * Self::sample_variance(&x)
            + (n2 - 1.0) * Self::sample_variance(&y))
            / df;
        let se = (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();

        Self::finish_ttest(Self::mean(&x) - Self::mean(&y), se, df)
    }

    /// Welch's t-test (independent samples, unequal variance).
    pub fn welch_ttest(x: &[f64], y: &[f64]) -> TTestResult {
        let (x, y) = (finite(x), finite(y));
        let (n1, n2) = (x.len() as f64, y.len() as f64);
        if x.len() < 2 || y.len() < 2 {
            return TTestResult::undefined(f64::NAN);
        }

        let v1 = Self::sample_variance(&x) / n1;
        let v2 = Self::sample_variance(&y) / n2;
        let se = (v1 + v2).sqrt();

        // Welch-Satterthwaite degrees of freedom
        let df = (v1 + v2).powi(2) / (v1.powi(2) / (n1 - 1.0) + v2.powi(2) / (n2 - 1.0));

        Self::finish_ttest(Self::mean(&x) - Self::mean(&y), se, df)
    }

    fn finish_ttest(mean_diff: f64, se: f64, df: f64) -> TTestResult {
        if se == 0.0 {
            if mean_diff == 0.0 {
                return TTestResult::undefined(df);
            }
            return TTestResult {
                statistic: mean_diff.signum() * f64::INFINITY,
                df,
                p_value: 0.0,
            };
        }

        let statistic = mean_diff / se;

        // Two-tailed p-value using t-distribution
        let p_value = match StudentsT::new(0.0, 1.0, df) {
            Ok(dist) => (2.0 * dist.sf(statistic.abs())).min(1.0),
            Err(_) => f64::NAN,
        };

        TTestResult {
            statistic,
            df,
            p_value,
        }
    }

    /// Compute fold change, p-value and -log10(p) for every row.
    pub fn compute_volcano(input: &AnalysisInput, kind: TTestKind) -> VolcanoResult {
        let mode = input.mode();
        match &input.kind {
            InputKind::Precomputed {
                log2_fold_change,
                p_value,
            } => {
                let points = input
                    .labels
                    .iter()
                    .zip(log2_fold_change.iter().zip(p_value))
                    .map(|(label, (&fc, &p))| {
                        let p_value = (0.0..=1.0).contains(&p).then_some(p);
                        VolcanoPoint {
                            label: label.clone(),
                            log2_fold_change: fc.is_finite().then_some(fc),
                            p_value,
                            neg_log10_p: p_value.and_then(Self::neg_log10),
                        }
                    })
                    .collect();

                VolcanoResult {
                    mode,
                    group_a: "log2 fold change".to_string(),
                    group_b: "p-value".to_string(),
                    ttest_kind: kind,
                    pair_test: None,
                    points,
                }
            }
            InputKind::Groups { group_a, group_b } if mode == AnalysisMode::Pair => {
                Self::compute_pair(&input.labels, &group_a[0], &group_b[0], kind)
            }
            InputKind::Groups { group_a, group_b } => {
                Self::compute_replicates(&input.labels, group_a, group_b, kind)
            }
        }
    }

    /// One column per group: per-row log2(B/A), one t-test of A vs B for every row.
    fn compute_pair(
        labels: &[String],
        a: &NamedColumn,
        b: &NamedColumn,
        kind: TTestKind,
    ) -> VolcanoResult {
        let test = Self::ttest(kind, &a.values, &b.values);
        let p_value = (!test.p_value.is_nan()).then_some(test.p_value);
        let neg_log10_p = p_value.and_then(Self::neg_log10);

        log::info!(
            "{} vs {}: t = {:.4}, df = {:.2}, p = {:.4e}",
            a.name,
            b.name,
            test.statistic,
            test.df,
            test.p_value
        );

        let points = labels
            .iter()
            .zip(a.values.iter().zip(&b.values))
            .map(|(label, (&va, &vb))| VolcanoPoint {
                label: label.clone(),
                log2_fold_change: Self::fold_change(va, vb),
                p_value,
                neg_log10_p,
            })
            .collect();

        VolcanoResult {
            mode: AnalysisMode::Pair,
            group_a: a.name.clone(),
            group_b: b.name.clone(),
            ttest_kind: kind,
            pair_test: Some(test),
            points,
        }
    }

    /// Replicate columns: per-row log2(mean B / mean A) and per-row t-test.
    fn compute_replicates(
        labels: &[String],
        group_a: &[NamedColumn],
        group_b: &[NamedColumn],
        kind: TTestKind,
    ) -> VolcanoResult {
        let row = |cols: &[NamedColumn], i: usize| -> Vec<f64> {
            cols.iter()
                .map(|c| c.values.get(i).copied().unwrap_or(f64::NAN))
                .collect()
        };

        // Use rayon for parallel computation
        let points: Vec<VolcanoPoint> = labels
            .par_iter()
            .enumerate()
            .map(|(i, label)| {
                let a = finite(&row(group_a, i));
                let b = finite(&row(group_b, i));
                let test = Self::ttest(kind, &a, &b);
                let p_value = (!test.p_value.is_nan()).then_some(test.p_value);

                VolcanoPoint {
                    label: label.clone(),
                    log2_fold_change: Self::fold_change(Self::mean(&a), Self::mean(&b)),
                    p_value,
                    neg_log10_p: p_value.and_then(Self::neg_log10),
                }
            })
            .collect();

        VolcanoResult {
            mode: AnalysisMode::Replicates,
            group_a: join_names(group_a),
            group_b: join_names(group_b),
            ttest_kind: kind,
            pair_test: None,
            points,
        }
    }
}

fn finite(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

fn join_names(cols: &[NamedColumn]) -> String {
    cols.iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol * b.abs().max(1.0)
    }

    fn column(name: &str, values: &[f64]) -> NamedColumn {
        NamedColumn {
            name: name.to_string(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn fold_change_is_log2_ratio() {
        assert_eq!(StatsCalculator::fold_change(1.0, 2.0), Some(1.0));
        assert_eq!(StatsCalculator::fold_change(8.0, 2.0), Some(-2.0));
        assert_eq!(StatsCalculator::fold_change(3.0, 3.0), Some(0.0));
    }

    #[test]
    fn fold_change_undefined_for_zero_or_negative() {
        assert_eq!(StatsCalculator::fold_change(0.0, 5.0), None);
        assert_eq!(StatsCalculator::fold_change(0.0, 0.0), None);
        assert_eq!(StatsCalculator::fold_change(2.0, 0.0), None);
        assert_eq!(StatsCalculator::fold_change(-2.0, 4.0), None);
        assert_eq!(StatsCalculator::fold_change(f64::NAN, 4.0), None);
        // b / a overflows to infinity
        assert_eq!(StatsCalculator::fold_change(1e-300, 1e300), None);
        assert_eq!(StatsCalculator::fold_change(1e300, 1e-300), None);
    }

    #[test]
    fn replicate_means_overflowing_ratio_are_undefined() {
        let labels = vec!["tiny".to_string()];
        let a = [column("A1", &[1e-300]), column("A2", &[1e-300])];
        let b = [column("B1", &[1e300]), column("B2", &[1e300])];
        let input = AnalysisInput {
            labels,
            kind: InputKind::Groups {
                group_a: a.to_vec(),
                group_b: b.to_vec(),
            },
        };
        let result = StatsCalculator::compute_volcano(&input, TTestKind::Student);
        assert_eq!(result.points[0].log2_fold_change, None);
        assert_eq!(result.counts(&Thresholds::default()).undefined, 1);
    }

    #[test]
    fn precomputed_p_values_outside_unit_interval_are_undefined() {
        let input = AnalysisInput {
            labels: ["ok", "high", "nan", "negative"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            kind: InputKind::Precomputed {
                log2_fold_change: vec![2.0, 2.0, 2.0, 2.0],
                p_value: vec![0.01, 1.5, f64::NAN, -0.1],
            },
        };
        let result = StatsCalculator::compute_volcano(&input, TTestKind::Student);

        assert_eq!(result.points[0].p_value, Some(0.01));
        for point in &result.points[1..] {
            assert_eq!(point.p_value, None, "{}", point.label);
            assert_eq!(point.neg_log10_p, None, "{}", point.label);
            assert_eq!(
                point.classify(&Thresholds::default()),
                Significance::NotSignificant
            );
        }
        let counts = result.counts(&Thresholds::default());
        assert_eq!((counts.up, counts.undefined), (1, 3));
    }

    #[test]
    fn neg_log10_handles_edges() {
        assert_eq!(StatsCalculator::neg_log10(1.0), Some(0.0));
        assert!(close(StatsCalculator::neg_log10(0.01).unwrap(), 2.0, 1e-12));
        let zero = StatsCalculator::neg_log10(0.0).unwrap();
        assert!(zero.is_finite() && zero > 300.0);
        assert_eq!(StatsCalculator::neg_log10(f64::NAN), None);
        assert_eq!(StatsCalculator::neg_log10(1.5), None);
    }

    // Reference values from scipy.stats.ttest_ind
    #[test]
    fn student_ttest_matches_reference() {
        let r = StatsCalculator::student_ttest(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 6.0, 8.0, 10.0]);
        assert!(close(r.statistic, -1.8973665961010275, 1e-12));
        assert_eq!(r.df, 8.0);
        assert!(close(r.p_value, 0.09434977284243774, 1e-8));

        let r = StatsCalculator::student_ttest(
            &[10.1, 9.8, 10.4, 10.0],
            &[12.3, 11.9, 12.8, 12.1, 12.5],
        );
        assert!(close(r.statistic, -10.77324240287213, 1e-10));
        assert!(close(r.p_value, 1.3066998766141907e-05, 1e-6));
    }

    #[test]
    fn welch_ttest_matches_reference() {
        let r = StatsCalculator::welch_ttest(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 6.0, 8.0, 10.0]);
        assert!(close(r.statistic, -1.8973665961010275, 1e-12));
        assert!(close(r.df, 5.882352941176471, 1e-12));
        assert!(close(r.p_value, 0.10753119493062718, 1e-8));

        let r = StatsCalculator::welch_ttest(
            &[10.1, 9.8, 10.4, 10.0],
            &[12.3, 11.9, 12.8, 12.1, 12.5],
        );
        assert!(close(r.statistic, -11.221493830931182, 1e-10));
        assert!(close(r.df, 6.958557793851357, 1e-10));
        assert!(close(r.p_value, 1.0408982927766906e-05, 1e-6));
    }

    #[test]
    fn ttest_is_symmetric_in_p() {
        let x = [5.0, 5.2, 4.9];
        let y = [5.1, 5.0, 5.3];
        let xy = StatsCalculator::student_ttest(&x, &y);
        let yx = StatsCalculator::student_ttest(&y, &x);
        assert!(close(xy.statistic, -yx.statistic, 1e-12));
        assert!(close(xy.p_value, 0.46760475460939843, 1e-8));
        assert!(close(xy.p_value, yx.p_value, 1e-12));
    }

    #[test]
    fn ttest_degenerate_inputs() {
        let r = StatsCalculator::student_ttest(&[1.0], &[2.0, 3.0]);
        assert!(r.statistic.is_nan() && r.p_value.is_nan());

        let r = StatsCalculator::welch_ttest(&[2.0, 2.0], &[2.0, 2.0]);
        assert!(r.statistic.is_nan() && r.p_value.is_nan());

        let r = StatsCalculator::student_ttest(&[1.0, 1.0], &[3.0, 3.0]);
        assert_eq!(r.statistic, f64::NEG_INFINITY);
        assert_eq!(r.p_value, 0.0);

        // NaN entries are dropped before testing
        let r = StatsCalculator::student_ttest(
            &[1.0, 2.0, f64::NAN, 3.0, 4.0, 5.0],
            &[2.0, 4.0, 6.0, 8.0, 10.0],
        );
        assert!(close(r.p_value, 0.09434977284243774, 1e-8));
    }

    #[test]
    fn classification_follows_thresholds() {
        let t = Thresholds {
            fold_change: 1.0,
            p_value: 0.05,
        };
        assert_eq!(StatsCalculator::classify(Some(1.0), Some(0.05), &t), Significance::Up);
        assert_eq!(StatsCalculator::classify(Some(-1.5), Some(0.01), &t), Significance::Down);
        assert_eq!(
            StatsCalculator::classify(Some(0.5), Some(0.001), &t),
            Significance::NotSignificant
        );
        assert_eq!(
            StatsCalculator::classify(Some(3.0), Some(0.06), &t),
            Significance::NotSignificant
        );
        assert_eq!(
            StatsCalculator::classify(None, Some(0.0), &t),
            Significance::NotSignificant
        );

        let zero = Thresholds {
            fold_change: 0.0,
            p_value: 0.05,
        };
        assert_eq!(StatsCalculator::classify(Some(0.0), Some(0.01), &zero), Significance::Up);
    }

    #[test]
    fn example_genes_classify_like_the_dashboard() {
        let input = AnalysisInput {
            labels: ["GeneA", "GeneB", "GeneC", "GeneD", "GeneE"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            kind: InputKind::Precomputed {
                log2_fold_change: vec![1.5, -2.0, 0.5, 3.0, -1.2],
                p_value: vec![0.001, 0.05, 0.02, 0.001, 0.03],
            },
        };
        let result = StatsCalculator::compute_volcano(&input, TTestKind::Student);
        let classes: Vec<Significance> = result
            .points
            .iter()
            .map(|p| p.classify(&Thresholds::default()))
            .collect();

        assert_eq!(
            classes,
            vec![
                Significance::Up,
                Significance::Down,
                Significance::NotSignificant,
                Significance::Up,
                Significance::NotSignificant,
            ]
        );
        let counts = result.counts(&Thresholds::default());
        assert_eq!((counts.up, counts.down, counts.not_significant), (2, 1, 2));
    }

    #[test]
    fn pair_mode_broadcasts_one_p_value() {
        let input = AnalysisInput {
            labels: vec!["r1".into(), "r2".into(), "r3".into()],
            kind: InputKind::Groups {
                group_a: vec![column("A", &[1.0, 2.0, 0.0])],
                group_b: vec![column("B", &[2.0, 8.0, 5.0])],
            },
        };
        let result = StatsCalculator::compute_volcano(&input, TTestKind::Student);
        let test = result.pair_test.unwrap();
        let expected = StatsCalculator::student_ttest(&[1.0, 2.0, 0.0], &[2.0, 8.0, 5.0]);

        assert_eq!(result.mode, AnalysisMode::Pair);
        assert_eq!(test, expected);
        assert!(result.points.iter().all(|p| p.p_value == Some(expected.p_value)));
        assert_eq!(result.points[0].log2_fold_change, Some(1.0));
        assert_eq!(result.points[1].log2_fold_change, Some(2.0));
        assert_eq!(result.points[2].log2_fold_change, None);
        assert_eq!(result.counts(&Thresholds::default()).undefined, 1);
    }

    #[test]
    fn replicate_mode_tests_each_row() {
        let input = AnalysisInput {
            labels: vec!["up".into(), "flat".into()],
            kind: InputKind::Groups {
                group_a: vec![
                    column("a1", &[1.0, 5.0]),
                    column("a2", &[2.0, 5.2]),
                    column("a3", &[3.0, 4.9]),
                ],
                group_b: vec![
                    column("b1", &[4.0, 5.1]),
                    column("b2", &[8.0, 5.0]),
                    column("b3", &[12.0, 5.3]),
                ],
            },
        };
        let result = StatsCalculator::compute_volcano(&input, TTestKind::Welch);
        assert_eq!(result.mode, AnalysisMode::Replicates);
        assert_eq!(result.group_a, "a1, a2, a3");

        let up = &result.points[0];
        assert!(close(up.log2_fold_change.unwrap(), 2.0, 1e-12));
        let expected = StatsCalculator::welch_ttest(&[1.0, 2.0, 3.0], &[4.0, 8.0, 12.0]);
        assert!(close(up.p_value.unwrap(), expected.p_value, 1e-12));

        let flat = &result.points[1];
        assert!(close(flat.p_value.unwrap(), 0.46760475460939843, 1e-8));
        assert_eq!(flat.classify(&Thresholds::default()), Significance::NotSignificant);
    }
}
