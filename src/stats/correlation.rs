//! Pearson correlation matrix across the numeric columns of a table.

use crate::data::NamedColumn;
use rayon::prelude::*;
use std::io::Write;

/// Square matrix of pairwise Pearson coefficients, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Pairwise-complete Pearson correlation for every column pair.
    pub fn compute(columns: &[NamedColumn]) -> Self {
        let n = columns.len();
        let values: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (0..n)
                    .map(|j| pearson(&columns[i].values, &columns[j].values))
                    .collect()
            })
            .collect();

        Self {
            labels: columns.iter().map(|c| c.name.clone()).collect(),
            values,
        }
    }

    pub fn size(&self) -> usize {
        self.labels.len()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(f64::NAN)
    }

    /// Write as CSV: blank corner cell, column labels, then one row per label.
    /// NaN cells are left empty.
    pub fn write_csv<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        let header: Vec<String> = std::iter::once(String::new())
            .chain(self.labels.iter().map(|l| csv_field(l)))
            .collect();
        writeln!(out, "{}", header.join(","))?;

        for (label, row) in self.labels.iter().zip(&self.values) {
            let cells: Vec<String> = std::iter::once(csv_field(label))
                .chain(row.iter().map(|v| {
                    if v.is_nan() {
                        String::new()
                    } else {
                        v.to_string()
                    }
                }))
                .collect();
            writeln!(out, "{}", cells.join(","))?;
        }
        Ok(())
    }
}

/// Pearson coefficient over rows where both values are finite.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(&a, &b)| (a, b))
        .collect();

    let n = pairs.len();
    if n < 2 {
        return f64::NAN;
    }

    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n as f64;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(a, b) in &pairs {
        let (dx, dy) = (a - mean_x, b - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// Quote a CSV field when it contains a separator, quote or newline.
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, values: &[f64]) -> NamedColumn {
        NamedColumn {
            name: name.to_string(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn perfect_and_inverse_correlation() {
        assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 1.0).abs() < 1e-12);
        assert!((pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn known_coefficient() {
        // r = 0.8 for this classic textbook pair
        let r = pearson(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 1.0, 4.0, 3.0, 5.0]);
        assert!((r - 0.8).abs() < 1e-12);
    }

    #[test]
    fn skips_incomplete_rows_and_degenerate_columns() {
        let r = pearson(&[1.0, f64::NAN, 2.0, 3.0], &[2.0, 100.0, 4.0, 6.0]);
        assert!((r - 1.0).abs() < 1e-12);
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_nan());
        assert!(pearson(&[1.0], &[1.0]).is_nan());
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let m = CorrelationMatrix::compute(&[
            column("A", &[1.0, 2.0, 3.0, 4.0, 5.0]),
            column("B", &[2.0, 1.0, 4.0, 3.0, 5.0]),
            column("C", &[5.0, 3.0, 4.0, 1.0, 2.0]),
        ]);
        assert_eq!(m.size(), 3);
        for i in 0..3 {
            assert!((m.get(i, i) - 1.0).abs() < 1e-12);
            for j in 0..3 {
                assert_eq!(m.get(i, j), m.get(j, i));
            }
        }
        assert!((m.get(0, 1) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn csv_layout() {
        let m = CorrelationMatrix::compute(&[
            column("A", &[1.0, 2.0, 3.0]),
            column("B", &[3.0, 2.0, 1.0]),
            column("flat", &[1.0, 1.0, 1.0]),
        ]);
        let mut buf = Vec::new();
        m.write_csv(&mut buf).unwrap();
        let csv = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], ",A,B,flat");
        assert_eq!(lines[1], "A,1,-1,");
        assert_eq!(lines[2], "B,-1,1,");
        assert_eq!(lines[3], "flat,,,");
    }

    #[test]
    fn csv_fields_are_quoted_when_needed() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
