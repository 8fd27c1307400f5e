use serde::Serialize;

use crate::assemble::DecisionInput;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Normalization {
    /// Euclidean norm of each raw criterion column.
    pub column_norms: Vec<f64>,
    /// Vector-normalized matrix, same shape as the raw matrix.
    pub matrix: Vec<Vec<f64>>,
    /// Indices of columns whose norm is zero and received the equal-share fallback.
    pub zero_columns: Vec<usize>,
}

/// Euclidean norm, scaled by the largest magnitude so very large values do not
/// overflow the sum of squares.
pub fn euclidean_norm(values: &[f64]) -> f64 {
    let scale = values.iter().map(|v| v.abs()).fold(0.0_f64, f64::max);
    if scale == 0.0 || !scale.is_finite() {
        return scale;
    }
    let sum: f64 = values
        .iter()
        .map(|v| {
            let r = v / scale;
            r * r
        })
        .sum();
    scale * sum.sqrt()
}

/// Vector normalization of every criterion column.
///
/// A column whose norm is zero (every alternative scored 0) is filled with
/// `1 / sqrt(alternatives)` instead of dividing by zero.
pub fn normalize(input: &DecisionInput) -> Normalization {
    let alternative_count = input.alternative_count();
    let equal_share = equal_share(alternative_count);

    let column_norms: Vec<f64> = (0..input.criterion_count())
        .map(|j| euclidean_norm(&input.column(j).collect::<Vec<_>>()))
        .collect();

    let zero_columns: Vec<usize> = column_norms
        .iter()
        .enumerate()
        .filter(|(_, norm)| !usable_norm(**norm))
        .map(|(j, _)| j)
        .collect();

    let matrix = input
        .raw()
        .iter()
        .map(|row| {
            row.iter()
                .zip(&column_norms)
                .map(|(value, norm)| {
                    if usable_norm(*norm) {
                        let normalized = value / norm;
                        if normalized.is_finite() {
                            normalized
                        } else {
                            equal_share
                        }
                    } else {
                        equal_share
                    }
                })
                .collect()
        })
        .collect();

    Normalization {
        column_norms,
        matrix,
        zero_columns,
    }
}

#[allow(clippy::cast_precision_loss)]
fn equal_share(alternative_count: usize) -> f64 {
    if alternative_count == 0 {
        0.0
    } else {
        1.0 / (alternative_count as f64).sqrt()
    }
}

fn usable_norm(norm: f64) -> bool {
    norm > 0.0 && norm.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::assemble;
    use crate::model::{Alternative, Criterion, Polarity, ScoreMatrix};

    fn input(rows: &[&[f64]]) -> DecisionInput {
        let width = rows.first().map_or(0, |r| r.len());
        let criteria: Vec<Criterion> = (0..width)
            .map(|j| Criterion::new(format!("k{j}"), format!("K{j}"), 1.0, Polarity::Benefit))
            .collect();
        let alternatives: Vec<Alternative> = (0..rows.len())
            .map(|i| Alternative::new(format!("a{i}"), format!("A{i}")))
            .collect();
        let mut scores = ScoreMatrix::new();
        for (i, row) in rows.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                scores.set(format!("a{i}"), format!("k{j}"), *v);
            }
        }
        assemble(&criteria, &alternatives, &scores).expect("valid input")
    }

    #[test]
    fn divides_by_column_norm() {
        let out = normalize(&input(&[&[3.0, 90.0], &[4.0, 60.0]]));
        assert!((out.column_norms[0] - 5.0).abs() < 1e-12);
        assert!((out.matrix[0][0] - 0.6).abs() < 1e-12);
        assert!((out.matrix[1][0] - 0.8).abs() < 1e-12);
        assert!(out.zero_columns.is_empty());
    }

    #[test]
    fn zero_column_gets_equal_share() {
        let out = normalize(&input(&[&[0.0, 10.0], &[0.0, 10.0], &[0.0, 5.0]]));
        let expected = 1.0 / 3.0_f64.sqrt();
        assert_eq!(out.zero_columns, vec![0]);
        for row in &out.matrix {
            assert!((row[0] - expected).abs() < 1e-12);
        }
        assert!((out.matrix[2][1] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn huge_scores_do_not_overflow() {
        let out = normalize(&input(&[&[1e300], &[1e300]]));
        let expected = 1.0 / 2.0_f64.sqrt();
        assert!((out.matrix[0][0] - expected).abs() < 1e-12);
        assert!(out.zero_columns.is_empty());
    }
}
