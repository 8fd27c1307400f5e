use serde::Serialize;

use crate::model::{Criterion, Polarity};

/// Best and worst weighted value per criterion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdealSolution {
    pub positive: Vec<f64>,
    pub negative: Vec<f64>,
}

/// Derives the positive and negative ideal vectors from the weighted matrix.
///
/// Benefit columns take the max as positive ideal, Cost columns the min. A
/// column with no finite value resolves to 0 on both sides.
pub fn resolve_ideals(weighted: &[Vec<f64>], criteria: &[Criterion]) -> IdealSolution {
    let mut positive = Vec::with_capacity(criteria.len());
    let mut negative = Vec::with_capacity(criteria.len());

    for (j, criterion) in criteria.iter().enumerate() {
        let (min, max) = column_bounds(weighted, j).unwrap_or((0.0, 0.0));
        let (best, worst) = match criterion.polarity {
            Polarity::Benefit => (max, min),
            Polarity::Cost => (min, max),
        };
        positive.push(best);
        negative.push(worst);
    }

    IdealSolution { positive, negative }
}

fn column_bounds(weighted: &[Vec<f64>], column: usize) -> Option<(f64, f64)> {
    weighted
        .iter()
        .filter_map(|row| row.get(column).copied())
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
