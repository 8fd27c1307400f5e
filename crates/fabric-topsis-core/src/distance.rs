use serde::Serialize;

use crate::ideal::IdealSolution;
use crate::normalize::euclidean_norm;

/// Euclidean distances of one alternative to the two ideal vectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Separation {
    pub positive: f64,
    pub negative: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Closeness {
    /// Relative closeness to the positive ideal, always within `[0, 1]`.
    pub score: f64,
    /// The raw ratio was not a number in `[0, 1]` and was replaced with 0.
    pub fallback: bool,
}

pub fn separation(row: &[f64], ideal: &IdealSolution) -> Separation {
    Separation {
        positive: distance_to(row, &ideal.positive),
        negative: distance_to(row, &ideal.negative),
    }
}

fn distance_to(row: &[f64], reference: &[f64]) -> f64 {
    let deltas: Vec<f64> = row
        .iter()
        .zip(reference)
        .map(|(value, target)| value - target)
        .filter(|delta| delta.is_finite())
        .collect();
    let distance = euclidean_norm(&deltas);
    if distance.is_finite() {
        distance
    } else {
        0.0
    }
}

/// `D- / (D+ + D-)`, with a coincident alternative (both distances exactly 0)
/// scoring 1 and any other degenerate ratio scoring 0.
pub fn closeness(separation: &Separation) -> Closeness {
    let Separation { positive, negative } = *separation;
    let total = positive + negative;

    let raw = if total > 0.0 && total.is_finite() {
        negative / total
    } else if positive == 0.0 && negative == 0.0 {
        1.0
    } else {
        f64::NAN
    };

    if raw.is_nan() || !(0.0..=1.0).contains(&raw) {
        Closeness {
            score: 0.0,
            fallback: true,
        }
    } else {
        Closeness {
            score: raw,
            fallback: false,
        }
    }
}
