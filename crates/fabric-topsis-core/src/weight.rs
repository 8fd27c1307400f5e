use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TopsisError;
use crate::model::Criterion;

/// How criterion weights scale the normalized matrix.
///
/// Both modes rank alternatives identically; they differ in the absolute
/// magnitude of the weighted matrix, the ideal vectors and the distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightingMode {
    /// `weighted = normalized * weight`.
    Raw,
    /// `weighted = normalized * weight / sum(weights)`.
    #[default]
    Share,
}

impl WeightingMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Share => "share",
        }
    }
}

impl fmt::Display for WeightingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightingMode {
    type Err = TopsisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "raw" | "raw-weight" | "raw_weight" => Ok(Self::Raw),
            "share" | "weight-share" | "weight_share" | "normalized" => Ok(Self::Share),
            _ => Err(TopsisError::UnknownWeighting(lowered)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveWeights {
    pub mode: WeightingMode,
    /// Multiplier applied to each criterion column, in criterion order.
    pub values: Vec<f64>,
    /// Sum of the raw criterion weights.
    pub total: f64,
    /// Share mode with a zero (or unusable) weight total fell back to `1 / criteria`.
    pub fallback_equal: bool,
}

pub fn effective_weights(criteria: &[Criterion], mode: WeightingMode) -> EffectiveWeights {
    let total: f64 = criteria.iter().map(|c| c.weight).sum();

    let (values, fallback_equal) = match mode {
        WeightingMode::Raw => (criteria.iter().map(|c| c.weight).collect(), false),
        WeightingMode::Share => match weight_shares(criteria) {
            Some(shares) => (shares, false),
            None => {
                let equal = equal_weight(criteria.len());
                (vec![equal; criteria.len()], true)
            }
        },
    };

    EffectiveWeights {
        mode,
        values,
        total,
        fallback_equal,
    }
}

/// Scales each normalized column by its effective weight.
///
/// A product that is not finite is replaced with 0.
pub fn apply_weights(normalized: &[Vec<f64>], weights: &EffectiveWeights) -> Vec<Vec<f64>> {
    normalized
        .iter()
        .map(|row| {
            row.iter()
                .zip(&weights.values)
                .map(|(value, weight)| {
                    let weighted = value * weight;
                    if weighted.is_finite() {
                        weighted
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

/// Aggregate view of the configured weights.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightSummary {
    pub total: f64,
    pub average: f64,
    pub shares: Vec<WeightShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightShare {
    pub criterion_id: String,
    pub weight: f64,
    /// Percentage of the weight total, 0 when the total is 0.
    pub percent: f64,
}

/// Each weight divided by the weight total, `None` when the total is zero
/// or not finite.
///
/// Weights are scaled by the largest one before summing so that large
/// finite weights do not overflow the total.
fn weight_shares(criteria: &[Criterion]) -> Option<Vec<f64>> {
    let scale = criteria.iter().map(|c| c.weight).fold(0.0_f64, f64::max);
    if !(scale.is_finite() && scale > 0.0) {
        return None;
    }
    let scaled_total: f64 = criteria.iter().map(|c| c.weight / scale).sum();
    if !(scaled_total.is_finite() && scaled_total > 0.0) {
        return None;
    }
    Some(
        criteria
            .iter()
            .map(|c| c.weight / scale / scaled_total)
            .collect(),
    )
}

#[allow(clippy::cast_precision_loss)]
pub fn weight_summary(criteria: &[Criterion]) -> WeightSummary {
    let total: f64 = criteria.iter().map(|c| c.weight).sum();
    let count = criteria.len() as f64;
    let average = if criteria.is_empty() {
        0.0
    } else if total.is_finite() {
        total / count
    } else {
        criteria.iter().map(|c| c.weight / count).sum()
    };
    let percents = weight_shares(criteria).unwrap_or_else(|| vec![0.0; criteria.len()]);
    let shares = criteria
        .iter()
        .zip(percents)
        .map(|(c, share)| WeightShare {
            criterion_id: c.id.clone(),
            weight: c.weight,
            percent: share * 100.0,
        })
        .collect();

    WeightSummary {
        total,
        average,
        shares,
    }
}

#[allow(clippy::cast_precision_loss)]
fn equal_weight(criterion_count: usize) -> f64 {
    if criterion_count == 0 {
        0.0
    } else {
        1.0 / criterion_count as f64
    }
}
