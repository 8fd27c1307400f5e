use serde::Serialize;

use crate::model::{Alternative, Criterion, ScoreMatrix};

/// How much of the score matrix has been filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoringProgress {
    pub required: usize,
    pub filled: usize,
    /// Rounded completion percentage, 0 when nothing is required.
    pub percent: u8,
}

impl ScoringProgress {
    pub const fn is_complete(&self) -> bool {
        self.required > 0 && self.filled >= self.required
    }

    pub const fn missing(&self) -> usize {
        self.required.saturating_sub(self.filled)
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn scoring_progress(
    criteria: &[Criterion],
    alternatives: &[Alternative],
    scores: &ScoreMatrix,
) -> ScoringProgress {
    let required = criteria.len() * alternatives.len();
    let filled = alternatives
        .iter()
        .map(|alt| {
            criteria
                .iter()
                .filter(|crit| scores.get(&alt.id, &crit.id).is_some())
                .count()
        })
        .sum::<usize>();
    let percent = if required == 0 {
        0
    } else {
        ((filled as f64 / required as f64) * 100.0).round().clamp(0.0, 100.0) as u8
    };

    ScoringProgress {
        required,
        filled,
        percent,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionStatistics {
    pub criterion_id: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Mean, min and max of the scores present for each criterion.
#[allow(clippy::cast_precision_loss)]
pub fn criterion_statistics(
    criteria: &[Criterion],
    alternatives: &[Alternative],
    scores: &ScoreMatrix,
) -> Vec<CriterionStatistics> {
    criteria
        .iter()
        .map(|crit| {
            let values: Vec<f64> = alternatives
                .iter()
                .filter_map(|alt| scores.get(&alt.id, &crit.id))
                .filter(|v| v.is_finite())
                .collect();
            let count = values.len();
            let mean = (count > 0).then(|| values.iter().sum::<f64>() / count as f64);
            let min = values.iter().copied().reduce(f64::min);
            let max = values.iter().copied().reduce(f64::max);
            CriterionStatistics {
                criterion_id: crit.id.clone(),
                count,
                mean,
                min,
                max,
            }
        })
        .collect()
}
