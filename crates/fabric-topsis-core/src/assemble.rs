use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::error::TopsisError;
use crate::model::{Alternative, Criterion, ScoreMatrix};

/// A validated, dense snapshot of one decision problem.
///
/// `raw` has one row per alternative and one column per criterion, both in the
/// canonical order of the input lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionInput {
    criteria: Vec<Criterion>,
    alternatives: Vec<Alternative>,
    raw: Vec<Vec<f64>>,
}

impl DecisionInput {
    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    pub fn raw(&self) -> &[Vec<f64>] {
        &self.raw
    }

    pub fn alternative_count(&self) -> usize {
        self.alternatives.len()
    }

    pub fn criterion_count(&self) -> usize {
        self.criteria.len()
    }

    /// Raw values of one criterion column, top to bottom.
    pub fn column(&self, criterion_index: usize) -> impl Iterator<Item = f64> + '_ {
        self.raw
            .iter()
            .filter_map(move |row| row.get(criterion_index).copied())
    }
}

/// Validates the three raw inputs and lays the scores out densely.
pub fn assemble(
    criteria: &[Criterion],
    alternatives: &[Alternative],
    scores: &ScoreMatrix,
) -> Result<DecisionInput, TopsisError> {
    if criteria.is_empty() {
        return Err(TopsisError::NoCriteria);
    }
    if alternatives.is_empty() {
        return Err(TopsisError::NoAlternatives);
    }

    ensure_unique("criterion", criteria.iter().map(|c| c.id.as_str()))?;
    ensure_unique("alternative", alternatives.iter().map(|a| a.id.as_str()))?;

    for criterion in criteria {
        if !criterion.weight.is_finite() || criterion.weight < 0.0 {
            return Err(TopsisError::InvalidWeight {
                criterion_id: criterion.id.clone(),
                weight: criterion.weight,
            });
        }
    }

    let required = criteria.len() * alternatives.len();
    let mut present = 0_usize;
    let mut first_invalid: Option<TopsisError> = None;
    let mut raw = Vec::with_capacity(alternatives.len());

    for alternative in alternatives {
        let mut row = Vec::with_capacity(criteria.len());
        for criterion in criteria {
            let value = match scores.get(&alternative.id, &criterion.id) {
                Some(v) => {
                    present += 1;
                    v
                }
                None => 0.0,
            };
            if (!value.is_finite() || value < 0.0) && first_invalid.is_none() {
                first_invalid = Some(TopsisError::InvalidScore {
                    alternative_id: alternative.id.clone(),
                    criterion_id: criterion.id.clone(),
                    value,
                });
            }
            row.push(value);
        }
        raw.push(row);
    }

    if present < required {
        return Err(TopsisError::IncompleteData { required, present });
    }
    if let Some(err) = first_invalid {
        return Err(err);
    }

    let stray = scores.len().saturating_sub(present);
    if stray > 0 {
        debug!(stray, "ignoring score cells for unknown criteria or alternatives");
    }

    Ok(DecisionInput {
        criteria: criteria.to_vec(),
        alternatives: alternatives.to_vec(),
        raw,
    })
}

fn ensure_unique<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), TopsisError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(TopsisError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}
