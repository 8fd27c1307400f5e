use serde::Serialize;
use tracing::warn;

use crate::assemble::DecisionInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateKind {
    /// Every alternative scored 0.
    AllZero,
    /// Every alternative received the same non-zero score.
    Constant,
}

/// Non-fatal findings of one evaluation. None of these stop the ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    DegenerateColumn {
        criterion_id: String,
        degeneracy: DegenerateKind,
    },
    ZeroWeight {
        criterion_id: String,
    },
    ZeroWeightTotal,
    /// The preference ratio was not a number in `[0, 1]` and was replaced with 0.
    NumericFallback {
        alternative_id: String,
    },
}

impl Diagnostic {
    pub fn log(&self) {
        match self {
            Self::DegenerateColumn {
                criterion_id,
                degeneracy,
            } => warn!(
                criterion_id = criterion_id.as_str(),
                degeneracy = ?degeneracy,
                "degenerate criterion column; it cannot separate alternatives"
            ),
            Self::ZeroWeight { criterion_id } => warn!(
                criterion_id = criterion_id.as_str(),
                "criterion has zero weight and contributes nothing to distances"
            ),
            Self::ZeroWeightTotal => {
                warn!("criterion weights sum to zero; using equal weights");
            }
            Self::NumericFallback { alternative_id } => warn!(
                alternative_id = alternative_id.as_str(),
                "degenerate preference score replaced with 0"
            ),
        }
    }
}

/// Finds criterion columns whose raw scores are all zero or all equal.
pub fn degenerate_columns(input: &DecisionInput) -> Vec<Diagnostic> {
    input
        .criteria()
        .iter()
        .enumerate()
        .filter_map(|(j, criterion)| {
            let mut column = input.column(j);
            let first = column.next()?;
            if !column.all(|v| v == first) {
                return None;
            }
            let degeneracy = if first == 0.0 {
                DegenerateKind::AllZero
            } else {
                DegenerateKind::Constant
            };
            Some(Diagnostic::DegenerateColumn {
                criterion_id: criterion.id.clone(),
                degeneracy,
            })
        })
        .collect()
}
