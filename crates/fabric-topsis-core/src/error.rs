use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TopsisError {
    #[error("incomplete data: no criteria defined")]
    NoCriteria,

    #[error("incomplete data: no alternatives defined")]
    NoAlternatives,

    #[error("incomplete data: {present} of {required} scores present")]
    IncompleteData { required: usize, present: usize },

    #[error("invalid score for alternative={alternative_id}, criterion={criterion_id}: {value}")]
    InvalidScore {
        alternative_id: String,
        criterion_id: String,
        value: f64,
    },

    #[error("invalid weight for criterion={criterion_id}: {weight}")]
    InvalidWeight { criterion_id: String, weight: f64 },

    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("unknown weighting mode: {0}")]
    UnknownWeighting(String),

    #[error("unknown polarity: {0}")]
    UnknownPolarity(String),
}

impl TopsisError {
    /// Errors that mean an earlier data-entry step has not been completed.
    pub const fn is_incomplete_data(&self) -> bool {
        matches!(
            self,
            Self::NoCriteria | Self::NoAlternatives | Self::IncompleteData { .. }
        )
    }

    /// Number of score cells still required, for incomplete-data errors.
    pub const fn missing(&self) -> Option<usize> {
        match self {
            Self::IncompleteData { required, present } => Some(required.saturating_sub(*present)),
            _ => None,
        }
    }
}
