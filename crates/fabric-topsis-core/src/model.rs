use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TopsisError;

/// Direction in which a criterion's raw score is preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    /// Higher raw score is better.
    Benefit,
    /// Lower raw score is better.
    Cost,
}

impl Polarity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Benefit => "Benefit",
            Self::Cost => "Cost",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Polarity {
    type Err = TopsisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "benefit" => Ok(Self::Benefit),
            "cost" => Ok(Self::Cost),
            other => Err(TopsisError::UnknownPolarity(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: String,
    pub name: String,
    pub weight: f64,
    pub polarity: Polarity,
}

impl Criterion {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        weight: f64,
        polarity: Polarity,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            weight,
            polarity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Alternative {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCell {
    pub alternative_id: String,
    pub criterion_id: String,
    pub value: f64,
}

/// Raw assigned scores keyed by alternative id, then criterion id.
///
/// Serializes as a flat list of [`ScoreCell`]s in key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ScoreCell>", into = "Vec<ScoreCell>")]
pub struct ScoreMatrix {
    rows: BTreeMap<String, BTreeMap<String, f64>>,
}

impl ScoreMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a cell, returning the previous value if one was present.
    pub fn set(
        &mut self,
        alternative_id: impl Into<String>,
        criterion_id: impl Into<String>,
        value: f64,
    ) -> Option<f64> {
        self.rows
            .entry(alternative_id.into())
            .or_default()
            .insert(criterion_id.into(), value)
    }

    pub fn get(&self, alternative_id: &str, criterion_id: &str) -> Option<f64> {
        self.rows
            .get(alternative_id)
            .and_then(|row| row.get(criterion_id))
            .copied()
    }

    pub fn remove(&mut self, alternative_id: &str, criterion_id: &str) -> Option<f64> {
        let row = self.rows.get_mut(alternative_id)?;
        let removed = row.remove(criterion_id);
        if row.is_empty() {
            self.rows.remove(alternative_id);
        }
        removed
    }

    /// Drops every cell belonging to the alternative. Returns the number removed.
    pub fn remove_alternative(&mut self, alternative_id: &str) -> usize {
        self.rows
            .remove(alternative_id)
            .map_or(0, |row| row.len())
    }

    /// Drops every cell belonging to the criterion. Returns the number removed.
    pub fn remove_criterion(&mut self, criterion_id: &str) -> usize {
        let mut removed = 0;
        for row in self.rows.values_mut() {
            if row.remove(criterion_id).is_some() {
                removed += 1;
            }
        }
        self.rows.retain(|_, row| !row.is_empty());
        removed
    }

    pub fn len(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &str, f64)> + '_ {
        self.rows.iter().flat_map(|(alternative_id, row)| {
            row.iter().map(move |(criterion_id, value)| {
                (alternative_id.as_str(), criterion_id.as_str(), *value)
            })
        })
    }
}

impl From<Vec<ScoreCell>> for ScoreMatrix {
    fn from(cells: Vec<ScoreCell>) -> Self {
        cells.into_iter().collect()
    }
}

impl From<ScoreMatrix> for Vec<ScoreCell> {
    fn from(matrix: ScoreMatrix) -> Self {
        matrix
            .rows
            .into_iter()
            .flat_map(|(alternative_id, row)| {
                row.into_iter().map(move |(criterion_id, value)| ScoreCell {
                    alternative_id: alternative_id.clone(),
                    criterion_id,
                    value,
                })
            })
            .collect()
    }
}

impl FromIterator<ScoreCell> for ScoreMatrix {
    fn from_iter<I: IntoIterator<Item = ScoreCell>>(iter: I) -> Self {
        let mut matrix = Self::new();
        for cell in iter {
            matrix.set(cell.alternative_id, cell.criterion_id, cell.value);
        }
        matrix
    }
}
