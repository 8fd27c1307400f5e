use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use fabric_topsis_core::{
    Alternative, Criterion, Polarity, ScoreCell, ScoreMatrix, TopsisReport, WeightingMode,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CriterionRecord {
    #[serde(flatten)]
    pub criterion: Criterion,
    /// Display and computation order, assigned at creation.
    pub sequence: u32,
    pub created_ms: u64,
    pub updated_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlternativeRecord {
    #[serde(flatten)]
    pub alternative: Alternative,
    pub sequence: u32,
    pub created_ms: u64,
    pub updated_ms: u64,
}

#[derive(Debug, Clone)]
pub struct NewCriterion {
    pub name: String,
    pub weight: f64,
    pub polarity: Polarity,
}

#[derive(Debug, Clone, Default)]
pub struct CriterionPatch {
    pub name: Option<String>,
    pub weight: Option<f64>,
    pub polarity: Option<Polarity>,
}

#[derive(Debug, Clone)]
pub struct NewAlternative {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AlternativePatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Immutable view of the inputs of one computation, ordered by `sequence`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionSnapshot {
    pub criteria: Vec<Criterion>,
    pub alternatives: Vec<Alternative>,
    pub scores: ScoreMatrix,
    pub revision: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredResult {
    pub alternative_id: String,
    pub alternative_name: String,
    pub distance_positive: f64,
    pub distance_negative: f64,
    pub preference_score: f64,
    pub rank: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredRun {
    pub run_id: String,
    pub weighting: WeightingMode,
    pub computed_ms: u64,
    /// Input revision the results were computed from.
    pub input_revision: u64,
    /// Ordered by rank.
    pub results: Vec<StoredResult>,
}

impl StoredRun {
    pub fn from_report(run_id: impl Into<String>, input_revision: u64, report: &TopsisReport) -> Self {
        let results = report
            .ranking()
            .into_iter()
            .map(|outcome| StoredResult {
                alternative_id: outcome.alternative_id.clone(),
                alternative_name: report
                    .alternatives
                    .iter()
                    .find(|a| a.id == outcome.alternative_id)
                    .map(|a| a.name.clone())
                    .unwrap_or_default(),
                distance_positive: outcome.distance_positive,
                distance_negative: outcome.distance_negative,
                preference_score: outcome.preference_score,
                rank: outcome.rank,
            })
            .collect();

        Self {
            run_id: run_id.into(),
            weighting: report.weighting,
            computed_ms: now_ms(),
            input_revision,
            results,
        }
    }
}

pub trait StorageBackend: Send {
    fn add_criterion(&mut self, new_criterion: NewCriterion) -> Result<CriterionRecord, StorageError>;
    fn update_criterion(
        &mut self,
        id: &str,
        patch: CriterionPatch,
    ) -> Result<CriterionRecord, StorageError>;
    fn remove_criterion(&mut self, id: &str) -> Result<bool, StorageError>;
    fn reorder_criteria(&mut self, ordered_ids: &[String]) -> Result<(), StorageError>;
    fn criteria(&self) -> Vec<CriterionRecord>;

    fn add_alternative(
        &mut self,
        new_alternative: NewAlternative,
    ) -> Result<AlternativeRecord, StorageError>;
    fn update_alternative(
        &mut self,
        id: &str,
        patch: AlternativePatch,
    ) -> Result<AlternativeRecord, StorageError>;
    fn remove_alternative(&mut self, id: &str) -> Result<bool, StorageError>;
    fn reorder_alternatives(&mut self, ordered_ids: &[String]) -> Result<(), StorageError>;
    fn alternatives(&self) -> Vec<AlternativeRecord>;

    fn set_score(
        &mut self,
        alternative_id: &str,
        criterion_id: &str,
        value: f64,
    ) -> Result<Option<f64>, StorageError>;
    fn set_scores(&mut self, cells: &[ScoreCell]) -> Result<usize, StorageError>;
    fn clear_score(&mut self, alternative_id: &str, criterion_id: &str)
        -> Result<bool, StorageError>;

    fn snapshot(&self) -> DecisionSnapshot;
    fn replace_results(&mut self, run: StoredRun) -> Result<(), StorageError>;
    fn results(&self) -> Option<StoredRun>;
    fn revision(&self) -> u64;
    fn stats(&self) -> serde_json::Value;
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Persisted {
    #[serde(default)]
    revision: u64,
    /// Id counters, so ids of deleted records are never handed out again.
    #[serde(default)]
    next_criterion_id: u64,
    #[serde(default)]
    next_alternative_id: u64,
    #[serde(default)]
    criteria: Vec<CriterionRecord>,
    #[serde(default)]
    alternatives: Vec<AlternativeRecord>,
    #[serde(default)]
    scores: ScoreMatrix,
    #[serde(default)]
    results: Option<StoredRun>,
}

pub struct PersistentDecisionStore {
    path: PathBuf,
    state: Persisted,
}

impl PersistentDecisionStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        if !path.exists() {
            write_state(&path, &Persisted::default())?;
        }

        let bytes = fs::read(&path)?;
        let mut state: Persisted = serde_json::from_slice(&bytes)?;
        state.next_criterion_id = state.next_criterion_id.max(next_id(
            state.criteria.iter().map(|c| c.criterion.id.as_str()),
            "krit-",
        ));
        state.next_alternative_id = state.next_alternative_id.max(next_id(
            state.alternatives.iter().map(|a| a.alternative.id.as_str()),
            "alt-",
        ));
        debug!(
            path = %path.display(),
            criteria = state.criteria.len(),
            alternatives = state.alternatives.len(),
            scores = state.scores.len(),
            "opened decision store"
        );

        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn add_criterion(
        &mut self,
        new_criterion: NewCriterion,
    ) -> Result<CriterionRecord, StorageError> {
        let name = required_name(&new_criterion.name)?;
        validate_weight(new_criterion.weight)?;

        self.commit_inputs(|state| {
            let now = now_ms();
            let record = CriterionRecord {
                criterion: Criterion::new(
                    format!("krit-{}", state.next_criterion_id),
                    name,
                    new_criterion.weight,
                    new_criterion.polarity,
                ),
                sequence: next_sequence(state.criteria.iter().map(|c| c.sequence)),
                created_ms: now,
                updated_ms: now,
            };
            state.next_criterion_id += 1;
            state.criteria.push(record.clone());
            Ok(record)
        })
    }

    pub fn update_criterion(
        &mut self,
        id: &str,
        patch: CriterionPatch,
    ) -> Result<CriterionRecord, StorageError> {
        let name = patch.name.as_deref().map(required_name).transpose()?;
        if let Some(weight) = patch.weight {
            validate_weight(weight)?;
        }

        self.commit_inputs(|state| {
            let record = state
                .criteria
                .iter_mut()
                .find(|c| c.criterion.id == id)
                .ok_or_else(|| not_found("criterion", id))?;
            if let Some(name) = name {
                record.criterion.name = name;
            }
            if let Some(weight) = patch.weight {
                record.criterion.weight = weight;
            }
            if let Some(polarity) = patch.polarity {
                record.criterion.polarity = polarity;
            }
            record.updated_ms = now_ms();
            Ok(record.clone())
        })
    }

    /// Deletes the criterion together with its score cells.
    pub fn remove_criterion(&mut self, id: &str) -> Result<bool, StorageError> {
        if !self.state.criteria.iter().any(|c| c.criterion.id == id) {
            return Ok(false);
        }
        let dropped = self.commit_inputs(|state| {
            state.criteria.retain(|c| c.criterion.id != id);
            Ok(state.scores.remove_criterion(id))
        })?;
        debug!(criterion_id = id, dropped, "removed criterion");
        Ok(true)
    }

    pub fn reorder_criteria(&mut self, ordered_ids: &[String]) -> Result<(), StorageError> {
        let existing = self.state.criteria.iter().map(|c| c.criterion.id.as_str());
        ensure_permutation("criterion", existing, ordered_ids)?;
        self.commit_inputs(|state| {
            for record in &mut state.criteria {
                record.sequence = position_of(ordered_ids, &record.criterion.id);
            }
            Ok(())
        })
    }

    pub fn criteria(&self) -> Vec<CriterionRecord> {
        let mut out = self.state.criteria.clone();
        out.sort_by_key(|c| c.sequence);
        out
    }

    pub fn add_alternative(
        &mut self,
        new_alternative: NewAlternative,
    ) -> Result<AlternativeRecord, StorageError> {
        let name = required_name(&new_alternative.name)?;

        self.commit_inputs(|state| {
            let now = now_ms();
            let record = AlternativeRecord {
                alternative: Alternative {
                    id: format!("alt-{}", state.next_alternative_id),
                    name,
                    description: clean_description(new_alternative.description),
                },
                sequence: next_sequence(state.alternatives.iter().map(|a| a.sequence)),
                created_ms: now,
                updated_ms: now,
            };
            state.next_alternative_id += 1;
            state.alternatives.push(record.clone());
            Ok(record)
        })
    }

    pub fn update_alternative(
        &mut self,
        id: &str,
        patch: AlternativePatch,
    ) -> Result<AlternativeRecord, StorageError> {
        let name = patch.name.as_deref().map(required_name).transpose()?;

        self.commit_inputs(|state| {
            let record = state
                .alternatives
                .iter_mut()
                .find(|a| a.alternative.id == id)
                .ok_or_else(|| not_found("alternative", id))?;
            if let Some(name) = name {
                record.alternative.name = name;
            }
            if patch.description.is_some() {
                record.alternative.description = clean_description(patch.description);
            }
            record.updated_ms = now_ms();
            Ok(record.clone())
        })
    }

    /// Deletes the alternative together with its score cells.
    pub fn remove_alternative(&mut self, id: &str) -> Result<bool, StorageError> {
        if !self.state.alternatives.iter().any(|a| a.alternative.id == id) {
            return Ok(false);
        }
        let dropped = self.commit_inputs(|state| {
            state.alternatives.retain(|a| a.alternative.id != id);
            Ok(state.scores.remove_alternative(id))
        })?;
        debug!(alternative_id = id, dropped, "removed alternative");
        Ok(true)
    }

    pub fn reorder_alternatives(&mut self, ordered_ids: &[String]) -> Result<(), StorageError> {
        let existing = self
            .state
            .alternatives
            .iter()
            .map(|a| a.alternative.id.as_str());
        ensure_permutation("alternative", existing, ordered_ids)?;
        self.commit_inputs(|state| {
            for record in &mut state.alternatives {
                record.sequence = position_of(ordered_ids, &record.alternative.id);
            }
            Ok(())
        })
    }

    pub fn alternatives(&self) -> Vec<AlternativeRecord> {
        let mut out = self.state.alternatives.clone();
        out.sort_by_key(|a| a.sequence);
        out
    }

    pub fn set_score(
        &mut self,
        alternative_id: &str,
        criterion_id: &str,
        value: f64,
    ) -> Result<Option<f64>, StorageError> {
        validate_score(value)?;
        self.ensure_cell_ids(alternative_id, criterion_id)?;

        self.commit_inputs(|state| Ok(state.scores.set(alternative_id, criterion_id, value)))
    }

    /// Writes every cell or none of them. Returns the number of cells written.
    pub fn set_scores(&mut self, cells: &[ScoreCell]) -> Result<usize, StorageError> {
        for cell in cells {
            validate_score(cell.value)?;
            self.ensure_cell_ids(&cell.alternative_id, &cell.criterion_id)?;
        }
        if cells.is_empty() {
            return Ok(0);
        }

        self.commit_inputs(|state| {
            for cell in cells {
                state
                    .scores
                    .set(&cell.alternative_id, &cell.criterion_id, cell.value);
            }
            Ok(())
        })?;
        debug!(cells = cells.len(), "stored score batch");
        Ok(cells.len())
    }

    pub fn clear_score(
        &mut self,
        alternative_id: &str,
        criterion_id: &str,
    ) -> Result<bool, StorageError> {
        if self.state.scores.get(alternative_id, criterion_id).is_none() {
            return Ok(false);
        }
        self.commit_inputs(|state| Ok(state.scores.remove(alternative_id, criterion_id).is_some()))
    }

    pub fn snapshot(&self) -> DecisionSnapshot {
        DecisionSnapshot {
            criteria: self.criteria().into_iter().map(|c| c.criterion).collect(),
            alternatives: self
                .alternatives()
                .into_iter()
                .map(|a| a.alternative)
                .collect(),
            scores: self.state.scores.clone(),
            revision: self.state.revision,
        }
    }

    /// Drops any previously stored results and stores `run` in their place,
    /// in a single write.
    pub fn replace_results(&mut self, run: StoredRun) -> Result<(), StorageError> {
        let replaced = self.commit(|state| Ok(state.results.replace(run)))?;
        info!(
            replaced_run = replaced.as_ref().map(|r| r.run_id.as_str()),
            revision = self.state.revision,
            "stored computation results"
        );
        Ok(())
    }

    pub fn results(&self) -> Option<StoredRun> {
        self.state.results.clone()
    }

    pub const fn revision(&self) -> u64 {
        self.state.revision
    }

    pub fn stats(&self) -> serde_json::Value {
        serde_json::json!({
            "criteria": self.state.criteria.len(),
            "alternatives": self.state.alternatives.len(),
            "scores": self.state.scores.len(),
            "revision": self.state.revision,
            "has_results": self.state.results.is_some(),
            "path": self.path,
        })
    }

    fn ensure_cell_ids(&self, alternative_id: &str, criterion_id: &str) -> Result<(), StorageError> {
        if !self
            .state
            .alternatives
            .iter()
            .any(|a| a.alternative.id == alternative_id)
        {
            return Err(not_found("alternative", alternative_id));
        }
        if !self
            .state
            .criteria
            .iter()
            .any(|c| c.criterion.id == criterion_id)
        {
            return Err(not_found("criterion", criterion_id));
        }
        Ok(())
    }

    /// Like [`Self::commit`], also bumping the input revision.
    fn commit_inputs<T>(
        &mut self,
        change: impl FnOnce(&mut Persisted) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        self.commit(|state| {
            let out = change(state)?;
            state.revision = state.revision.saturating_add(1);
            Ok(out)
        })
    }

    /// Applies `change` to a copy of the state and swaps the copy in only
    /// after it has been written. On error the store is left as it was.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut Persisted) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut next = self.state.clone();
        let out = change(&mut next)?;
        write_state(&self.path, &next)?;
        self.state = next;
        Ok(out)
    }
}

fn write_state(path: &Path, state: &Persisted) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(state)?;
    fs::write(path, bytes)?;
    Ok(())
}

impl StorageBackend for PersistentDecisionStore {
    fn add_criterion(&mut self, new_criterion: NewCriterion) -> Result<CriterionRecord, StorageError> {
        Self::add_criterion(self, new_criterion)
    }

    fn update_criterion(
        &mut self,
        id: &str,
        patch: CriterionPatch,
    ) -> Result<CriterionRecord, StorageError> {
        Self::update_criterion(self, id, patch)
    }

    fn remove_criterion(&mut self, id: &str) -> Result<bool, StorageError> {
        Self::remove_criterion(self, id)
    }

    fn reorder_criteria(&mut self, ordered_ids: &[String]) -> Result<(), StorageError> {
        Self::reorder_criteria(self, ordered_ids)
    }

    fn criteria(&self) -> Vec<CriterionRecord> {
        Self::criteria(self)
    }

    fn add_alternative(
        &mut self,
        new_alternative: NewAlternative,
    ) -> Result<AlternativeRecord, StorageError> {
        Self::add_alternative(self, new_alternative)
    }

    fn update_alternative(
        &mut self,
        id: &str,
        patch: AlternativePatch,
    ) -> Result<AlternativeRecord, StorageError> {
        Self::update_alternative(self, id, patch)
    }

    fn remove_alternative(&mut self, id: &str) -> Result<bool, StorageError> {
        Self::remove_alternative(self, id)
    }

    fn reorder_alternatives(&mut self, ordered_ids: &[String]) -> Result<(), StorageError> {
        Self::reorder_alternatives(self, ordered_ids)
    }

    fn alternatives(&self) -> Vec<AlternativeRecord> {
        Self::alternatives(self)
    }

    fn set_score(
        &mut self,
        alternative_id: &str,
        criterion_id: &str,
        value: f64,
    ) -> Result<Option<f64>, StorageError> {
        Self::set_score(self, alternative_id, criterion_id, value)
    }

    fn set_scores(&mut self, cells: &[ScoreCell]) -> Result<usize, StorageError> {
        Self::set_scores(self, cells)
    }

    fn clear_score(
        &mut self,
        alternative_id: &str,
        criterion_id: &str,
    ) -> Result<bool, StorageError> {
        Self::clear_score(self, alternative_id, criterion_id)
    }

    fn snapshot(&self) -> DecisionSnapshot {
        Self::snapshot(self)
    }

    fn replace_results(&mut self, run: StoredRun) -> Result<(), StorageError> {
        Self::replace_results(self, run)
    }

    fn results(&self) -> Option<StoredRun> {
        Self::results(self)
    }

    fn revision(&self) -> u64 {
        Self::revision(self)
    }

    fn stats(&self) -> serde_json::Value {
        Self::stats(self)
    }
}

fn validate_score(value: f64) -> Result<(), StorageError> {
    if !value.is_finite() || value < 0.0 {
        return Err(StorageError::InvalidInput(format!(
            "score must be a finite non-negative number, got {value}"
        )));
    }
    Ok(())
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

fn next_id<'a>(ids: impl Iterator<Item = &'a str>, prefix: &str) -> u64 {
    ids.filter_map(|id| id.strip_prefix(prefix)?.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
        + 1
}

fn next_sequence(sequences: impl Iterator<Item = u32>) -> u32 {
    sequences.max().map_or(1, |max| max.saturating_add(1))
}

fn position_of(ordered_ids: &[String], id: &str) -> u32 {
    ordered_ids
        .iter()
        .position(|candidate| candidate == id)
        .and_then(|idx| u32::try_from(idx + 1).ok())
        .unwrap_or(u32::MAX)
}

fn ensure_permutation<'a>(
    kind: &'static str,
    existing: impl Iterator<Item = &'a str>,
    ordered_ids: &[String],
) -> Result<(), StorageError> {
    let existing: HashSet<&str> = existing.collect();
    let requested: HashSet<&str> = ordered_ids.iter().map(String::as_str).collect();
    if requested.len() != ordered_ids.len() {
        return Err(StorageError::InvalidInput(format!(
            "{kind} order contains duplicate ids"
        )));
    }
    if let Some(unknown) = requested.difference(&existing).next() {
        return Err(not_found(kind, unknown));
    }
    if requested.len() != existing.len() {
        return Err(StorageError::InvalidInput(format!(
            "{kind} order must list all {} ids",
            existing.len()
        )));
    }
    Ok(())
}

fn required_name(name: &str) -> Result<String, StorageError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StorageError::InvalidInput(
            "name cannot be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

fn validate_weight(weight: f64) -> Result<(), StorageError> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(StorageError::InvalidInput(format!(
            "weight must be a finite non-negative number, got {weight}"
        )));
    }
    Ok(())
}

fn not_found(kind: &'static str, id: &str) -> StorageError {
    StorageError::NotFound {
        kind,
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> PersistentDecisionStore {
        let path = std::env::temp_dir().join(format!(
            "fabric-topsis-store-{tag}-{}-{}.json",
            std::process::id(),
            now_ms()
        ));
        PersistentDecisionStore::open(&path).expect("open store")
    }

    fn criterion(name: &str, weight: f64, polarity: Polarity) -> NewCriterion {
        NewCriterion {
            name: name.to_string(),
            weight,
            polarity,
        }
    }

    #[test]
    fn assigns_ids_and_sequences_in_creation_order() {
        let mut store = temp_store("ids");
        let k1 = store
            .add_criterion(criterion("Kualitas", 5.0, Polarity::Benefit))
            .expect("add");
        let k2 = store
            .add_criterion(criterion("Harga", 3.0, Polarity::Cost))
            .expect("add");

        assert_eq!(k1.criterion.id, "krit-1");
        assert_eq!(k2.criterion.id, "krit-2");
        assert_eq!((k1.sequence, k2.sequence), (1, 2));
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn rejects_blank_names_and_bad_weights() {
        let mut store = temp_store("reject");
        assert!(matches!(
            store.add_criterion(criterion("  ", 1.0, Polarity::Benefit)),
            Err(StorageError::InvalidInput(_))
        ));
        assert!(matches!(
            store.add_criterion(criterion("Harga", f64::NAN, Polarity::Cost)),
            Err(StorageError::InvalidInput(_))
        ));
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn removing_an_alternative_drops_its_scores() {
        let mut store = temp_store("remove");
        let k = store
            .add_criterion(criterion("Kualitas", 5.0, Polarity::Benefit))
            .expect("add");
        let a = store
            .add_alternative(NewAlternative {
                name: "Kain Doby".to_string(),
                description: None,
            })
            .expect("add");
        store
            .set_score(&a.alternative.id, &k.criterion.id, 80.0)
            .expect("score");

        assert!(store.remove_alternative(&a.alternative.id).expect("remove"));
        assert!(store.snapshot().scores.is_empty());
        assert!(!store.remove_alternative(&a.alternative.id).expect("remove again"));
    }

    #[test]
    fn reorder_requires_a_full_permutation() {
        let mut store = temp_store("reorder");
        for name in ["A", "B", "C"] {
            store
                .add_alternative(NewAlternative {
                    name: name.to_string(),
                    description: None,
                })
                .expect("add");
        }

        let partial = vec!["alt-1".to_string(), "alt-2".to_string()];
        assert!(store.reorder_alternatives(&partial).is_err());

        let order = vec!["alt-3".to_string(), "alt-1".to_string(), "alt-2".to_string()];
        store.reorder_alternatives(&order).expect("reorder");
        let names = store
            .snapshot()
            .alternatives
            .into_iter()
            .map(|a| a.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["C", "A", "B"]);
    }
}
