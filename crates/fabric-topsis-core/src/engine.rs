use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assemble::assemble;
use crate::diagnostics::{degenerate_columns, Diagnostic};
use crate::distance::{closeness, separation};
use crate::error::TopsisError;
use crate::ideal::{resolve_ideals, IdealSolution};
use crate::model::{Alternative, Criterion, ScoreMatrix};
use crate::normalize::normalize;
use crate::rank::assign_ranks;
use crate::weight::{apply_weights, effective_weights, EffectiveWeights, WeightingMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub weighting: WeightingMode,
}

impl EngineConfig {
    pub const fn with_weighting(weighting: WeightingMode) -> Self {
        Self { weighting }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlternativeOutcome {
    pub alternative_id: String,
    pub distance_positive: f64,
    pub distance_negative: f64,
    pub preference_score: f64,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingSummary {
    pub best_alternative_id: String,
    pub best_score: f64,
    /// Lead of the best alternative over the second one, 0 with a single alternative.
    pub runner_up_margin: f64,
    pub alternative_count: usize,
}

/// Every stage of one evaluation, rows and columns in canonical input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopsisReport {
    pub weighting: WeightingMode,
    pub criteria: Vec<Criterion>,
    pub alternatives: Vec<Alternative>,
    pub raw: Vec<Vec<f64>>,
    pub column_norms: Vec<f64>,
    pub normalized: Vec<Vec<f64>>,
    pub weights: EffectiveWeights,
    pub weighted: Vec<Vec<f64>>,
    pub ideal: IdealSolution,
    pub outcomes: Vec<AlternativeOutcome>,
    pub diagnostics: Vec<Diagnostic>,
}

impl TopsisReport {
    /// Outcomes ordered by rank, best first.
    pub fn ranking(&self) -> Vec<&AlternativeOutcome> {
        let mut ranked: Vec<&AlternativeOutcome> = self.outcomes.iter().collect();
        ranked.sort_by_key(|o| o.rank);
        ranked
    }

    pub fn outcome(&self, alternative_id: &str) -> Option<&AlternativeOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.alternative_id == alternative_id)
    }

    pub fn summary(&self) -> Option<RankingSummary> {
        let ranked = self.ranking();
        let mut top = ranked.iter();
        let best = top.next()?;
        let runner_up_margin = top
            .next()
            .map_or(0.0, |second| best.preference_score - second.preference_score);
        Some(RankingSummary {
            best_alternative_id: best.alternative_id.clone(),
            best_score: best.preference_score,
            runner_up_margin,
            alternative_count: self.outcomes.len(),
        })
    }
}

/// Stateless TOPSIS pipeline. Safe to share across threads and to call
/// concurrently; every call works on its own snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopsisEngine {
    config: EngineConfig,
}

impl TopsisEngine {
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> EngineConfig {
        self.config
    }

    pub fn evaluate(
        &self,
        criteria: &[Criterion],
        alternatives: &[Alternative],
        scores: &ScoreMatrix,
    ) -> Result<TopsisReport, TopsisError> {
        let input = assemble(criteria, alternatives, scores)?;
        debug!(
            criteria = input.criterion_count(),
            alternatives = input.alternative_count(),
            weighting = self.config.weighting.as_str(),
            "evaluating decision matrix"
        );

        let mut diagnostics = degenerate_columns(&input);

        let normalization = normalize(&input);

        let weights = effective_weights(input.criteria(), self.config.weighting);
        if weights.fallback_equal {
            diagnostics.push(Diagnostic::ZeroWeightTotal);
        } else {
            diagnostics.extend(
                input
                    .criteria()
                    .iter()
                    .filter(|c| c.weight == 0.0)
                    .map(|c| Diagnostic::ZeroWeight {
                        criterion_id: c.id.clone(),
                    }),
            );
        }
        let weighted = apply_weights(&normalization.matrix, &weights);

        let ideal = resolve_ideals(&weighted, input.criteria());

        let mut separations = Vec::with_capacity(weighted.len());
        let mut scores = Vec::with_capacity(weighted.len());
        for (row, alternative) in weighted.iter().zip(input.alternatives()) {
            let sep = separation(row, &ideal);
            let close = closeness(&sep);
            if close.fallback {
                diagnostics.push(Diagnostic::NumericFallback {
                    alternative_id: alternative.id.clone(),
                });
            }
            separations.push(sep);
            scores.push(close.score);
        }

        let ranks = assign_ranks(&scores);
        let outcomes = input
            .alternatives()
            .iter()
            .zip(separations)
            .zip(scores)
            .zip(ranks)
            .map(|(((alternative, sep), score), rank)| AlternativeOutcome {
                alternative_id: alternative.id.clone(),
                distance_positive: sep.positive,
                distance_negative: sep.negative,
                preference_score: score,
                rank,
            })
            .collect();

        for diagnostic in &diagnostics {
            diagnostic.log();
        }

        Ok(TopsisReport {
            weighting: self.config.weighting,
            criteria: input.criteria().to_vec(),
            alternatives: input.alternatives().to_vec(),
            raw: input.raw().to_vec(),
            column_norms: normalization.column_norms,
            normalized: normalization.matrix,
            weights,
            weighted,
            ideal,
            outcomes,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DegenerateKind;
    use crate::model::Polarity;

    fn three_criteria() -> Vec<Criterion> {
        vec![
            Criterion::new("k1", "Kualitas", 5.0, Polarity::Benefit),
            Criterion::new("k2", "Harga", 3.0, Polarity::Cost),
            Criterion::new("k3", "Tekstur", 4.0, Polarity::Benefit),
        ]
    }

    fn two_alternatives() -> (Vec<Alternative>, ScoreMatrix) {
        let alternatives = vec![Alternative::new("a", "A"), Alternative::new("b", "B")];
        let mut scores = ScoreMatrix::new();
        for (alt, row) in [("a", [90.0, 20.0, 80.0]), ("b", [60.0, 50.0, 90.0])] {
            for (crit, value) in ["k1", "k2", "k3"].iter().zip(row) {
                scores.set(alt, *crit, value);
            }
        }
        (alternatives, scores)
    }

    #[test]
    fn raw_weight_mode_matches_reference_values() {
        let (alternatives, scores) = two_alternatives();
        let engine = TopsisEngine::new(EngineConfig::with_weighting(WeightingMode::Raw));
        let report = engine
            .evaluate(&three_criteria(), &alternatives, &scores)
            .expect("evaluate");

        let a = report.outcome("a").expect("a");
        let b = report.outcome("b").expect("b");
        assert!((a.distance_positive - 0.332_182).abs() < 1e-3);
        assert!((a.distance_negative - 2.171_677).abs() < 1e-3);
        assert!((a.preference_score - 0.867_332).abs() < 1e-3);
        assert!((b.preference_score - 0.132_668).abs() < 1e-3);
        assert_eq!((a.rank, b.rank), (1, 2));
        assert!((report.ideal.positive[1] - 1.114_172).abs() < 1e-3);
    }

    #[test]
    fn share_mode_scales_distances_but_not_preference() {
        let (alternatives, scores) = two_alternatives();
        let report = TopsisEngine::default()
            .evaluate(&three_criteria(), &alternatives, &scores)
            .expect("evaluate");

        let a = report.outcome("a").expect("a");
        assert_eq!(report.weighting, WeightingMode::Share);
        assert!((a.distance_positive - 0.027_682).abs() < 1e-3);
        assert!((a.distance_negative - 0.180_973).abs() < 1e-3);
        assert!((a.preference_score - 0.867_332).abs() < 1e-3);
    }

    #[test]
    fn identical_alternatives_tie_in_input_order() {
        let criteria = three_criteria();
        let alternatives = vec![
            Alternative::new("first", "First"),
            Alternative::new("second", "Second"),
            Alternative::new("worse", "Worse"),
        ];
        let mut scores = ScoreMatrix::new();
        for alt in ["first", "second"] {
            scores.set(alt, "k1", 80.0);
            scores.set(alt, "k2", 40.0);
            scores.set(alt, "k3", 70.0);
        }
        scores.set("worse", "k1", 50.0);
        scores.set("worse", "k2", 60.0);
        scores.set("worse", "k3", 40.0);

        let report = TopsisEngine::default()
            .evaluate(&criteria, &alternatives, &scores)
            .expect("evaluate");
        let first = report.outcome("first").expect("first");
        let second = report.outcome("second").expect("second");
        assert_eq!(first.preference_score, second.preference_score);
        assert_eq!((first.rank, second.rank), (1, 2));
    }

    #[test]
    fn all_constant_columns_score_everyone_one() {
        let criteria = vec![Criterion::new("k1", "x", 2.0, Polarity::Benefit)];
        let alternatives = vec![Alternative::new("a", "A"), Alternative::new("b", "B")];
        let mut scores = ScoreMatrix::new();
        scores.set("a", "k1", 0.0);
        scores.set("b", "k1", 0.0);

        let report = TopsisEngine::default()
            .evaluate(&criteria, &alternatives, &scores)
            .expect("evaluate");
        assert!(report.outcomes.iter().all(|o| o.preference_score == 1.0));
        assert_eq!(report.ranking()[0].alternative_id, "a");
        assert!(report.diagnostics.contains(&Diagnostic::DegenerateColumn {
            criterion_id: "k1".to_string(),
            degeneracy: DegenerateKind::AllZero,
        }));
    }

    #[test]
    fn zero_weights_are_reported() {
        let mut criteria = three_criteria();
        criteria[2].weight = 0.0;
        let (alternatives, scores) = two_alternatives();

        let report = TopsisEngine::default()
            .evaluate(&criteria, &alternatives, &scores)
            .expect("evaluate");
        assert!(report.diagnostics.contains(&Diagnostic::ZeroWeight {
            criterion_id: "k3".to_string()
        }));
        assert!(report.weighted.iter().all(|row| row[2] == 0.0));
    }

    #[test]
    fn all_zero_weights_fall_back_to_equal_shares() {
        let mut criteria = three_criteria();
        for criterion in &mut criteria {
            criterion.weight = 0.0;
        }
        let (alternatives, scores) = two_alternatives();

        let report = TopsisEngine::default()
            .evaluate(&criteria, &alternatives, &scores)
            .expect("evaluate");
        assert!(report.weights.fallback_equal);
        assert!(report.diagnostics.contains(&Diagnostic::ZeroWeightTotal));
        assert!(report
            .weights
            .values
            .iter()
            .all(|w| (w - 1.0 / 3.0).abs() < 1e-12));
        let a = report.outcome("a").expect("a");
        let b = report.outcome("b").expect("b");
        assert!((a.preference_score - 0.882).abs() < 1e-3);
        assert_eq!((a.rank, b.rank), (1, 2));
    }

    #[test]
    fn huge_weights_rank_the_same_in_both_modes() {
        let criteria = vec![
            Criterion::new("k1", "x", 1e308, Polarity::Benefit),
            Criterion::new("k2", "y", 1e308, Polarity::Benefit),
        ];
        let alternatives = vec![Alternative::new("a", "A"), Alternative::new("b", "B")];
        let mut scores = ScoreMatrix::new();
        for (alt, value) in [("a", 10.0), ("b", 90.0)] {
            scores.set(alt, "k1", value);
            scores.set(alt, "k2", value);
        }

        for mode in [WeightingMode::Share, WeightingMode::Raw] {
            let report = TopsisEngine::new(EngineConfig::with_weighting(mode))
                .evaluate(&criteria, &alternatives, &scores)
                .expect("evaluate");
            assert!(!report.diagnostics.contains(&Diagnostic::ZeroWeightTotal));
            let a = report.outcome("a").expect("a");
            let b = report.outcome("b").expect("b");
            assert_eq!((b.rank, a.rank), (1, 2), "mode {mode}");
            assert!((b.preference_score - 1.0).abs() < 1e-9, "mode {mode}");
            assert!(a.preference_score.abs() < 1e-9, "mode {mode}");
        }
    }

    #[test]
    fn summary_reports_margin_over_runner_up() {
        let (alternatives, scores) = two_alternatives();
        let report = TopsisEngine::default()
            .evaluate(&three_criteria(), &alternatives, &scores)
            .expect("evaluate");
        let summary = report.summary().expect("summary");
        assert_eq!(summary.best_alternative_id, "a");
        assert_eq!(summary.alternative_count, 2);
        assert!((summary.runner_up_margin - (0.867_332 - 0.132_668)).abs() < 1e-3);
    }

    #[test]
    fn incomplete_scores_block_evaluation() {
        let (alternatives, mut scores) = two_alternatives();
        scores.remove("b", "k3");
        let err = TopsisEngine::default()
            .evaluate(&three_criteria(), &alternatives, &scores)
            .expect_err("incomplete");
        assert_eq!(err.missing(), Some(1));
    }
}
