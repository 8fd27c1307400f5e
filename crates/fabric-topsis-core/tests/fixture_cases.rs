use std::fs;
use std::path::PathBuf;

use fabric_topsis_core::{
    Alternative, Criterion, EngineConfig, ScoreCell, ScoreMatrix, TopsisEngine, WeightingMode,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Case {
    name: String,
    weighting: WeightingMode,
    criteria: Vec<Criterion>,
    alternatives: Vec<Alternative>,
    scores: Vec<ScoreCell>,
    expected: Expected,
}

#[derive(Debug, Deserialize)]
struct Expected {
    ranking: Vec<String>,
    outcomes: Vec<ExpectedOutcome>,
}

#[derive(Debug, Deserialize)]
struct ExpectedOutcome {
    alternative_id: String,
    distance_positive: f64,
    distance_negative: f64,
    preference_score: f64,
}

fn load_cases() -> Vec<Case> {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let fixture = root
        .join("..")
        .join("..")
        .join("data")
        .join("fixtures")
        .join("topsis_cases.json");

    let content = fs::read_to_string(&fixture)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", fixture.display()));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", fixture.display()))
}

#[test]
fn reference_cases_match_to_three_decimals() {
    for case in load_cases() {
        let engine = TopsisEngine::new(EngineConfig::with_weighting(case.weighting));
        let scores: ScoreMatrix = case.scores.into_iter().collect();
        let report = engine
            .evaluate(&case.criteria, &case.alternatives, &scores)
            .unwrap_or_else(|e| panic!("case {} failed to evaluate: {e}", case.name));

        let ranking = report
            .ranking()
            .into_iter()
            .map(|o| o.alternative_id.clone())
            .collect::<Vec<_>>();
        assert_eq!(ranking, case.expected.ranking, "case {} ranking", case.name);

        for expected in &case.expected.outcomes {
            let got = report
                .outcome(&expected.alternative_id)
                .unwrap_or_else(|| panic!("case {} missing {}", case.name, expected.alternative_id));
            assert!(
                (got.distance_positive - expected.distance_positive).abs() < 1e-3,
                "case {} D+ of {}: {} vs {}",
                case.name,
                expected.alternative_id,
                got.distance_positive,
                expected.distance_positive
            );
            assert!(
                (got.distance_negative - expected.distance_negative).abs() < 1e-3,
                "case {} D- of {}",
                case.name,
                expected.alternative_id
            );
            assert!(
                (got.preference_score - expected.preference_score).abs() < 1e-3,
                "case {} preference of {}",
                case.name,
                expected.alternative_id
            );
        }
    }
}

#[test]
fn output_covers_every_alternative_once() {
    for case in load_cases() {
        let scores: ScoreMatrix = case.scores.into_iter().collect();
        let report = TopsisEngine::default()
            .evaluate(&case.criteria, &case.alternatives, &scores)
            .expect("evaluate");

        assert_eq!(report.outcomes.len(), case.alternatives.len());
        let mut ranks = report.outcomes.iter().map(|o| o.rank).collect::<Vec<_>>();
        ranks.sort_unstable();
        let expected = (1..=u32::try_from(case.alternatives.len()).expect("fits")).collect::<Vec<_>>();
        assert_eq!(ranks, expected, "case {}", case.name);
    }
}
