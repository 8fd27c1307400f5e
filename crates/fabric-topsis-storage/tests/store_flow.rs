use std::sync::atomic::{AtomicU64, Ordering};

use fabric_topsis_core::{Polarity, ScoreCell, TopsisEngine};
use fabric_topsis_storage::{
    now_ms, CriterionPatch, NewAlternative, NewCriterion, PersistentDecisionStore, StoredRun,
};

static TEMP_SEQ: AtomicU64 = AtomicU64::new(1);

fn temp_db_path() -> std::path::PathBuf {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "fabric-topsis-flow-{}-{}-{seq}.json",
        std::process::id(),
        now_ms()
    ))
}

fn seed(store: &mut PersistentDecisionStore) {
    for (name, weight, polarity) in [
        ("Kualitas", 5.0, Polarity::Benefit),
        ("Harga Perimeter", 3.0, Polarity::Cost),
        ("Tekstur", 4.0, Polarity::Benefit),
    ] {
        store
            .add_criterion(NewCriterion {
                name: name.to_string(),
                weight,
                polarity,
            })
            .expect("add criterion");
    }
    for name in ["Kain Primisima", "Kain Doby"] {
        store
            .add_alternative(NewAlternative {
                name: name.to_string(),
                description: None,
            })
            .expect("add alternative");
    }
    for (alt, row) in [("alt-1", [90.0, 20.0, 80.0]), ("alt-2", [60.0, 50.0, 90.0])] {
        for (crit, value) in ["krit-1", "krit-2", "krit-3"].iter().zip(row) {
            store.set_score(alt, crit, value).expect("set score");
        }
    }
}

#[test]
fn state_survives_reopen() {
    let path = temp_db_path();
    {
        let mut store = PersistentDecisionStore::open(&path).expect("open");
        seed(&mut store);
    }

    let mut reopened = PersistentDecisionStore::open(&path).expect("reopen");
    let snapshot = reopened.snapshot();
    assert_eq!(snapshot.criteria.len(), 3);
    assert_eq!(snapshot.alternatives.len(), 2);
    assert_eq!(snapshot.scores.len(), 6);
    assert_eq!(snapshot.criteria[1].polarity, Polarity::Cost);

    let next = reopened
        .add_criterion(NewCriterion {
            name: "Ramah Lingkungan".to_string(),
            weight: 4.0,
            polarity: Polarity::Benefit,
        })
        .expect("add after reopen");
    assert_eq!(next.criterion.id, "krit-4");
    assert_eq!(next.sequence, 4);
}

#[test]
fn results_are_replaced_wholesale_and_go_stale_on_edit() {
    let path = temp_db_path();
    let mut store = PersistentDecisionStore::open(&path).expect("open");
    seed(&mut store);

    let snapshot = store.snapshot();
    let report = TopsisEngine::default()
        .evaluate(&snapshot.criteria, &snapshot.alternatives, &snapshot.scores)
        .expect("evaluate");
    store
        .replace_results(StoredRun::from_report("run-1", snapshot.revision, &report))
        .expect("store run 1");
    store
        .replace_results(StoredRun::from_report("run-2", snapshot.revision, &report))
        .expect("store run 2");

    let stored = store.results().expect("results");
    assert_eq!(stored.run_id, "run-2");
    assert_eq!(stored.results.len(), 2);
    assert_eq!(stored.results[0].alternative_name, "Kain Primisima");
    assert_eq!(stored.results[0].rank, 1);
    assert_eq!(stored.input_revision, store.revision());

    store
        .update_criterion(
            "krit-3",
            CriterionPatch {
                weight: Some(1.0),
                ..CriterionPatch::default()
            },
        )
        .expect("update");
    assert_ne!(store.results().expect("results").input_revision, store.revision());
}

#[test]
fn incomplete_store_snapshot_is_rejected_by_engine() {
    let path = temp_db_path();
    let mut store = PersistentDecisionStore::open(&path).expect("open");
    seed(&mut store);
    assert!(store.clear_score("alt-2", "krit-3").expect("clear"));

    let snapshot = store.snapshot();
    let err = TopsisEngine::default()
        .evaluate(&snapshot.criteria, &snapshot.alternatives, &snapshot.scores)
        .expect_err("incomplete");
    assert_eq!(err.missing(), Some(1));
}

#[test]
fn scores_for_unknown_ids_are_rejected() {
    let path = temp_db_path();
    let mut store = PersistentDecisionStore::open(&path).expect("open");
    seed(&mut store);
    assert!(store.set_score("alt-9", "krit-1", 10.0).is_err());
    assert!(store.set_score("alt-1", "krit-9", 10.0).is_err());
    assert!(store.set_score("alt-1", "krit-1", -5.0).is_err());
}

#[test]
fn score_batch_is_all_or_nothing() {
    let path = temp_db_path();
    let mut store = PersistentDecisionStore::open(&path).expect("open");
    seed(&mut store);
    let revision = store.revision();

    let cell = |alt: &str, crit: &str, value: f64| ScoreCell {
        alternative_id: alt.to_string(),
        criterion_id: crit.to_string(),
        value,
    };
    let rejected = store.set_scores(&[cell("alt-1", "krit-1", 10.0), cell("alt-1", "krit-9", 10.0)]);
    assert!(rejected.is_err());
    assert_eq!(store.revision(), revision);
    assert_eq!(store.snapshot().scores.get("alt-1", "krit-1"), Some(90.0));

    let written = store
        .set_scores(&[cell("alt-1", "krit-1", 75.0), cell("alt-2", "krit-1", 65.0)])
        .expect("batch");
    assert_eq!(written, 2);
    assert_eq!(store.revision(), revision + 1);
    assert_eq!(store.snapshot().scores.get("alt-2", "krit-1"), Some(65.0));
}

#[test]
fn failed_write_leaves_store_unchanged() {
    let dir = temp_db_path().with_extension("d");
    let path = dir.join("store.json");
    let mut store = PersistentDecisionStore::open(&path).expect("open");
    seed(&mut store);
    let revision = store.revision();
    let before = store.snapshot();
    std::fs::remove_dir_all(&dir).expect("remove store dir");

    let added = store.add_criterion(NewCriterion {
        name: "Ramah Lingkungan".to_string(),
        weight: 4.0,
        polarity: Polarity::Benefit,
    });
    assert!(added.is_err());
    assert_eq!(store.criteria().len(), 3);
    assert_eq!(store.revision(), revision);

    let batch = store.set_scores(&[ScoreCell {
        alternative_id: "alt-1".to_string(),
        criterion_id: "krit-1".to_string(),
        value: 10.0,
    }]);
    assert!(batch.is_err());
    assert!(store.remove_alternative("alt-2").is_err());

    let report = TopsisEngine::default()
        .evaluate(&before.criteria, &before.alternatives, &before.scores)
        .expect("evaluate");
    let stored = store.replace_results(StoredRun::from_report("run-1", revision, &report));
    assert!(stored.is_err());
    assert!(store.results().is_none());
    assert_eq!(store.snapshot(), before);

    std::fs::create_dir_all(&dir).expect("recreate store dir");
    let retried = store
        .add_criterion(NewCriterion {
            name: "Ramah Lingkungan".to_string(),
            weight: 4.0,
            polarity: Polarity::Benefit,
        })
        .expect("add after recovery");
    assert_eq!(retried.criterion.id, "krit-4");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn deleted_ids_are_not_reused_after_reopen() {
    let path = temp_db_path();
    {
        let mut store = PersistentDecisionStore::open(&path).expect("open");
        for name in ["A", "B", "C"] {
            store
                .add_alternative(NewAlternative {
                    name: name.to_string(),
                    description: None,
                })
                .expect("add alternative");
        }
        assert!(store.remove_alternative("alt-3").expect("remove"));
    }

    let mut reopened = PersistentDecisionStore::open(&path).expect("reopen");
    let next = reopened
        .add_alternative(NewAlternative {
            name: "D".to_string(),
            description: None,
        })
        .expect("add after reopen");
    assert_eq!(next.alternative.id, "alt-4");
}
