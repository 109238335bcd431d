//! Concrete search scenarios (S1-S6), each with N=6 rows, a hidden
//! `anomaly` label, and `score(mask) = hits - 0.5 * |mask|`.
#![allow(clippy::cast_precision_loss)]

use indexmap::IndexMap;

use boxscan_core::{bottom_up_init, BottomUpEngine, EngineConfig};
use boxscan_data::{Data, RawValue};
use boxscan_types::{BitMask, ColumnName};

fn make_data(columns: &[(&str, Vec<RawValue>)]) -> Data {
    let mut map = IndexMap::new();
    for (name, cells) in columns {
        map.insert(ColumnName::new(*name), cells.clone());
    }
    Data::load(map)
}

fn score_fn(anomaly: Vec<bool>) -> impl Fn(&BitMask) -> f64 {
    move |mask: &BitMask| {
        let hits = mask.iter_ones().filter(|&i| anomaly[i]).count() as f64;
        hits - 0.5 * mask.count_ones() as f64
    }
}

fn ordinal(values: &[i64]) -> Vec<RawValue> {
    values.iter().map(|&v| RawValue::Ordinal(v)).collect()
}

fn nominal(values: &[&str]) -> Vec<RawValue> {
    values
        .iter()
        .map(|v| RawValue::Nominal((*v).to_string()))
        .collect()
}

/// Does `result` contain exactly one predicate with the given
/// `(column, labels)` constraints, ignoring order?
fn assert_single_predicate(
    engine: &BottomUpEngine,
    result: &[boxscan_core::PredicateId],
    expected: &[(&str, &[&str])],
) {
    assert_eq!(
        result.len(),
        1,
        "expected exactly one predicate, got {}",
        result.len()
    );
    let conj = engine.arena().get(result[0]);
    assert_eq!(conj.keys().len(), expected.len());
    for (col, labels) in expected {
        let column = ColumnName::new(*col);
        let values = conj
            .values(&column)
            .unwrap_or_else(|| panic!("missing column {col}"));
        let mut got: Vec<String> = values.iter().map(ToString::to_string).collect();
        got.sort();
        let mut want: Vec<String> = labels.iter().map(|s| (*s).to_string()).collect();
        want.sort();
        assert_eq!(got, want, "mismatched value set for column {col}");
    }
}

#[test]
fn s1_no_signal_yields_empty_result() {
    let mut data = make_data(&[
        ("a", ordinal(&[0, 0, 0, 0, 0, 0])),
        ("b", ordinal(&[0, 0, 0, 0, 0, 0])),
    ]);
    let anomaly = vec![false; 6];
    let config = EngineConfig::default();
    let (arena, bases) = bottom_up_init(&mut data, &config, None).unwrap();
    let score = score_fn(anomaly);
    let mut engine = BottomUpEngine::new(&data, arena, bases, &score);
    let result = engine.expand_refine(&config).unwrap();
    assert!(
        result.is_empty(),
        "expected no accepted predicates, got {}",
        result.len()
    );
}

#[test]
fn s2_conjunction_of_two_binary_columns() {
    let mut data = make_data(&[
        ("a", ordinal(&[0, 0, 1, 1, 1, 0])),
        ("b", ordinal(&[0, 1, 0, 1, 1, 0])),
    ]);
    let anomaly = vec![false, false, false, true, true, false];
    let config = EngineConfig::default();
    let (arena, bases) = bottom_up_init(&mut data, &config, None).unwrap();
    let score = score_fn(anomaly);
    let mut engine = BottomUpEngine::new(&data, arena, bases, &score);
    let result = engine.refine(&config).unwrap();
    assert_single_predicate(&engine, &result, &[("a", &["1"]), ("b", &["1"])]);
}

#[test]
fn s3_ordinal_expand_merges_adjacent_bins() {
    let mut data = make_data(&[
        ("a", ordinal(&[0, 0, 1, 1, 2, 3])),
        ("b", ordinal(&[5, 5, 5, 5, 5, 5])),
    ]);
    let anomaly = vec![false, false, false, false, true, true];
    let config = EngineConfig::default();
    let (arena, bases) = bottom_up_init(&mut data, &config, None).unwrap();
    let score = score_fn(anomaly);
    let mut engine = BottomUpEngine::new(&data, arena, bases, &score);
    let result = engine.expand(&config).unwrap();
    assert_single_predicate(&engine, &result, &[("a", &["2", "3"])]);
}

#[test]
fn s4_nominal_coalesces_via_greedy_merge() {
    let mut data = make_data(&[("a", nominal(&["x", "x", "y", "y", "z", "z"]))]);
    let anomaly = vec![true, true, true, true, false, false];
    let config = EngineConfig {
        maxiters: Some(0),
        ..EngineConfig::default()
    };
    let (arena, bases) = bottom_up_init(&mut data, &config, None).unwrap();
    let score = score_fn(anomaly);
    let mut engine = BottomUpEngine::new(&data, arena, bases, &score);
    let result = engine.refine(&config).unwrap();
    assert_single_predicate(&engine, &result, &[("a", &["x", "y"])]);
}

#[test]
fn s5_disjoint_regions_both_survive() {
    // Neither column alone pins down a region: a=0 also covers a (b=1) row
    // with no anomaly, and a=2 also covers a (b=1) row with no anomaly, so
    // only the conjunction is precise.
    let mut data = make_data(&[
        ("a", ordinal(&[0, 0, 1, 1, 2, 2])),
        ("b", ordinal(&[0, 1, 0, 2, 2, 1])),
    ]);
    let anomaly = vec![true, false, false, false, true, false];
    let config = EngineConfig::default();
    let (arena, bases) = bottom_up_init(&mut data, &config, None).unwrap();
    let score = score_fn(anomaly);
    let mut engine = BottomUpEngine::new(&data, arena, bases, &score);
    let result = engine.refine(&config).unwrap();

    assert_eq!(result.len(), 2, "expected two disjoint accepted predicates");
    let arena = engine.arena();
    let a_id = arena.get(result[0]);
    let b_id = arena.get(result[1]);
    assert!(!a_id.is_contained_by(b_id));
    assert!(!b_id.is_contained_by(a_id));

    let mut signatures: Vec<Vec<(String, Vec<String>)>> = result
        .iter()
        .map(|&id| {
            let conj = engine.arena().get(id);
            let mut sig: Vec<(String, Vec<String>)> = conj
                .keys()
                .iter()
                .map(|k| {
                    let mut labels: Vec<String> = conj
                        .values(k)
                        .unwrap()
                        .iter()
                        .map(ToString::to_string)
                        .collect();
                    labels.sort();
                    (k.as_str().to_string(), labels)
                })
                .collect();
            sig.sort();
            sig
        })
        .collect();
    signatures.sort();
    assert_eq!(
        signatures,
        vec![
            vec![
                ("a".to_string(), vec!["0".to_string()]),
                ("b".to_string(), vec!["0".to_string()]),
            ],
            vec![
                ("a".to_string(), vec!["2".to_string()]),
                ("b".to_string(), vec!["2".to_string()]),
            ],
        ]
    );
}

#[test]
fn s6_conditional_threshold_triggers_early_stop() {
    // score(mask) = hits - 0.5*|mask|, so an all-anomalous subset of size k
    // scores 0.5k. With 24 anomalous rows at a=1 the base predicate already
    // scores 12, exceeding the conditional threshold (10), so the main loop
    // should stop before doing any further exploration and the finaliser
    // must still surface it.
    let rows = 30usize;
    let a: Vec<i64> = (0..rows).map(|i| i64::from(i < 24)).collect();
    let mut data = make_data(&[("a", ordinal(&a))]);
    let anomaly: Vec<bool> = (0..rows).map(|i| i < 24).collect();
    let config = EngineConfig {
        conditional_threshold: Some(10.0),
        ..EngineConfig::default()
    };
    let (arena, bases) = bottom_up_init(&mut data, &config, None).unwrap();
    let score = score_fn(anomaly);
    let mut engine = BottomUpEngine::new(&data, arena, bases, &score);
    let result = engine.refine(&config).unwrap();

    assert!(
        !result.is_empty(),
        "expected at least one surfaced predicate"
    );
    let top_score = result
        .iter()
        .map(|&id| engine.score_of(id).unwrap())
        .fold(f64::NEG_INFINITY, f64::max);
    assert!(
        top_score >= 10.0,
        "top score {top_score} should be >= conditional_threshold"
    );
}
