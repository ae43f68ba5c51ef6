//! # Configuration Tests
//!
//! Defaults, partial JSON documents, and validation failures.

use mcsim_core::common::{FuKind, SimError};
use mcsim_core::config::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn default_config_is_valid() {
    assert!(Config::default().validate().is_ok());
}

#[test]
fn partial_json_keeps_other_defaults() {
    let config = Config::from_json(
        r#"{
            "processor": { "num_cores": 4, "rob_size": 64 },
            "memory": { "l1_d": { "sets": 128, "assoc": 2, "hit_latency": 2 } }
        }"#,
    )
    .unwrap();

    assert_eq!(config.processor.num_cores, 4);
    assert_eq!(config.processor.rob_size, 64);
    assert_eq!(config.processor.threads_per_core, ProcessorConfig::default().threads_per_core);
    assert_eq!(config.memory.l1_d.sets, 128);
    assert_eq!(config.memory.l1_d.line_size, MemoryConfig::default().l1_d.line_size);
    assert_eq!(config.predictor, PredictorConfig::default());
}

#[test]
fn functional_units_parse_from_json() {
    let config = Config::from_json(
        r#"{ "processor": { "functional_units": [
            { "kind": "int_alu", "count": 2, "issue_latency": 1, "op_latency": 1 }
        ] } }"#,
    )
    .unwrap();
    assert_eq!(config.processor.functional_units.len(), 1);
    assert_eq!(config.processor.functional_units[0].kind, FuKind::IntAlu);
}

#[test]
fn malformed_json_is_reported() {
    assert!(matches!(Config::from_json("{ not json"), Err(SimError::Json(_))));
}

#[rstest]
#[case::zero_cores(|c: &mut Config| c.processor.num_cores = 0)]
#[case::zero_width(|c: &mut Config| c.processor.issue_width = 0)]
#[case::no_units(|c: &mut Config| c.processor.functional_units.clear())]
#[case::zero_retry(|c: &mut Config| c.processor.fu_retry_latency = 0)]
#[case::zero_timeout(|c: &mut Config| c.general.commit_timeout = 0)]
#[case::odd_bimodal(|c: &mut Config| c.predictor.bimodal_size = 1000)]
#[case::odd_btb_sets(|c: &mut Config| c.predictor.btb_sets = 3)]
#[case::empty_ras(|c: &mut Config| c.predictor.ras_size = 0)]
#[case::odd_l2_sets(|c: &mut Config| c.memory.l2.sets = 1000)]
#[case::zero_hit_latency(|c: &mut Config| c.memory.l1_i.hit_latency = 0)]
fn invalid_configs_are_rejected(#[case] mutate: fn(&mut Config)) {
    let mut config = Config::default();
    mutate(&mut config);
    assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
}

#[test]
fn total_threads_multiplies_cores_and_threads() {
    let mut config = Config::default();
    config.processor.num_cores = 3;
    config.processor.threads_per_core = 2;
    assert_eq!(config.total_threads(), 6);
}
