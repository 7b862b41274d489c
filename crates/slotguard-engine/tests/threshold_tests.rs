#![cfg(feature = "z3")]

mod common;
use common::*;

use slotguard_engine::domains::{ThresholdConfig, ThresholdModel};
use slotguard_engine::report::{run_cases, Outcome};

fn model(config: ThresholdConfig) -> ThresholdModel {
    ThresholdModel::new(config, 4).expect("valid threshold config")
}

#[test]
fn execution_requires_threshold() {
    let m = model(ThresholdConfig::default());
    let q = m
        .exploration(4)
        .query(&m.authorization_property())
        .expect("query");
    assert!(verdict(&q).is_proved());
}

#[test]
fn execution_is_reachable_with_enough_steps() {
    let m = model(ThresholdConfig::default());
    let q = m
        .exploration(4)
        .query(&m.execution_unreachable_property())
        .expect("query");
    let v = verdict(&q);
    assert_eq!(v.verdict_class(), "violated");
    // three approvals and the execution, in that order
    assert_eq!(witness_value(&v, "s3.executed"), "true");
    assert_eq!(witness_value(&v, "s2.executed"), "false");
}

#[test]
fn execution_is_unreachable_below_the_threshold() {
    let m = model(ThresholdConfig::default());
    let q = m
        .exploration(3)
        .query(&m.execution_unreachable_property())
        .expect("query");
    assert!(verdict(&q).is_proved());
}

#[test]
fn approvals_count_distinct_admins() {
    let m = model(ThresholdConfig::default().with_required(2).with_admins(3));
    let q = m
        .exploration(3)
        .query(&m.accounting_property())
        .expect("query");
    assert!(verdict(&q).is_proved());
}

#[test]
fn relaxed_guard_breaks_accounting() {
    let m = model(ThresholdConfig::default().relaxed());
    let q = m
        .exploration(2)
        .query(&m.accounting_property())
        .expect("query");
    let v = verdict(&q);
    assert_eq!(v.verdict_class(), "violated");
    assert!(v.witness().is_some_and(|w| w.get("s0.choice").is_some()));
}

#[test]
fn double_approval_counts_once() {
    let m = model(ThresholdConfig::default());
    let q = m
        .double_approval_scenario()
        .query(&m.double_approval_property())
        .expect("query");
    assert!(verdict(&q).is_proved());
}

#[test]
fn relaxed_double_approval_counts_twice() {
    let m = model(ThresholdConfig::default().relaxed());
    let q = m
        .double_approval_scenario()
        .query(&m.double_approval_property())
        .expect("query");
    let v = verdict(&q);
    assert_eq!(v.verdict_class(), "violated");
    let w = v.witness().expect("witness");
    // both calls go through and bump the same counter
    let counts: Vec<String> = w
        .iter()
        .filter(|(label, _)| label.contains(".approvals["))
        .map(|(_, value)| value.to_string())
        .collect();
    assert_eq!(counts, vec!["1", "2"]);
}

#[test]
fn default_suite_passes() {
    let m = model(ThresholdConfig::default());
    let report = run_cases(&checker(), &m.cases().expect("cases")).expect("run");
    assert_eq!(report.count(Outcome::Pass), 4, "{report}");
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn relaxed_suite_fails_with_counterexamples() {
    let m = model(ThresholdConfig::default().relaxed().with_depth(2));
    let report = run_cases(&checker(), &m.cases().expect("cases")).expect("run");
    assert_eq!(report.exit_code(), 1, "{report}");
    let failed: Vec<&str> = report
        .cases
        .iter()
        .filter(|c| c.outcome == Outcome::Fail)
        .map(|c| c.query.as_str())
        .collect();
    assert_eq!(
        failed,
        vec!["threshold/approval_accounting", "threshold/double_approval"]
    );
    assert!(report
        .cases
        .iter()
        .filter(|c| c.outcome == Outcome::Fail)
        .all(|c| c.witness.is_some()));
}
