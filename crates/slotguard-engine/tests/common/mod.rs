#![allow(dead_code)]

use slotguard_engine::config::EngineOptions;
use slotguard_engine::contract::ContractSpec;
use slotguard_engine::query::VerificationQuery;
use slotguard_engine::result::Verdict;
use slotguard_engine::PropertyChecker;

pub fn options(depth: usize) -> EngineOptions {
    EngineOptions {
        depth,
        timeout_secs: 120,
        ..EngineOptions::default()
    }
}

pub fn checker() -> PropertyChecker {
    PropertyChecker::new(options(4))
}

pub fn verdict(query: &VerificationQuery) -> Verdict {
    checker()
        .check(query)
        .unwrap_or_else(|e| panic!("checking {} failed: {e}", query.name))
}

pub fn load_contract(name: &str) -> ContractSpec {
    let path = format!("{}/../../contracts/{name}", env!("CARGO_MANIFEST_DIR"));
    ContractSpec::load(std::path::Path::new(&path))
        .unwrap_or_else(|e| panic!("Failed to load {path}: {e}"))
}

pub fn witness_value(verdict: &Verdict, label: &str) -> String {
    verdict
        .witness()
        .and_then(|w| w.get(label))
        .map(ToString::to_string)
        .unwrap_or_else(|| panic!("no witness value for {label} in {verdict}"))
}
