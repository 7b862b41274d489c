use std::path::Path;

use miette::IntoDiagnostic;
use slotguard_engine::config::EngineOptions;
use slotguard_engine::contract::ContractSpec;
use slotguard_engine::query::render_smtlib;

pub(crate) fn run_smt_command(contract: &Path, depth: usize) -> miette::Result<i32> {
    let options = EngineOptions {
        depth,
        ..EngineOptions::default()
    };
    let spec = ContractSpec::load(contract).into_diagnostic()?;
    for case in spec.cases(&options).into_diagnostic()? {
        println!("{}", render_smtlib(&case.query));
    }
    Ok(0)
}
