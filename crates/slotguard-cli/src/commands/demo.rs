use miette::IntoDiagnostic;
use slotguard_engine::contract::demo_contracts;
use slotguard_engine::report::CheckCase;

use super::{make_options, parse_output_format, run_suite};
use crate::cli::RunArgs;

pub(crate) fn run_demo_command(run: &RunArgs) -> miette::Result<i32> {
    let format = parse_output_format(&run.format)?;
    let options = make_options(run)?;
    let mut cases: Vec<CheckCase> = Vec::new();
    for contract in demo_contracts() {
        cases.extend(contract.cases(&options).into_diagnostic()?);
    }
    run_suite(&cases, options, format)
}
