use std::path::Path;

use miette::IntoDiagnostic;
use slotguard_engine::contract::ContractSpec;

use super::{make_options, parse_output_format, run_suite};
use crate::cli::RunArgs;

pub(crate) fn run_check_command(contract: &Path, run: &RunArgs) -> miette::Result<i32> {
    let format = parse_output_format(&run.format)?;
    let options = make_options(run)?;
    let spec = ContractSpec::load(contract).into_diagnostic()?;
    let cases = spec.cases(&options).into_diagnostic()?;
    run_suite(&cases, options, format)
}
