//! Command handlers and the helpers they share.

pub(crate) mod check;
pub(crate) mod demo;
pub(crate) mod smt;

use miette::IntoDiagnostic;
use slotguard_engine::config::{EngineOptions, SolverChoice};
use slotguard_engine::report::{run_cases, CheckCase};
use slotguard_engine::PropertyChecker;
use tracing::info;

use crate::cli::RunArgs;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

pub(crate) fn parse_output_format(raw: &str) -> miette::Result<OutputFormat> {
    match raw {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        other => Err(miette::miette!(
            "Unknown output format: {other}. Use 'text' or 'json'."
        )),
    }
}

pub(crate) fn make_options(run: &RunArgs) -> miette::Result<EngineOptions> {
    let solver: SolverChoice = run.solver.parse().into_diagnostic()?;
    Ok(EngineOptions {
        solver,
        solver_command: run.solver_cmd.clone(),
        timeout_secs: run.timeout,
        depth: run.depth,
        dump_smt: run.dump_smt.clone(),
    })
}

/// Check `cases`, print the report and return the process exit code.
pub(crate) fn run_suite(
    cases: &[CheckCase],
    options: EngineOptions,
    format: OutputFormat,
) -> miette::Result<i32> {
    info!(cases = cases.len(), solver = %options.solver, "running checks");
    let checker = PropertyChecker::new(options);
    let report = run_cases(&checker, cases).into_diagnostic()?;
    match format {
        OutputFormat::Text => println!("{report}"),
        OutputFormat::Json => println!("{}", report.to_json().into_diagnostic()?),
    }
    Ok(report.exit_code())
}
