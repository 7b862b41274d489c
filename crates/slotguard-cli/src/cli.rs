//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub(crate) const CLI_LONG_ABOUT: &str =
    "Bounded symbolic verification of smart-contract storage transitions.\n\n\
    Each property is checked by asking an SMT solver for an execution that\n\
    breaks it: none means PROVED within the bound, one means VIOLATED with a\n\
    counterexample, and a timeout is reported as UNKNOWN.\n\n\
    Exit status: 0 when every check matches its expectation, 1 when one\n\
    does not, 2 when a check is left undecided.";

#[derive(Parser)]
#[command(name = "slotguard")]
#[command(about = "Bounded symbolic verification of smart-contract storage transitions")]
#[command(long_about = CLI_LONG_ABOUT)]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Check every property of a contract description (.json)
    Check {
        /// Path to the contract description
        contract: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Check the built-in multisig and withdrawal contracts
    Demo {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Print the SMT-LIB2 script of every query without solving
    Smt {
        /// Path to the contract description
        contract: PathBuf,

        /// Exploration depth for contracts that do not set one
        #[arg(long, default_value_t = 4)]
        depth: usize,
    },
}

#[derive(Args, Clone, Debug)]
pub(crate) struct RunArgs {
    /// Solver backend: z3 | z3-process | cvc5
    #[arg(long, default_value = "z3")]
    pub(crate) solver: String,

    /// Command line for a process backend (overrides the default binary)
    #[arg(long)]
    pub(crate) solver_cmd: Option<String>,

    /// Per-query timeout in seconds (0 disables)
    #[arg(long, default_value_t = 60)]
    pub(crate) timeout: u64,

    /// Exploration depth for contracts that do not set one
    #[arg(long, default_value_t = 4)]
    pub(crate) depth: usize,

    /// Directory receiving one .smt2 script per query
    #[arg(long)]
    pub(crate) dump_smt: Option<PathBuf>,

    /// Output format: text | json
    #[arg(long, default_value = "text")]
    pub(crate) format: String,
}
