use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use slotguard_smt::backends::smtlib_process::SolverCommand;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed contract description {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown solver '{0}' (expected z3, z3-process or cvc5)")]
    UnknownSolver(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which decision procedure answers the queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolverChoice {
    /// In-process z3 through its C API.
    #[default]
    Z3,
    /// A `z3` binary driven over SMT-LIB2.
    Z3Process,
    /// A `cvc5` binary driven over SMT-LIB2.
    Cvc5,
}

impl FromStr for SolverChoice {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "z3" => Ok(SolverChoice::Z3),
            "z3-process" | "z3-smtlib" => Ok(SolverChoice::Z3Process),
            "cvc5" => Ok(SolverChoice::Cvc5),
            other => Err(ConfigError::UnknownSolver(other.to_string())),
        }
    }
}

impl fmt::Display for SolverChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SolverChoice::Z3 => "z3",
            SolverChoice::Z3Process => "z3-process",
            SolverChoice::Cvc5 => "cvc5",
        })
    }
}

/// Options shared by every query of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub solver: SolverChoice,
    /// Command line replacing the default binary of a process backend.
    pub solver_command: Option<String>,
    /// Per-query solver timeout; `0` disables it.
    pub timeout_secs: u64,
    /// Number of nondeterministic steps explored from the initial state.
    pub depth: usize,
    /// Directory receiving one `.smt2` script per query.
    pub dump_smt: Option<PathBuf>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            solver: SolverChoice::Z3,
            solver_command: None,
            timeout_secs: 60,
            depth: 4,
            dump_smt: None,
        }
    }
}

/// Slack given to a process solver past its own timeout flag before the
/// process is killed.
const DEADLINE_GRACE_MS: u64 = 1000;

impl EngineOptions {
    pub fn timeout_ms(&self) -> Option<u64> {
        (self.timeout_secs > 0).then(|| self.timeout_secs.saturating_mul(1000))
    }

    /// Wall-clock limit on a process solver's `check-sat`.
    pub fn process_deadline(&self) -> Option<Duration> {
        self.timeout_ms()
            .map(|ms| Duration::from_millis(ms.saturating_add(DEADLINE_GRACE_MS)))
    }

    /// Command line for the process backends. An explicit
    /// `solver_command` wins over the built-in z3 / cvc5 invocations; the
    /// deadline applies to both.
    pub fn process_command(&self) -> Result<SolverCommand, ConfigError> {
        let cmd = match &self.solver_command {
            Some(cmdline) => SolverCommand::parse(cmdline)
                .ok_or_else(|| ConfigError::Invalid("empty solver command".into()))?,
            None => match self.solver {
                SolverChoice::Cvc5 => SolverCommand::cvc5(self.timeout_ms()),
                SolverChoice::Z3 | SolverChoice::Z3Process => SolverCommand::z3(self.timeout_ms()),
            },
        };
        Ok(cmd.with_deadline(self.process_deadline()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solver_names_round_trip() {
        for choice in [SolverChoice::Z3, SolverChoice::Z3Process, SolverChoice::Cvc5] {
            assert_eq!(choice.to_string().parse::<SolverChoice>().ok(), Some(choice));
        }
        assert!(matches!(
            "yices".parse::<SolverChoice>(),
            Err(ConfigError::UnknownSolver(_))
        ));
    }

    #[test]
    fn process_command_honours_override_and_timeout() {
        let mut opts = EngineOptions {
            solver: SolverChoice::Cvc5,
            timeout_secs: 2,
            ..EngineOptions::default()
        };
        let cmd = opts.process_command().expect("default cvc5 command");
        assert_eq!(cmd.program, "cvc5");
        assert!(cmd.args.iter().any(|a| a == "--tlimit-per=2000"));

        assert_eq!(cmd.deadline, Some(Duration::from_millis(3000)));

        opts.solver_command = Some("bitwuzla --lang smt2".into());
        let custom = opts.process_command().expect("override");
        assert_eq!(custom.program, "bitwuzla");
        assert_eq!(custom.deadline, Some(Duration::from_millis(3000)));

        opts.solver_command = Some("  ".into());
        assert!(matches!(opts.process_command(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_timeout_means_none() {
        let opts = EngineOptions {
            timeout_secs: 0,
            ..EngineOptions::default()
        };
        assert_eq!(opts.timeout_ms(), None);
        assert_eq!(opts.process_deadline(), None);
        assert_eq!(EngineOptions::default().timeout_ms(), Some(60_000));
    }
}
