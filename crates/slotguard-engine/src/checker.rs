//! The property checker: one satisfiability call per query.
//!
//! A query asserts the initial constraints, the transition relation and the
//! negated property. `unsat` proves the property within the bound, `sat`
//! yields a witness, and anything else is reported as unknown rather than
//! retried or guessed.

use std::path::{Path, PathBuf};
use std::thread;

use slotguard_ir::ModelError;
use slotguard_smt::backends::smtlib_process::SmtLibProcess;
#[cfg(feature = "z3")]
use slotguard_smt::backends::z3_backend::Z3Solver;
use slotguard_smt::solver::{Model, SatResult, SmtSolver};
use slotguard_smt::terms::SmtTerm;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, EngineOptions, SolverChoice};
use crate::query::{render_smtlib, VerificationQuery};
use crate::result::{Verdict, Witness};

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("solver error: {0}")]
    Solver(String),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not write SMT dump to {path}: {source}")]
    Dump {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("solver backend '{0}' is not compiled into this build")]
    Unavailable(SolverChoice),
}

fn solver_err<E: std::error::Error>(e: E) -> CheckError {
    CheckError::Solver(e.to_string())
}

fn decide_in_scope<S: SmtSolver>(
    query: &VerificationQuery,
    solver: &mut S,
    observations: &[(String, SmtTerm)],
) -> Result<(SatResult, Option<Model>), S::Error> {
    for (name, sort) in query.vocabulary.iter() {
        solver.declare_var(name, sort)?;
    }
    for assertion in query.assertions() {
        solver.assert(&assertion)?;
    }
    solver.check_sat_with_values(observations)
}

/// Decide `query` with `solver`.
///
/// Every vocabulary symbol is declared inside a fresh scope, so the same
/// solver can answer several queries in turn.
pub fn check<S: SmtSolver>(query: &VerificationQuery, solver: &mut S) -> Result<Verdict, CheckError> {
    let observations = query.witness_terms();
    solver.push().map_err(solver_err)?;
    let outcome = decide_in_scope(query, solver, &observations);
    // the scope is closed even when the check itself failed
    let popped = solver.pop();
    let (result, model) = outcome.map_err(solver_err)?;
    popped.map_err(solver_err)?;

    let verdict = match result {
        SatResult::Unsat => Verdict::Proved,
        SatResult::Sat => {
            let model = model.unwrap_or_default();
            Verdict::Violated(Witness::from_model(
                &model,
                observations.iter().map(|(label, _)| label.as_str()),
            ))
        }
        SatResult::Unknown(reason) => Verdict::Unknown { reason },
    };
    info!(
        query = %query.name,
        verdict = verdict.verdict_class(),
        "query decided"
    );
    Ok(verdict)
}

/// Runs queries against the backend chosen in [`EngineOptions`], with one
/// solver instance per query.
#[derive(Debug, Clone, Default)]
pub struct PropertyChecker {
    options: EngineOptions,
}

impl PropertyChecker {
    pub fn new(options: EngineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn check(&self, query: &VerificationQuery) -> Result<Verdict, CheckError> {
        if let Some(dir) = &self.options.dump_smt {
            dump_query(query, dir)?;
        }
        info!(
            query = %query.name,
            solver = %self.options.solver,
            symbols = query.vocabulary.len(),
            size = query.size(),
            "checking query"
        );
        match self.options.solver {
            SolverChoice::Z3 => self.check_in_process(query),
            SolverChoice::Z3Process | SolverChoice::Cvc5 => {
                let cmd = self.options.process_command()?;
                let mut solver = SmtLibProcess::spawn(&cmd).map_err(solver_err)?;
                check(query, &mut solver)
            }
        }
    }

    #[cfg(feature = "z3")]
    fn check_in_process(&self, query: &VerificationQuery) -> Result<Verdict, CheckError> {
        let mut solver = Z3Solver::with_timeout_secs(self.options.timeout_secs);
        check(query, &mut solver)
    }

    #[cfg(not(feature = "z3"))]
    fn check_in_process(&self, _query: &VerificationQuery) -> Result<Verdict, CheckError> {
        Err(CheckError::Unavailable(SolverChoice::Z3))
    }

    /// Check independent queries in parallel, one thread each. Results come
    /// back in input order.
    pub fn check_batch(&self, queries: &[VerificationQuery]) -> Vec<Result<Verdict, CheckError>> {
        thread::scope(|scope| {
            let handles: Vec<_> = queries
                .iter()
                .map(|query| scope.spawn(move || self.check(query)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        warn!("checker thread panicked");
                        Err(CheckError::Solver("checker thread panicked".into()))
                    })
                })
                .collect()
        })
    }
}

/// File name for a query's SMT dump: every character outside
/// `[A-Za-z0-9_.-]` becomes `_`.
pub fn dump_file_name(query_name: &str) -> String {
    let stem: String = query_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{stem}.smt2")
}

fn dump_query(query: &VerificationQuery, dir: &Path) -> Result<PathBuf, CheckError> {
    let path = dir.join(dump_file_name(&query.name));
    let io_err = |source| CheckError::Dump {
        path: path.clone(),
        source,
    };
    std::fs::create_dir_all(dir).map_err(io_err)?;
    std::fs::write(&path, render_smtlib(query)).map_err(io_err)?;
    debug!(path = %path.display(), "SMT dump written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use slotguard_ir::types::SlotType;
    use slotguard_ir::value::{Predicate, SymbolicValue};
    use slotguard_ir::vocab::Vocabulary;
    use slotguard_smt::solver::{Model, ModelValue};
    use slotguard_smt::sorts::SmtSort;
    use slotguard_smt::terms::SmtTerm;

    /// Answers every check with a fixed result and records what it saw.
    struct MockSolver {
        answer: SatResult,
        model: Model,
        declared: Vec<String>,
        asserted: usize,
        depth: i32,
    }

    impl MockSolver {
        fn answering(answer: SatResult) -> Self {
            Self {
                answer,
                model: Model::default(),
                declared: Vec::new(),
                asserted: 0,
                depth: 0,
            }
        }
    }

    impl SmtSolver for MockSolver {
        type Error = io::Error;

        fn declare_var(&mut self, name: &str, _sort: &SmtSort) -> Result<(), io::Error> {
            self.declared.push(name.to_string());
            Ok(())
        }

        fn assert(&mut self, _term: &SmtTerm) -> Result<(), io::Error> {
            self.asserted += 1;
            Ok(())
        }

        fn push(&mut self) -> Result<(), io::Error> {
            self.depth += 1;
            Ok(())
        }

        fn pop(&mut self) -> Result<(), io::Error> {
            self.depth -= 1;
            Ok(())
        }

        fn check_sat(&mut self) -> Result<SatResult, io::Error> {
            Ok(self.answer.clone())
        }

        fn check_sat_with_values(
            &mut self,
            _observations: &[(String, SmtTerm)],
        ) -> Result<(SatResult, Option<Model>), io::Error> {
            let model = (self.answer == SatResult::Sat).then(|| self.model.clone());
            Ok((self.answer.clone(), model))
        }

        fn reset(&mut self) -> Result<(), io::Error> {
            Ok(())
        }
    }

    /// A solver whose backend fails on every check.
    #[derive(Default)]
    struct BrokenSolver {
        depth: i32,
    }

    impl SmtSolver for BrokenSolver {
        type Error = io::Error;

        fn declare_var(&mut self, _: &str, _: &SmtSort) -> Result<(), io::Error> {
            Ok(())
        }
        fn assert(&mut self, _: &SmtTerm) -> Result<(), io::Error> {
            Ok(())
        }
        fn push(&mut self) -> Result<(), io::Error> {
            self.depth += 1;
            Ok(())
        }
        fn pop(&mut self) -> Result<(), io::Error> {
            self.depth -= 1;
            Ok(())
        }
        fn check_sat(&mut self) -> Result<SatResult, io::Error> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "solver exited"))
        }
        fn check_sat_with_values(
            &mut self,
            _: &[(String, SmtTerm)],
        ) -> Result<(SatResult, Option<Model>), io::Error> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "solver exited"))
        }
        fn reset(&mut self) -> Result<(), io::Error> {
            Ok(())
        }
    }

    fn query() -> VerificationQuery {
        let mut vocab = Vocabulary::new();
        let x = vocab.fresh("x", &SlotType::Uint(8)).expect("fresh");
        vocab
            .fresh("m", &SlotType::map(SlotType::Uint(8), SlotType::Bool))
            .expect("fresh");
        let negated = x.ugt(&SymbolicValue::uint(5u8, 8)).expect("numeric");
        VerificationQuery::new("x_small", vocab, negated).assume(Predicate::always())
    }

    #[test]
    fn unsat_is_proved_and_scope_is_balanced() {
        let mut solver = MockSolver::answering(SatResult::Unsat);
        let verdict = check(&query(), &mut solver).expect("check");
        assert_eq!(verdict, Verdict::Proved);
        assert_eq!(solver.declared, vec!["x", "m"]);
        assert_eq!(solver.asserted, 1);
        assert_eq!(solver.depth, 0);
    }

    #[test]
    fn sat_carries_scalar_witness() {
        let mut solver = MockSolver::answering(SatResult::Sat);
        let six = ModelValue::BitVec {
            value: 6u8.into(),
            width: 8,
        };
        solver.model.values.insert("x".into(), six);
        let verdict = check(&query(), &mut solver).expect("check");
        let witness = verdict.witness().expect("violated");
        assert_eq!(witness.get("x").map(ToString::to_string).as_deref(), Some("6"));
        assert_eq!(witness.len(), 1);
    }

    #[test]
    fn timeout_is_unknown_never_proved() {
        let mut solver = MockSolver::answering(SatResult::Unknown("timeout".into()));
        let verdict = check(&query(), &mut solver).expect("check");
        assert_eq!(
            verdict,
            Verdict::Unknown {
                reason: "timeout".into()
            }
        );
        assert!(!verdict.is_proved());
    }

    #[test]
    fn backend_failure_is_an_error_not_a_verdict() {
        let mut solver = BrokenSolver::default();
        let err = check(&query(), &mut solver).unwrap_err();
        assert!(matches!(err, CheckError::Solver(msg) if msg.contains("solver exited")));
        assert_eq!(solver.depth, 0);
    }

    #[test]
    fn dump_names_are_filesystem_safe() {
        assert_eq!(
            dump_file_name("threshold/authorization"),
            "threshold_authorization.smt2"
        );
        assert_eq!(dump_file_name("a.b-c_d"), "a.b-c_d.smt2");
    }

    #[test]
    fn missing_process_solver_is_reported() {
        let checker = PropertyChecker::new(EngineOptions {
            solver: SolverChoice::Z3Process,
            solver_command: Some("slotguard-no-such-solver".into()),
            ..EngineOptions::default()
        });
        assert!(matches!(checker.check(&query()), Err(CheckError::Solver(_))));
    }
}
