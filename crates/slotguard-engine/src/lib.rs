//! slotguard verification engine.
//!
//! Builds verification queries from contract models, decides them with an
//! SMT backend and reports verdicts: proved within the bound, violated with
//! a concrete witness, or unknown.

pub mod checker;
pub mod config;
pub mod contract;
pub mod domains;
pub mod query;
pub mod report;
pub mod result;
pub mod scenario;

pub use checker::{check, CheckError, PropertyChecker};
pub use config::{ConfigError, EngineOptions, SolverChoice};
pub use contract::ContractSpec;
pub use query::{render_smtlib, VerificationQuery};
pub use report::{run_cases, CheckCase, Expectation, RunReport};
pub use result::{Verdict, Witness};
