//! Solver backends and the SMT-LIB2 text layer they share.

pub mod sexp;
pub mod smtlib_printer;
pub mod smtlib_process;
#[cfg(feature = "z3")]
pub mod z3_backend;
