//! SMT encoding primitives and solver integration for slotguard.
//!
//! This crate provides a solver-agnostic term language over booleans,
//! integers, fixed-width bit-vectors and total arrays, an SMT-LIB2 printer,
//! and two backends behind the [`solver::SmtSolver`] trait: an in-process Z3
//! backend (feature `z3`) and a backend that drives any SMT-LIB2 solver
//! binary over stdin/stdout.

pub mod backends;
pub mod solver;
pub mod sorts;
pub mod terms;
