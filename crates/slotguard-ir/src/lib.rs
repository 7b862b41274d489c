//! Typed symbolic model of contract storage.
//!
//! This crate defines slot types, symbolic values and predicates, storage
//! layouts and symbolic states, guarded transitions, the transition encoder
//! that turns a call into a pre/post relation, and safety properties. It is
//! solver-agnostic: everything lowers to [`slotguard_smt::terms::SmtTerm`].

pub mod encoder;
pub mod error;
pub mod properties;
pub mod state;
pub mod transition;
pub mod types;
pub mod value;
pub mod vocab;

pub use error::{ModelError, ModelResult};
