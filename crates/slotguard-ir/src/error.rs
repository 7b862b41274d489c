use thiserror::Error;

use crate::types::SlotType;

/// Modeling mistakes caught while building states, transitions and
/// properties. None of these ever reach the solver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("undeclared storage slot '{0}'")]
    UndeclaredSlot(String),
    #[error("storage slot '{0}' declared twice")]
    DuplicateSlot(String),
    #[error("symbol '{0}' declared twice")]
    DuplicateSymbol(String),
    #[error("'{0}' is not a valid SMT-LIB symbol")]
    InvalidName(String),
    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: SlotType,
        found: SlotType,
    },
    #[error("cannot index into non-mapping value of type {0}")]
    NotAMap(SlotType),
    #[error("arithmetic on non-numeric type {0}")]
    NotNumeric(SlotType),
    #[error("expected a boolean value, found {0}")]
    NotBool(SlotType),
    #[error("slot '{slot}' indexed with {given} key(s) but has mapping depth {depth}")]
    KeyDepth {
        slot: String,
        given: usize,
        depth: usize,
    },
    #[error("missing input '{0}'")]
    MissingInput(String),
    #[error("states built from different storage layouts")]
    LayoutMismatch,
    #[error("transition '{0}' produced a state for another layout")]
    ForeignEffect(String),
    #[error("a nondeterministic step needs at least one transition")]
    EmptyChoice,
}

pub type ModelResult<T> = Result<T, ModelError>;
