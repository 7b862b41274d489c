use std::collections::BTreeMap;
use std::fmt;

use num_bigint::BigUint;

use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Result of a satisfiability check.
#[derive(Debug, Clone, PartialEq)]
pub enum SatResult {
    Sat,
    Unsat,
    /// The solver gave up; the string carries its reason (e.g. `timeout`).
    Unknown(String),
}

/// A concrete value read back from a solver model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValue {
    Bool(bool),
    Int(i64),
    BitVec { value: BigUint, width: u32 },
    /// Anything the backend could not decode (array models, lambdas), verbatim.
    Raw(String),
}

impl ModelValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ModelValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_biguint(&self) -> Option<&BigUint> {
        match self {
            ModelValue::BitVec { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for ModelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelValue::Bool(b) => write!(f, "{b}"),
            ModelValue::Int(n) => write!(f, "{n}"),
            ModelValue::BitVec { value, .. } => write!(f, "{value}"),
            ModelValue::Raw(s) => f.write_str(s),
        }
    }
}

/// Values extracted from a SAT result, keyed by the observation label.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub values: BTreeMap<String, ModelValue>,
}

impl Model {
    pub fn get(&self, name: &str) -> Option<&ModelValue> {
        self.values.get(name)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(ModelValue::as_bool)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ModelValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_bv(&self, name: &str) -> Option<&BigUint> {
        self.values.get(name).and_then(ModelValue::as_biguint)
    }
}

/// Abstract SMT solver interface.
///
/// The engine only ever talks to a decision procedure through this trait;
/// backends translate [`SmtTerm`]s into whatever representation they accept.
pub trait SmtSolver {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Declare a new free constant.
    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Self::Error>;

    /// Assert a boolean constraint.
    fn assert(&mut self, term: &SmtTerm) -> Result<(), Self::Error>;

    /// Push a new scope.
    fn push(&mut self) -> Result<(), Self::Error>;

    /// Pop a scope.
    fn pop(&mut self) -> Result<(), Self::Error>;

    /// Check satisfiability.
    fn check_sat(&mut self) -> Result<SatResult, Self::Error>;

    /// Check satisfiability and, if SAT, evaluate each labelled term in the
    /// model. Terms the backend cannot evaluate are left out of the model.
    fn check_sat_with_values(
        &mut self,
        observations: &[(String, SmtTerm)],
    ) -> Result<(SatResult, Option<Model>), Self::Error>;

    /// Reset the solver state.
    fn reset(&mut self) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_getters_return_typed_values_only() {
        let mut values = BTreeMap::new();
        values.insert("x".to_string(), ModelValue::Int(42));
        values.insert("flag".to_string(), ModelValue::Bool(true));
        values.insert(
            "balance".to_string(),
            ModelValue::BitVec {
                value: BigUint::from(7u8),
                width: 256,
            },
        );
        let model = Model { values };

        assert_eq!(model.get_int("x"), Some(42));
        assert_eq!(model.get_bool("flag"), Some(true));
        assert_eq!(model.get_bv("balance"), Some(&BigUint::from(7u8)));
        assert_eq!(model.get_int("flag"), None);
        assert_eq!(model.get_bool("x"), None);
        assert_eq!(model.get_bv("x"), None);
        assert_eq!(model.get_int("missing"), None);
    }

    #[test]
    fn model_value_display_is_human_readable() {
        let v = ModelValue::BitVec {
            value: BigUint::from(255u16),
            width: 8,
        };
        assert_eq!(v.to_string(), "255");
        assert_eq!(ModelValue::Bool(false).to_string(), "false");
        assert_eq!(ModelValue::Raw("((as const x) 0)".into()).to_string(), "((as const x) 0)");
    }
}
