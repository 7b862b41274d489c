//! Typed symbolic values and boolean predicates.
//!
//! Every operation checks operand types before it builds a term, so a
//! mismatched comparison or an index into a scalar is reported as a
//! [`ModelError`] instead of surfacing later as a solver sort error.

use num_bigint::BigUint;
use slotguard_smt::terms::SmtTerm;

use crate::error::{ModelError, ModelResult};
use crate::types::SlotType;

/// A term paired with the slot type it denotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolicValue {
    ty: SlotType,
    term: SmtTerm,
}

#[allow(clippy::should_implement_trait)]
impl SymbolicValue {
    /// Wrap a raw term. The caller vouches that `term` has `ty`'s sort.
    pub fn new(ty: SlotType, term: SmtTerm) -> Self {
        Self { ty, term }
    }

    pub fn bool(b: bool) -> Self {
        Self::new(SlotType::Bool, SmtTerm::bool(b))
    }

    /// Numeric literal of the given type, reduced modulo its width.
    pub fn literal(ty: SlotType, value: impl Into<BigUint>) -> ModelResult<Self> {
        let term = ty
            .literal(value)
            .ok_or_else(|| ModelError::NotNumeric(ty.clone()))?;
        Ok(Self::new(ty, term))
    }

    pub fn uint(value: impl Into<BigUint>, width: u32) -> Self {
        Self::new(SlotType::Uint(width), SmtTerm::bv(value, width))
    }

    pub fn default_of(ty: &SlotType) -> Self {
        Self::new(ty.clone(), ty.default_term())
    }

    pub fn ty(&self) -> &SlotType {
        &self.ty
    }

    pub fn term(&self) -> &SmtTerm {
        &self.term
    }

    pub fn into_term(self) -> SmtTerm {
        self.term
    }

    fn expect_type(&self, expected: &SlotType, context: &str) -> ModelResult<()> {
        if &self.ty == expected {
            Ok(())
        } else {
            Err(ModelError::TypeMismatch {
                context: context.to_string(),
                expected: expected.clone(),
                found: self.ty.clone(),
            })
        }
    }

    fn numeric_pair(&self, other: &SymbolicValue, context: &str) -> ModelResult<()> {
        if !self.ty.is_numeric() {
            return Err(ModelError::NotNumeric(self.ty.clone()));
        }
        other.expect_type(&self.ty, context)
    }

    /// Read a mapping at `key`. Reads through literal stores and default
    /// arrays are folded so unwritten keys stay literal defaults.
    pub fn read(&self, key: &SymbolicValue) -> ModelResult<SymbolicValue> {
        let (key_ty, value_ty) = self
            .ty
            .key_value()
            .ok_or_else(|| ModelError::NotAMap(self.ty.clone()))?;
        key.expect_type(key_ty, "mapping key")?;
        Ok(SymbolicValue::new(
            value_ty.clone(),
            select_folded(&self.term, &key.term),
        ))
    }

    /// Functional update: a new mapping equal to this one except at `key`.
    pub fn write(&self, key: &SymbolicValue, value: &SymbolicValue) -> ModelResult<SymbolicValue> {
        let (key_ty, value_ty) = self
            .ty
            .key_value()
            .ok_or_else(|| ModelError::NotAMap(self.ty.clone()))?;
        key.expect_type(key_ty, "mapping key")?;
        value.expect_type(value_ty, "mapping value")?;
        Ok(SymbolicValue::new(
            self.ty.clone(),
            self.term.clone().store(key.term.clone(), value.term.clone()),
        ))
    }

    /// Read through nested mappings, one key per level.
    pub fn read_path(&self, keys: &[&SymbolicValue]) -> ModelResult<SymbolicValue> {
        keys.iter().try_fold(self.clone(), |acc, key| acc.read(key))
    }

    /// Write through nested mappings, rebuilding every enclosing level.
    pub fn write_path(
        &self,
        keys: &[&SymbolicValue],
        value: &SymbolicValue,
    ) -> ModelResult<SymbolicValue> {
        match keys.split_first() {
            None => {
                value.expect_type(&self.ty, "storage write")?;
                Ok(value.clone())
            }
            Some((key, rest)) => {
                let inner = self.read(key)?.write_path(rest, value)?;
                self.write(key, &inner)
            }
        }
    }

    /// Modular addition.
    pub fn add(&self, other: &SymbolicValue) -> ModelResult<SymbolicValue> {
        self.numeric_pair(other, "addition")?;
        Ok(SymbolicValue::new(
            self.ty.clone(),
            self.term.clone().bvadd(other.term.clone()),
        ))
    }

    /// Modular subtraction; `0 - 1` wraps to the maximum value.
    pub fn sub(&self, other: &SymbolicValue) -> ModelResult<SymbolicValue> {
        self.numeric_pair(other, "subtraction")?;
        Ok(SymbolicValue::new(
            self.ty.clone(),
            self.term.clone().bvsub(other.term.clone()),
        ))
    }

    /// Add a literal of this value's own type.
    pub fn add_const(&self, n: impl Into<BigUint>) -> ModelResult<SymbolicValue> {
        self.add(&SymbolicValue::literal(self.ty.clone(), n)?)
    }

    /// Equality over any type, including whole mappings.
    pub fn eq(&self, other: &SymbolicValue) -> ModelResult<Predicate> {
        other.expect_type(&self.ty, "equality")?;
        if self.term == other.term {
            return Ok(Predicate::always());
        }
        Ok(Predicate(self.term.clone().eq(other.term.clone())))
    }

    pub fn ne(&self, other: &SymbolicValue) -> ModelResult<Predicate> {
        Ok(self.eq(other)?.not())
    }

    pub fn ult(&self, other: &SymbolicValue) -> ModelResult<Predicate> {
        self.numeric_pair(other, "comparison")?;
        Ok(Predicate(self.term.clone().bvult(other.term.clone())))
    }

    pub fn ule(&self, other: &SymbolicValue) -> ModelResult<Predicate> {
        self.numeric_pair(other, "comparison")?;
        Ok(Predicate(self.term.clone().bvule(other.term.clone())))
    }

    pub fn ugt(&self, other: &SymbolicValue) -> ModelResult<Predicate> {
        self.numeric_pair(other, "comparison")?;
        Ok(Predicate(self.term.clone().bvugt(other.term.clone())))
    }

    pub fn uge(&self, other: &SymbolicValue) -> ModelResult<Predicate> {
        self.numeric_pair(other, "comparison")?;
        Ok(Predicate(self.term.clone().bvuge(other.term.clone())))
    }

    /// View a boolean value as a predicate.
    pub fn truthy(&self) -> ModelResult<Predicate> {
        match self.ty {
            SlotType::Bool => Ok(Predicate(self.term.clone())),
            _ => Err(ModelError::NotBool(self.ty.clone())),
        }
    }

    /// `if cond then a else b`; both branches must share a type.
    pub fn ite(
        cond: &Predicate,
        then: &SymbolicValue,
        els: &SymbolicValue,
    ) -> ModelResult<SymbolicValue> {
        els.expect_type(&then.ty, "conditional")?;
        let term = match cond.0.as_bool_lit() {
            Some(true) => then.term.clone(),
            Some(false) => els.term.clone(),
            None if then.term == els.term => then.term.clone(),
            None => SmtTerm::ite(cond.0.clone(), then.term.clone(), els.term.clone()),
        };
        Ok(SymbolicValue::new(then.ty.clone(), term))
    }
}

fn is_literal(term: &SmtTerm) -> bool {
    matches!(
        term,
        SmtTerm::BvLit { .. } | SmtTerm::BoolLit(_) | SmtTerm::IntLit(_)
    )
}

fn select_folded(array: &SmtTerm, key: &SmtTerm) -> SmtTerm {
    match array {
        SmtTerm::ConstArray { value, .. } => (**value).clone(),
        SmtTerm::Store(inner, k, v) => {
            if **k == *key {
                (**v).clone()
            } else if is_literal(k) && is_literal(key) {
                select_folded(inner, key)
            } else {
                array.clone().select(key.clone())
            }
        }
        _ => array.clone().select(key.clone()),
    }
}

/// A boolean-valued term: a guard, constraint or property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate(SmtTerm);

#[allow(clippy::should_implement_trait)]
impl Predicate {
    /// Wrap a raw boolean term.
    pub fn from_term(term: SmtTerm) -> Self {
        Self(term)
    }

    pub fn always() -> Self {
        Self(SmtTerm::bool(true))
    }

    pub fn never() -> Self {
        Self(SmtTerm::bool(false))
    }

    pub fn term(&self) -> &SmtTerm {
        &self.0
    }

    pub fn into_term(self) -> SmtTerm {
        self.0
    }

    pub fn as_literal(&self) -> Option<bool> {
        self.0.as_bool_lit()
    }

    pub fn not(self) -> Self {
        match self.0 {
            SmtTerm::BoolLit(b) => Self(SmtTerm::bool(!b)),
            SmtTerm::Not(inner) => Self(*inner),
            other => Self(other.not()),
        }
    }

    pub fn and(self, other: Predicate) -> Self {
        Self::all([self, other])
    }

    pub fn or(self, other: Predicate) -> Self {
        Self::any([self, other])
    }

    pub fn implies(self, other: Predicate) -> Self {
        match (self.as_literal(), other.as_literal()) {
            (Some(false), _) | (_, Some(true)) => Self::always(),
            (Some(true), _) => other,
            _ => Self(self.0.implies(other.0)),
        }
    }

    /// Conjunction; `true` conjuncts are dropped and `false` absorbs.
    pub fn all(preds: impl IntoIterator<Item = Predicate>) -> Self {
        let mut terms = Vec::new();
        for p in preds {
            match p.0 {
                SmtTerm::BoolLit(true) => {}
                SmtTerm::BoolLit(false) => return Self::never(),
                SmtTerm::And(inner) => terms.extend(inner),
                other => terms.push(other),
            }
        }
        match terms.len() {
            0 => Self::always(),
            1 => Self(terms.remove(0)),
            _ => Self(SmtTerm::and(terms)),
        }
    }

    /// Disjunction; `false` disjuncts are dropped and `true` absorbs.
    pub fn any(preds: impl IntoIterator<Item = Predicate>) -> Self {
        let mut terms = Vec::new();
        for p in preds {
            match p.0 {
                SmtTerm::BoolLit(false) => {}
                SmtTerm::BoolLit(true) => return Self::always(),
                SmtTerm::Or(inner) => terms.extend(inner),
                other => terms.push(other),
            }
        }
        match terms.len() {
            0 => Self::never(),
            1 => Self(terms.remove(0)),
            _ => Self(SmtTerm::or(terms)),
        }
    }

    /// Lift back into a boolean [`SymbolicValue`], e.g. to store it.
    pub fn to_value(&self) -> SymbolicValue {
        SymbolicValue::new(SlotType::Bool, self.0.clone())
    }
}
