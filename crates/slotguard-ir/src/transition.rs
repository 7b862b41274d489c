//! Guarded state transitions: one contract entry point each.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{ModelError, ModelResult};
use crate::state::State;
use crate::types::SlotType;
use crate::value::{Predicate, SymbolicValue};
use crate::vocab::Vocabulary;

pub type GuardFn = dyn Fn(&State, &Inputs) -> ModelResult<Predicate> + Send + Sync;
pub type EffectFn = dyn Fn(&State, &Inputs) -> ModelResult<State> + Send + Sync;

/// Concrete symbolic arguments for one call of a transition.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    values: IndexMap<String, SymbolicValue>,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: SymbolicValue) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: SymbolicValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> ModelResult<&SymbolicValue> {
        self.values
            .get(name)
            .ok_or_else(|| ModelError::MissingInput(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SymbolicValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Union of two input sets; entries in `other` win on name clashes.
    pub fn merged(&self, other: &Inputs) -> Inputs {
        let mut values = self.values.clone();
        for (n, v) in &other.values {
            values.insert(n.clone(), v.clone());
        }
        Inputs { values }
    }
}

/// A guarded state transition: when `guard` holds the post-state is
/// `effect(pre)`, otherwise the call reverts and storage is unchanged.
#[derive(Clone)]
pub struct Transition {
    name: String,
    params: Vec<(String, SlotType)>,
    guard: Arc<GuardFn>,
    effect: Arc<EffectFn>,
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Transition {
    /// A transition with no inputs, an always-true guard and no effect.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            guard: Arc::new(|_, _| Ok(Predicate::always())),
            effect: Arc::new(|pre, _| Ok(pre.clone())),
        }
    }

    pub fn input(mut self, name: impl Into<String>, ty: SlotType) -> Self {
        self.params.push((name.into(), ty));
        self
    }

    pub fn guard<F>(mut self, guard: F) -> Self
    where
        F: Fn(&State, &Inputs) -> ModelResult<Predicate> + Send + Sync + 'static,
    {
        self.guard = Arc::new(guard);
        self
    }

    pub fn effect<F>(mut self, effect: F) -> Self
    where
        F: Fn(&State, &Inputs) -> ModelResult<State> + Send + Sync + 'static,
    {
        self.effect = Arc::new(effect);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[(String, SlotType)] {
        &self.params
    }

    pub fn eval_guard(&self, pre: &State, inputs: &Inputs) -> ModelResult<Predicate> {
        (self.guard)(pre, inputs)
    }

    pub fn apply_effect(&self, pre: &State, inputs: &Inputs) -> ModelResult<State> {
        let post = (self.effect)(pre, inputs)?;
        pre.same_layout(&post)
            .map_err(|_| ModelError::ForeignEffect(self.name.clone()))?;
        Ok(post)
    }

    /// Complete `bound` with fresh constants `<prefix>.<param>` for every
    /// parameter it does not already supply. Bound values are type-checked.
    pub fn instantiate_inputs(
        &self,
        prefix: &str,
        bound: &Inputs,
        vocab: &mut Vocabulary,
    ) -> ModelResult<Inputs> {
        let mut inputs = Inputs::new();
        for (param, ty) in &self.params {
            let value = match bound.values.get(param) {
                Some(v) if v.ty() == ty => v.clone(),
                Some(v) => {
                    return Err(ModelError::TypeMismatch {
                        context: format!("argument '{param}' of '{}'", self.name),
                        expected: ty.clone(),
                        found: v.ty().clone(),
                    })
                }
                None => vocab.fresh(&format!("{prefix}.{param}"), ty)?,
            };
            inputs.insert(param.clone(), value);
        }
        Ok(inputs)
    }
}
