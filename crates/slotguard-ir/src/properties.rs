//! Safety properties over encoded executions.
//!
//! A property is either checked at every step (a relation between the
//! pre-state, the post-state and the call's arguments) or once, on the
//! final state. Either way it is handed to the checker in negated form:
//! the property holds on every execution of the bounded model exactly when
//! its negation is unsatisfiable together with the transition constraints.

use std::fmt;
use std::sync::Arc;

use crate::encoder::Step;
use crate::error::ModelResult;
use crate::state::State;
use crate::transition::Inputs;
use crate::types::SlotType;
use crate::value::Predicate;
use crate::vocab::Vocabulary;

/// What a per-step property can see about one branch of one step.
#[derive(Debug, Clone, Copy)]
pub struct StepView<'a> {
    pub step: &'a str,
    pub transition: &'a str,
    pub pre: &'a State,
    pub post: &'a State,
    /// Call arguments merged with the property's universal variables.
    pub inputs: &'a Inputs,
}

pub type StepPredicate = dyn Fn(&StepView<'_>) -> ModelResult<Predicate> + Send + Sync;
pub type FinalPredicate = dyn Fn(&State, &State, &Inputs) -> ModelResult<Predicate> + Send + Sync;

#[derive(Clone)]
pub enum PropertyScope {
    /// Must hold across every step of the execution.
    PerStep(Arc<StepPredicate>),
    /// Must hold between the initial and the last state.
    Final(Arc<FinalPredicate>),
}

/// A named safety property.
#[derive(Clone)]
pub struct SafetyProperty {
    name: String,
    description: String,
    universals: Vec<(String, SlotType)>,
    scope: PropertyScope,
}

impl fmt::Debug for SafetyProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = match self.scope {
            PropertyScope::PerStep(_) => "per-step",
            PropertyScope::Final(_) => "final",
        };
        f.debug_struct("SafetyProperty")
            .field("name", &self.name)
            .field("scope", &scope)
            .field("universals", &self.universals)
            .finish()
    }
}

impl SafetyProperty {
    pub fn per_step<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&StepView<'_>) -> ModelResult<Predicate> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            universals: Vec::new(),
            scope: PropertyScope::PerStep(Arc::new(check)),
        }
    }

    pub fn final_state<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&State, &State, &Inputs) -> ModelResult<Predicate> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            universals: Vec::new(),
            scope: PropertyScope::Final(Arc::new(check)),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Universally quantified variable, available to the predicate as an
    /// input. It becomes a free constant `prop.<name>`, so a violation
    /// reports the instance that fails.
    pub fn for_all(mut self, name: impl Into<String>, ty: SlotType) -> Self {
        self.universals.push((name.into(), ty));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn scope(&self) -> &PropertyScope {
        &self.scope
    }

    /// The negated property over an encoded execution.
    ///
    /// `context` carries scenario-level constants (pinned arguments) that
    /// the predicate may refer to next to the universals. A per-step
    /// property over zero steps negates to `false`.
    pub fn negation(
        &self,
        initial: &State,
        steps: &[Step],
        context: &Inputs,
        vocab: &mut Vocabulary,
    ) -> ModelResult<Predicate> {
        let mut universals = context.clone();
        for (name, ty) in &self.universals {
            universals.insert(name.clone(), vocab.fresh(&format!("prop.{name}"), ty)?);
        }
        match &self.scope {
            PropertyScope::PerStep(check) => {
                let mut violations = Vec::new();
                for step in steps {
                    for branch in &step.branches {
                        let inputs = branch.inputs.merged(&universals);
                        let view = StepView {
                            step: &step.label,
                            transition: &branch.transition,
                            pre: &step.pre,
                            post: &step.post,
                            inputs: &inputs,
                        };
                        let holds = check(&view)?;
                        violations.push(branch.selected.clone().and(holds.not()));
                    }
                }
                Ok(Predicate::any(violations))
            }
            PropertyScope::Final(check) => {
                let last = steps.last().map_or(initial, |s| &s.post);
                Ok(check(initial, last, &universals)?.not())
            }
        }
    }
}
