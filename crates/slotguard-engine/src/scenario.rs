//! Scenarios: how a contract is started and driven before a property is
//! checked against it.

use std::fmt;
use std::sync::Arc;

use slotguard_ir::encoder::{encode_call, encode_choice, Step};
use slotguard_ir::properties::SafetyProperty;
use slotguard_ir::state::{declare_state, State, StorageLayout};
use slotguard_ir::transition::{Inputs, Transition};
use slotguard_ir::types::SlotType;
use slotguard_ir::value::{Predicate, SymbolicValue};
use slotguard_ir::vocab::Vocabulary;
use slotguard_ir::ModelResult;
use tracing::debug;

use crate::query::VerificationQuery;

/// The state a scenario starts from, plus facts assumed about it.
#[derive(Debug, Clone)]
pub struct Setup {
    pub state: State,
    pub assumptions: Vec<Predicate>,
}

impl Setup {
    pub fn new(state: State) -> Self {
        Self {
            state,
            assumptions: Vec::new(),
        }
    }

    pub fn assume(mut self, fact: Predicate) -> Self {
        self.assumptions.push(fact);
        self
    }
}

pub type SetupFn = dyn Fn(&State, &Inputs, &mut Vocabulary) -> ModelResult<Setup> + Send + Sync;
pub type ObserveFn =
    dyn Fn(&State, &[Step], &Inputs) -> ModelResult<Vec<(String, SymbolicValue)>> + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Start {
    /// Every slot at its default, as right after deployment.
    Deployed,
    /// Every slot unconstrained, named `pre.<slot>`.
    Arbitrary,
}

/// A fixed call whose arguments may be tied to scenario constants.
#[derive(Debug, Clone)]
pub struct Call {
    pub transition: Transition,
    /// `(parameter, constant)` pairs.
    pub bindings: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
enum Drive {
    /// `depth` steps, each a free choice among `transitions`.
    Explore {
        transitions: Vec<Transition>,
        depth: usize,
    },
    /// The given calls, in order.
    Calls(Vec<Call>),
}

/// Builder for the initial-state and transition parts of a query.
///
/// Scenario constants are free values named `p.<name>`; they can be bound
/// to call arguments, constrained in the setup and referenced by
/// properties.
#[derive(Clone)]
pub struct Scenario {
    name: String,
    layout: Arc<StorageLayout>,
    start: Start,
    constants: Vec<(String, SlotType)>,
    setup: Option<Arc<SetupFn>>,
    drive: Drive,
    observer: Option<Arc<ObserveFn>>,
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("start", &self.start)
            .field("constants", &self.constants)
            .field("drive", &self.drive)
            .finish_non_exhaustive()
    }
}

impl Scenario {
    pub fn new(name: impl Into<String>, layout: &Arc<StorageLayout>) -> Self {
        Self {
            name: name.into(),
            layout: Arc::clone(layout),
            start: Start::Deployed,
            constants: Vec::new(),
            setup: None,
            drive: Drive::Calls(Vec::new()),
            observer: None,
        }
    }

    pub fn start(mut self, start: Start) -> Self {
        self.start = start;
        self
    }

    pub fn constant(mut self, name: impl Into<String>, ty: SlotType) -> Self {
        self.constants.push((name.into(), ty));
        self
    }

    pub fn setup<F>(mut self, setup: F) -> Self
    where
        F: Fn(&State, &Inputs, &mut Vocabulary) -> ModelResult<Setup> + Send + Sync + 'static,
    {
        self.setup = Some(Arc::new(setup));
        self
    }

    /// Explore `depth` nondeterministic steps over `transitions`.
    pub fn explore(mut self, transitions: Vec<Transition>, depth: usize) -> Self {
        self.drive = Drive::Explore { transitions, depth };
        self
    }

    /// Append a fixed call; `bindings` ties parameters to constants.
    pub fn call(mut self, transition: &Transition, bindings: &[(&str, &str)]) -> Self {
        let call = Call {
            transition: transition.clone(),
            bindings: bindings
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
        };
        match &mut self.drive {
            Drive::Calls(calls) => calls.push(call),
            Drive::Explore { .. } => self.drive = Drive::Calls(vec![call]),
        }
        self
    }

    /// Report extra values (e.g. mapping reads) in every witness.
    pub fn observe<F>(mut self, observer: F) -> Self
    where
        F: Fn(&State, &[Step], &Inputs) -> ModelResult<Vec<(String, SymbolicValue)>>
            + Send
            + Sync
            + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build the query for `property` over this scenario.
    pub fn query(&self, property: &SafetyProperty) -> ModelResult<VerificationQuery> {
        let mut vocab = Vocabulary::new();
        let mut constants = Inputs::new();
        for (name, ty) in &self.constants {
            constants.insert(name.clone(), vocab.fresh(&format!("p.{name}"), ty)?);
        }

        let base = match self.start {
            Start::Deployed => State::initial(&self.layout),
            Start::Arbitrary => declare_state(&self.layout, "pre", &mut vocab)?,
        };
        let setup = match &self.setup {
            Some(f) => f(&base, &constants, &mut vocab)?,
            None => Setup::new(base),
        };

        let steps = self.drive_steps(&setup.state, &constants, &mut vocab)?;
        let negated = property.negation(&setup.state, &steps, &constants, &mut vocab)?;
        let observations = match &self.observer {
            Some(f) => f(&setup.state, &steps, &constants)?,
            None => Vec::new(),
        };
        debug!(
            scenario = %self.name,
            property = property.name(),
            steps = steps.len(),
            symbols = vocab.len(),
            "built query"
        );

        let mut query = VerificationQuery::new(
            format!("{}/{}", self.name, property.name()),
            vocab,
            negated,
        )
        .describe(property.description());
        query.initial = setup.assumptions;
        query.transitions = steps.into_iter().map(|s| s.constraint).collect();
        query.observations = observations
            .into_iter()
            .map(|(label, value)| (label, value.into_term()))
            .collect();
        Ok(query)
    }

    fn drive_steps(
        &self,
        initial: &State,
        constants: &Inputs,
        vocab: &mut Vocabulary,
    ) -> ModelResult<Vec<Step>> {
        let mut steps: Vec<Step> = Vec::new();
        match &self.drive {
            Drive::Explore { transitions, depth } => {
                for i in 0..*depth {
                    let pre = steps.last().map_or(initial, |s| &s.post).clone();
                    steps.push(encode_choice(transitions, &pre, &format!("s{i}"), vocab)?);
                }
            }
            Drive::Calls(calls) => {
                for (i, call) in calls.iter().enumerate() {
                    let mut bound = Inputs::new();
                    for (param, constant) in &call.bindings {
                        bound.insert(param.clone(), constants.get(constant)?.clone());
                    }
                    let pre = steps.last().map_or(initial, |s| &s.post).clone();
                    steps.push(encode_call(
                        &call.transition,
                        &pre,
                        &format!("s{i}"),
                        &bound,
                        vocab,
                    )?);
                }
            }
        }
        Ok(steps)
    }
}
