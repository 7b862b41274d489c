//! Transition encoder: turns calls into pre/post-state relations.
//!
//! A call of transition `T` from state `pre` introduces a fresh post-state
//! `post` and the constraint
//!
//! ```text
//! (guard(pre) => post == effect(pre)) and (not guard(pre) => post == pre)
//! ```
//!
//! so a failing guard behaves like a revert: the call is possible but has
//! no effect. The encoder never decides whether a call happens; that is
//! left to how steps are composed ([`chain`], [`fan_out`],
//! [`encode_choice`]).

use slotguard_smt::sorts::SmtSort;
use slotguard_smt::terms::SmtTerm;
use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::state::{declare_state, State};
use crate::transition::{Inputs, Transition};
use crate::value::Predicate;
use crate::vocab::Vocabulary;

/// One transition that may have fired during a [`Step`].
#[derive(Debug, Clone)]
pub struct Branch {
    pub transition: String,
    pub inputs: Inputs,
    /// Holds exactly when this branch is the one taken.
    pub selected: Predicate,
    pub guard: Predicate,
}

/// One encoded step from `pre` to `post`.
#[derive(Debug, Clone)]
pub struct Step {
    pub label: String,
    pub pre: State,
    pub post: State,
    pub branches: Vec<Branch>,
    /// Integer selector for nondeterministic steps.
    pub selector: Option<SmtTerm>,
    pub constraint: Predicate,
}

fn guarded_update(pre: &State, post: &State, effect: &State, guard: &Predicate) -> ModelResult<Predicate> {
    let applied = guard.clone().implies(post.equals(effect)?);
    let reverted = guard.clone().not().implies(post.equals(pre)?);
    Ok(applied.and(reverted))
}

/// Encode one call of `transition` with fresh inputs `<label>.<param>`.
pub fn encode(
    transition: &Transition,
    pre: &State,
    label: &str,
    vocab: &mut Vocabulary,
) -> ModelResult<Step> {
    encode_call(transition, pre, label, &Inputs::new(), vocab)
}

/// Encode one call, reusing any arguments supplied in `bound`.
pub fn encode_call(
    transition: &Transition,
    pre: &State,
    label: &str,
    bound: &Inputs,
    vocab: &mut Vocabulary,
) -> ModelResult<Step> {
    let inputs = transition.instantiate_inputs(label, bound, vocab)?;
    let guard = transition.eval_guard(pre, &inputs)?;
    let effect = transition.apply_effect(pre, &inputs)?;
    let post = declare_state(pre.layout(), label, vocab)?;
    let constraint = guarded_update(pre, &post, &effect, &guard)?;
    debug!(
        step = label,
        transition = transition.name(),
        size = constraint.term().size(),
        "encoded call"
    );
    Ok(Step {
        label: label.to_string(),
        pre: pre.clone(),
        post,
        branches: vec![Branch {
            transition: transition.name().to_string(),
            inputs,
            selected: Predicate::always(),
            guard,
        }],
        selector: None,
        constraint,
    })
}

/// Sequential composition: step `i + 1` starts from the post-state of
/// step `i`. Labels are `<prefix>0`, `<prefix>1`, ...
pub fn chain(
    transitions: &[Transition],
    initial: &State,
    prefix: &str,
    vocab: &mut Vocabulary,
) -> ModelResult<Vec<Step>> {
    let mut steps: Vec<Step> = Vec::with_capacity(transitions.len());
    for (i, t) in transitions.iter().enumerate() {
        let pre = steps.last().map_or(initial, |s| &s.post).clone();
        steps.push(encode(t, &pre, &format!("{prefix}{i}"), vocab)?);
    }
    Ok(steps)
}

/// Independent encodings of every transition from the same pre-state.
pub fn fan_out(
    transitions: &[Transition],
    pre: &State,
    prefix: &str,
    vocab: &mut Vocabulary,
) -> ModelResult<Vec<Step>> {
    transitions
        .iter()
        .enumerate()
        .map(|(i, t)| encode(t, pre, &format!("{prefix}{i}"), vocab))
        .collect()
}

/// A step in which exactly one of `transitions` is called, chosen by a
/// fresh integer selector `<label>.choice`. Each alternative gets its own
/// inputs `<label>.<transition>.<param>`.
pub fn encode_choice(
    transitions: &[Transition],
    pre: &State,
    label: &str,
    vocab: &mut Vocabulary,
) -> ModelResult<Step> {
    if transitions.is_empty() {
        return Err(ModelError::EmptyChoice);
    }
    let selector = vocab.declare(&format!("{label}.choice"), SmtSort::Int)?;
    let post = declare_state(pre.layout(), label, vocab)?;

    let count = transitions.len() as i64;
    let mut conjuncts = vec![
        Predicate::from_term(SmtTerm::int(0).le(selector.clone())),
        Predicate::from_term(selector.clone().lt(SmtTerm::int(count))),
    ];
    let mut branches = Vec::with_capacity(transitions.len());
    for (k, t) in (0i64..).zip(transitions) {
        let prefix = format!("{label}.{}", t.name());
        let inputs = t.instantiate_inputs(&prefix, &Inputs::new(), vocab)?;
        let guard = t.eval_guard(pre, &inputs)?;
        let effect = t.apply_effect(pre, &inputs)?;
        let selected = Predicate::from_term(selector.clone().eq(SmtTerm::int(k)));
        conjuncts.push(
            selected
                .clone()
                .implies(guarded_update(pre, &post, &effect, &guard)?),
        );
        branches.push(Branch {
            transition: t.name().to_string(),
            inputs,
            selected,
            guard,
        });
    }
    let constraint = Predicate::all(conjuncts);
    debug!(
        step = label,
        alternatives = transitions.len(),
        size = constraint.term().size(),
        "encoded nondeterministic step"
    );
    Ok(Step {
        label: label.to_string(),
        pre: pre.clone(),
        post,
        branches,
        selector: Some(selector),
        constraint,
    })
}
