//! Verification queries: everything one solver call needs.

use std::collections::HashSet;

use slotguard_ir::value::Predicate;
use slotguard_ir::vocab::Vocabulary;
use slotguard_smt::backends::smtlib_printer::render_script;
use slotguard_smt::terms::SmtTerm;

/// A self-contained safety query:
/// `initial ∧ transitions ∧ negated_property`, plus the terms whose values
/// are reported when it is satisfiable.
#[derive(Debug, Clone)]
pub struct VerificationQuery {
    pub name: String,
    pub description: String,
    pub vocabulary: Vocabulary,
    pub initial: Vec<Predicate>,
    pub transitions: Vec<Predicate>,
    pub negated_property: Predicate,
    /// Extra labelled terms (typically mapping reads) for the witness.
    pub observations: Vec<(String, SmtTerm)>,
}

impl VerificationQuery {
    pub fn new(
        name: impl Into<String>,
        vocabulary: Vocabulary,
        negated_property: Predicate,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            vocabulary,
            initial: Vec::new(),
            transitions: Vec::new(),
            negated_property,
            observations: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn assume(mut self, constraint: Predicate) -> Self {
        self.initial.push(constraint);
        self
    }

    pub fn transition(mut self, constraint: Predicate) -> Self {
        self.transitions.push(constraint);
        self
    }

    pub fn observe(mut self, label: impl Into<String>, term: SmtTerm) -> Self {
        self.observations.push((label.into(), term));
        self
    }

    /// Assertions in solving order. Literal `true` conjuncts are dropped.
    pub fn assertions(&self) -> Vec<SmtTerm> {
        self.initial
            .iter()
            .chain(&self.transitions)
            .chain(std::iter::once(&self.negated_property))
            .filter(|p| p.as_literal() != Some(true))
            .map(|p| p.term().clone())
            .collect()
    }

    /// Every scalar free symbol followed by the explicit observations.
    /// Observations whose label repeats an earlier entry are dropped.
    pub fn witness_terms(&self) -> Vec<(String, SmtTerm)> {
        let mut seen = HashSet::new();
        self.vocabulary
            .scalars()
            .map(|(name, _)| (name.to_string(), SmtTerm::var(name)))
            .chain(self.observations.iter().cloned())
            .filter(|(label, _)| seen.insert(label.clone()))
            .collect()
    }

    /// Total term nodes over all assertions.
    pub fn size(&self) -> usize {
        self.assertions().iter().map(SmtTerm::size).sum()
    }
}

/// Standalone SMT-LIB2 script for `query`: a header naming it, the
/// declarations, the assertions and `(check-sat)`.
pub fn render_smtlib(query: &VerificationQuery) -> String {
    let mut comments = vec![format!("query: {}", query.name)];
    if !query.description.is_empty() {
        comments.push(query.description.clone());
    }
    render_script(
        &comments,
        &query.vocabulary.declarations(),
        &query.assertions(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotguard_ir::types::SlotType;

    fn underflow_query() -> VerificationQuery {
        let mut vocab = Vocabulary::new();
        let b = vocab.fresh("b", &SlotType::Uint(8)).expect("fresh");
        let a = vocab.fresh("a", &SlotType::Uint(8)).expect("fresh");
        let guard = b.ugt(&a).expect("numeric");
        let post = b.sub(&a).expect("numeric");
        let negated = post.ugt(&b).expect("numeric");
        VerificationQuery::new("no_underflow", vocab, negated)
            .describe("withdraw never increases the balance")
            .assume(guard)
            .transition(Predicate::always())
            .observe("b-a", post.into_term())
    }

    #[test]
    fn assertions_skip_trivial_constraints() {
        let q = underflow_query();
        assert_eq!(q.assertions().len(), 2);
    }

    #[test]
    fn witness_terms_list_scalars_then_observations() {
        let q = underflow_query();
        let labels: Vec<String> = q.witness_terms().into_iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["b", "a", "b-a"]);
    }

    #[test]
    fn rendered_script_is_complete() {
        let script = render_smtlib(&underflow_query());
        assert!(script.starts_with("; query: no_underflow\n; withdraw never increases the balance\n"));
        assert!(script.contains("(declare-const b (_ BitVec 8))"));
        assert!(script.contains("(assert (bvugt b a))"));
        assert!(script.contains("(assert (bvugt (bvsub b a) b))"));
        assert!(script.ends_with("(check-sat)\n"));
    }
}
