use indexmap::IndexMap;
use slotguard_smt::sorts::SmtSort;
use slotguard_smt::terms::SmtTerm;

use crate::error::{ModelError, ModelResult};
use crate::types::SlotType;
use crate::value::SymbolicValue;

/// Every free constant a query mentions, in declaration order.
///
/// Backends need each symbol declared exactly once before any assertion
/// references it; the vocabulary is the single place that tracks this.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    symbols: IndexMap<String, SmtSort>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a raw symbol of the given sort.
    pub fn declare(&mut self, name: &str, sort: SmtSort) -> ModelResult<SmtTerm> {
        if !is_simple_symbol(name) {
            return Err(ModelError::InvalidName(name.to_string()));
        }
        if self.symbols.contains_key(name) {
            return Err(ModelError::DuplicateSymbol(name.to_string()));
        }
        self.symbols.insert(name.to_string(), sort);
        Ok(SmtTerm::var(name))
    }

    /// Declare a fresh unconstrained value of a slot type.
    pub fn fresh(&mut self, name: &str, ty: &SlotType) -> ModelResult<SymbolicValue> {
        let term = self.declare(name, ty.sort())?;
        Ok(SymbolicValue::new(ty.clone(), term))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn sort_of(&self, name: &str) -> Option<&SmtSort> {
        self.symbols.get(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SmtSort)> {
        self.symbols.iter().map(|(n, s)| (n.as_str(), s))
    }

    /// Symbols whose sort is not an array; these make up a witness.
    pub fn scalars(&self) -> impl Iterator<Item = (&str, &SmtSort)> {
        self.iter()
            .filter(|(_, sort)| !matches!(sort, SmtSort::Array(..)))
    }

    pub fn declarations(&self) -> Vec<(String, SmtSort)> {
        self.symbols
            .iter()
            .map(|(n, s)| (n.clone(), s.clone()))
            .collect()
    }
}

/// SMT-LIB simple symbol: non-empty, no leading digit, drawn from letters,
/// digits and `~!@$%^&*_-+=<>.?/`.
pub fn is_simple_symbol(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let allowed = |c: char| c.is_ascii_alphanumeric() || "~!@$%^&*_-+=<>.?/".contains(c);
    !first.is_ascii_digit() && allowed(first) && chars.all(allowed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_and_invalid_names_are_rejected() {
        let mut vocab = Vocabulary::new();
        vocab.fresh("s0.sender", &SlotType::Address).expect("fresh");
        assert_eq!(
            vocab.fresh("s0.sender", &SlotType::Address),
            Err(ModelError::DuplicateSymbol("s0.sender".into()))
        );
        assert_eq!(
            vocab.declare("0x", SmtSort::Bool),
            Err(ModelError::InvalidName("0x".into()))
        );
        assert!(!is_simple_symbol("a b"));
        assert!(!is_simple_symbol(""));
    }

    #[test]
    fn scalars_skip_arrays_and_keep_order() {
        let mut vocab = Vocabulary::new();
        vocab.fresh("b", &SlotType::uint256()).expect("fresh");
        vocab
            .fresh("m", &SlotType::map(SlotType::Address, SlotType::Bool))
            .expect("fresh");
        vocab.declare("a", SmtSort::Int).expect("declare");
        let names: Vec<&str> = vocab.scalars().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(vocab.len(), 3);
    }
}
