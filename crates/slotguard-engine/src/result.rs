use std::fmt;

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use slotguard_smt::solver::{Model, ModelValue};

/// Concrete values of the free symbols and observed terms in a
/// counterexample, in the order the query listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Witness {
    values: IndexMap<String, ModelValue>,
}

impl Witness {
    /// Keep the model's values for `labels`, in that order. Labels the
    /// backend did not evaluate are skipped.
    pub fn from_model<'a>(model: &Model, labels: impl IntoIterator<Item = &'a str>) -> Self {
        let values = labels
            .into_iter()
            .filter_map(|label| model.get(label).map(|v| (label.to_string(), v.clone())))
            .collect();
        Self { values }
    }

    pub fn get(&self, label: &str) -> Option<&ModelValue> {
        self.values.get(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, value) in &self.values {
            writeln!(f, "  {label} = {value}")?;
        }
        Ok(())
    }
}

impl Serialize for Witness {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (label, value) in &self.values {
            map.serialize_entry(label, &value.to_string())?;
        }
        map.end()
    }
}

/// Outcome of checking one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The negated property is unsatisfiable: the property holds on every
    /// execution within the bound.
    Proved,
    /// A concrete execution breaks the property.
    Violated(Witness),
    /// The solver gave up (timeout, resource limit, incompleteness).
    /// Never to be read as a pass.
    Unknown { reason: String },
}

impl Verdict {
    /// Stable, machine-readable verdict name.
    pub fn verdict_class(&self) -> &'static str {
        match self {
            Verdict::Proved => "proved",
            Verdict::Violated(_) => "violated",
            Verdict::Unknown { .. } => "unknown",
        }
    }

    pub fn is_proved(&self) -> bool {
        matches!(self, Verdict::Proved)
    }

    pub fn witness(&self) -> Option<&Witness> {
        match self {
            Verdict::Violated(w) => Some(w),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Proved => write!(f, "PROVED"),
            Verdict::Violated(witness) => {
                writeln!(f, "VIOLATED")?;
                write!(f, "Counterexample:\n{witness}")
            }
            Verdict::Unknown { reason } => write!(f, "UNKNOWN ({reason})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    fn bv(n: u8) -> ModelValue {
        ModelValue::BitVec {
            value: BigUint::from(n),
            width: 256,
        }
    }

    fn model() -> Model {
        let mut model = Model::default();
        model.values.insert("pre.balance".into(), bv(0));
        model.values.insert("p.amount".into(), bv(1));
        model
    }

    #[test]
    fn witness_keeps_requested_order_and_skips_missing() {
        let w = Witness::from_model(&model(), ["p.amount", "missing", "pre.balance"]);
        let labels: Vec<&str> = w.iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["p.amount", "pre.balance"]);
        assert_eq!(w.to_string(), "  p.amount = 1\n  pre.balance = 0\n");
    }

    #[test]
    fn witness_serializes_as_decimal_strings() {
        let w = Witness::from_model(&model(), ["pre.balance"]);
        let json = serde_json::to_string(&w).expect("serializable");
        assert_eq!(json, r#"{"pre.balance":"0"}"#);
    }

    #[test]
    fn verdict_classes_are_stable() {
        assert_eq!(Verdict::Proved.verdict_class(), "proved");
        assert_eq!(
            Verdict::Violated(Witness::default()).verdict_class(),
            "violated"
        );
        let unknown = Verdict::Unknown {
            reason: "timeout".into(),
        };
        assert_eq!(unknown.verdict_class(), "unknown");
        assert!(!unknown.is_proved());
        assert_eq!(unknown.to_string(), "UNKNOWN (timeout)");
    }
}
