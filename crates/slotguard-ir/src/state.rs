//! Storage layouts and symbolic contract states.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{ModelError, ModelResult};
use crate::types::SlotType;
use crate::value::{Predicate, SymbolicValue};
use crate::vocab::{is_simple_symbol, Vocabulary};

/// Named, typed storage slots of one contract, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    slots: IndexMap<String, SlotType>,
}

impl StorageLayout {
    pub fn builder() -> LayoutBuilder {
        LayoutBuilder::default()
    }

    pub fn slot_type(&self, slot: &str) -> ModelResult<&SlotType> {
        self.slots
            .get(slot)
            .ok_or_else(|| ModelError::UndeclaredSlot(slot.to_string()))
    }

    pub fn slots(&self) -> impl Iterator<Item = (&str, &SlotType)> {
        self.slots.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct LayoutBuilder {
    slots: Vec<(String, SlotType)>,
}

impl LayoutBuilder {
    pub fn slot(mut self, name: impl Into<String>, ty: SlotType) -> Self {
        self.slots.push((name.into(), ty));
        self
    }

    pub fn build(self) -> ModelResult<Arc<StorageLayout>> {
        let mut slots = IndexMap::with_capacity(self.slots.len());
        for (name, ty) in self.slots {
            if !is_simple_symbol(&name) {
                return Err(ModelError::InvalidName(name));
            }
            if slots.contains_key(&name) {
                return Err(ModelError::DuplicateSlot(name));
            }
            slots.insert(name, ty);
        }
        Ok(Arc::new(StorageLayout { slots }))
    }
}

/// One symbolic snapshot of storage: a value for every slot of a layout.
///
/// States are immutable; writes return a new state and leave the receiver
/// untouched, so a pre-state can be shared by several encoded steps.
#[derive(Debug, Clone)]
pub struct State {
    layout: Arc<StorageLayout>,
    label: String,
    values: IndexMap<String, SymbolicValue>,
}

/// A state whose every slot is a fresh constant named `<label>.<slot>`.
pub fn declare_state(
    layout: &Arc<StorageLayout>,
    label: &str,
    vocab: &mut Vocabulary,
) -> ModelResult<State> {
    let mut values = IndexMap::with_capacity(layout.len());
    for (slot, ty) in layout.slots() {
        let value = vocab.fresh(&format!("{label}.{slot}"), ty)?;
        values.insert(slot.to_string(), value);
    }
    Ok(State {
        layout: Arc::clone(layout),
        label: label.to_string(),
        values,
    })
}

impl State {
    /// The freshly deployed state: every slot holds its type's default.
    pub fn initial(layout: &Arc<StorageLayout>) -> State {
        let values = layout
            .slots()
            .map(|(slot, ty)| (slot.to_string(), SymbolicValue::default_of(ty)))
            .collect();
        State {
            layout: Arc::clone(layout),
            label: "init".to_string(),
            values,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn layout(&self) -> &Arc<StorageLayout> {
        &self.layout
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &SymbolicValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn read(&self, slot: &str) -> ModelResult<SymbolicValue> {
        self.values
            .get(slot)
            .cloned()
            .ok_or_else(|| ModelError::UndeclaredSlot(slot.to_string()))
    }

    /// Read a mapping slot through one key per nesting level.
    pub fn read_at(&self, slot: &str, keys: &[&SymbolicValue]) -> ModelResult<SymbolicValue> {
        let base = self.read(slot)?;
        self.check_depth(slot, base.ty(), keys.len())?;
        base.read_path(keys)
    }

    pub fn write(&self, slot: &str, value: SymbolicValue) -> ModelResult<State> {
        let expected = self.layout.slot_type(slot)?;
        if value.ty() != expected {
            return Err(ModelError::TypeMismatch {
                context: format!("write to '{slot}'"),
                expected: expected.clone(),
                found: value.ty().clone(),
            });
        }
        let mut next = self.clone();
        next.values.insert(slot.to_string(), value);
        Ok(next)
    }

    /// Functional update of a (possibly nested) mapping slot at `keys`.
    pub fn write_at(
        &self,
        slot: &str,
        keys: &[&SymbolicValue],
        value: SymbolicValue,
    ) -> ModelResult<State> {
        let base = self.read(slot)?;
        self.check_depth(slot, base.ty(), keys.len())?;
        let updated = base.write_path(keys, &value)?;
        self.write(slot, updated)
    }

    /// Slot-wise equality with another state over the same layout.
    pub fn equals(&self, other: &State) -> ModelResult<Predicate> {
        self.same_layout(other)?;
        let mut conjuncts = Vec::with_capacity(self.values.len());
        for (slot, value) in &self.values {
            conjuncts.push(value.eq(&other.read(slot)?)?);
        }
        Ok(Predicate::all(conjuncts))
    }

    /// Slot-wise `if cond then a else b`.
    pub fn ite(cond: &Predicate, then: &State, els: &State) -> ModelResult<State> {
        then.same_layout(els)?;
        let mut values = IndexMap::with_capacity(then.values.len());
        for (slot, value) in &then.values {
            values.insert(
                slot.clone(),
                SymbolicValue::ite(cond, value, &els.read(slot)?)?,
            );
        }
        Ok(State {
            layout: Arc::clone(&then.layout),
            label: then.label.clone(),
            values,
        })
    }

    pub(crate) fn same_layout(&self, other: &State) -> ModelResult<()> {
        if Arc::ptr_eq(&self.layout, &other.layout) || self.layout == other.layout {
            Ok(())
        } else {
            Err(ModelError::LayoutMismatch)
        }
    }

    fn check_depth(&self, slot: &str, ty: &SlotType, given: usize) -> ModelResult<()> {
        let depth = ty.map_depth();
        if given == 0 || given > depth {
            return Err(ModelError::KeyDepth {
                slot: slot.to_string(),
                given,
                depth,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use slotguard_smt::terms::SmtTerm;

    fn layout() -> Arc<StorageLayout> {
        StorageLayout::builder()
            .slot("owner", SlotType::Address)
            .slot("balance", SlotType::uint256())
            .slot(
                "allowed",
                SlotType::map(SlotType::Address, SlotType::map(SlotType::Address, SlotType::Bool)),
            )
            .build()
            .expect("valid layout")
    }

    fn addr(n: u64) -> SymbolicValue {
        SymbolicValue::literal(SlotType::Address, n).expect("numeric")
    }

    #[test]
    fn duplicate_slot_is_rejected() {
        let err = StorageLayout::builder()
            .slot("x", SlotType::Bool)
            .slot("x", SlotType::uint256())
            .build()
            .unwrap_err();
        assert_eq!(err, ModelError::DuplicateSlot("x".into()));
    }

    #[test]
    fn declared_state_names_each_slot() {
        let mut vocab = Vocabulary::new();
        let s = declare_state(&layout(), "s1", &mut vocab).expect("declare");
        assert_eq!(s.label(), "s1");
        assert_eq!(
            s.read("balance").expect("slot").term(),
            &SmtTerm::var("s1.balance")
        );
        assert!(vocab.contains("s1.allowed"));
        assert_eq!(vocab.len(), 3);
    }

    #[test]
    fn undeclared_slot_and_bad_writes_fail() {
        let s = State::initial(&layout());
        assert_eq!(
            s.read("missing").unwrap_err(),
            ModelError::UndeclaredSlot("missing".into())
        );
        assert!(matches!(
            s.write("balance", SymbolicValue::bool(true)),
            Err(ModelError::TypeMismatch { .. })
        ));
        assert!(matches!(
            s.read_at("balance", &[&addr(1)]),
            Err(ModelError::KeyDepth { depth: 0, .. })
        ));
        assert!(matches!(
            s.read_at("allowed", &[&addr(1), &addr(2), &addr(3)]),
            Err(ModelError::KeyDepth { given: 3, depth: 2, .. })
        ));
    }

    #[test]
    fn write_leaves_the_original_untouched() {
        let s = State::initial(&layout());
        let t = s
            .write_at("allowed", &[&addr(1), &addr(2)], SymbolicValue::bool(true))
            .expect("nested write");
        assert_eq!(
            s.read_at("allowed", &[&addr(1), &addr(2)]).expect("read").term(),
            &SmtTerm::bool(false)
        );
        assert_eq!(
            t.read_at("allowed", &[&addr(1), &addr(2)]).expect("read").term(),
            &SmtTerm::bool(true)
        );
    }

    #[test]
    fn states_over_different_layouts_do_not_compare() {
        let other = StorageLayout::builder()
            .slot("x", SlotType::Bool)
            .build()
            .expect("layout");
        let a = State::initial(&layout());
        let b = State::initial(&other);
        assert_eq!(a.equals(&b).unwrap_err(), ModelError::LayoutMismatch);
        assert_eq!(a.equals(&a).expect("same layout"), Predicate::always());
    }

    proptest! {
        /// Reads on a never-written mapping key return the default, and a
        /// write is visible at its key while other literal keys are unchanged.
        #[test]
        fn mapping_reads_follow_functional_update(
            written in 0u64..64,
            key in 0u64..64,
            amount in any::<u64>(),
        ) {
            let ty = SlotType::map(SlotType::Address, SlotType::uint256());
            let l = StorageLayout::builder().slot("m", ty).build().expect("layout");
            let s = State::initial(&l);
            let fresh = s.read_at("m", &[&addr(key)]).expect("read");
            prop_assert_eq!(fresh.term(), &SmtTerm::bv(0u8, 256));

            let v = SymbolicValue::uint(amount, 256);
            let t = s.write_at("m", &[&addr(written)], v.clone()).expect("write");
            let seen = t.read_at("m", &[&addr(key)]).expect("read");
            if key == written {
                prop_assert_eq!(seen.term(), v.term());
            } else {
                prop_assert_eq!(seen.term(), &SmtTerm::bv(0u8, 256));
            }
        }

        /// Writing one slot leaves every other slot's read untouched, on
        /// both the constant start state and a declared one.
        #[test]
        fn slot_write_leaves_other_slots_alone(
            written in 0usize..3,
            amount in any::<u64>(),
            declared in any::<bool>(),
        ) {
            let l = layout();
            let s = if declared {
                let mut vocab = Vocabulary::new();
                declare_state(&l, "pre", &mut vocab).expect("declare")
            } else {
                State::initial(&l)
            };
            let slots = ["owner", "balance", "allowed"];
            let target = slots[written];
            let t = match target {
                "owner" => s.write("owner", addr(amount)),
                "balance" => s.write("balance", SymbolicValue::uint(amount, 256)),
                _ => s.write_at("allowed", &[&addr(amount), &addr(1)], SymbolicValue::bool(true)),
            }
            .expect("write");
            for other in slots.iter().filter(|name| **name != target) {
                let after = t.read(other).expect("slot");
                let before = s.read(other).expect("slot");
                prop_assert_eq!(after.term(), before.term());
            }
        }
    }
}
