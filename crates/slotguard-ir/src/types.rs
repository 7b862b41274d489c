use std::fmt;

use num_bigint::BigUint;
use slotguard_smt::sorts::SmtSort;
use slotguard_smt::terms::SmtTerm;

/// Bit width of an account address.
pub const ADDRESS_WIDTH: u32 = 160;

/// Bit width of the machine word.
pub const WORD_WIDTH: u32 = 256;

/// The type of a storage slot, transition input or symbolic value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotType {
    Bool,
    /// Unsigned fixed-width integer with wraparound arithmetic.
    Uint(u32),
    Address,
    /// Total mapping; every key not yet written reads as the value
    /// type's default.
    Map(Box<SlotType>, Box<SlotType>),
}

impl SlotType {
    pub fn uint256() -> Self {
        SlotType::Uint(WORD_WIDTH)
    }

    pub fn map(key: SlotType, value: SlotType) -> Self {
        SlotType::Map(Box::new(key), Box::new(value))
    }

    /// SMT sort this type lowers to. Addresses are 160-bit vectors and
    /// mappings are arrays.
    pub fn sort(&self) -> SmtSort {
        match self {
            SlotType::Bool => SmtSort::Bool,
            SlotType::Uint(w) => SmtSort::bitvec(*w),
            SlotType::Address => SmtSort::bitvec(ADDRESS_WIDTH),
            SlotType::Map(k, v) => SmtSort::array(k.sort(), v.sort()),
        }
    }

    /// The value a freshly deployed contract holds in a slot of this type:
    /// false, zero, the zero address, or a mapping of defaults.
    pub fn default_term(&self) -> SmtTerm {
        match self {
            SlotType::Bool => SmtTerm::bool(false),
            SlotType::Uint(w) => SmtTerm::bv(0u8, *w),
            SlotType::Address => SmtTerm::bv(0u8, ADDRESS_WIDTH),
            SlotType::Map(_, v) => SmtTerm::const_array(self.sort(), v.default_term()),
        }
    }

    /// Literal of this numeric type, reduced modulo its width.
    pub fn literal(&self, value: impl Into<BigUint>) -> Option<SmtTerm> {
        self.width().map(|w| SmtTerm::bv(value, w))
    }

    pub fn width(&self) -> Option<u32> {
        match self {
            SlotType::Uint(w) => Some(*w),
            SlotType::Address => Some(ADDRESS_WIDTH),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.width().is_some()
    }

    pub fn key_value(&self) -> Option<(&SlotType, &SlotType)> {
        match self {
            SlotType::Map(k, v) => Some((k, v)),
            _ => None,
        }
    }

    /// Number of nested mapping levels (`0` for scalars).
    pub fn map_depth(&self) -> usize {
        match self {
            SlotType::Map(_, v) => 1 + v.map_depth(),
            _ => 0,
        }
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotType::Bool => f.write_str("bool"),
            SlotType::Uint(w) => write!(f, "uint{w}"),
            SlotType::Address => f.write_str("address"),
            SlotType::Map(k, v) => write!(f, "mapping({k} => {v})"),
        }
    }
}
