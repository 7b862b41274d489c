/// SMT sorts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SmtSort {
    Bool,
    Int,
    /// Fixed-width bit-vector `(_ BitVec w)`.
    BitVec(u32),
    /// Total array from index sort to element sort.
    Array(Box<SmtSort>, Box<SmtSort>),
}

impl SmtSort {
    pub fn bitvec(width: u32) -> Self {
        SmtSort::BitVec(width)
    }

    pub fn array(index: SmtSort, element: SmtSort) -> Self {
        SmtSort::Array(Box::new(index), Box::new(element))
    }

    /// Bit width for bit-vector sorts.
    pub fn width(&self) -> Option<u32> {
        match self {
            SmtSort::BitVec(w) => Some(*w),
            _ => None,
        }
    }

    /// Element sort of an array sort.
    pub fn element(&self) -> Option<&SmtSort> {
        match self {
            SmtSort::Array(_, element) => Some(element),
            _ => None,
        }
    }
}

impl std::fmt::Display for SmtSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmtSort::Bool => write!(f, "Bool"),
            SmtSort::Int => write!(f, "Int"),
            SmtSort::BitVec(w) => write!(f, "(_ BitVec {w})"),
            SmtSort::Array(index, element) => write!(f, "(Array {index} {element})"),
        }
    }
}
