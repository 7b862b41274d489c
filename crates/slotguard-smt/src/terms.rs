use num_bigint::BigUint;

use crate::sorts::SmtSort;

/// Abstract SMT term representation, solver-agnostic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SmtTerm {
    /// Variable reference by name.
    Var(String),
    /// Integer literal.
    IntLit(i64),
    /// Boolean literal.
    BoolLit(bool),
    /// Bit-vector literal; `value` is kept below `2^width` by the constructors.
    BvLit { value: BigUint, width: u32 },

    // Integer arithmetic
    Add(Box<SmtTerm>, Box<SmtTerm>),
    Sub(Box<SmtTerm>, Box<SmtTerm>),

    // Integer comparison
    Lt(Box<SmtTerm>, Box<SmtTerm>),
    Le(Box<SmtTerm>, Box<SmtTerm>),
    Gt(Box<SmtTerm>, Box<SmtTerm>),
    Ge(Box<SmtTerm>, Box<SmtTerm>),

    // Modular bit-vector arithmetic
    BvAdd(Box<SmtTerm>, Box<SmtTerm>),
    BvSub(Box<SmtTerm>, Box<SmtTerm>),

    // Unsigned bit-vector comparison
    BvUlt(Box<SmtTerm>, Box<SmtTerm>),
    BvUle(Box<SmtTerm>, Box<SmtTerm>),
    BvUgt(Box<SmtTerm>, Box<SmtTerm>),
    BvUge(Box<SmtTerm>, Box<SmtTerm>),

    /// Equality over any sort.
    Eq(Box<SmtTerm>, Box<SmtTerm>),

    // Boolean logic
    And(Vec<SmtTerm>),
    Or(Vec<SmtTerm>),
    Not(Box<SmtTerm>),
    Implies(Box<SmtTerm>, Box<SmtTerm>),

    // If-then-else
    Ite(Box<SmtTerm>, Box<SmtTerm>, Box<SmtTerm>),

    // Arrays
    Select(Box<SmtTerm>, Box<SmtTerm>),
    Store(Box<SmtTerm>, Box<SmtTerm>, Box<SmtTerm>),
    /// Array with every index mapped to `value`. `sort` is the full array sort.
    ConstArray { sort: SmtSort, value: Box<SmtTerm> },
}

#[allow(clippy::should_implement_trait)]
impl SmtTerm {
    pub fn var(name: impl Into<String>) -> Self {
        SmtTerm::Var(name.into())
    }

    pub fn int(n: i64) -> Self {
        SmtTerm::IntLit(n)
    }

    pub fn bool(b: bool) -> Self {
        SmtTerm::BoolLit(b)
    }

    /// Bit-vector literal, reduced modulo `2^width`.
    pub fn bv(value: impl Into<BigUint>, width: u32) -> Self {
        let modulus = BigUint::from(1u8) << width;
        SmtTerm::BvLit {
            value: value.into() % modulus,
            width,
        }
    }

    pub fn add(self, other: SmtTerm) -> Self {
        SmtTerm::Add(Box::new(self), Box::new(other))
    }

    pub fn sub(self, other: SmtTerm) -> Self {
        SmtTerm::Sub(Box::new(self), Box::new(other))
    }

    pub fn lt(self, other: SmtTerm) -> Self {
        SmtTerm::Lt(Box::new(self), Box::new(other))
    }

    pub fn le(self, other: SmtTerm) -> Self {
        SmtTerm::Le(Box::new(self), Box::new(other))
    }

    pub fn gt(self, other: SmtTerm) -> Self {
        SmtTerm::Gt(Box::new(self), Box::new(other))
    }

    pub fn ge(self, other: SmtTerm) -> Self {
        SmtTerm::Ge(Box::new(self), Box::new(other))
    }

    pub fn bvadd(self, other: SmtTerm) -> Self {
        SmtTerm::BvAdd(Box::new(self), Box::new(other))
    }

    pub fn bvsub(self, other: SmtTerm) -> Self {
        SmtTerm::BvSub(Box::new(self), Box::new(other))
    }

    pub fn bvult(self, other: SmtTerm) -> Self {
        SmtTerm::BvUlt(Box::new(self), Box::new(other))
    }

    pub fn bvule(self, other: SmtTerm) -> Self {
        SmtTerm::BvUle(Box::new(self), Box::new(other))
    }

    pub fn bvugt(self, other: SmtTerm) -> Self {
        SmtTerm::BvUgt(Box::new(self), Box::new(other))
    }

    pub fn bvuge(self, other: SmtTerm) -> Self {
        SmtTerm::BvUge(Box::new(self), Box::new(other))
    }

    pub fn eq(self, other: SmtTerm) -> Self {
        SmtTerm::Eq(Box::new(self), Box::new(other))
    }

    pub fn and(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::And(terms)
    }

    pub fn or(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::Or(terms)
    }

    pub fn not(self) -> Self {
        SmtTerm::Not(Box::new(self))
    }

    pub fn implies(self, other: SmtTerm) -> Self {
        SmtTerm::Implies(Box::new(self), Box::new(other))
    }

    pub fn ite(cond: SmtTerm, then: SmtTerm, els: SmtTerm) -> Self {
        SmtTerm::Ite(Box::new(cond), Box::new(then), Box::new(els))
    }

    pub fn select(self, index: SmtTerm) -> Self {
        SmtTerm::Select(Box::new(self), Box::new(index))
    }

    pub fn store(self, index: SmtTerm, value: SmtTerm) -> Self {
        SmtTerm::Store(Box::new(self), Box::new(index), Box::new(value))
    }

    pub fn const_array(sort: SmtSort, value: SmtTerm) -> Self {
        SmtTerm::ConstArray {
            sort,
            value: Box::new(value),
        }
    }

    /// Returns the literal value if this is a boolean literal.
    pub fn as_bool_lit(&self) -> Option<bool> {
        match self {
            SmtTerm::BoolLit(b) => Some(*b),
            _ => None,
        }
    }

    /// Number of nodes in the term tree. Used for encoding-size diagnostics.
    pub fn size(&self) -> usize {
        match self {
            SmtTerm::Var(_) | SmtTerm::IntLit(_) | SmtTerm::BoolLit(_) | SmtTerm::BvLit { .. } => 1,
            SmtTerm::Not(inner) => 1 + inner.size(),
            SmtTerm::ConstArray { value, .. } => 1 + value.size(),
            SmtTerm::Add(a, b)
            | SmtTerm::Sub(a, b)
            | SmtTerm::Lt(a, b)
            | SmtTerm::Le(a, b)
            | SmtTerm::Gt(a, b)
            | SmtTerm::Ge(a, b)
            | SmtTerm::BvAdd(a, b)
            | SmtTerm::BvSub(a, b)
            | SmtTerm::BvUlt(a, b)
            | SmtTerm::BvUle(a, b)
            | SmtTerm::BvUgt(a, b)
            | SmtTerm::BvUge(a, b)
            | SmtTerm::Eq(a, b)
            | SmtTerm::Implies(a, b)
            | SmtTerm::Select(a, b) => 1 + a.size() + b.size(),
            SmtTerm::Ite(a, b, c) | SmtTerm::Store(a, b, c) => 1 + a.size() + b.size() + c.size(),
            SmtTerm::And(terms) | SmtTerm::Or(terms) => {
                1 + terms.iter().map(SmtTerm::size).sum::<usize>()
            }
        }
    }
}
