use std::collections::HashMap;

use num_bigint::BigUint;
use thiserror::Error;
use z3::ast::{Array, Ast, Bool, Dynamic, Int, BV};
use z3::SatResult as Z3SatResult;

use crate::backends::sexp;
use crate::solver::{Model, ModelValue, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Dispatch a generic z3 call over whichever AST kind a [`Z3Term`] holds.
macro_rules! with_ast {
    ($term:expr, |$ast:ident| $body:expr) => {
        match $term {
            Z3Term::Bool($ast) => $body,
            Z3Term::Int($ast) => $body,
            Z3Term::Bv($ast) => $body,
            Z3Term::Array($ast) => $body,
        }
    };
}

#[derive(Debug, Error)]
pub enum Z3Error {
    #[error("Z3 error: {0}")]
    Internal(String),
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
    #[error("Sort mismatch in {0}")]
    SortMismatch(&'static str),
}

pub struct Z3Solver {
    solver: z3::Solver,
    vars: HashMap<String, Z3Term>,
    _params: Option<z3::Params>,
}

impl Z3Solver {
    pub fn new() -> Self {
        Self {
            solver: z3::Solver::new(),
            vars: HashMap::new(),
            _params: None,
        }
    }

    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        if timeout_secs == 0 {
            return Self::new();
        }
        Self::with_timeout_ms(timeout_secs.saturating_mul(1000))
    }

    pub fn with_timeout_ms(timeout_ms: u64) -> Self {
        let solver = z3::Solver::new();
        let mut params = z3::Params::new();
        let timeout_ms = u32::try_from(timeout_ms).unwrap_or(u32::MAX);
        params.set_u32("timeout", timeout_ms);
        solver.set_params(&params);
        Self {
            solver,
            vars: HashMap::new(),
            _params: Some(params),
        }
    }

    pub fn with_default_config() -> Self {
        Self::new()
    }

    fn translate_term(&self, term: &SmtTerm) -> Result<Z3Term, Z3Error> {
        match term {
            SmtTerm::Var(name) => self
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| Z3Error::UnknownVariable(name.clone())),
            SmtTerm::IntLit(n) => Ok(Z3Term::Int(Int::from_i64(*n))),
            SmtTerm::BoolLit(b) => Ok(Z3Term::Bool(Bool::from_bool(*b))),
            SmtTerm::BvLit { value, width } => Ok(Z3Term::Bv(bv_literal(value, *width)?)),
            SmtTerm::Add(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_int()?;
                let r = self.translate_term(rhs)?.into_int()?;
                Ok(Z3Term::Int(&l + &r))
            }
            SmtTerm::Sub(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_int()?;
                let r = self.translate_term(rhs)?.into_int()?;
                Ok(Z3Term::Int(&l - &r))
            }
            SmtTerm::Lt(lhs, rhs) => {
                let (l, r) = self.int_pair(lhs, rhs)?;
                Ok(Z3Term::Bool(l.lt(&r)))
            }
            SmtTerm::Le(lhs, rhs) => {
                let (l, r) = self.int_pair(lhs, rhs)?;
                Ok(Z3Term::Bool(l.le(&r)))
            }
            SmtTerm::Gt(lhs, rhs) => {
                let (l, r) = self.int_pair(lhs, rhs)?;
                Ok(Z3Term::Bool(l.gt(&r)))
            }
            SmtTerm::Ge(lhs, rhs) => {
                let (l, r) = self.int_pair(lhs, rhs)?;
                Ok(Z3Term::Bool(l.ge(&r)))
            }
            SmtTerm::BvAdd(lhs, rhs) => {
                let (l, r) = self.bv_pair(lhs, rhs)?;
                Ok(Z3Term::Bv(l.bvadd(&r)))
            }
            SmtTerm::BvSub(lhs, rhs) => {
                let (l, r) = self.bv_pair(lhs, rhs)?;
                Ok(Z3Term::Bv(l.bvsub(&r)))
            }
            SmtTerm::BvUlt(lhs, rhs) => {
                let (l, r) = self.bv_pair(lhs, rhs)?;
                Ok(Z3Term::Bool(l.bvult(&r)))
            }
            SmtTerm::BvUle(lhs, rhs) => {
                let (l, r) = self.bv_pair(lhs, rhs)?;
                Ok(Z3Term::Bool(l.bvule(&r)))
            }
            SmtTerm::BvUgt(lhs, rhs) => {
                let (l, r) = self.bv_pair(lhs, rhs)?;
                Ok(Z3Term::Bool(l.bvugt(&r)))
            }
            SmtTerm::BvUge(lhs, rhs) => {
                let (l, r) = self.bv_pair(lhs, rhs)?;
                Ok(Z3Term::Bool(l.bvuge(&r)))
            }
            SmtTerm::Eq(lhs, rhs) => {
                let l = self.translate_term(lhs)?;
                let r = self.translate_term(rhs)?;
                match (l, r) {
                    (Z3Term::Int(li), Z3Term::Int(ri)) => Ok(Z3Term::Bool(li.eq(&ri))),
                    (Z3Term::Bool(lb), Z3Term::Bool(rb)) => Ok(Z3Term::Bool(lb.eq(&rb))),
                    (Z3Term::Bv(lv), Z3Term::Bv(rv)) => Ok(Z3Term::Bool(lv.eq(&rv))),
                    (Z3Term::Array(la), Z3Term::Array(ra)) => Ok(Z3Term::Bool(la.eq(&ra))),
                    _ => Err(Z3Error::SortMismatch("Eq")),
                }
            }
            SmtTerm::And(terms) => {
                let bools = self.translate_bools(terms)?;
                let refs: Vec<&Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(Bool::and(&refs)))
            }
            SmtTerm::Or(terms) => {
                let bools = self.translate_bools(terms)?;
                let refs: Vec<&Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(Bool::or(&refs)))
            }
            SmtTerm::Not(inner) => {
                let b = self.translate_term(inner)?.into_bool()?;
                Ok(Z3Term::Bool(b.not()))
            }
            SmtTerm::Implies(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_bool()?;
                let r = self.translate_term(rhs)?.into_bool()?;
                Ok(Z3Term::Bool(l.implies(&r)))
            }
            SmtTerm::Ite(cond, then, els) => {
                let c = self.translate_term(cond)?.into_bool()?;
                let t = self.translate_term(then)?;
                let e = self.translate_term(els)?;
                match (t, e) {
                    (Z3Term::Int(ti), Z3Term::Int(ei)) => Ok(Z3Term::Int(c.ite(&ti, &ei))),
                    (Z3Term::Bool(tb), Z3Term::Bool(eb)) => Ok(Z3Term::Bool(c.ite(&tb, &eb))),
                    (Z3Term::Bv(tv), Z3Term::Bv(ev)) => Ok(Z3Term::Bv(c.ite(&tv, &ev))),
                    (Z3Term::Array(ta), Z3Term::Array(ea)) => Ok(Z3Term::Array(c.ite(&ta, &ea))),
                    _ => Err(Z3Error::SortMismatch("ITE")),
                }
            }
            SmtTerm::Select(array, index) => {
                let a = self.translate_term(array)?.into_array()?;
                let i = self.translate_term(index)?;
                let selected = with_ast!(i, |idx| a.select(&idx));
                Z3Term::from_dynamic(selected)
            }
            SmtTerm::Store(array, index, value) => {
                let a = self.translate_term(array)?.into_array()?;
                let i = self.translate_term(index)?;
                let v = self.translate_term(value)?;
                let stored = with_ast!(i, |idx| with_ast!(v, |val| a.store(&idx, &val)));
                Ok(Z3Term::Array(stored))
            }
            SmtTerm::ConstArray { sort, value } => {
                let SmtSort::Array(domain, _) = sort else {
                    return Err(Z3Error::SortMismatch("ConstArray"));
                };
                let domain = to_z3_sort(domain);
                let v = self.translate_term(value)?;
                let array = with_ast!(v, |val| Array::const_array(&domain, &val));
                Ok(Z3Term::Array(array))
            }
        }
    }

    fn translate_bools(&self, terms: &[SmtTerm]) -> Result<Vec<Bool>, Z3Error> {
        terms
            .iter()
            .map(|t| self.translate_term(t).and_then(Z3Term::into_bool))
            .collect()
    }

    fn int_pair(&self, lhs: &SmtTerm, rhs: &SmtTerm) -> Result<(Int, Int), Z3Error> {
        Ok((
            self.translate_term(lhs)?.into_int()?,
            self.translate_term(rhs)?.into_int()?,
        ))
    }

    fn bv_pair(&self, lhs: &SmtTerm, rhs: &SmtTerm) -> Result<(BV, BV), Z3Error> {
        Ok((
            self.translate_term(lhs)?.into_bv()?,
            self.translate_term(rhs)?.into_bv()?,
        ))
    }

    fn map_check(&self, result: Z3SatResult) -> SatResult {
        match result {
            Z3SatResult::Sat => SatResult::Sat,
            Z3SatResult::Unsat => SatResult::Unsat,
            Z3SatResult::Unknown => SatResult::Unknown(
                self.solver
                    .get_reason_unknown()
                    .unwrap_or_else(|| "Z3 returned unknown".into()),
            ),
        }
    }
}

#[derive(Clone)]
enum Z3Term {
    Bool(Bool),
    Int(Int),
    Bv(BV),
    Array(Array),
}

impl Z3Term {
    fn into_int(self) -> Result<Int, Z3Error> {
        match self {
            Z3Term::Int(i) => Ok(i),
            _ => Err(Z3Error::Internal("Expected Int".into())),
        }
    }

    fn into_bool(self) -> Result<Bool, Z3Error> {
        match self {
            Z3Term::Bool(b) => Ok(b),
            _ => Err(Z3Error::Internal("Expected Bool".into())),
        }
    }

    fn into_bv(self) -> Result<BV, Z3Error> {
        match self {
            Z3Term::Bv(bv) => Ok(bv),
            _ => Err(Z3Error::Internal("Expected BitVec".into())),
        }
    }

    fn into_array(self) -> Result<Array, Z3Error> {
        match self {
            Z3Term::Array(a) => Ok(a),
            _ => Err(Z3Error::Internal("Expected Array".into())),
        }
    }

    fn from_dynamic(d: Dynamic) -> Result<Self, Z3Error> {
        if let Some(b) = d.as_bool() {
            Ok(Z3Term::Bool(b))
        } else if let Some(bv) = d.as_bv() {
            Ok(Z3Term::Bv(bv))
        } else if let Some(a) = d.as_array() {
            Ok(Z3Term::Array(a))
        } else if let Some(i) = d.as_int() {
            Ok(Z3Term::Int(i))
        } else {
            Err(Z3Error::Internal(format!("unsupported select result: {d}")))
        }
    }
}

fn to_z3_sort(sort: &SmtSort) -> z3::Sort {
    match sort {
        SmtSort::Bool => z3::Sort::bool(),
        SmtSort::Int => z3::Sort::int(),
        SmtSort::BitVec(w) => z3::Sort::bitvector(*w),
        SmtSort::Array(index, element) => {
            z3::Sort::array(&to_z3_sort(index), &to_z3_sort(element))
        }
    }
}

/// Build a bit-vector constant of any width from 64-bit limbs, least
/// significant first, so wide literals never go through string parsing.
fn bv_literal(value: &BigUint, width: u32) -> Result<BV, Z3Error> {
    let limbs = value.to_u64_digits();
    let mut remaining = width;
    let mut idx = 0usize;
    let mut acc: Option<BV> = None;
    while remaining > 0 {
        let chunk = remaining.min(64);
        let limb = limbs.get(idx).copied().unwrap_or(0);
        let limb = if chunk < 64 {
            limb & ((1u64 << chunk) - 1)
        } else {
            limb
        };
        let part = BV::from_u64(limb, chunk);
        acc = Some(match acc {
            None => part,
            Some(low) => part.concat(&low),
        });
        remaining -= chunk;
        idx += 1;
    }
    acc.ok_or_else(|| Z3Error::Internal("zero-width bit-vector literal".into()))
}

fn eval_value(model: &z3::Model, term: &Z3Term) -> Option<ModelValue> {
    match term {
        Z3Term::Bool(b) => model.eval(b, true)?.as_bool().map(ModelValue::Bool),
        Z3Term::Int(i) => model.eval(i, true)?.as_i64().map(ModelValue::Int),
        Z3Term::Bv(bv) => {
            let width = bv.get_size();
            let val = model.eval(bv, true)?;
            match val.as_u64() {
                Some(n) => Some(ModelValue::BitVec {
                    value: BigUint::from(n),
                    width,
                }),
                None => match sexp::atom_value(&val.to_string()) {
                    Some(ModelValue::BitVec { value, .. }) => {
                        Some(ModelValue::BitVec { value, width })
                    }
                    _ => None,
                },
            }
        }
        Z3Term::Array(a) => Some(ModelValue::Raw(model.eval(a, true)?.to_string())),
    }
}

impl Default for Z3Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl SmtSolver for Z3Solver {
    type Error = Z3Error;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Z3Error> {
        let var = match sort {
            SmtSort::Bool => Z3Term::Bool(Bool::new_const(name)),
            SmtSort::Int => Z3Term::Int(Int::new_const(name)),
            SmtSort::BitVec(w) => Z3Term::Bv(BV::new_const(name, *w)),
            SmtSort::Array(index, element) => Z3Term::Array(Array::new_const(
                name,
                &to_z3_sort(index),
                &to_z3_sort(element),
            )),
        };
        self.vars.insert(name.to_string(), var);
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Z3Error> {
        let z3_term = self.translate_term(term)?.into_bool()?;
        self.solver.assert(&z3_term);
        Ok(())
    }

    fn push(&mut self) -> Result<(), Z3Error> {
        self.solver.push();
        Ok(())
    }

    fn pop(&mut self) -> Result<(), Z3Error> {
        self.solver.pop(1);
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult, Z3Error> {
        let result = self.solver.check();
        Ok(self.map_check(result))
    }

    fn check_sat_with_values(
        &mut self,
        observations: &[(String, SmtTerm)],
    ) -> Result<(SatResult, Option<Model>), Z3Error> {
        let result = self.solver.check();
        if result != Z3SatResult::Sat {
            return Ok((self.map_check(result), None));
        }
        let z3_model = self
            .solver
            .get_model()
            .ok_or_else(|| Z3Error::Internal("SAT but no model available".into()))?;
        let mut model = Model::default();
        for (label, term) in observations {
            let translated = self.translate_term(term)?;
            if let Some(value) = eval_value(&z3_model, &translated) {
                model.values.insert(label.clone(), value);
            }
        }
        Ok((SatResult::Sat, Some(model)))
    }

    fn reset(&mut self) -> Result<(), Z3Error> {
        self.solver.reset();
        // Z3 may drop per-solver parameters on reset; reapply timeout if configured.
        if let Some(params) = &self._params {
            self.solver.set_params(params);
        }
        self.vars.clear();
        Ok(())
    }
}
