use std::fmt::Write as _;

use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Print an SmtTerm as SMT-LIB2 format.
pub fn to_smtlib(term: &SmtTerm) -> String {
    match term {
        SmtTerm::Var(name) => name.clone(),
        SmtTerm::IntLit(n) => {
            if *n < 0 {
                format!("(- {})", n.unsigned_abs())
            } else {
                n.to_string()
            }
        }
        SmtTerm::BoolLit(b) => {
            if *b {
                "true".to_string()
            } else {
                "false".to_string()
            }
        }
        SmtTerm::BvLit { value, width } => format!("(_ bv{value} {width})"),
        SmtTerm::Add(lhs, rhs) => binary("+", lhs, rhs),
        SmtTerm::Sub(lhs, rhs) => binary("-", lhs, rhs),
        SmtTerm::Lt(lhs, rhs) => binary("<", lhs, rhs),
        SmtTerm::Le(lhs, rhs) => binary("<=", lhs, rhs),
        SmtTerm::Gt(lhs, rhs) => binary(">", lhs, rhs),
        SmtTerm::Ge(lhs, rhs) => binary(">=", lhs, rhs),
        SmtTerm::BvAdd(lhs, rhs) => binary("bvadd", lhs, rhs),
        SmtTerm::BvSub(lhs, rhs) => binary("bvsub", lhs, rhs),
        SmtTerm::BvUlt(lhs, rhs) => binary("bvult", lhs, rhs),
        SmtTerm::BvUle(lhs, rhs) => binary("bvule", lhs, rhs),
        SmtTerm::BvUgt(lhs, rhs) => binary("bvugt", lhs, rhs),
        SmtTerm::BvUge(lhs, rhs) => binary("bvuge", lhs, rhs),
        SmtTerm::Eq(lhs, rhs) => binary("=", lhs, rhs),
        SmtTerm::And(terms) => {
            if terms.is_empty() {
                "true".to_string()
            } else if terms.len() == 1 {
                to_smtlib(&terms[0])
            } else {
                let inner: Vec<String> = terms.iter().map(to_smtlib).collect();
                format!("(and {})", inner.join(" "))
            }
        }
        SmtTerm::Or(terms) => {
            if terms.is_empty() {
                "false".to_string()
            } else if terms.len() == 1 {
                to_smtlib(&terms[0])
            } else {
                let inner: Vec<String> = terms.iter().map(to_smtlib).collect();
                format!("(or {})", inner.join(" "))
            }
        }
        SmtTerm::Not(inner) => format!("(not {})", to_smtlib(inner)),
        SmtTerm::Implies(lhs, rhs) => binary("=>", lhs, rhs),
        SmtTerm::Ite(cond, then, els) => {
            format!(
                "(ite {} {} {})",
                to_smtlib(cond),
                to_smtlib(then),
                to_smtlib(els)
            )
        }
        SmtTerm::Select(array, index) => binary("select", array, index),
        SmtTerm::Store(array, index, value) => format!(
            "(store {} {} {})",
            to_smtlib(array),
            to_smtlib(index),
            to_smtlib(value)
        ),
        SmtTerm::ConstArray { sort, value } => {
            format!("((as const {}) {})", sort_to_smtlib(sort), to_smtlib(value))
        }
    }
}

fn binary(op: &str, lhs: &SmtTerm, rhs: &SmtTerm) -> String {
    format!("({op} {} {})", to_smtlib(lhs), to_smtlib(rhs))
}

/// Print a sort as SMT-LIB2 format.
pub fn sort_to_smtlib(sort: &SmtSort) -> String {
    sort.to_string()
}

/// Render a standalone SMT-LIB2 script: declarations, assertions and a
/// trailing `(check-sat)`. Comment lines are emitted before the body.
pub fn render_script(
    comments: &[String],
    declarations: &[(String, SmtSort)],
    assertions: &[SmtTerm],
) -> String {
    let mut out = String::new();
    for line in comments {
        let _ = writeln!(out, "; {line}");
    }
    for (name, sort) in declarations {
        let _ = writeln!(out, "(declare-const {name} {})", sort_to_smtlib(sort));
    }
    for term in assertions {
        let _ = writeln!(out, "(assert {})", to_smtlib(term));
    }
    out.push_str("(check-sat)\n");
    out
}
