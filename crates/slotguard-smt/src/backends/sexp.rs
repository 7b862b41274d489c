//! Minimal S-expression reader for solver responses (`get-value` output and
//! numeral printing).

use num_bigint::BigUint;
use num_traits::Num;

use crate::solver::ModelValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SExp {
    Atom(String),
    List(Vec<SExp>),
}

impl SExp {
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExp::Atom(s) => Some(s),
            SExp::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match self {
            SExp::List(items) => Some(items),
            SExp::Atom(_) => None,
        }
    }
}

impl std::fmt::Display for SExp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SExp::Atom(s) => f.write_str(s),
            SExp::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Parse exactly one S-expression. Returns `None` on unbalanced input.
pub fn parse(input: &str) -> Option<SExp> {
    let tokens = tokenize(input);
    let mut pos = 0;
    let expr = parse_at(&tokens, &mut pos)?;
    if pos == tokens.len() {
        Some(expr)
    } else {
        None
    }
}

/// Net parenthesis depth of `input`, ignoring parens inside `|quoted|`
/// symbols and string literals.
pub fn paren_balance(input: &str) -> i64 {
    let mut depth = 0i64;
    let mut in_quote = false;
    let mut in_string = false;
    for ch in input.chars() {
        match ch {
            '|' if !in_string => in_quote = !in_quote,
            '"' if !in_quote => in_string = !in_string,
            '(' if !in_quote && !in_string => depth += 1,
            ')' if !in_quote && !in_string => depth -= 1,
            _ => {}
        }
    }
    depth
}

fn tokenize(input: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut in_quote = false;
    for ch in input.chars() {
        match ch {
            '|' => {
                in_quote = !in_quote;
                buf.push(ch);
            }
            '(' | ')' if !in_quote => {
                if !buf.is_empty() {
                    out.push(std::mem::take(&mut buf));
                }
                out.push(ch.to_string());
            }
            c if c.is_whitespace() && !in_quote => {
                if !buf.is_empty() {
                    out.push(std::mem::take(&mut buf));
                }
            }
            other => buf.push(other),
        }
    }
    if !buf.is_empty() {
        out.push(buf);
    }
    out
}

fn parse_at(tokens: &[String], pos: &mut usize) -> Option<SExp> {
    let tok = tokens.get(*pos)?;
    *pos += 1;
    match tok.as_str() {
        "(" => {
            let mut items = Vec::new();
            loop {
                match tokens.get(*pos).map(String::as_str) {
                    Some(")") => {
                        *pos += 1;
                        return Some(SExp::List(items));
                    }
                    Some(_) => items.push(parse_at(tokens, pos)?),
                    None => return None,
                }
            }
        }
        ")" => None,
        atom => Some(SExp::Atom(atom.to_string())),
    }
}

/// Decode a solver value: `true`/`false`, integers (incl. `(- n)`),
/// `#x..`/`#b..` bit-vector numerals and `(_ bvN w)`. Anything else is kept
/// as [`ModelValue::Raw`].
pub fn model_value(expr: &SExp) -> ModelValue {
    match expr {
        SExp::Atom(a) => atom_value(a).unwrap_or_else(|| ModelValue::Raw(a.clone())),
        SExp::List(items) => list_value(items).unwrap_or_else(|| ModelValue::Raw(expr.to_string())),
    }
}

/// Decode a single numeral atom such as Z3's `#x00ff` printing.
pub fn atom_value(atom: &str) -> Option<ModelValue> {
    match atom {
        "true" => return Some(ModelValue::Bool(true)),
        "false" => return Some(ModelValue::Bool(false)),
        _ => {}
    }
    if let Some(hex) = atom.strip_prefix("#x") {
        let value = BigUint::from_str_radix(hex, 16).ok()?;
        let width = u32::try_from(hex.len()).ok()?.checked_mul(4)?;
        return Some(ModelValue::BitVec { value, width });
    }
    if let Some(bin) = atom.strip_prefix("#b") {
        let value = BigUint::from_str_radix(bin, 2).ok()?;
        let width = u32::try_from(bin.len()).ok()?;
        return Some(ModelValue::BitVec { value, width });
    }
    atom.parse::<i64>().ok().map(ModelValue::Int)
}

fn list_value(items: &[SExp]) -> Option<ModelValue> {
    match items {
        [SExp::Atom(minus), SExp::Atom(n)] if minus == "-" => {
            n.parse::<i64>().ok().map(|n| ModelValue::Int(-n))
        }
        [SExp::Atom(underscore), SExp::Atom(bv), SExp::Atom(width)] if underscore == "_" => {
            let digits = bv.strip_prefix("bv")?;
            let value = BigUint::from_str_radix(digits, 10).ok()?;
            let width = width.parse::<u32>().ok()?;
            Some(ModelValue::BitVec { value, width })
        }
        _ => None,
    }
}
