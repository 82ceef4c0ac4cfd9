use serde_json::Value;

use crate::context::Context;
use crate::expression::{is_truthy, parse_node, Expr};
use crate::parser::{ParseError, Parser};

/// Condition of an `if`/`elsif`/`unless` tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare(Expr, CmpOp, Expr),
    Truthy(Expr),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
}

/// `and`/`or` chain from right to left, so `a or b and c` is `a or (b and c)`.
pub fn parse_condition(input: &str) -> Result<Condition, ParseError> {
    let mut p = Parser::new(input);
    let cond = parse_chain(&mut p)?;
    p.skip_ws();
    if !p.eof() {
        return Err(ParseError::InvalidSyntax(format!(
            "unexpected '{}' in condition '{}'",
            p.rest(),
            input.trim()
        )));
    }
    Ok(cond)
}

fn parse_chain(p: &mut Parser) -> Result<Condition, ParseError> {
    let left = parse_compare(p)?;
    p.skip_ws();
    if p.consume_keyword("and") {
        Ok(Condition::And(Box::new(left), Box::new(parse_chain(p)?)))
    } else if p.consume_keyword("or") {
        Ok(Condition::Or(Box::new(left), Box::new(parse_chain(p)?)))
    } else {
        Ok(left)
    }
}

fn parse_compare(p: &mut Parser) -> Result<Condition, ParseError> {
    let left = parse_node(p)?;
    p.skip_ws();
    let op = if p.consume_str("==") {
        CmpOp::Eq
    } else if p.consume_str("!=") || p.consume_str("<>") {
        CmpOp::Ne
    } else if p.consume_str("<=") {
        CmpOp::Lte
    } else if p.consume_str(">=") {
        CmpOp::Gte
    } else if p.consume_char('<') {
        CmpOp::Lt
    } else if p.consume_char('>') {
        CmpOp::Gt
    } else if p.consume_keyword("contains") {
        CmpOp::Contains
    } else {
        return Ok(Condition::Truthy(left));
    };
    let right = parse_node(p)?;
    Ok(Condition::Compare(left, op, right))
}

impl Condition {
    pub fn eval(&self, ctx: &Context<'_>) -> bool {
        match self {
            Condition::Truthy(e) => is_truthy(&e.eval(ctx)),
            Condition::And(a, b) => a.eval(ctx) && b.eval(ctx),
            Condition::Or(a, b) => a.eval(ctx) || b.eval(ctx),
            Condition::Compare(l, op, r) => {
                let (a, b) = (l.eval(ctx), r.eval(ctx));
                match op {
                    CmpOp::Eq => cmp_values(&a, &b, |o| o == 0),
                    CmpOp::Ne => !cmp_values(&a, &b, |o| o == 0),
                    CmpOp::Lt => cmp_values(&a, &b, |o| o < 0),
                    CmpOp::Lte => cmp_values(&a, &b, |o| o <= 0),
                    CmpOp::Gt => cmp_values(&a, &b, |o| o > 0),
                    CmpOp::Gte => cmp_values(&a, &b, |o| o >= 0),
                    CmpOp::Contains => contains(&a, &b),
                }
            }
        }
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::String(h), Value::String(n)) => h.contains(n.as_str()),
        (Value::Array(items), _) => items.iter().any(|item| cmp_values(item, needle, |o| o == 0)),
        (Value::Object(m), Value::String(key)) => m.contains_key(key),
        _ => false,
    }
}

pub fn cmp_values<F>(a: &Value, b: &Value, pred_on_ord: F) -> bool
where
    F: Fn(i32) -> bool,
{
    match (a, b) {
        (Value::String(sa), Value::String(sb)) => pred_on_ord(sa.cmp(sb) as i32),
        (Value::Number(na), Value::Number(nb)) => {
            if let (Some(da), Some(db)) = (na.as_f64(), nb.as_f64()) {
                pred_on_ord(float_ord(da, db))
            } else {
                pred_on_ord(0) && na == nb
            }
        }
        (Value::Bool(ba), Value::Bool(bb)) => {
            let ord = (*ba as i32) - (*bb as i32);
            pred_on_ord(ord)
        }
        (Value::Number(na), Value::String(sb)) => match (na.as_f64(), sb.parse::<f64>()) {
            (Some(da), Ok(db)) => pred_on_ord(float_ord(da, db)),
            _ => false,
        },
        (Value::String(sa), Value::Number(nb)) => match (sa.parse::<f64>(), nb.as_f64()) {
            (Ok(da), Some(db)) => pred_on_ord(float_ord(da, db)),
            _ => false,
        },
        (Value::Null, Value::Null) => pred_on_ord(0),
        // Mixed kinds are only ever unequal.
        _ => a == b && pred_on_ord(0),
    }
}

fn float_ord(da: f64, db: f64) -> i32 {
    if (da - db).abs() < f64::EPSILON {
        0
    } else if da < db {
        -1
    } else {
        1
    }
}
