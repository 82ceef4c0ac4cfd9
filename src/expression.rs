// src/expression.rs
use crate::context::Context;
use crate::parser::{ParseError, Parser};
use serde_json::Value;
use tracing::warn;

/// Ranges spanning more elements than this evaluate to an empty array.
pub const MAX_RANGE_LEN: i64 = 100_000;

/// A value expression as it appears in `{{ }}` output and tag markup.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// `(start..end)`, inclusive on both ends.
    Range(Box<Expr>, Box<Expr>),
    Path { root: String, accessors: Vec<Accessor> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    /// `.name`
    Key(String),
    /// `[expr]`
    Index(Box<Expr>),
}

/// Parse a complete expression; trailing input is an error.
pub fn parse_expr(input: &str) -> Result<Expr, ParseError> {
    let mut p = Parser::new(input);
    let expr = parse_node(&mut p)?;
    p.skip_ws();
    if !p.eof() {
        return Err(ParseError::InvalidSyntax(format!(
            "unexpected '{}' in expression '{}'",
            p.rest(),
            input.trim()
        )));
    }
    Ok(expr)
}

pub(crate) fn parse_node(p: &mut Parser) -> Result<Expr, ParseError> {
    p.skip_ws();
    match p.peek_char() {
        Some('\'') | Some('"') => Ok(Expr::Literal(Value::String(p.parse_quoted_string()?))),
        Some('(') => {
            p.expect('(')?;
            let start = parse_node(p)?;
            p.skip_ws();
            if !p.consume_str("..") {
                return Err(ParseError::InvalidSyntax("expected '..' in range".into()));
            }
            let end = parse_node(p)?;
            p.skip_ws();
            p.expect(')')?;
            Ok(Expr::Range(Box::new(start), Box::new(end)))
        }
        Some(c) if c == '-' || c.is_ascii_digit() => Ok(Expr::Literal(p.parse_number_literal()?)),
        Some(_) => parse_path(p),
        None => Err(ParseError::InvalidSyntax("expression expected".into())),
    }
}

fn parse_path(p: &mut Parser) -> Result<Expr, ParseError> {
    let root = p.parse_identifier()?;
    let mut accessors = Vec::new();
    loop {
        if p.peek_str("..") {
            break;
        }
        if p.consume_char('.') {
            accessors.push(Accessor::Key(p.parse_identifier()?));
        } else if p.consume_char('[') {
            let inner = parse_node(p)?;
            p.skip_ws();
            p.expect(']')?;
            accessors.push(Accessor::Index(Box::new(inner)));
        } else {
            break;
        }
    }
    if accessors.is_empty() {
        match root.as_str() {
            "true" => return Ok(Expr::Literal(Value::Bool(true))),
            "false" => return Ok(Expr::Literal(Value::Bool(false))),
            "nil" | "null" => return Ok(Expr::Literal(Value::Null)),
            _ => {}
        }
    }
    Ok(Expr::Path { root, accessors })
}

impl Expr {
    /// Evaluate against the context; unknown variables and keys give `Null`.
    pub fn eval(&self, ctx: &Context<'_>) -> Value {
        match self {
            Expr::Literal(v) => v.clone(),
            Expr::Range(start, end) => {
                match (as_int(&start.eval(ctx)), as_int(&end.eval(ctx))) {
                    (Some(a), Some(b)) if i128::from(b) - i128::from(a) >= i128::from(MAX_RANGE_LEN) => {
                        warn!(start = a, end = b, limit = MAX_RANGE_LEN, "range too long, treating as empty");
                        Value::Array(Vec::new())
                    }
                    (Some(a), Some(b)) => Value::Array((a..=b).map(Value::from).collect()),
                    _ => Value::Array(Vec::new()),
                }
            }
            Expr::Path { root, accessors } => {
                let mut current = ctx.get(root).cloned().unwrap_or(Value::Null);
                for accessor in accessors {
                    current = match accessor {
                        Accessor::Key(key) => lookup_key(&current, key),
                        Accessor::Index(index) => match index.eval(ctx) {
                            Value::String(key) => lookup_key(&current, &key),
                            other => lookup_index(&current, &other),
                        },
                    };
                }
                current
            }
        }
    }
}

fn as_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lookup_key(v: &Value, key: &str) -> Value {
    if let Some(found) = v.as_object().and_then(|m| m.get(key)) {
        return found.clone();
    }
    match (v, key) {
        (Value::Array(a), "size") => Value::from(a.len()),
        (Value::Array(a), "first") => a.first().cloned().unwrap_or(Value::Null),
        (Value::Array(a), "last") => a.last().cloned().unwrap_or(Value::Null),
        (Value::String(s), "size") => Value::from(s.chars().count()),
        (Value::Object(m), "size") => Value::from(m.len()),
        _ => Value::Null,
    }
}

fn lookup_index(v: &Value, index: &Value) -> Value {
    let (Value::Array(a), Some(i)) = (v, as_int(index)) else {
        return Value::Null;
    };
    let i = if i < 0 { a.len() as i64 + i } else { i };
    usize::try_from(i)
        .ok()
        .and_then(|i| a.get(i))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Render a value the way `{{ }}` prints it.
pub fn to_output(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(to_output).collect(),
        Value::Object(_) => v.to_string(),
    }
}

/// `nil` and `false` are falsy, everything else is truthy.
pub fn is_truthy(v: &Value) -> bool {
    !matches!(v, Value::Null | Value::Bool(false))
}
