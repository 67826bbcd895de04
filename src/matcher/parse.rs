//! Turns a query [Document] into an [Expr] tree.
//!
//! Grounded on `matcher.h`'s constructor, which walks a query object's
//! top-level fields once, treating `$and`/`$or`/`$nor`-shaped elements (there:
//! `_andMatchers`/`_orMatchers`) specially and everything else as a basic
//! `(path, operator, operand)` clause appended to `basics`. `$near` is left
//! out on purpose: in `index_geo2d.cpp` it drives a `GeoSearchCursor` (an
//! ordered, limited scan), never a boolean predicate, so it has no place in
//! an [Expr] tree — callers run it through [crate::geo::near] directly.

use regex::{Regex, RegexBuilder};

use crate::{
    bson::{Document, Value},
    err_at,
    matcher::predicate::{Expr, Op},
    Result,
};

/// Parse a query document into its [Expr] tree, ANDing together whatever
/// top-level clauses it names (MongoDB's implicit top-level AND).
pub fn parse_query(query: &Document) -> Result<Expr> {
    let mut clauses = Vec::with_capacity(query.len());
    for (key, value) in query.iter() {
        clauses.push(parse_clause(key, value)?);
    }
    match clauses.len() {
        1 => Ok(clauses.into_iter().next().unwrap()),
        _ => Ok(Expr::And(clauses)),
    }
}

fn parse_clause(key: &str, value: &Value) -> Result<Expr> {
    match key {
        "$and" => Ok(Expr::And(parse_subdocs(value)?)),
        "$or" => Ok(Expr::Or(parse_subdocs(value)?)),
        "$nor" => Ok(Expr::Not(Box::new(Expr::Or(parse_subdocs(value)?)))),
        _ => parse_field(key, value),
    }
}

fn parse_subdocs(value: &Value) -> Result<Vec<Expr>> {
    let items = match value.as_array() {
        Some(items) => items,
        None => return err_at!(BadValue, msg: "{} expects an array of sub-queries", "$and/$or/$nor"),
    };
    items.iter().map(|item| match item.as_document() {
        Some(doc) => parse_query(doc),
        None => err_at!(BadValue, msg: "sub-query element must be a document"),
    }).collect()
}

/// One field's clause. A plain value means `$eq`; an operator document
/// (every key starting with `$`) may name several operators, ANDed
/// together exactly as `matcher.h`'s `basics` list ANDs every
/// `ElementMatcher` across the whole query.
fn parse_field(path: &str, value: &Value) -> Result<Expr> {
    let ops_doc = match value {
        Value::Document(doc) if is_operator_doc(doc) => doc,
        Value::Regex { pattern, options } => {
            return Ok(Expr::Field { path: path.to_string(), op: Op::Regex(build_regex(pattern, options)?) })
        }
        _ => return Ok(Expr::Field { path: path.to_string(), op: Op::Eq(value.clone()) }),
    };

    let mut clauses = Vec::new();
    let options = ops_doc.get("$options").and_then(Value::as_str).unwrap_or("");
    for (opname, operand) in ops_doc.iter() {
        if opname == "$options" {
            continue;
        }
        clauses.push(parse_operator(path, opname, operand, options)?);
    }

    match clauses.len() {
        1 => Ok(clauses.into_iter().next().unwrap()),
        _ => Ok(Expr::And(clauses)),
    }
}

fn is_operator_doc(doc: &Document) -> bool {
    !doc.is_empty() && doc.iter().all(|(k, _)| k.starts_with('$'))
}

fn parse_operator(path: &str, opname: &str, operand: &Value, regex_options: &str) -> Result<Expr> {
    let op = match opname {
        "$eq" => Op::Eq(operand.clone()),
        "$ne" => Op::Ne(operand.clone()),
        "$gt" => Op::Gt(operand.clone()),
        "$gte" => Op::Gte(operand.clone()),
        "$lt" => Op::Lt(operand.clone()),
        "$lte" => Op::Lte(operand.clone()),
        "$in" => Op::In(as_value_list(operand, "$in")?),
        "$nin" => Op::Nin(as_value_list(operand, "$nin")?),
        "$exists" => Op::Exists(as_bool(operand)?),
        "$size" => Op::Size(as_usize(operand)?),
        "$regex" => match operand {
            Value::Regex { pattern, options } => Op::Regex(build_regex(pattern, options)?),
            Value::String(pattern) => Op::Regex(build_regex(pattern, regex_options)?),
            _ => return err_at!(BadValue, msg: "$regex operand must be a string or regex"),
        },
        "$not" => {
            let inner = match operand.as_document() {
                Some(doc) => doc,
                None => return err_at!(BadValue, msg: "$not expects an operator document"),
            };
            return Ok(Expr::Not(Box::new(parse_field(path, &Value::Document(inner.clone()))?)));
        }
        "$within" => return parse_within(path, operand),
        _ => return err_at!(BadValue, msg: "unsupported operator {}", opname),
    };
    Ok(Expr::Field { path: path.to_string(), op })
}

/// `$within: {$center: [[x,y], r]}` or `$within: {$box: [[x1,y1],[x2,y2]]}`
/// (`index_geo2d.cpp`'s `GeoCircleBrowse`/`GeoBoxBrowse` constructors).
fn parse_within(path: &str, operand: &Value) -> Result<Expr> {
    let shape = match operand.as_document() {
        Some(doc) => doc,
        None => return err_at!(BadValue, msg: "$within expects an object"),
    };
    if let Some(center) = shape.get("$center") {
        let args = center.as_array().unwrap_or(&[]);
        let (pt, radius) = match args {
            [point, r] => (as_point(point)?, as_f64(r, "$center radius")?),
            _ => return err_at!(BadValue, msg: "$center expects [[x,y], radius]"),
        };
        return Ok(Expr::Field { path: path.to_string(), op: Op::WithinCircle { center: pt, radius } });
    }
    if let Some(bx) = shape.get("$box") {
        let args = bx.as_array().unwrap_or(&[]);
        let (bl, tr) = match args {
            [a, b] => (as_point(a)?, as_point(b)?),
            _ => return err_at!(BadValue, msg: "$box expects [[x1,y1], [x2,y2]]"),
        };
        return Ok(Expr::Field { path: path.to_string(), op: Op::WithinBox { bl, tr } });
    }
    err_at!(BadValue, msg: "unsupported $within shape")
}

fn as_point(v: &Value) -> Result<(f64, f64)> {
    match v.as_array() {
        Some([x, y]) => Ok((as_f64(x, "point x")?, as_f64(y, "point y")?)),
        _ => err_at!(BadValue, msg: "expected a [x, y] pair"),
    }
}

fn as_f64(v: &Value, what: &str) -> Result<f64> {
    v.as_f64().ok_or(()).or_else(|_| err_at!(BadValue, msg: "{} must be numeric", what))
}

fn as_value_list(v: &Value, opname: &str) -> Result<Vec<Value>> {
    match v.as_array() {
        Some(items) => Ok(items.to_vec()),
        None => err_at!(BadValue, msg: "{} expects an array operand", opname),
    }
}

fn as_bool(v: &Value) -> Result<bool> {
    match v {
        Value::Bool(b) => Ok(*b),
        _ => err_at!(BadValue, msg: "$exists expects a boolean"),
    }
}

fn as_usize(v: &Value) -> Result<usize> {
    v.as_f64().filter(|n| *n >= 0.0).map(|n| n as usize).ok_or(()).or_else(|_| err_at!(BadValue, msg: "$size expects a non-negative integer"))
}

fn build_regex(pattern: &str, options: &str) -> Result<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    builder.case_insensitive(options.contains('i'));
    builder.multi_line(options.contains('m'));
    builder.dot_matches_new_line(options.contains('s'));
    builder.ignore_whitespace(options.contains('x'));
    err_at!(BadValue, builder.build())
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod parse_test;
