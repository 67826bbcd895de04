//! [Op]: one field-level comparison, and [Expr]: the tree `$and`/`$or`/
//! `$not` combine them into (spec.md's Matcher row; §4.4 for the
//! `$within` variants).

use regex::Regex;

use crate::{
    bson::{Document, Value},
    geo::{within_box, within_circle, GeoEntry, GeoHashConfig},
};

/// One field-level operator, equivalent to one `matcher.h` `ElementMatcher`
/// triple (`path` lives on the enclosing [Expr::Field], not here).
#[derive(Clone, Debug)]
pub enum Op {
    Eq(Value),
    /// `$ne`: true iff no candidate value equals the operand — `matcher.h`
    /// special-cases this (`matchesNe`) rather than folding it into a
    /// generic "not equal" per-element test, since for an array field
    /// `$ne` must fail only when *every* element differs.
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
    /// `$size`: matches only the array value itself, never an element
    /// inside it — no implicit per-element expansion.
    Size(usize),
    Regex(Regex),
    WithinCircle { center: (f64, f64), radius: f64 },
    WithinBox { bl: (f64, f64), tr: (f64, f64) },
}

/// The expression tree a query document parses into (spec.md's Matcher
/// row: "equality, comparison, $in, $size, regex, geometric predicates").
#[derive(Clone, Debug)]
pub enum Expr {
    Field { path: String, op: Op },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// Evaluate this tree against `doc`.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Expr::Field { path, op } => op.matches(&doc.get_path(path)),
            Expr::And(clauses) => clauses.iter().all(|c| c.matches(doc)),
            Expr::Or(clauses) => clauses.iter().any(|c| c.matches(doc)),
            Expr::Not(inner) => !inner.matches(doc),
        }
    }
}

impl Op {
    /// `candidates` is whatever `Document::get_path` resolved for this
    /// operator's field — zero matches for a missing path, more than one
    /// only when the path crossed an array ([crate::bson::document]'s
    /// fan-out rule).
    fn matches(&self, candidates: &[&Value]) -> bool {
        match self {
            Op::Exists(want) => candidates.is_empty() != *want,
            Op::Size(n) => candidates.iter().any(|v| matches!(v, Value::Array(items) if items.len() == *n)),
            _ => {
                let expanded = expand(candidates);
                match self {
                    Op::Eq(target) => expanded.iter().any(|v| *v == target),
                    Op::Ne(target) => !expanded.iter().any(|v| *v == target),
                    Op::Gt(target) => expanded.iter().any(|v| *v > target),
                    Op::Gte(target) => expanded.iter().any(|v| *v >= target),
                    Op::Lt(target) => expanded.iter().any(|v| *v < target),
                    Op::Lte(target) => expanded.iter().any(|v| *v <= target),
                    Op::In(targets) => expanded.iter().any(|v| targets.iter().any(|t| *v == t)),
                    Op::Nin(targets) => !expanded.iter().any(|v| targets.iter().any(|t| *v == t)),
                    Op::Regex(re) => expanded.iter().any(|v| matches!(v.as_str(), Some(s) if re.is_match(s))),
                    Op::WithinCircle { center, radius } => expanded.iter().any(|v| {
                        as_point(*v).map_or(false, |pt| point_within_circle(pt, *center, *radius))
                    }),
                    Op::WithinBox { bl, tr } => {
                        expanded.iter().any(|v| as_point(*v).map_or(false, |pt| point_within_box(pt, *bl, *tr)))
                    }
                    Op::Exists(_) | Op::Size(_) => unreachable!("handled above"),
                }
            }
        }
    }
}

/// Implicit array traversal: every top-level match, plus each element of
/// any match that is itself an array — the behavior `Document::get_path`
/// leaves to its callers when a terminal path component names an array
/// field directly (it returns the whole array rather than fanning out,
/// since fan-out is only needed when there's a further path segment to
/// resolve against each element).
fn expand<'a>(candidates: &[&'a Value]) -> Vec<&'a Value> {
    let mut out = Vec::with_capacity(candidates.len());
    for v in candidates {
        out.push(*v);
        if let Value::Array(items) = v {
            out.extend(items.iter());
        }
    }
    out
}

fn as_point(v: &Value) -> Option<(f64, f64)> {
    match v.as_array()? {
        [x, y] => Some((x.as_f64()?, y.as_f64()?)),
        _ => None,
    }
}

/// `$within` tests a raw `[x, y]` pair against the shape with no B-tree
/// involved, so the [GeoEntry] wrapper only needs a placeholder hash.
fn as_entry(pt: (f64, f64)) -> GeoEntry<()> {
    GeoEntry { hash: crate::geo::GeoHash::from_raw(0, 0), x: pt.0, y: pt.1, item: () }
}

fn point_within_circle(pt: (f64, f64), center: (f64, f64), radius: f64) -> bool {
    let config = GeoHashConfig::new(-1e18, 1e18, GeoHashConfig::DEFAULT_BITS);
    !within_circle(&[as_entry(pt)], &config, center, radius).is_empty()
}

fn point_within_box(pt: (f64, f64), bl: (f64, f64), tr: (f64, f64)) -> bool {
    !within_box(&[as_entry(pt)], bl, tr).is_empty()
}

#[cfg(test)]
#[path = "predicate_test.rs"]
mod predicate_test;
