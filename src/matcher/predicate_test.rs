use super::*;
use crate::bson::{Document, Value};

fn doc_with(pairs: Vec<(&str, Value)>) -> Document {
    let mut doc = Document::new();
    for (k, v) in pairs {
        doc.set(k, v);
    }
    doc
}

#[test]
fn eq_matches_scalar_field() {
    let doc = doc_with(vec![("age", Value::Int32(30))]);
    let expr = Expr::Field { path: "age".into(), op: Op::Eq(Value::Int32(30)) };
    assert!(expr.matches(&doc));
    let expr = Expr::Field { path: "age".into(), op: Op::Eq(Value::Int32(31)) };
    assert!(!expr.matches(&doc));
}

#[test]
fn gt_matches_any_array_element() {
    let doc = doc_with(vec![("tags", Value::Array(vec![Value::Int32(1), Value::Int32(9)]))]);
    let expr = Expr::Field { path: "tags".into(), op: Op::Gt(Value::Int32(5)) };
    assert!(expr.matches(&doc));
}

#[test]
fn ne_fails_only_when_every_element_differs() {
    let doc = doc_with(vec![("tags", Value::Array(vec![Value::Int32(1), Value::Int32(9)]))]);
    let has_nine = Expr::Field { path: "tags".into(), op: Op::Ne(Value::Int32(9)) };
    assert!(!has_nine.matches(&doc));
    let has_ten = Expr::Field { path: "tags".into(), op: Op::Ne(Value::Int32(10)) };
    assert!(has_ten.matches(&doc));
}

#[test]
fn size_does_not_match_element_values() {
    let doc = doc_with(vec![("tags", Value::Array(vec![Value::Int32(1), Value::Int32(2)]))]);
    assert!(Expr::Field { path: "tags".into(), op: Op::Size(2) }.matches(&doc));
    assert!(!Expr::Field { path: "tags".into(), op: Op::Size(3) }.matches(&doc));
}

#[test]
fn exists_distinguishes_missing_from_present() {
    let doc = doc_with(vec![("a", Value::Int32(1))]);
    assert!(Expr::Field { path: "a".into(), op: Op::Exists(true) }.matches(&doc));
    assert!(!Expr::Field { path: "b".into(), op: Op::Exists(true) }.matches(&doc));
    assert!(Expr::Field { path: "b".into(), op: Op::Exists(false) }.matches(&doc));
}

#[test]
fn in_and_nin_are_complementary() {
    let doc = doc_with(vec![("color", Value::from("red"))]);
    let targets = vec![Value::from("red"), Value::from("blue")];
    assert!(Expr::Field { path: "color".into(), op: Op::In(targets.clone()) }.matches(&doc));
    assert!(!Expr::Field { path: "color".into(), op: Op::Nin(targets) }.matches(&doc));
}

#[test]
fn and_or_not_combine() {
    let doc = doc_with(vec![("a", Value::Int32(1)), ("b", Value::Int32(2))]);
    let a1 = Expr::Field { path: "a".into(), op: Op::Eq(Value::Int32(1)) };
    let b2 = Expr::Field { path: "b".into(), op: Op::Eq(Value::Int32(2)) };
    let b9 = Expr::Field { path: "b".into(), op: Op::Eq(Value::Int32(9)) };

    assert!(Expr::And(vec![a1.clone(), b2.clone()]).matches(&doc));
    assert!(!Expr::And(vec![a1.clone(), b9.clone()]).matches(&doc));
    assert!(Expr::Or(vec![a1.clone(), b9.clone()]).matches(&doc));
    assert!(Expr::Not(Box::new(b9)).matches(&doc));
}

#[test]
fn regex_matches_string_field() {
    let doc = doc_with(vec![("name", Value::from("hello world"))]);
    let re = regex::Regex::new("^hello").unwrap();
    assert!(Expr::Field { path: "name".into(), op: Op::Regex(re) }.matches(&doc));
}

#[test]
fn within_circle_and_box_match_point_fields() {
    let doc = doc_with(vec![("loc", Value::Array(vec![Value::Double(1.0), Value::Double(1.0)]))]);
    let circle = Op::WithinCircle { center: (0.0, 0.0), radius: 5.0 };
    assert!(Expr::Field { path: "loc".into(), op: circle }.matches(&doc));

    let outside_box = Op::WithinBox { bl: (10.0, 10.0), tr: (20.0, 20.0) };
    assert!(!Expr::Field { path: "loc".into(), op: outside_box }.matches(&doc));
}
