//! The query-expression evaluator: turns a query document into an
//! [Expr] tree and matches it against documents (SPEC_FULL.md's
//! "Matcher" row, grounded on `examples/original_source/db/matcher.h`'s
//! `Matcher`/`ElementMatcher`/`basics` list, shaped as a small enum
//! evaluator the way `src/db/diff.rs`'s `Diff` trait is a small, closed
//! abstraction over document values rather than a visitor hierarchy).
//!
//! `matcher.h`'s `ElementMatcher` carries one `(path, compareOp, operand)`
//! triple per basic clause with an implicit AND across `basics`, plus a
//! special-cased `matchesNe`; [Op]/[Expr] generalize that into an
//! explicit tree so `$and`/`$or`/`$not` nest rather than living only at
//! the top level, while keeping the same per-field operator list
//! (`$eq`/`$ne`/`$gt`/`$gte`/`$lt`/`$lte`/`$in`/`$nin`/`$exists`/`$size`/
//! `$regex`) plus the `$within circle`/`$within box` predicates `db/index_geo2d.cpp`
//! contributes (reusing [crate::geo]'s own distance/box tests rather than
//! duplicating them).

mod parse;
mod predicate;

pub use parse::parse_query;
pub use predicate::{Expr, Op};
