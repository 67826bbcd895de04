//! The document value model: [Value], the tagged union every field and
//! array element is made of; [Document], the ordered `(name, value)`
//! sequence a record holds; and [ObjectId], the default `_id` type.
//!
//! Grounded on the `Cborize`-derived `Value<V>` enum shape used throughout
//! `prataprc-rdms` (`src/dbs/value.rs`, `src/db/value.rs`), generalized from
//! a generic payload type to the closed BSON-like type union a document
//! store's wire format actually needs.

pub mod document;
pub mod object_id;
pub mod value;

pub use document::Document;
pub use object_id::ObjectId;
pub use value::Value;
