//! `docstore-core`: the storage, durability, indexing and sharding core of a
//! schemaless, document-oriented database server.
//!
//! This crate intentionally stops at the boundary of a single storage node's
//! engine: wire-protocol framing, authentication, replication, the
//! aggregation pipeline and a query-plan cache live elsewhere. What lives
//! here:
//!
//! - [bson]: the document value model (a small BSON-like type system) and its
//!   canonical ordering.
//! - [store]: memory-mapped, extent-based record storage, including capped
//!   collections and the deleted-record free lists.
//! - [catalog]: the on-disk namespace catalog (collection and index
//!   metadata).
//! - [btree]: the classical B-tree index core, including multi-key indexing.
//! - [geo]: the 2D geohash index backing `$near` and `$within`.
//! - [matcher]: the query-expression evaluator.
//! - [durability]: per-thread write-intent tracking, the prepared log
//!   buffer, and the [durability::GroupCommitDriver] tick that feeds group
//!   commit.
//! - [journal]: the write-ahead journal writer and crash recovery.
//! - [engine]: the lock hierarchy plus [engine::Collection], the write-path
//!   composition point that keeps a collection's records and its per-index
//!   B-trees in lockstep.
//! - [sharding]: the chunk routing table and the split/migrate coordinator.
//! - [config]: process-wide configuration, threaded explicitly rather than
//!   held in global mutable state.
//! - [error]: the crate's error type and the `err_at!` call-site macro.

#[macro_use]
mod error;

pub mod bson;
pub mod btree;
pub mod catalog;
pub mod config;
pub mod durability;
pub mod engine;
pub mod geo;
pub mod hash;
pub mod journal;
pub mod matcher;
pub mod sharding;
pub mod store;
pub mod util;

pub use crate::config::Config;
pub use crate::error::{retry_on_write_conflict, Error, Result};
