//! Sharding core: the chunk routing table and the split/migrate
//! coordinator (spec.md §4.7).
//!
//! - [chunk]: [chunk::Chunk], [chunk::ChunkVersion], [chunk::ShardKey] —
//!   the value types a routing table is built from.
//! - [manager]: [manager::ChunkManager] (the per-collection ordered chunk
//!   list), [manager::ConfigStore] (the in-scope slice of the config
//!   store: `config.chunks`/`config.locks`/`config.changelog`) and
//!   [manager::ShardVersionCache] (the `setShardVersion` handshake).
//! - [migrate]: [migrate::MigrateCoordinator] (the moveChunk two-phase
//!   commit) and [migrate::reconcile] (the background reconciler for a
//!   commit the donor never heard back from).
//! - [autosplit]: the `_dataWritten` heuristic and `pickSplitPoint`.

pub mod autosplit;
pub mod chunk;
pub mod manager;
pub mod migrate;

pub use chunk::{Chunk, ChunkVersion, ShardKey};
pub use manager::{ChunkManager, ConfigStore, ShardVersionCache};
pub use migrate::{reconcile, MigrateCoordinator, MigratePhase, ModsLogEntry};
