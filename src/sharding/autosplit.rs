//! Auto-split and auto-migrate heuristics (spec.md §4.7 "Auto-split
//! trigger") and `pickSplitPoint` (spec.md §4.7 "Split" step 1).
//!
//! Grounded on `examples/original_source/s/chunk.cpp`'s
//! `Chunk::splitIfShould` (`_dataWritten` accumulation, the
//! `MaxChunkSize / 5` threshold, the physical-size re-check after picking
//! a point) and `Chunk::pickSplitPoint` (counts-based approximate median,
//! falling back to the first key greater than `min` when the median
//! coincides with `min`).

use crate::{
    bson::Value,
    sharding::chunk::{Chunk, ShardKey},
};

/// Per-chunk write-pressure counter (spec.md §4.7). DESIGN NOTES §9's open
/// question notes the original updates `_dataWritten` without a lock;
/// we keep that: `record_write` takes `&mut Chunk` so callers serialize it
/// themselves (typically under the collection lock a write already holds),
/// but nothing downstream depends on it being exact — "best-effort
/// counter, may under-count under contention; correctness does not depend
/// on it" (DESIGN.md Open Question).
pub fn record_write(chunk: &mut Chunk, bytes_written: u64) {
    chunk.data_written = chunk.data_written.saturating_add(bytes_written);
}

/// Whether `chunk` has accumulated enough write pressure to be considered
/// for a split (spec.md §4.7 "when it exceeds `MaxChunkSize / 5`").
pub fn should_consider_split(chunk: &Chunk, max_chunk_size: u64) -> bool {
    !chunk.jumbo && chunk.data_written >= max_chunk_size / 5
}

/// `pickSplitPoint`: an approximate median of `sample_keys` (a caller-
/// supplied count-based sample of the chunk's current keys, in shard-key
/// order) within `(chunk.min, chunk.max)`. Falls back to the first sample
/// key strictly greater than `chunk.min` when the median coincides with
/// `min` (`chunk.cpp`'s `median == getMin()` branch) — without this, a
/// chunk whose low end is crowded with one repeated value could never
/// make progress splitting away from it.
///
/// Returns `None` when no interior split point exists (every sampled key
/// equals `min` or `max`) — the caller should then mark the chunk
/// `jumbo` (SPEC_FULL.md §B.4) rather than retry every cycle.
pub fn pick_split_point(chunk: &Chunk, sample_keys: &[ShardKey]) -> Option<ShardKey> {
    if sample_keys.is_empty() {
        return None;
    }
    let mut sorted: Vec<&ShardKey> = sample_keys.iter().collect();
    sorted.sort();

    let median = sorted[sorted.len() / 2];
    let candidate = if median == &chunk.min {
        sorted.iter().find(|k| ***k > chunk.min).copied()
    } else {
        Some(median)
    };

    candidate.filter(|k| chunk.is_interior_point(k)).cloned()
}

/// `splitIfShould`: accumulate `bytes_written`, and report whether the
/// chunk has crossed the auto-split threshold and still exceeds
/// `max_chunk_size` after a split point is found — the caller (the engine
/// wiring this module into a live write path) is responsible for actually
/// invoking `ChunkManager::split` with the returned point and for
/// resetting `data_written`, since that requires the config store lock
/// this module has no access to.
pub fn split_if_should(
    chunk: &mut Chunk,
    bytes_written: u64,
    max_chunk_size: u64,
    physical_size: u64,
    sample_keys: &[ShardKey],
) -> Option<ShardKey> {
    record_write(chunk, bytes_written);

    if !should_consider_split(chunk, max_chunk_size) {
        return None;
    }
    chunk.data_written = 0;

    match pick_split_point(chunk, sample_keys) {
        Some(point) if physical_size >= max_chunk_size => Some(point),
        Some(_) => None,
        None => {
            chunk.jumbo = true;
            None
        }
    }
}

/// Whether a chunk produced by a just-completed split is a candidate for
/// auto-migration to a lighter shard (spec.md §4.7 "Newly split chunks at
/// the extremes are candidates for auto-migration"): only chunks touching
/// either global sentinel, since interior chunks are assumed to already
/// be reasonably distributed by prior splits.
pub fn is_migration_candidate(chunk: &Chunk) -> bool {
    matches!(chunk.min.0.first(), Some(Value::MinKey)) || matches!(chunk.max.0.first(), Some(Value::MaxKey))
}

#[cfg(test)]
#[path = "autosplit_test.rs"]
mod autosplit_test;
