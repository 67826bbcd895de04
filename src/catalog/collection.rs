//! [CollectionHeader]: the catalog's per-collection value (spec.md
//! "Collection"), [IndexDescriptor] and [CollectionFlags].
//!
//! Grounded on `examples/original_source/db/namespace.h`'s
//! `NamespaceDetails` (extent list heads, record/data counters, padding
//! factor, `$extra` overflow-index pointer, `systemFlags`/`userFlags`
//! split, `_multiKeyIndexBits`) and `db/index.h`'s `IndexDetails`
//! (key-pattern, unique, sparse, background) — both named in SPEC_FULL.md
//! §B as supplemented features.

use cbordata::Cborize;

use crate::{catalog::N_BUCKETS, store::RecordLocation};

pub const INDEX_DESCRIPTOR_VER: u32 = 0x0001_0001;
pub const COLLECTION_FLAGS_VER: u32 = 0x0001_0001;
pub const COLLECTION_HEADER_VER: u32 = 0x0001_0001;

/// One index's key-pattern and options, kept separate from the B-tree
/// implementation itself (spec.md §4.3; supplemented per SPEC_FULL.md §B.3
/// with `sparse`).
#[derive(Clone, Debug, Cborize)]
pub struct IndexDescriptor {
    pub name: String,
    /// Ordered `(field-path, direction)` pairs; `direction` is `1` or `-1`.
    pub key_pattern: Vec<(String, i32)>,
    pub unique: bool,
    /// A sparse index skips documents missing the indexed field entirely,
    /// rather than indexing them under an explicit null key.
    pub sparse: bool,
    pub background: bool,
    /// Whether this index is the 2D geo index described in spec.md §4.4.
    pub geo: bool,
    /// Geohash precision in bits, meaningful only when `geo` is set
    /// (spec.md §4.4 default 26).
    pub geo_bits: u8,
}

impl IndexDescriptor {
    pub const ID: u32 = INDEX_DESCRIPTOR_VER;

    pub fn new(name: impl Into<String>, key_pattern: Vec<(String, i32)>) -> IndexDescriptor {
        IndexDescriptor {
            name: name.into(),
            key_pattern,
            unique: false,
            sparse: false,
            background: false,
            geo: false,
            geo_bits: 26,
        }
    }

    pub fn set_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn set_sparse(mut self, sparse: bool) -> Self {
        self.sparse = sparse;
        self
    }

    pub fn set_geo(mut self, geo_bits: u8) -> Self {
        self.geo = true;
        self.geo_bits = geo_bits;
        self
    }
}

/// Collection-level flags (spec.md §3 "Collection"), supplemented per
/// SPEC_FULL.md §B.1/§B.5 with `auto_index_id`, `use_power_of_two_sizes`
/// and a concrete `u64` multi-key bitfield.
#[derive(Clone, Debug, Cborize)]
pub struct CollectionFlags {
    pub capped: bool,
    pub capped_no_delete: bool,
    pub has_id_index: bool,
    pub auto_index_id: bool,
    pub background_index_in_progress: bool,
    /// The `usePowerOf2Sizes`-equivalent toggle named in SPEC_FULL.md §B.1:
    /// when set, slot sizing quantizes to a bucket ceiling instead of the
    /// float padding-factor scheme. Recorded but not yet wired into
    /// `store::Store::insert`'s sizing decision (Open Question, see
    /// `DESIGN.md`).
    pub use_power_of_two_sizes: bool,
    /// One bit per index slot (≤ 64 indexes): set iff some document has
    /// produced ≥2 keys for that index (spec.md §3 invariants).
    pub multi_key_bits: u64,
}

impl CollectionFlags {
    pub const ID: u32 = COLLECTION_FLAGS_VER;

    pub fn new() -> CollectionFlags {
        CollectionFlags {
            capped: false,
            capped_no_delete: false,
            has_id_index: true,
            auto_index_id: true,
            background_index_in_progress: false,
            use_power_of_two_sizes: false,
            multi_key_bits: 0,
        }
    }

    pub fn is_multi_key(&self, index_slot: usize) -> bool {
        index_slot < 64 && (self.multi_key_bits & (1 << index_slot)) != 0
    }

    pub fn set_multi_key(&mut self, index_slot: usize) {
        if index_slot < 64 {
            self.multi_key_bits |= 1 << index_slot;
        }
    }
}

impl Default for CollectionFlags {
    fn default() -> Self {
        CollectionFlags::new()
    }
}

/// The catalog's per-`db.collection` value (spec.md §3 "Collection").
#[derive(Clone, Debug, Cborize)]
pub struct CollectionHeader {
    pub name: String,
    pub first_extent: RecordLocation,
    pub last_extent: RecordLocation,
    /// Current ring write-cursor extent for capped collections.
    pub cap_extent: RecordLocation,
    /// Invalid (`NULL`) until the capped ring has wrapped once; then the
    /// oldest surviving extent (spec.md §3 invariants).
    pub cap_first_new_record: RecordLocation,
    pub record_count: u64,
    pub data_size: u64,
    pub padding_factor: f64,
    pub max_record_size: u64,
    /// Byte-size cap for a capped collection (spec.md §4.1).
    pub capped_max_size: u64,
    /// Document-count cap for a capped collection, `0` meaning
    /// "unbounded by count" (SPEC_FULL.md §B.1 `maxDocsInCapped`).
    pub capped_max_docs: u64,
    /// Inline slots 0..10, overflow slots 10.. — modeled uniformly (see
    /// module doc); capped at [crate::catalog::MAX_INDEXES].
    pub indexes: Vec<IndexDescriptor>,
    pub flags: CollectionFlags,
    /// Head of each free-list bucket (spec.md §4.1).
    pub free_list: [RecordLocation; N_BUCKETS],
}

impl CollectionHeader {
    pub const ID: u32 = COLLECTION_HEADER_VER;

    pub fn new(name: impl Into<String>) -> CollectionHeader {
        CollectionHeader {
            name: name.into(),
            first_extent: RecordLocation::NULL,
            last_extent: RecordLocation::NULL,
            cap_extent: RecordLocation::NULL,
            cap_first_new_record: RecordLocation::NULL,
            record_count: 0,
            data_size: 0,
            padding_factor: 1.0,
            max_record_size: 16 * 1024 * 1024,
            capped_max_size: u64::MAX,
            capped_max_docs: 0,
            indexes: vec![],
            flags: CollectionFlags::new(),
            free_list: [RecordLocation::NULL; N_BUCKETS],
        }
    }

    pub fn find_index(&self, name: &str) -> Option<(usize, &IndexDescriptor)> {
        self.indexes.iter().enumerate().find(|(_, ix)| ix.name == name)
    }
}
