//! Memory layout constants for in-memory tag structures
//!
//! This module centralizes the byte layout of the structures read out of the
//! target process. Build-specific addresses live in [`crate::EngineBuild`].

/// Layout of the header that precedes every loaded tag's data
pub mod tag_header {
    /// Word size (4 bytes / 32-bit integer)
    pub const WORD: u64 = 4;

    /// Checksum, skipped when parsing
    pub const CHECKSUM: u64 = 0;
    pub const TOTAL_SIZE: u64 = WORD;

    // Fixup counts, 16 bits each
    pub const DEPENDENCY_COUNT: u64 = WORD * 2;
    pub const DATA_FIXUP_COUNT: u64 = WORD * 2 + 2;
    pub const RESOURCE_FIXUP_COUNT: u64 = WORD * 3;
    pub const TAG_REFERENCE_FIXUP_COUNT: u64 = WORD * 3 + 2;

    /// Bytes between the counts and the first fixup array
    pub const RESERVED: u64 = 20;

    /// Start of the dependency array; the other fixup arrays follow it
    pub const FIXUP_ARRAYS: u64 = TAG_REFERENCE_FIXUP_COUNT + 2 + RESERVED;

    /// Size of one entry in any of the fixup arrays
    pub const FIXUP_ENTRY: u32 = 4;
}

/// Serialized sizes of the field kinds that have a fixed in-memory footprint
pub mod field_size {
    /// Count (4) + block address (4) + unused (4)
    pub const BLOCK: u32 = 12;

    /// Group tag (4) + unused (8) + tag index (4)
    pub const TAG_REFERENCE: u32 = 16;

    /// Offset of the tag index inside a tag reference
    pub const TAG_REFERENCE_INDEX: usize = 12;

    pub const STRING_ID: u32 = 4;

    /// Size (4) + unused (8) + address (4) + unused (4)
    pub const DATA: u32 = 20;
}

/// Timing constants for polling
pub mod timing {
    /// Interval between target discovery scans while an editor is open (s)
    pub const TARGET_REFRESH_INTERVAL_SECS: u64 = 5;
    /// Shortest interval a watcher will poll at (ms)
    pub const MIN_REFRESH_INTERVAL_MILLIS: u64 = 100;
}
