use tracing::debug;

use crate::engine::EngineBuild;
use crate::error::Result;
use crate::memory::layout::tag_header;
use crate::memory::{MemoryStream, ReadMemory};

/// Size of an in-memory tag header with the given fixup counts.
///
/// Every fixup entry is one word; the sum is rounded up to 16 bytes.
pub fn calculate_header_size(
    base: u32,
    dependencies: u16,
    data_fixups: u16,
    resource_fixups: u16,
    tag_reference_fixups: u16,
) -> u32 {
    let entries = u32::from(dependencies)
        + u32::from(data_fixups)
        + u32::from(resource_fixups)
        + u32::from(tag_reference_fixups);
    let size = base + entries * tag_header::FIXUP_ENTRY;
    (size + 15) & !15
}

/// Pad `data` with zeroes to a multiple of 16 bytes.
pub fn align16(mut data: Vec<u8>) -> Vec<u8> {
    let padded = data.len().div_ceil(16) * 16;
    data.resize(padded, 0);
    data
}

/// Header of a tag as currently loaded in the target process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagHeader {
    pub total_size: u32,
    pub dependency_count: u16,
    pub data_fixup_count: u16,
    pub resource_fixup_count: u16,
    /// Offsets of tag reference fields relative to the tag address, bias removed
    pub tag_reference_fixups: Vec<u32>,
    pub header_size: u32,
}

impl TagHeader {
    pub fn read<M: ReadMemory + ?Sized>(
        memory: &M,
        address: u32,
        build: &EngineBuild,
    ) -> Result<Self> {
        let base = u64::from(address);
        let total_size = memory.read_u32(base + tag_header::TOTAL_SIZE)?;
        let dependency_count = memory.read_u16(base + tag_header::DEPENDENCY_COUNT)?;
        let data_fixup_count = memory.read_u16(base + tag_header::DATA_FIXUP_COUNT)?;
        let resource_fixup_count = memory.read_u16(base + tag_header::RESOURCE_FIXUP_COUNT)?;
        let tag_reference_count = memory.read_u16(base + tag_header::TAG_REFERENCE_FIXUP_COUNT)?;

        let skipped = u64::from(dependency_count)
            + u64::from(data_fixup_count)
            + u64::from(resource_fixup_count);

        let mut stream = MemoryStream::new(memory);
        stream.seek_to(base + tag_header::FIXUP_ARRAYS);
        stream.skip(skipped * u64::from(tag_header::FIXUP_ENTRY));

        let mut tag_reference_fixups = Vec::with_capacity(usize::from(tag_reference_count));
        for _ in 0..tag_reference_count {
            let stored = stream.read_u32()?;
            tag_reference_fixups.push(stored.wrapping_sub(build.tag_reference_fixup_bias));
        }

        let header_size = calculate_header_size(
            build.tag_header_base_size,
            dependency_count,
            data_fixup_count,
            resource_fixup_count,
            tag_reference_count,
        );

        debug!(
            "Tag header at {:#010x}: total {} bytes, header {} bytes, {} tag references",
            address,
            total_size,
            header_size,
            tag_reference_fixups.len()
        );

        Ok(Self {
            total_size,
            dependency_count,
            data_fixup_count,
            resource_fixup_count,
            tag_reference_fixups,
            header_size,
        })
    }

    /// Number of tag data bytes following the header.
    pub fn runtime_size(&self) -> usize {
        self.total_size.saturating_sub(self.header_size) as usize
    }

    pub fn data_address(&self, address: u32) -> u32 {
        address.wrapping_add(self.header_size)
    }
}
