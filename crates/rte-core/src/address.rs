//! Tag address table lookup
//!
//! The engine keeps two tables reachable from fixed addresses: an index
//! table mapping a tag index to a slot, and an address table mapping that
//! slot to the tag's memory. Mod-package tags are exposed at the top of the
//! 16-bit index space, packed downward in creation order.

use tracing::debug;

use crate::engine::EngineBuild;
use crate::error::Result;
use crate::memory::ReadMemory;
use crate::tag::{CachedTag, TagCache, TagTable};

/// Merged-space index of mod-package tag `index`.
pub fn mod_package_index(tags: &TagTable, index: u32, build: &EngineBuild) -> u32 {
    build
        .mod_tag_index_ceiling
        .saturating_sub(tags.count_non_empty_below(index))
}

/// Index of a cache tag as seen by the target process.
///
/// Identity for base caches and for mod-package indices the base already
/// has; anything else is moved into the mod-package range.
pub fn resolve_tag_index<C: TagCache + ?Sized>(
    cache: &C,
    index: u32,
    build: &EngineBuild,
) -> u32 {
    match cache.base_tags() {
        Some(base) if !base.contains(index) => mod_package_index(cache.tags(), index, build),
        _ => index,
    }
}

/// Live address of the tag with merged index `index`, or `None` if the tag
/// is not resident.
pub fn tag_address<M: ReadMemory + ?Sized>(
    memory: &M,
    index: u32,
    build: &EngineBuild,
) -> Result<Option<u32>> {
    if index >= build.max_tag_index {
        return Ok(None);
    }

    let index_table = memory.read_u32(u64::from(build.tag_index_table_pointer))?;
    if index_table == 0 {
        return Ok(None);
    }

    let slot = memory.read_i32(u64::from(index_table) + u64::from(index) * 4)?;
    if slot < 0 {
        return Ok(None);
    }

    let address_table = memory.read_u32(u64::from(build.tag_address_table_pointer))?;
    if address_table == 0 {
        return Ok(None);
    }

    let address = memory.read_u32(u64::from(address_table) + slot as u64 * 4)?;
    debug!("Tag {:#06x} -> slot {} -> {:#010x}", index, slot, address);
    Ok((address != 0).then_some(address))
}

/// Live address of `tag`, translating mod-package indices first.
pub fn tag_memory_address<M, C>(
    memory: &M,
    cache: &C,
    tag: &CachedTag,
    build: &EngineBuild,
) -> Result<Option<u32>>
where
    M: ReadMemory + ?Sized,
    C: TagCache + ?Sized,
{
    let index = resolve_tag_index(cache, tag.index, build);
    tag_address(memory, index, build)
}
