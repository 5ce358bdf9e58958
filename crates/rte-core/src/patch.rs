//! Tag memory patching ("poke")
//!
//! A poke writes the editor's version of a tag over the copy loaded in the
//! target process. Only bytes that still hold their cache value when the tag
//! is first poked are ever overwritten; everything the engine changed at
//! runtime (pointers, counters) is left alone.

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::address::{mod_package_index, resolve_tag_index, tag_address};
use crate::engine::EngineBuild;
use crate::error::{Error, Result};
use crate::memory::layout::field_size;
use crate::memory::{ProcessMemory, ProcessOpener, SuspendGuard, WriteMemory};
use crate::tag::{CachedTag, TagCache, TagHeader, TagTable, align16};
use crate::target::Target;

/// Per-byte patch flags for one open tag.
///
/// Empty until the first poke. A flag of 1 marks a byte that may be
/// overwritten with the editor's value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeDataMap {
    flags: Vec<u8>,
}

impl RuntimeDataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag every byte where `live` still equals `baseline`.
    pub fn compute(live: &[u8], baseline: &[u8]) -> Self {
        let flags = live
            .iter()
            .zip(baseline)
            .map(|(l, b)| u8::from(l == b))
            .collect();
        Self { flags }
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.flags
    }

    pub fn patchable(&self) -> usize {
        self.flags.iter().filter(|&&f| f == 1).count()
    }

    pub fn reset(&mut self) {
        self.flags.clear();
    }

    /// Copy `editor` into `live` at every flagged position. Returns the
    /// number of flagged positions.
    pub fn apply(&self, live: &mut [u8], editor: &[u8]) -> usize {
        let mut patched = 0;
        for ((flag, live), editor) in self.flags.iter().zip(live.iter_mut()).zip(editor) {
            if *flag == 1 {
                *live = *editor;
                patched += 1;
            }
        }
        patched
    }
}

/// Point the live copy's tag references at merged-space indices.
///
/// `fixups` are offsets from the tag address, so `header_size` is taken off
/// to index the runtime buffers. The referenced index is read from the
/// editor image; references the base cache already has are left alone, as
/// are null references. Returns the number of references rewritten.
pub fn apply_reference_fixups(
    live: &mut [u8],
    editor: &[u8],
    fixups: &[u32],
    header_size: u32,
    mod_tags: &TagTable,
    base_tags: &TagTable,
    build: &EngineBuild,
) -> Result<usize> {
    let mut rewritten = 0;
    for &fixup in fixups {
        let len = live.len().min(editor.len());
        let invalid = || Error::InvalidFixup { offset: fixup, len };

        let offset = fixup.checked_sub(header_size).ok_or_else(invalid)? as usize;
        let end = offset.checked_add(4).filter(|&end| end <= len).ok_or_else(invalid)?;

        let mut raw = [0u8; 4];
        raw.copy_from_slice(&editor[offset..end]);
        let index = u32::from_le_bytes(raw);

        if index == u32::MAX || base_tags.contains(index) {
            continue;
        }

        let translated = mod_package_index(mod_tags, index, build);
        debug!("Tag reference at {:#x}: {:#06x} -> {:#06x}", fixup, index, translated);
        live[offset..end].copy_from_slice(&translated.to_le_bytes());
        rewritten += 1;
    }
    Ok(rewritten)
}

/// Reject tags whose serialized size differs from what the header declares.
pub fn check_tag_shape(serialized: usize, total_size: u32, header_size: u32) -> Result<()> {
    let declared = total_size.saturating_sub(header_size);
    if serialized != declared as usize {
        return Err(Error::UnsupportedTagShape {
            serialized,
            declared,
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PokeReport {
    /// Live address of the tag
    pub address: u32,
    pub patched_bytes: usize,
    pub elapsed: Duration,
    pub finished_at: DateTime<Local>,
}

pub struct TagPatcher<'a> {
    build: &'a EngineBuild,
}

impl<'a> TagPatcher<'a> {
    pub fn new(build: &'a EngineBuild) -> Self {
        Self { build }
    }

    /// Poke `definition` into the copy of `tag` loaded by `target`.
    ///
    /// Every precondition is checked before the target is suspended. Once
    /// suspended, the target is resumed exactly once whatever happens.
    pub fn poke<O, C>(
        &self,
        opener: &O,
        target: &Target,
        cache: &C,
        tag: &CachedTag,
        definition: &C::Definition,
        map: &mut RuntimeDataMap,
    ) -> Result<PokeReport>
    where
        O: ProcessOpener,
        C: TagCache + ?Sized,
    {
        let started = Instant::now();
        let process = opener.open(target.id())?;

        let index = resolve_tag_index(cache, tag.index, self.build);
        let address = tag_address(&process, index, self.build)?
            .ok_or_else(|| Error::TagNotLoaded(tag.qualified_name()))?;
        debug!(
            "Poking {} (index {:#06x}) at {:#010x} in {}",
            tag.qualified_name(),
            index,
            address,
            target.display_name()
        );

        let cache_data = align16(cache.serialize(&cache.load_definition(tag)?)?);
        let editor_data = align16(cache.serialize(definition)?);
        if cache_data.len() != editor_data.len() {
            return Err(Error::SerializerMismatch {
                cache_len: cache_data.len(),
                editor_len: editor_data.len(),
            });
        }

        if !cache.is_mod_package() {
            check_tag_shape(cache_data.len(), tag.total_size, tag.header_size(self.build))?;
        }

        let guard = SuspendGuard::new(&process)?;
        let outcome =
            self.patch_suspended(&process, cache, address, &cache_data, &editor_data, map);
        let resumed = guard.resume();
        let patched_bytes = outcome?;
        resumed?;

        let report = PokeReport {
            address,
            patched_bytes,
            elapsed: started.elapsed(),
            finished_at: Local::now(),
        };
        info!(
            "Patched {} bytes of {} in {:.3} seconds",
            report.patched_bytes,
            tag.qualified_name(),
            report.elapsed.as_secs_f32()
        );
        Ok(report)
    }

    fn patch_suspended<P, C>(
        &self,
        process: &P,
        cache: &C,
        address: u32,
        cache_data: &[u8],
        editor_data: &[u8],
        map: &mut RuntimeDataMap,
    ) -> Result<usize>
    where
        P: ProcessMemory + ?Sized,
        C: TagCache + ?Sized,
    {
        let header = TagHeader::read(process, address, self.build)?;
        if header.runtime_size() != cache_data.len() {
            return Err(Error::LoadedSizeMismatch {
                loaded: header.runtime_size(),
                cached: cache_data.len(),
            });
        }

        let data_address = u64::from(header.data_address(address));
        let mut live = process.read_bytes(data_address, header.runtime_size())?;

        if map.is_empty() {
            *map = RuntimeDataMap::compute(&live, cache_data);
            debug!("Runtime data map: {} of {} bytes patchable", map.patchable(), map.len());
        }
        if map.len() != cache_data.len() {
            return Err(Error::SizeChangedSinceInitialPoke {
                map_len: map.len(),
                tag_len: cache_data.len(),
            });
        }

        if let Some(base) = cache.base_tags() {
            apply_reference_fixups(
                &mut live,
                editor_data,
                &header.tag_reference_fixups,
                header.header_size,
                cache.tags(),
                base,
                self.build,
            )?;
        }

        let patched = map.apply(&mut live, editor_data);
        process.write_bytes(data_address, &live)?;
        Ok(patched)
    }
}

/// A single field value to write in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Already serialized bytes
    Raw(Vec<u8>),
    TagReference { group: u32, index: u32 },
}

impl FieldValue {
    fn encode<C: TagCache + ?Sized>(&self, cache: &C, build: &EngineBuild) -> Vec<u8> {
        match self {
            FieldValue::Raw(bytes) => bytes.clone(),
            FieldValue::TagReference { group, index } => {
                let mut index = *index;
                if cache.is_mod_package() && cache.tags().is_non_empty(index) {
                    index = mod_package_index(cache.tags(), index, build);
                }
                let mut bytes = vec![0u8; field_size::TAG_REFERENCE as usize];
                bytes[..4].copy_from_slice(&group.to_le_bytes());
                bytes[field_size::TAG_REFERENCE_INDEX..].copy_from_slice(&index.to_le_bytes());
                bytes
            }
        }
    }
}

/// Write one field value at an already resolved address. Returns the number
/// of bytes written.
pub fn poke_field<M, C>(
    memory: &M,
    cache: &C,
    address: u32,
    value: &FieldValue,
    build: &EngineBuild,
) -> Result<usize>
where
    M: WriteMemory + ?Sized,
    C: TagCache + ?Sized,
{
    let bytes = value.encode(cache, build);
    memory.write_bytes(u64::from(address), &bytes)?;
    debug!("Wrote {} bytes at {:#010x}", bytes.len(), address);
    Ok(bytes.len())
}
