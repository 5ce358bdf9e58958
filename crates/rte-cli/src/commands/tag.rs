use std::path::Path;

use anyhow::Result;
use owo_colors::OwoColorize;
use rte_core::{
    ProcessOpener, ReadMemory, SystemProcessOpener, TagCache, TagHeader, resolve_tag_index,
    tag_address,
};

use super::hex_utils::format_hex_address;
use super::hexdump::format_rows;
use super::{attach, find_tag, open_manifest, selected};
use crate::config::CliConfig;

pub fn address(config: &CliConfig, manifest: &Path, tag: &str, pid: Option<u32>) -> Result<()> {
    let cache = open_manifest(manifest)?;
    let tag = find_tag(&cache, tag)?;
    let targets = attach(config, cache.version(), pid)?;
    let target = selected(&targets)?;

    let process = SystemProcessOpener.open(target.id())?;
    let runtime_index = resolve_tag_index(&cache, tag.index, &config.build);

    print!("{} [0x{:04X}]", tag.qualified_name().bold(), tag.index);
    if runtime_index != tag.index {
        print!(" as 0x{:04X}", runtime_index);
    }

    match tag_address(&process, runtime_index, &config.build)? {
        Some(address) => println!(" at {}", format_hex_address(address).green()),
        None => println!(" {}", "not loaded".yellow()),
    }
    Ok(())
}

/// Print the live header of a tag next to what the cache declares.
pub fn header(
    config: &CliConfig,
    manifest: &Path,
    tag: &str,
    raw: bool,
    pid: Option<u32>,
) -> Result<()> {
    let cache = open_manifest(manifest)?;
    let tag = find_tag(&cache, tag)?;
    let targets = attach(config, cache.version(), pid)?;
    let target = selected(&targets)?;

    let process = SystemProcessOpener.open(target.id())?;
    let runtime_index = resolve_tag_index(&cache, tag.index, &config.build);
    let Some(address) = tag_address(&process, runtime_index, &config.build)? else {
        println!("{} is not loaded in {}", tag.qualified_name(), target.display_name());
        return Ok(());
    };

    let header = TagHeader::read(&process, address, &config.build)?;
    println!("{} at {}", tag.qualified_name().bold(), format_hex_address(address));
    println!(
        "  total size:      {:#x} (cache {:#x})",
        header.total_size, tag.total_size
    );
    println!(
        "  header size:     {:#x} (cache {:#x})",
        header.header_size,
        tag.header_size(&config.build)
    );
    println!("  dependencies:    {}", header.dependency_count);
    println!("  data fixups:     {}", header.data_fixup_count);
    println!("  resource fixups: {}", header.resource_fixup_count);
    println!("  tag references:  {}", header.tag_reference_fixups.len());
    for fixup in &header.tag_reference_fixups {
        println!("    +{:#06x}", fixup);
    }
    if header.total_size != tag.total_size {
        println!("{}", "Loaded size differs from the cache".yellow());
    }

    if raw {
        let bytes = process.read_bytes(u64::from(address), header.header_size as usize)?;
        println!();
        for row in format_rows(address, &bytes) {
            println!("{}", row);
        }
    }
    Ok(())
}
