use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use rte_core::{RuntimeDataMap, SystemProcessOpener, TagCache, TagPatcher};
use tracing::info;

use super::hex_utils::format_hex_address;
use super::{attach, find_tag, open_manifest, report_failure, selected};
use crate::config::CliConfig;

/// Poke `image`, or the definition stored in the cache when none is given.
pub fn run(
    config: &CliConfig,
    manifest: &Path,
    tag: &str,
    image: Option<&Path>,
    pid: Option<u32>,
) -> Result<()> {
    let cache = open_manifest(manifest)?;
    let tag = find_tag(&cache, tag)?;

    let definition = match image {
        Some(path) => {
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?
        }
        None => cache.load_definition(&tag)?,
    };

    let targets = attach(config, cache.version(), pid)?;
    let target = selected(&targets)?;
    info!("Poking {} into {}", tag.qualified_name(), target.display_name());

    let mut map = RuntimeDataMap::new();
    let result = TagPatcher::new(&config.build).poke(
        &SystemProcessOpener,
        target,
        &cache,
        &tag,
        &definition,
        &mut map,
    );

    match result {
        Ok(report) => {
            println!(
                "{} {} bytes of {} at {} ({:.3}s, {})",
                "Patched".green().bold(),
                report.patched_bytes,
                tag.qualified_name(),
                format_hex_address(report.address),
                report.elapsed.as_secs_f64(),
                report.finished_at.format("%H:%M:%S")
            );
            Ok(())
        }
        Err(e) => {
            report_failure(&e);
            Err(e.into())
        }
    }
}
