//! Subcommand implementations.

pub mod field;
pub mod hex_utils;
pub mod hexdump;
pub mod poke;
pub mod tag;
pub mod targets;
pub mod watch;

use std::path::Path;

use anyhow::{Context, Result, bail};
use owo_colors::OwoColorize;
use rte_core::{
    CachedTag, ManifestCache, ProcessTargetSource, RteService, SystemProcessProvider, Target,
    TagCache, TargetList,
};
use tracing::debug;

use crate::config::CliConfig;
use hex_utils::parse_hex_address;

/// Service with one provider for the configured build.
pub(crate) fn service(config: &CliConfig) -> RteService {
    let mut service = RteService::new();
    service.register(ProcessTargetSource::new(
        SystemProcessProvider,
        config.build.clone(),
    ));
    service
}

/// Scan once for targets able to host `cache_version` and select `pid`, or
/// the first target found.
pub(crate) fn attach(
    config: &CliConfig,
    cache_version: &str,
    pid: Option<u32>,
) -> Result<TargetList> {
    let service = service(config);
    if !service.providers().any(|p| p.supports(cache_version)) {
        bail!(
            "Cache version {} does not match the configured build {}",
            cache_version,
            config.build.name
        );
    }

    let mut targets = TargetList::new(service.target_registry(cache_version));
    targets.refresh();

    if let Some(pid) = pid {
        if !targets.select(pid) {
            bail!("Process {} is not a running {}", pid, config.build.executable);
        }
    }

    let target = targets
        .selected()
        .with_context(|| format!("No running {} found", config.build.executable))?;
    debug!("Attached to {}", target.display_name());
    Ok(targets)
}

pub(crate) fn selected(targets: &TargetList) -> Result<&Target> {
    targets.selected().context("No target selected")
}

pub(crate) fn open_manifest(path: &Path) -> Result<ManifestCache> {
    ManifestCache::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

/// Find a tag by index (decimal or `0x` hex), `name` or `name.group`.
pub(crate) fn find_tag(cache: &ManifestCache, tag: &str) -> Result<CachedTag> {
    let by_index = if tag.starts_with("0x") || tag.starts_with("0X") {
        parse_hex_address(tag).ok().and_then(|i| u32::try_from(i).ok())
    } else {
        tag.parse::<u32>().ok()
    };

    by_index
        .and_then(|index| cache.tags().get(index))
        .or_else(|| cache.tags().find(tag))
        .cloned()
        .with_context(|| format!("Tag {} not found in cache", tag))
}

/// Print a failed core operation the way the editor shows its alert.
pub(crate) fn report_failure(err: &rte_core::Error) {
    let alert = err.alert();
    eprintln!("{}", alert.title.red().bold());
    eprintln!("{}", alert.message);
    if let Some(remedy) = alert.remedy {
        eprintln!("{}", remedy.yellow());
    }
}
