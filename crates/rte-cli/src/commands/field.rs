use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use owo_colors::OwoColorize;
use rte_core::{
    FieldPath, FieldValue, ManifestCache, SystemProcessOpener, TagCache, TagEditorSession,
};

use super::hex_utils::{format_hex_address, parse_hex_bytes};
use super::{attach, find_tag, open_manifest, report_failure};
use crate::config::CliConfig;

fn open_session(
    config: &CliConfig,
    manifest: &Path,
    tag: &str,
    root: &str,
    pid: Option<u32>,
) -> Result<TagEditorSession<SystemProcessOpener, ManifestCache>> {
    let cache = open_manifest(manifest)?;
    let tag = find_tag(&cache, tag)?;
    let targets = attach(config, cache.version(), pid)?;

    Ok(TagEditorSession::new(
        config.session.clone(),
        config.build.clone(),
        SystemProcessOpener,
        Arc::new(cache),
        tag,
        root,
        targets,
    ))
}

pub fn address(
    config: &CliConfig,
    manifest: &Path,
    tag: &str,
    root: &str,
    path: &str,
    pid: Option<u32>,
) -> Result<()> {
    let path: FieldPath = path.parse()?;
    let session = open_session(config, manifest, tag, root, pid)?;

    match session.field_address(&path) {
        Ok(Some(address)) => println!("{} at {}", path.bold(), format_hex_address(address)),
        Ok(None) => println!("{} is not loaded", session.tag().qualified_name().yellow()),
        Err(e) => {
            report_failure(&e);
            return Err(e.into());
        }
    }
    Ok(())
}

pub fn poke(
    config: &CliConfig,
    manifest: &Path,
    tag: &str,
    root: &str,
    path: &str,
    value: &str,
    pid: Option<u32>,
) -> Result<()> {
    let path: FieldPath = path.parse()?;
    let value = parse_field_value(value)?;
    let session = open_session(config, manifest, tag, root, pid)?;

    match session.poke_field(&path, &value) {
        Ok(address) => {
            println!("Poked {} at {}", path.bold(), format_hex_address(address));
            Ok(())
        }
        Err(e) => {
            report_failure(&e);
            Err(e.into())
        }
    }
}

/// Parse a field value argument: hex bytes, or `ref:<group>:<index>` for a
/// tag reference such as `ref:weap:0x2A`.
pub(crate) fn parse_field_value(value: &str) -> Result<FieldValue> {
    let Some(reference) = value.strip_prefix("ref:") else {
        return Ok(FieldValue::Raw(parse_hex_bytes(value)?));
    };

    let (group, index) = reference
        .split_once(':')
        .context("Tag reference must be ref:<group>:<index>")?;

    let group: [u8; 4] = group
        .as_bytes()
        .try_into()
        .map_err(|_| anyhow::anyhow!("Tag group must be four characters: {}", group))?;

    let index = match index.strip_prefix("0x").or_else(|| index.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => index.parse(),
    }
    .with_context(|| format!("Invalid tag index: {}", index))?;

    if index > 0xFFFF {
        bail!("Tag index out of range: {:#x}", index);
    }

    Ok(FieldValue::TagReference {
        group: u32::from_be_bytes(group),
        index,
    })
}
