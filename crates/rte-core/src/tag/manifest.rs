//! File-backed tag cache
//!
//! A manifest is a JSON document listing tags and where their serialized
//! definitions live:
//!
//! ```json
//! {
//!   "version": "HaloOnline106708",
//!   "layout": "layout.json",
//!   "base": "../base/manifest.json",
//!   "tags": [
//!     { "index": 5, "name": "objects\\weapon\\rifle", "group": "weap",
//!       "total_size": 320, "tag_reference_fixup_count": 3, "data": "rifle.bin" }
//!   ]
//! }
//! ```
//!
//! Paths are relative to the manifest. A tag without `data` is read from
//! `<index as 4 hex digits>.bin`. Definitions are raw runtime images, so
//! serialization is the identity.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use super::{CachedTag, TagCache, TagTable};
use crate::error::{Error, Result};
use crate::layout::{LayoutRegistry, Platform};

#[derive(Deserialize)]
struct Manifest {
    version: String,
    #[serde(default)]
    layout: Option<PathBuf>,
    #[serde(default)]
    base: Option<PathBuf>,
    tags: Vec<ManifestEntry>,
}

#[derive(Deserialize)]
struct ManifestEntry {
    #[serde(flatten)]
    tag: CachedTag,
    #[serde(default)]
    data: Option<PathBuf>,
}

#[derive(Debug, Clone)]
enum DefinitionSource {
    File(PathBuf),
    Inline(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct ManifestCache {
    version: String,
    tags: TagTable,
    base: Option<TagTable>,
    layout: LayoutRegistry,
    definitions: HashMap<u32, DefinitionSource>,
}

impl ManifestCache {
    /// Empty in-memory cache
    pub fn new(version: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            layout: LayoutRegistry::new(version.clone(), Platform::default()),
            version,
            tags: TagTable::new(),
            base: None,
            definitions: HashMap::new(),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Self::open_chain(path, &mut Vec::new())
    }

    /// `seen` holds the manifests that led here through their `base`.
    fn open_chain(path: &Path, seen: &mut Vec<PathBuf>) -> Result<Self> {
        let canonical = fs::canonicalize(path)?;
        if seen.contains(&canonical) {
            return Err(Error::ManifestCycle(canonical));
        }
        seen.push(canonical);

        let content = fs::read_to_string(path)?;
        let manifest: Manifest = serde_json::from_str(&content)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));

        let mut cache = Self::new(manifest.version);

        if let Some(layout) = manifest.layout {
            cache.layout = LayoutRegistry::load(&dir.join(layout))?;
        }

        if let Some(base) = manifest.base {
            let base_path = dir.join(base);
            debug!("Loading base manifest {}", base_path.display());
            let base = Self::open_chain(&base_path, seen)?;
            cache.base = Some(base.tags);
        }

        for entry in manifest.tags {
            let file = entry
                .data
                .unwrap_or_else(|| PathBuf::from(format!("{:04x}.bin", entry.tag.index)));
            cache
                .definitions
                .insert(entry.tag.index, DefinitionSource::File(dir.join(file)));
            cache.tags.insert(entry.tag);
        }

        info!(
            "Opened {} with {} tags{}",
            path.display(),
            cache.tags.len(),
            if cache.is_mod_package() {
                " (mod package)"
            } else {
                ""
            }
        );
        Ok(cache)
    }

    pub fn with_tag(mut self, tag: CachedTag, definition: Vec<u8>) -> Self {
        self.definitions
            .insert(tag.index, DefinitionSource::Inline(definition));
        self.tags.insert(tag);
        self
    }

    /// Turn this cache into a mod package over `base`.
    pub fn with_base(mut self, base: TagTable) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_layout(mut self, layout: LayoutRegistry) -> Self {
        self.layout = layout;
        self
    }
}

impl TagCache for ManifestCache {
    type Definition = Vec<u8>;

    fn version(&self) -> &str {
        &self.version
    }

    fn tags(&self) -> &TagTable {
        &self.tags
    }

    fn base_tags(&self) -> Option<&TagTable> {
        self.base.as_ref()
    }

    fn layout(&self) -> &LayoutRegistry {
        &self.layout
    }

    fn load_definition(&self, tag: &CachedTag) -> Result<Vec<u8>> {
        match self.definitions.get(&tag.index) {
            Some(DefinitionSource::Inline(data)) => Ok(data.clone()),
            Some(DefinitionSource::File(path)) => Ok(fs::read(path)?),
            None => Err(Error::Serialization(format!(
                "no definition for tag {}",
                tag.qualified_name()
            ))),
        }
    }

    fn serialize(&self, definition: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(definition.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &[u8]) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_open_manifest_with_data_files() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "manifest.json",
            br#"{
                "version": "HaloOnline106708",
                "tags": [
                    {"index": 5, "name": "rifle", "group": "weap", "total_size": 80, "data": "rifle.bin"},
                    {"index": 10, "name": "pistol", "group": "weap", "total_size": 64}
                ]
            }"#,
        );
        write(dir.path(), "rifle.bin", &[1, 2, 3, 4]);
        write(dir.path(), "000a.bin", &[9; 16]);

        let cache = ManifestCache::open(&dir.path().join("manifest.json")).unwrap();
        assert_eq!(cache.version(), "HaloOnline106708");
        assert!(!cache.is_mod_package());
        assert_eq!(cache.tags().len(), 2);

        let rifle = cache.tags().get(5).unwrap().clone();
        assert_eq!(cache.load_definition(&rifle).unwrap(), vec![1, 2, 3, 4]);

        let pistol = cache.tags().find("pistol.weap").unwrap().clone();
        assert_eq!(cache.load_definition(&pistol).unwrap(), vec![9; 16]);
    }

    #[test]
    fn test_open_mod_package_with_base_and_layout() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "base.json",
            br#"{"version": "HaloOnline106708", "tags": [{"index": 0, "name": "globals", "total_size": 64}]}"#,
        );
        write(
            dir.path(),
            "layout.json",
            br#"{"version": "HaloOnline106708", "structs": [{"name": "Globals", "size": 16, "fields": []}]}"#,
        );
        write(
            dir.path(),
            "mod.json",
            br#"{"version": "HaloOnline106708", "base": "base.json", "layout": "layout.json",
                 "tags": [{"index": 0, "name": "custom", "total_size": 64}]}"#,
        );

        let cache = ManifestCache::open(&dir.path().join("mod.json")).unwrap();
        assert!(cache.is_mod_package());
        assert!(cache.base_tags().unwrap().contains(0));
        assert_eq!(cache.layout().struct_size("Globals").unwrap(), 16);
    }

    #[test]
    fn test_base_chain_cycle_rejected() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "self.json",
            br#"{"version": "v", "base": "self.json", "tags": []}"#,
        );
        write(dir.path(), "a.json", br#"{"version": "v", "base": "b.json", "tags": []}"#);
        write(dir.path(), "b.json", br#"{"version": "v", "base": "a.json", "tags": []}"#);

        for name in ["self.json", "a.json"] {
            let err = ManifestCache::open(&dir.path().join(name)).unwrap_err();
            assert!(matches!(err, Error::ManifestCycle(_)), "{}: {:?}", name, err);
        }
    }

    #[test]
    fn test_missing_data_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "manifest.json",
            br#"{"version": "v", "tags": [{"index": 1, "name": "gone", "total_size": 64}]}"#,
        );

        let cache = ManifestCache::open(&dir.path().join("manifest.json")).unwrap();
        let tag = cache.tags().get(1).unwrap().clone();
        assert!(cache.load_definition(&tag).unwrap_err().is_not_found());
    }

    #[test]
    fn test_inline_cache() {
        let tag = CachedTag::new(3, "inline", "bitm").with_size(64);
        let cache = ManifestCache::new("v").with_tag(tag.clone(), vec![5; 8]);

        let definition = cache.load_definition(&tag).unwrap();
        assert_eq!(cache.serialize(&definition).unwrap(), vec![5; 8]);
        assert!(
            cache
                .load_definition(&CachedTag::new(4, "unknown", "bitm"))
                .is_err()
        );
    }
}
