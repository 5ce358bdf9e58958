//! Tags, tag tables and the cache abstraction the editor works against.

mod header;
mod manifest;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::EngineBuild;
use crate::error::Result;
use crate::layout::LayoutRegistry;

pub use header::{TagHeader, align16, calculate_header_size};
pub use manifest::ManifestCache;

/// One tag as recorded in a cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTag {
    pub index: u32,
    pub name: String,
    #[serde(default)]
    pub group: String,
    /// Declared size of the tag, header included. Zero for an empty slot.
    #[serde(default)]
    pub total_size: u32,
    #[serde(default)]
    pub dependency_count: u16,
    #[serde(default)]
    pub data_fixup_count: u16,
    #[serde(default)]
    pub resource_fixup_count: u16,
    #[serde(default)]
    pub tag_reference_fixup_count: u16,
}

impl CachedTag {
    pub fn new(index: u32, name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            group: group.into(),
            total_size: 0,
            dependency_count: 0,
            data_fixup_count: 0,
            resource_fixup_count: 0,
            tag_reference_fixup_count: 0,
        }
    }

    pub fn with_size(mut self, total_size: u32) -> Self {
        self.total_size = total_size;
        self
    }

    pub fn with_fixups(
        mut self,
        dependencies: u16,
        data_fixups: u16,
        resource_fixups: u16,
        tag_references: u16,
    ) -> Self {
        self.dependency_count = dependencies;
        self.data_fixup_count = data_fixups;
        self.resource_fixup_count = resource_fixups;
        self.tag_reference_fixup_count = tag_references;
        self
    }

    /// A slot that exists but carries no definition
    pub fn is_empty(&self) -> bool {
        self.total_size == 0
    }

    pub fn header_size(&self, build: &EngineBuild) -> u32 {
        calculate_header_size(
            build.tag_header_base_size,
            self.dependency_count,
            self.data_fixup_count,
            self.resource_fixup_count,
            self.tag_reference_fixup_count,
        )
    }

    /// Declared size of the tag data that follows the header
    pub fn declared_runtime_size(&self, build: &EngineBuild) -> u32 {
        self.total_size.saturating_sub(self.header_size(build))
    }

    /// `name.group`, the way tags are usually written
    pub fn qualified_name(&self) -> String {
        if self.group.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.group)
        }
    }
}

/// Tags of one cache, keyed by index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagTable {
    tags: BTreeMap<u32, CachedTag>,
}

impl TagTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: CachedTag) {
        self.tags.insert(tag.index, tag);
    }

    pub fn get(&self, index: u32) -> Option<&CachedTag> {
        self.tags.get(&index)
    }

    pub fn contains(&self, index: u32) -> bool {
        self.tags.contains_key(&index)
    }

    pub fn is_non_empty(&self, index: u32) -> bool {
        self.get(index).is_some_and(|t| !t.is_empty())
    }

    /// Number of non-empty tags with an index below `index`.
    pub fn count_non_empty_below(&self, index: u32) -> u32 {
        self.tags
            .range(..index)
            .filter(|(_, tag)| !tag.is_empty())
            .count() as u32
    }

    /// Look a tag up by `name` or `name.group`.
    pub fn find(&self, name: &str) -> Option<&CachedTag> {
        self.tags
            .values()
            .find(|t| t.name == name || t.qualified_name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CachedTag> {
        self.tags.values()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl FromIterator<CachedTag> for TagTable {
    fn from_iter<I: IntoIterator<Item = CachedTag>>(iter: I) -> Self {
        let mut table = Self::new();
        for tag in iter {
            table.insert(tag);
        }
        table
    }
}

/// The open cache the editor reads tags from.
///
/// A mod package is a cache layered over a base cache; it reports the base's
/// tags through [`TagCache::base_tags`].
pub trait TagCache {
    /// Deserialized tag definition as edited by the user
    type Definition;

    /// Engine version the cache was built for
    fn version(&self) -> &str;

    fn tags(&self) -> &TagTable;

    fn base_tags(&self) -> Option<&TagTable>;

    fn is_mod_package(&self) -> bool {
        self.base_tags().is_some()
    }

    /// Structure layouts for this cache's version and platform
    fn layout(&self) -> &LayoutRegistry;

    /// Deserialize the definition of `tag` as stored in the cache.
    fn load_definition(&self, tag: &CachedTag) -> Result<Self::Definition>;

    /// Serialize a definition to its runtime byte image.
    fn serialize(&self, definition: &Self::Definition) -> Result<Vec<u8>>;
}
