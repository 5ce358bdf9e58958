//! Per-version structure layouts
//!
//! A [`LayoutRegistry`] describes the serialized shape of every structure a
//! tag definition can contain: its size and the offset and type of each of
//! its fields. The same metadata drives serialization, so offsets computed
//! from it line up with the bytes the target process holds.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{Error, Result};
use crate::memory::layout::field_size;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Platform {
    #[default]
    Pc32,
    Pc64,
    Xbox360,
}

/// Declared type of a structure field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldType {
    /// Plain value of a fixed size
    Value { size: u32 },
    /// Inline nested structure
    Struct { name: String },
    /// Variable-length list stored out of line: count, pointer, unused
    Block { element: String },
    /// Fixed-size inline array
    Array { element: Box<FieldType>, count: u32 },
    StringId,
    TagReference,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLayout {
    pub name: String,
    pub offset: u32,
    #[serde(rename = "type")]
    pub ty: FieldType,
}

impl FieldLayout {
    pub fn new(name: impl Into<String>, offset: u32, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            offset,
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructLayout {
    pub name: String,
    pub size: u32,
    pub fields: Vec<FieldLayout>,
}

impl StructLayout {
    pub fn new(name: impl Into<String>, size: u32) -> Self {
        Self {
            name: name.into(),
            size,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, offset: u32, ty: FieldType) -> Self {
        self.fields.push(FieldLayout::new(name, offset, ty));
        self
    }
}

#[derive(Deserialize)]
struct LayoutFile {
    version: String,
    #[serde(default)]
    platform: Platform,
    structs: Vec<StructLayout>,
}

/// Structure layouts for one engine version and platform.
#[derive(Debug, Clone, Default)]
pub struct LayoutRegistry {
    version: String,
    platform: Platform,
    structs: HashMap<String, StructLayout>,
}

impl LayoutRegistry {
    pub fn new(version: impl Into<String>, platform: Platform) -> Self {
        Self {
            version: version.into(),
            platform,
            structs: HashMap::new(),
        }
    }

    /// Parse a layout document:
    /// `{"version": "...", "platform": "pc32", "structs": [...]}`
    pub fn from_json(json: &str) -> Result<Self> {
        let file: LayoutFile = serde_json::from_str(json)?;
        let mut registry = Self::new(file.version, file.platform);
        for layout in file.structs {
            registry.insert(layout);
        }
        Ok(registry)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn insert(&mut self, layout: StructLayout) {
        self.structs.insert(layout.name.clone(), layout);
    }

    pub fn with(mut self, layout: StructLayout) -> Self {
        self.insert(layout);
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn len(&self) -> usize {
        self.structs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }

    pub fn get(&self, name: &str) -> Result<&StructLayout> {
        self.structs
            .get(name)
            .ok_or_else(|| Error::UnknownStruct(name.to_string()))
    }

    pub fn field(&self, structure: &str, name: &str) -> Result<&FieldLayout> {
        self.get(structure)?
            .fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| Error::UnknownField {
                structure: structure.to_string(),
                field: name.to_string(),
            })
    }

    pub fn struct_size(&self, name: &str) -> Result<u32> {
        Ok(self.get(name)?.size)
    }

    /// Serialized size of one value of `ty`.
    pub fn element_size(&self, ty: &FieldType) -> Result<u32> {
        Ok(match ty {
            FieldType::Value { size } => *size,
            FieldType::Struct { name } => self.struct_size(name)?,
            FieldType::Block { .. } => field_size::BLOCK,
            FieldType::Array { element, count } => {
                let size = self.element_size(element)?;
                size.checked_mul(*count).ok_or_else(|| {
                    Error::InvalidLayout(format!("array of {} x {} bytes overflows", count, size))
                })?
            }
            FieldType::StringId => field_size::STRING_ID,
            FieldType::TagReference => field_size::TAG_REFERENCE,
            FieldType::Data => field_size::DATA,
        })
    }
}
