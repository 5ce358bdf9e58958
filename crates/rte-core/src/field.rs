//! Editor-side field model and field paths
//!
//! The editor presents a tag definition as a tree of fields. Each node only
//! knows its kind and its parent; a [`FieldPath`] such as
//! `Header.Items[3].Name` is derived from the parent chain when an address
//! is needed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{Error, Result};
use crate::layout::FieldType;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum FieldKind {
    Value,
    Block,
    Array,
    Struct,
    StringId,
    TagReference,
    Data,
}

impl FieldKind {
    pub fn of(ty: &FieldType) -> Self {
        match ty {
            FieldType::Value { .. } => Self::Value,
            FieldType::Struct { .. } => Self::Struct,
            FieldType::Block { .. } => Self::Block,
            FieldType::Array { .. } => Self::Array,
            FieldType::StringId => Self::StringId,
            FieldType::TagReference => Self::TagReference,
            FieldType::Data => Self::Data,
        }
    }

    /// Whether a path segment of this kind may carry an index
    pub fn is_indexable(self) -> bool {
        matches!(self, Self::Block | Self::Array)
    }

    /// Whether fields of this kind have named children
    pub fn has_fields(self) -> bool {
        matches!(self, Self::Struct | Self::Block | Self::Array)
    }

    /// Whether the value can be written on its own with a field poke
    pub fn is_pokeable(self) -> bool {
        matches!(self, Self::Value | Self::StringId | Self::TagReference)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNode {
    pub name: String,
    pub kind: FieldKind,
    pub parent: Option<FieldId>,
    /// Set on the element nodes of a block or array
    pub element_index: Option<u32>,
}

/// Arena of editor fields.
#[derive(Debug, Clone, Default)]
pub struct FieldTree {
    nodes: Vec<FieldNode>,
}

impl FieldTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named field. `parent` is `None` for fields of the root struct
    /// and must otherwise be a field with sub-fields.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        kind: FieldKind,
        parent: Option<FieldId>,
    ) -> Result<FieldId> {
        if let Some(parent) = parent.map(|id| self.node(id)) {
            if !parent.kind.has_fields() {
                return Err(Error::NotAStruct(parent.name.clone()));
            }
        }
        Ok(self.push(FieldNode {
            name: name.into(),
            kind,
            parent,
            element_index: None,
        }))
    }

    /// Add element `index` of a block or array field.
    pub fn add_element(&mut self, list: FieldId, index: u32) -> Result<FieldId> {
        let parent = self.node(list);
        if !parent.kind.is_indexable() {
            return Err(Error::NotIndexable(parent.name.clone()));
        }
        let name = parent.name.clone();
        Ok(self.push(FieldNode {
            name,
            kind: FieldKind::Struct,
            parent: Some(list),
            element_index: Some(index),
        }))
    }

    pub fn node(&self, id: FieldId) -> &FieldNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Path from the root struct down to `id`.
    pub fn path(&self, id: FieldId) -> FieldPath {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(id) = current {
            let node = self.node(id);
            chain.push(node);
            current = node.parent;
        }

        let mut path = FieldPath::root();
        for node in chain.into_iter().rev() {
            match node.element_index {
                Some(index) => {
                    if let Some(last) = path.segments.last_mut() {
                        last.index = Some(index);
                    }
                }
                None => path.segments.push(PathSegment::new(&node.name)),
            }
        }
        path
    }

    fn push(&mut self, node: FieldNode) -> FieldId {
        self.nodes.push(node);
        FieldId(self.nodes.len() - 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment {
    pub name: String,
    pub index: Option<u32>,
}

impl PathSegment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }

    pub fn indexed(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            index: Some(index),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}[{}]", self.name, index),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Dotted, optionally indexed path from a root struct to a field.
///
/// The empty path names the root struct itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub fn join(mut self, segment: PathSegment) -> Self {
        self.push(segment);
        self
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let invalid = |reason: &str| Error::InvalidFieldPath {
            path: s.to_string(),
            reason: reason.to_string(),
        };

        let mut path = Self::root();
        for part in s.split('.') {
            let (name, index) = match part.split_once('[') {
                Some((name, rest)) => {
                    let digits = rest
                        .strip_suffix(']')
                        .ok_or_else(|| invalid("unterminated index"))?;
                    let index = digits
                        .parse::<u32>()
                        .map_err(|_| invalid("index is not a non-negative integer"))?;
                    (name, Some(index))
                }
                None => (part, None),
            };

            if name.is_empty() {
                return Err(invalid("empty field name"));
            }
            if name.contains(']') {
                return Err(invalid("unexpected ']'"));
            }

            path.push(PathSegment {
                name: name.to_string(),
                index,
            });
        }
        Ok(path)
    }
}
