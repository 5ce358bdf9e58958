//! Field address resolution
//!
//! Walks a [`FieldPath`] through the structure layouts of the open cache,
//! reading block headers out of the target process where a list has to be
//! followed, and returns the absolute address of the field.

use tracing::debug;

use crate::address::tag_memory_address;
use crate::engine::EngineBuild;
use crate::error::{Error, Result};
use crate::field::FieldPath;
use crate::layout::{FieldType, LayoutRegistry};
use crate::memory::{ProcessOpener, ReadMemory};
use crate::tag::{CachedTag, TagCache};
use crate::target::Target;

/// Where the walk currently is
enum Position<'a> {
    /// Inside a structure whose fields can be named
    Struct(&'a str),
    /// At a leaf field; nothing below it can be named
    Leaf(&'a str),
}

pub struct FieldAddressResolver<'a> {
    build: &'a EngineBuild,
}

impl<'a> FieldAddressResolver<'a> {
    pub fn new(build: &'a EngineBuild) -> Self {
        Self { build }
    }

    /// Absolute address of `path` inside `tag`, whose definition has root
    /// structure `root`.
    ///
    /// The tag address is looked up again on every call since the target
    /// may have reloaded the tag. Returns `None` when the tag is not loaded.
    pub fn resolve<M, C>(
        &self,
        memory: &M,
        cache: &C,
        root: &str,
        tag: &CachedTag,
        path: &FieldPath,
    ) -> Result<Option<u32>>
    where
        M: ReadMemory + ?Sized,
        C: TagCache + ?Sized,
    {
        let Some(tag_address) = tag_memory_address(memory, cache, tag, self.build)? else {
            debug!("Tag {} is not loaded", tag.qualified_name());
            return Ok(None);
        };

        let offset_address = tag_address.wrapping_add(self.build.main_struct_offset_position);
        let main_struct_offset = memory.read_u32(u64::from(offset_address))?;
        let root_address = tag_address.wrapping_add(main_struct_offset);

        let address = walk(memory, cache.layout(), root_address, root, path)?;
        debug!("{} of {} at {:#010x}", path, tag.qualified_name(), address);
        Ok(Some(address))
    }

    /// Open `target` and resolve `path` in it.
    pub fn resolve_target<O, C>(
        &self,
        opener: &O,
        target: &Target,
        cache: &C,
        root: &str,
        tag: &CachedTag,
        path: &FieldPath,
    ) -> Result<Option<u32>>
    where
        O: ProcessOpener,
        C: TagCache + ?Sized,
    {
        let process = opener.open(target.id())?;
        self.resolve(&process, cache, root, tag, path)
    }
}

/// Walk `path` from a structure of type `root` at `address`.
pub fn walk<M: ReadMemory + ?Sized>(
    memory: &M,
    layout: &LayoutRegistry,
    address: u32,
    root: &str,
    path: &FieldPath,
) -> Result<u32> {
    let mut address = address;
    let mut position = Position::Struct(root);

    for segment in path.segments() {
        let structure = match position {
            Position::Struct(name) => name,
            Position::Leaf(name) => return Err(Error::NotAStruct(name.to_string())),
        };

        let field = layout.field(structure, &segment.name)?;
        let field_address = address.wrapping_add(field.offset);

        match (segment.index, &field.ty) {
            (Some(index), FieldType::Block { element }) => {
                let count = memory.read_u32(u64::from(field_address))?;
                if index >= count {
                    return Err(Error::IndexOutOfRange {
                        field: segment.name.clone(),
                        index,
                        count,
                    });
                }
                let block_address = memory.read_u32(u64::from(field_address) + 4)?;
                let element_size = layout.struct_size(element)?;
                address = block_address.wrapping_add(index.wrapping_mul(element_size));
                position = Position::Struct(element);
            }
            (Some(index), FieldType::Array { element, count }) => {
                if index >= *count {
                    return Err(Error::IndexOutOfRange {
                        field: segment.name.clone(),
                        index,
                        count: *count,
                    });
                }
                let element_size = layout.element_size(element)?;
                address = field_address.wrapping_add(index.wrapping_mul(element_size));
                position = match &**element {
                    FieldType::Struct { name } => Position::Struct(name),
                    _ => Position::Leaf(&field.name),
                };
            }
            (Some(_), _) => return Err(Error::NotIndexable(segment.name.clone())),
            (None, FieldType::Struct { name }) => {
                address = field_address;
                position = Position::Struct(name);
            }
            (None, _) => {
                address = field_address;
                position = Position::Leaf(&field.name);
            }
        }
    }

    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::tests::tables;
    use crate::layout::StructLayout;
    use crate::memory::{MockMemoryBuilder, MockOpener, MockProcess};
    use crate::tag::ManifestCache;

    const TAG_INDEX: u32 = 7;
    const TAG_ADDRESS: u32 = 0x4000_0000;
    const MAIN_STRUCT_OFFSET: u32 = 0x40;
    const ROOT: u32 = TAG_ADDRESS + MAIN_STRUCT_OFFSET;
    const ITEMS_BLOCK: u32 = 0x4100_0000;

    fn layout() -> LayoutRegistry {
        LayoutRegistry::new("HaloOnline106708", Default::default())
            .with(
                StructLayout::new("Weapon", 0x60)
                    .field("Flags", 0x00, FieldType::Value { size: 4 })
                    .field(
                        "Header",
                        0x04,
                        FieldType::Struct {
                            name: "Header".into(),
                        },
                    )
                    .field(
                        "Offsets",
                        0x30,
                        FieldType::Array {
                            element: Box::new(FieldType::Value { size: 4 }),
                            count: 4,
                        },
                    )
                    .field(
                        "Points",
                        0x40,
                        FieldType::Array {
                            element: Box::new(FieldType::Struct {
                                name: "Point".into(),
                            }),
                            count: 2,
                        },
                    ),
            )
            .with(
                StructLayout::new("Header", 0x2C)
                    .field("Model", 0x00, FieldType::TagReference)
                    .field(
                        "Items",
                        0x10,
                        FieldType::Block {
                            element: "Item".into(),
                        },
                    ),
            )
            .with(
                StructLayout::new("Item", 0x18)
                    .field("Count", 0x00, FieldType::Value { size: 2 })
                    .field("Name", 0x08, FieldType::StringId),
            )
            .with(StructLayout::new("Point", 0x08).field("Y", 0x04, FieldType::Value { size: 4 }))
    }

    fn cache() -> ManifestCache {
        ManifestCache::new("HaloOnline106708")
            .with_tag(CachedTag::new(TAG_INDEX, "rifle", "weap").with_size(0x100), vec![])
            .with_layout(layout())
    }

    fn memory() -> MockProcess {
        tables(&[(TAG_INDEX, 0, TAG_ADDRESS)])
            .zeroed(u64::from(TAG_ADDRESS), 0x100)
            .u32_at(u64::from(TAG_ADDRESS + 0x10), MAIN_STRUCT_OFFSET)
            // Header.Items: 5 elements at ITEMS_BLOCK
            .u32_at(u64::from(ROOT + 0x04 + 0x10), 5)
            .u32_at(u64::from(ROOT + 0x04 + 0x14), ITEMS_BLOCK)
            .build()
    }

    fn resolve(path: &str) -> Result<Option<u32>> {
        let build = EngineBuild::default();
        let cache = cache();
        let tag = cache.tags().get(TAG_INDEX).unwrap().clone();
        FieldAddressResolver::new(&build).resolve(
            &memory(),
            &cache,
            "Weapon",
            &tag,
            &path.parse().unwrap(),
        )
    }

    #[test]
    fn test_empty_path_is_root_struct() {
        assert_eq!(resolve("").unwrap(), Some(ROOT));
    }

    #[test]
    fn test_scalar_and_nested_struct_fields() {
        assert_eq!(resolve("Flags").unwrap(), Some(ROOT));
        assert_eq!(resolve("Header").unwrap(), Some(ROOT + 0x04));
        assert_eq!(resolve("Header.Model").unwrap(), Some(ROOT + 0x04));
        assert_eq!(resolve("Header.Items").unwrap(), Some(ROOT + 0x14));
    }

    #[test]
    fn test_list_index_follows_block_pointer() {
        assert_eq!(resolve("Header.Items[0]").unwrap(), Some(ITEMS_BLOCK));
        assert_eq!(
            resolve("Header.Items[3].Name").unwrap(),
            Some(ITEMS_BLOCK + 3 * 0x18 + 0x08)
        );
    }

    #[test]
    fn test_array_index_is_inline() {
        assert_eq!(resolve("Offsets[2]").unwrap(), Some(ROOT + 0x30 + 2 * 4));
        assert_eq!(resolve("Points[1].Y").unwrap(), Some(ROOT + 0x40 + 8 + 4));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let build = EngineBuild::default();
        let cache = cache();
        let memory = memory();
        let tag = cache.tags().get(TAG_INDEX).unwrap().clone();
        let path: FieldPath = "Header.Items[4].Count".parse().unwrap();
        let resolver = FieldAddressResolver::new(&build);

        let first = resolver.resolve(&memory, &cache, "Weapon", &tag, &path).unwrap();
        let second = resolver.resolve(&memory, &cache, "Weapon", &tag, &path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, Some(ITEMS_BLOCK + 4 * 0x18));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            resolve("Header.Items[5]"),
            Err(Error::IndexOutOfRange {
                index: 5,
                count: 5,
                ..
            })
        ));
        assert!(matches!(
            resolve("Offsets[4]"),
            Err(Error::IndexOutOfRange { count: 4, .. })
        ));
        assert!(matches!(resolve("Flags[0]"), Err(Error::NotIndexable(_))));
        assert!(matches!(resolve("Flags.Bit"), Err(Error::NotAStruct(f)) if f == "Flags"));
        assert!(matches!(resolve("Offsets[1].X"), Err(Error::NotAStruct(_))));
        assert!(matches!(resolve("Ammo"), Err(Error::UnknownField { .. })));
    }

    #[test]
    fn test_not_loaded_is_none() {
        let build = EngineBuild::default();
        let cache = cache();
        let tag = cache.tags().get(TAG_INDEX).unwrap().clone();
        let memory = tables(&[(TAG_INDEX, -1, 0)]).build();

        let address = FieldAddressResolver::new(&build)
            .resolve(&memory, &cache, "Weapon", &tag, &"Flags".parse().unwrap())
            .unwrap();
        assert_eq!(address, None);
    }

    #[test]
    fn test_resolve_target_opens_process() {
        let build = EngineBuild::default();
        let cache = cache();
        let tag = cache.tags().get(TAG_INDEX).unwrap().clone();
        let memory = memory();
        let opener = MockOpener::new(&memory);
        let resolver = FieldAddressResolver::new(&build);
        let path = FieldPath::root();

        let target = Target::new(1234, "eldorado.exe #1234", "HaloOnline106708");
        let address = resolver.resolve_target(&opener, &target, &cache, "Weapon", &tag, &path);
        assert_eq!(address.unwrap(), Some(ROOT));

        let gone = Target::new(99, "eldorado.exe #99", "HaloOnline106708");
        let err = resolver
            .resolve_target(&opener, &gone, &cache, "Weapon", &tag, &path)
            .unwrap_err();
        assert!(matches!(err, Error::TargetNotAvailable(_)));
    }

    #[test]
    fn test_walk_without_memory_reads() {
        let memory = MockMemoryBuilder::new().build();
        let path: FieldPath = "Header.Model".parse().unwrap();
        assert_eq!(walk(&memory, &layout(), 0x1000, "Weapon", &path).unwrap(), 0x1004);
    }
}
