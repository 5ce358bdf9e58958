//! # rte-core
//!
//! Runtime tag editing: patching the tags of a running game from an editor.
//!
//! This crate provides:
//! - Target discovery over running engine processes
//! - Cross-process memory access with whole-process suspend/resume
//! - Tag address table lookup, including mod-package index translation
//! - Field address resolution from structure layouts
//! - Diff-based tag patching ("poke") and single-field writes
//! - Per-editor sessions tying the above together

pub mod address;
pub mod config;
pub mod engine;
pub mod error;
pub mod field;
pub mod layout;
pub mod memory;
pub mod patch;
pub mod resolver;
pub mod session;
pub mod shutdown;
pub mod tag;
pub mod target;

pub use address::{mod_package_index, resolve_tag_index, tag_address, tag_memory_address};
pub use config::{SessionConfig, SessionConfigBuilder};
pub use engine::EngineBuild;
pub use error::{Alert, Error, Result};
pub use field::{FieldId, FieldKind, FieldNode, FieldPath, FieldTree, PathSegment};
pub use layout::{FieldLayout, FieldType, LayoutRegistry, Platform, StructLayout};
pub use memory::{
    MemoryStream, ProcessHandle, ProcessInfo, ProcessMemory, ProcessOpener, ProcessProvider,
    ReadMemory, SuspendGuard, SuspendProcess, SystemProcessOpener, SystemProcessProvider,
    WriteMemory,
};
pub use patch::{
    FieldValue, PokeReport, RuntimeDataMap, TagPatcher, apply_reference_fixups, check_tag_shape,
    poke_field,
};
pub use resolver::FieldAddressResolver;
pub use session::TagEditorSession;
pub use shutdown::ShutdownSignal;
pub use tag::{
    CachedTag, ManifestCache, TagCache, TagHeader, TagTable, align16, calculate_header_size,
};
pub use target::{
    AggregateTargetSource, ProcessTargetSource, RefreshReport, RteProvider, RteService, Target,
    TargetEvent, TargetList, TargetRegistry, TargetSource, TargetWatcher,
};
