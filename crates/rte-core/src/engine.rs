//! Constants specific to one engine build.
//!
//! The tag index/address table pointers and the mod-package index scheme
//! only hold for the build they were taken from. Other builds supply their
//! own values through configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineBuild {
    /// Human-readable build name, also used as the provider name of targets
    pub name: String,
    /// Executable name of processes hosting this build
    pub executable: String,
    /// Absolute address holding a pointer to the tag index table
    pub tag_index_table_pointer: u32,
    /// Absolute address holding a pointer to the tag address table
    pub tag_address_table_pointer: u32,
    /// Tag indices at or above this are never resident
    pub max_tag_index: u32,
    /// Mod-package tags are packed downward from this index
    pub mod_tag_index_ceiling: u32,
    /// Fixed part of the in-memory tag header, before the fixup arrays
    pub tag_header_base_size: u32,
    /// Position of the main struct offset relative to the tag address
    pub main_struct_offset_position: u32,
    /// Bias stored in every tag reference fixup entry
    pub tag_reference_fixup_bias: u32,
}

impl EngineBuild {
    pub fn halo_online_106708() -> Self {
        Self {
            name: "HaloOnline106708".to_string(),
            executable: "eldorado.exe".to_string(),
            tag_index_table_pointer: 0x022A_AFFC,
            tag_address_table_pointer: 0x022A_AFF8,
            max_tag_index: 0xFFFF,
            mod_tag_index_ceiling: 0xFFFE,
            tag_header_base_size: 0x24,
            main_struct_offset_position: 0x10,
            tag_reference_fixup_bias: 0x4000_0000,
        }
    }
}

impl Default for EngineBuild {
    fn default() -> Self {
        Self::halo_online_106708()
    }
}
