use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Target not available: {0}")]
    TargetNotAvailable(String),

    #[error("Tag '{0}' could not be located in the target process")]
    TagNotLoaded(String),

    #[error(
        "Tag size changed or the serializer failed (cache: {cache_len} bytes, editor: {editor_len} bytes)"
    )]
    SerializerMismatch { cache_len: usize, editor_len: usize },

    #[error(
        "Can't poke this specific tag yet: serialized size {serialized} != declared runtime size {declared}"
    )]
    UnsupportedTagShape { serialized: usize, declared: u32 },

    #[error("Loaded tag size ({loaded} bytes) did not match cache tag size ({cached} bytes)")]
    LoadedSizeMismatch { loaded: usize, cached: usize },

    #[error(
        "Loaded tag has changed size since initial poke (map: {map_len} bytes, tag: {tag_len} bytes)"
    )]
    SizeChangedSinceInitialPoke { map_len: usize, tag_len: usize },

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Failed to write process memory at address {address:#x}: {message}")]
    MemoryWriteFailed { address: u64, message: String },

    #[error("Failed to suspend process {pid}: {message}")]
    SuspendFailed { pid: u32, message: String },

    #[error("Failed to resume process {pid}: {message}")]
    ResumeFailed { pid: u32, message: String },

    #[error("Invalid field path '{path}': {reason}")]
    InvalidFieldPath { path: String, reason: String },

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Manifest base chain loops back to {}", .0.display())]
    ManifestCycle(PathBuf),

    #[error("Unknown struct type: {0}")]
    UnknownStruct(String),

    #[error("Struct '{structure}' has no field named '{field}'")]
    UnknownField { structure: String, field: String },

    #[error("Field '{0}' cannot be indexed")]
    NotIndexable(String),

    #[error("Index {index} out of range for '{field}' ({count} elements)")]
    IndexOutOfRange { field: String, index: u32, count: u32 },

    #[error("Field '{0}' is not a struct and has no sub-fields")]
    NotAStruct(String),

    #[error("Field '{0}' cannot be poked on its own")]
    NotPokeable(String),

    #[error("Tag reference fixup at {offset:#x} lies outside the tag data ({len} bytes)")]
    InvalidFixup { offset: u32, len: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Content of the modal dialog shown when an operation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: &'static str,
    pub message: String,
    pub remedy: Option<&'static str>,
}

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// True for the conditions that mean the live tag no longer lines up with
    /// the editor and the tag has to be reopened or the package rebuilt.
    pub fn is_structural_mismatch(&self) -> bool {
        matches!(
            self,
            Error::SerializerMismatch { .. }
                | Error::UnsupportedTagShape { .. }
                | Error::LoadedSizeMismatch { .. }
                | Error::SizeChangedSinceInitialPoke { .. }
        )
    }

    pub fn alert(&self) -> Alert {
        let (title, remedy) = match self {
            Error::TargetNotAvailable(_) => ("Target Not Available", None),
            Error::TagNotLoaded(_) => ("Tag Not Loaded", None),
            Error::SerializerMismatch { .. } => ("Failed to Poke", Some("Reopen the tag.")),
            Error::UnsupportedTagShape { .. } => (
                "Failed to Poke",
                Some("This tag layout is not supported for runtime editing yet."),
            ),
            Error::LoadedSizeMismatch { .. } => (
                "Failed to Poke",
                Some(
                    "Is this tag overwritten in a mod package? Rebuild the mod package on the current cache.",
                ),
            ),
            Error::SizeChangedSinceInitialPoke { .. } => {
                ("Failed to Poke", Some("Try closing and reopening the tag."))
            }
            _ => ("Failed to Poke", None),
        };

        Alert {
            title,
            message: self.to_string(),
            remedy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.is_not_found());

        let other_io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err2 = Error::Io(other_io_err);
        assert!(!err2.is_not_found());
    }

    #[test]
    fn test_structural_mismatch_classification() {
        assert!(
            Error::LoadedSizeMismatch {
                loaded: 1,
                cached: 2
            }
            .is_structural_mismatch()
        );
        assert!(!Error::TagNotLoaded("x".into()).is_structural_mismatch());
        assert!(!Error::TargetNotAvailable("gone".into()).is_structural_mismatch());
    }

    #[test]
    fn test_alert_carries_remedy() {
        let alert = Error::SizeChangedSinceInitialPoke {
            map_len: 16,
            tag_len: 32,
        }
        .alert();
        assert_eq!(alert.title, "Failed to Poke");
        assert_eq!(alert.remedy, Some("Try closing and reopening the tag."));
        assert!(alert.message.contains("changed size"));

        let alert = Error::TagNotLoaded("weapon".into()).alert();
        assert_eq!(alert.title, "Tag Not Loaded");
        assert!(alert.remedy.is_none());
    }
}
