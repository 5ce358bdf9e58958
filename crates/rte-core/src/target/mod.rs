//! Target discovery and lifecycle.
//!
//! A [`Target`] is one running process that can host tag data. Sources
//! enumerate targets from scratch on every call; the [`TargetRegistry`]
//! diffs successive enumerations into added/removed events.

mod list;
mod registry;
mod service;
mod watcher;

use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::EngineBuild;
use crate::memory::ProcessProvider;

pub use list::TargetList;
pub use registry::{RefreshReport, TargetEvent, TargetRegistry};
pub use service::{RteProvider, RteService};
pub use watcher::TargetWatcher;

/// One external process capable of hosting tag data.
///
/// Identity is the process id alone: display metadata never affects
/// equality or hashing.
#[derive(Debug, Clone)]
pub struct Target {
    id: u32,
    display_name: String,
    provider: Arc<str>,
}

impl Target {
    pub fn new(id: u32, display_name: impl Into<String>, provider: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            provider: provider.into(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Name of the provider that discovered this target
    pub fn provider(&self) -> &str {
        &self.provider
    }
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Target {}

impl Hash for Target {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Producer of currently running targets.
///
/// Every call performs a fresh enumeration and must be cheap enough to run
/// on a fixed polling interval.
pub trait TargetSource {
    fn find_targets(&self) -> Vec<Target>;
}

impl<T: TargetSource + ?Sized> TargetSource for Arc<T> {
    fn find_targets(&self) -> Vec<Target> {
        (**self).find_targets()
    }
}

impl<T: TargetSource + ?Sized> TargetSource for Box<T> {
    fn find_targets(&self) -> Vec<Target> {
        (**self).find_targets()
    }
}

/// Concatenation of several sources, in insertion order.
#[derive(Default)]
pub struct AggregateTargetSource {
    sources: Vec<Box<dyn TargetSource>>,
}

impl AggregateTargetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: impl TargetSource + 'static) {
        self.sources.push(Box::new(source));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl TargetSource for AggregateTargetSource {
    fn find_targets(&self) -> Vec<Target> {
        self.sources
            .iter()
            .flat_map(|source| source.find_targets())
            .collect()
    }
}

/// Discovers processes of one engine build by executable name.
pub struct ProcessTargetSource<P> {
    processes: P,
    build: EngineBuild,
    provider: Arc<str>,
}

impl<P: ProcessProvider> ProcessTargetSource<P> {
    pub fn new(processes: P, build: EngineBuild) -> Self {
        let provider = Arc::from(build.name.as_str());
        Self {
            processes,
            build,
            provider,
        }
    }

    pub fn build(&self) -> &EngineBuild {
        &self.build
    }

    fn describe(&self, pid: u32) -> Option<Target> {
        match self.processes.image_path(pid) {
            Ok(path) => {
                let file_name = Path::new(&path)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| self.build.executable.clone());
                Some(Target::new(
                    pid,
                    format!("{} #{}", file_name, pid),
                    Arc::clone(&self.provider),
                ))
            }
            Err(e) => {
                debug!("Dropping candidate process {}: {}", pid, e);
                None
            }
        }
    }
}

impl<P: ProcessProvider> TargetSource for ProcessTargetSource<P> {
    fn find_targets(&self) -> Vec<Target> {
        let candidates = match self.processes.processes_named(&self.build.executable) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Process enumeration failed: {}", e);
                return Vec::new();
            }
        };

        candidates
            .into_iter()
            .filter_map(|info| self.describe(info.pid))
            .collect()
    }
}
