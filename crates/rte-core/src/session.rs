//! Runtime editing state of one open tag editor
//!
//! Each open editor owns a session. The runtime data map lives here and
//! nowhere else, so two editors never share patch flags. Nothing serializes
//! pokes across sessions: two editors poking overlapping memory of the same
//! target at once is not guarded against.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::engine::EngineBuild;
use crate::error::{Error, Result};
use crate::field::{FieldId, FieldPath, FieldTree};
use crate::memory::ProcessOpener;
use crate::patch::{FieldValue, PokeReport, RuntimeDataMap, TagPatcher, poke_field};
use crate::resolver::FieldAddressResolver;
use crate::tag::{CachedTag, TagCache};
use crate::target::{RefreshReport, Target, TargetList};

pub struct TagEditorSession<O, C> {
    config: SessionConfig,
    build: EngineBuild,
    opener: O,
    cache: Arc<C>,
    tag: CachedTag,
    /// Root structure type of the tag's definition
    root: String,
    targets: TargetList,
    runtime_map: RuntimeDataMap,
}

impl<O, C> TagEditorSession<O, C>
where
    O: ProcessOpener,
    C: TagCache,
{
    pub fn new(
        config: SessionConfig,
        build: EngineBuild,
        opener: O,
        cache: Arc<C>,
        tag: CachedTag,
        root: impl Into<String>,
        targets: TargetList,
    ) -> Self {
        Self {
            config,
            build,
            opener,
            cache,
            tag,
            root: root.into(),
            targets,
            runtime_map: RuntimeDataMap::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn tag(&self) -> &CachedTag {
        &self.tag
    }

    pub fn targets(&self) -> &TargetList {
        &self.targets
    }

    pub fn runtime_map(&self) -> &RuntimeDataMap {
        &self.runtime_map
    }

    pub fn refresh_targets(&mut self) -> RefreshReport {
        self.targets.refresh()
    }

    pub fn select_target(&mut self, id: u32) -> bool {
        self.targets.select(id)
    }

    fn selected(&self) -> Result<&Target> {
        self.targets.selected().ok_or_else(|| {
            Error::TargetNotAvailable("not attached to a game instance".to_string())
        })
    }

    /// Poke the whole definition into the selected target.
    pub fn poke(&mut self, definition: &C::Definition) -> Result<PokeReport> {
        let target = self.selected()?.clone();
        TagPatcher::new(&self.build).poke(
            &self.opener,
            &target,
            self.cache.as_ref(),
            &self.tag,
            definition,
            &mut self.runtime_map,
        )
    }

    /// Live address of `path` in the selected target, `None` if the tag is
    /// not loaded there.
    pub fn field_address(&self, path: &FieldPath) -> Result<Option<u32>> {
        let target = self.selected()?;
        FieldAddressResolver::new(&self.build).resolve_target(
            &self.opener,
            target,
            self.cache.as_ref(),
            &self.root,
            &self.tag,
            path,
        )
    }

    /// Write a single field value in place. Returns the address written.
    pub fn poke_field(&self, path: &FieldPath, value: &FieldValue) -> Result<u32> {
        let target = self.selected()?;
        let process = self.opener.open(target.id())?;
        let address = FieldAddressResolver::new(&self.build)
            .resolve(&process, self.cache.as_ref(), &self.root, &self.tag, path)?
            .ok_or_else(|| Error::TagNotLoaded(self.tag.qualified_name()))?;

        poke_field(&process, self.cache.as_ref(), address, value, &self.build)?;
        info!("Poked {} at {:#010x}", path, address);
        Ok(address)
    }

    /// Live address of an editor field, located through its parent chain.
    pub fn field_address_of(&self, fields: &FieldTree, id: FieldId) -> Result<Option<u32>> {
        self.field_address(&fields.path(id))
    }

    /// Write an editor field in place. Only leaf values can be poked this
    /// way; structs, blocks and data fields need a full poke.
    pub fn poke_field_of(
        &self,
        fields: &FieldTree,
        id: FieldId,
        value: &FieldValue,
    ) -> Result<u32> {
        let node = fields.node(id);
        if !node.kind.is_pokeable() || node.element_index.is_some() {
            return Err(Error::NotPokeable(fields.path(id).to_string()));
        }
        self.poke_field(&fields.path(id), value)
    }

    /// Called after every field edit. Pokes the whole tag when auto-poke is
    /// on and a target is attached; returns `None` when nothing was tried.
    pub fn on_field_changed(&mut self, definition: &C::Definition) -> Option<Result<PokeReport>> {
        if !self.config.auto_poke || self.targets.selected().is_none() {
            return None;
        }
        debug!("Auto-poking {}", self.tag.qualified_name());
        Some(self.poke(definition))
    }

    /// Forget everything learned from previous pokes, as when the editor is
    /// closed and opened again.
    pub fn reopen(&mut self) {
        self.runtime_map.reset();
    }
}
