use super::{RefreshReport, Target, TargetRegistry};

/// Ordered list of targets with a current selection, as shown by an editor.
pub struct TargetList {
    registry: TargetRegistry,
    selected: Option<u32>,
}

impl TargetList {
    pub fn new(registry: TargetRegistry) -> Self {
        Self {
            registry,
            selected: None,
        }
    }

    pub fn registry_mut(&mut self) -> &mut TargetRegistry {
        &mut self.registry
    }

    pub fn targets(&self) -> &[Target] {
        self.registry.targets()
    }

    pub fn has_targets(&self) -> bool {
        !self.registry.is_empty()
    }

    pub fn selected(&self) -> Option<&Target> {
        self.selected.and_then(|id| self.registry.get(id))
    }

    /// Select a known target. Returns false if the id is not in the list.
    pub fn select(&mut self, id: u32) -> bool {
        if self.registry.contains(id) {
            self.selected = Some(id);
            true
        } else {
            false
        }
    }

    /// Refresh the registry; keep the selection while its target is alive,
    /// otherwise fall back to the first target.
    pub fn refresh(&mut self) -> RefreshReport {
        let report = self.registry.refresh();

        let still_present = self.selected.is_some_and(|id| self.registry.contains(id));
        if !still_present {
            self.selected = self.registry.targets().first().map(Target::id);
        }

        report
    }
}
