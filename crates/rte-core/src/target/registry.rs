use std::collections::HashSet;

use tracing::info;

use super::{Target, TargetSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetEvent {
    Added(Target),
    Removed(Target),
}

/// Result of one refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub added: Vec<Target>,
    pub removed: Vec<Target>,
}

impl RefreshReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

type Listener = Box<dyn FnMut(&TargetEvent)>;

/// Deduplicated set of known targets, refreshed by full re-enumeration.
///
/// Membership only changes inside [`TargetRegistry::refresh`]. Targets are
/// never updated in place: a changed target is a removal plus an addition.
pub struct TargetRegistry {
    source: Box<dyn TargetSource>,
    targets: Vec<Target>,
    listeners: Vec<Listener>,
}

impl TargetRegistry {
    pub fn new(source: impl TargetSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            targets: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Register a callback for added/removed events.
    pub fn subscribe(&mut self, listener: impl FnMut(&TargetEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Known targets, in discovery order.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn contains(&self, id: u32) -> bool {
        self.targets.iter().any(|t| t.id() == id)
    }

    pub fn get(&self, id: u32) -> Option<&Target> {
        self.targets.iter().find(|t| t.id() == id)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn refresh(&mut self) -> RefreshReport {
        let found = self.source.find_targets();
        let found_ids: HashSet<u32> = found.iter().map(Target::id).collect();

        let mut report = RefreshReport::default();

        for target in found {
            if !self.contains(target.id()) {
                self.targets.push(target.clone());
                report.added.push(target);
            }
        }

        let (kept, removed): (Vec<Target>, Vec<Target>) = std::mem::take(&mut self.targets)
            .into_iter()
            .partition(|t| found_ids.contains(&t.id()));
        self.targets = kept;
        report.removed = removed;

        for target in &report.added {
            info!("Target added: {}", target.display_name());
            self.emit(&TargetEvent::Added(target.clone()));
        }
        for target in &report.removed {
            info!("Target removed: {}", target.display_name());
            self.emit(&TargetEvent::Removed(target.clone()));
        }

        report
    }

    fn emit(&mut self, event: &TargetEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Source that replays a scripted sequence of scans.
    struct Scripted {
        scans: RefCell<Vec<Vec<u32>>>,
    }

    impl Scripted {
        fn new(scans: Vec<Vec<u32>>) -> Self {
            let mut scans = scans;
            scans.reverse();
            Self {
                scans: RefCell::new(scans),
            }
        }
    }

    impl TargetSource for Scripted {
        fn find_targets(&self) -> Vec<Target> {
            self.scans
                .borrow_mut()
                .pop()
                .unwrap_or_default()
                .into_iter()
                .map(|id| Target::new(id, format!("eldorado.exe #{}", id), "test"))
                .collect()
        }
    }

    fn ids(registry: &TargetRegistry) -> HashSet<u32> {
        registry.targets().iter().map(Target::id).collect()
    }

    #[test]
    fn test_membership_tracks_latest_scan() {
        let scans = vec![
            vec![1, 2, 3],
            vec![2, 3, 4],
            vec![],
            vec![5, 5, 6],
            vec![6, 1],
        ];
        let mut registry = TargetRegistry::new(Scripted::new(scans.clone()));

        let mut previous: HashSet<u32> = HashSet::new();
        for scan in scans {
            let report = registry.refresh();
            let expected: HashSet<u32> = scan.into_iter().collect();

            assert_eq!(ids(&registry), expected);
            assert_eq!(registry.len(), expected.len(), "no duplicates");
            assert_eq!(report.added.len(), expected.difference(&previous).count());
            assert_eq!(report.removed.len(), previous.difference(&expected).count());

            previous = expected;
        }
    }

    #[test]
    fn test_listeners_receive_events() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);

        let mut registry = TargetRegistry::new(Scripted::new(vec![vec![1], vec![2]]));
        registry.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        registry.refresh();
        registry.refresh();

        let events = events.borrow();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], TargetEvent::Added(t) if t.id() == 1));
        assert!(matches!(&events[1], TargetEvent::Added(t) if t.id() == 2));
        assert!(matches!(&events[2], TargetEvent::Removed(t) if t.id() == 1));
    }

    #[test]
    fn test_unchanged_scan_reports_nothing() {
        let mut registry = TargetRegistry::new(Scripted::new(vec![vec![9], vec![9]]));
        assert!(!registry.refresh().is_empty());
        assert!(registry.refresh().is_empty());
        assert!(registry.contains(9));
    }
}
