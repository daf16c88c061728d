//! Aggregated progress over the registered loaders

use std::collections::HashMap;

use crate::error::ResourceError;

use super::resource::{ResourceKind, ResourceStatus};

/// Receives the aggregate percentage every time an item finishes
pub type ProgressListener = Box<dyn FnMut(u8)>;

/// Counts finished items against registered items and turns them into one percentage.
///
/// The percentage never decreases within a session and a failed item does not count as
/// loaded, so a failure freezes the percentage at its last value. Items that are not tracked
/// still get a [`ResourceStatus`] but never move the percentage.
pub struct LoadingManager {
    items_loaded: usize,
    items_total: usize,
    percentage: u8,
    statuses: HashMap<ResourceKind, ResourceStatus>,
    tracked: HashMap<ResourceKind, bool>,
    listener: Option<ProgressListener>,
}

impl std::fmt::Debug for LoadingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingManager")
            .field("items_loaded", &self.items_loaded)
            .field("items_total", &self.items_total)
            .field("percentage", &self.percentage)
            .field("statuses", &self.statuses)
            .finish()
    }
}

impl Default for LoadingManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadingManager {
    pub fn new() -> Self {
        Self {
            items_loaded: 0,
            items_total: 0,
            percentage: 0,
            statuses: HashMap::new(),
            tracked: HashMap::new(),
            listener: None,
        }
    }

    pub fn set_listener(&mut self, listener: ProgressListener) {
        self.listener = Some(listener);
    }

    /// Marks a load as started. Tracked items count towards the percentage.
    pub fn item_start(&mut self, kind: ResourceKind, tracked: bool) {
        self.statuses.insert(kind, ResourceStatus::Pending);
        self.tracked.insert(kind, tracked);
        if tracked {
            self.items_total += 1;
        }
    }

    /// Marks a load as finished successfully
    pub fn item_end(&mut self, kind: ResourceKind) {
        if self.status(kind).is_terminal() {
            return;
        }
        self.statuses.insert(kind, ResourceStatus::Loaded);
        if self.is_tracked(kind) {
            self.items_loaded += 1;
            self.on_progress(self.items_loaded, self.items_total);
        }
    }

    /// Marks a load as failed; the percentage is left where it was
    pub fn item_error(&mut self, kind: ResourceKind, error: ResourceError) {
        if self.status(kind).is_terminal() {
            return;
        }
        log::error!("{:?} failed: {}", kind, error);
        self.statuses.insert(kind, ResourceStatus::Failed(error));
    }

    /// Folds one `(items_loaded, items_total)` report into the percentage.
    ///
    /// Reports with a zero total are ignored.
    pub fn on_progress(&mut self, items_loaded: usize, items_total: usize) -> u8 {
        if items_total == 0 {
            return self.percentage;
        }

        let raw = (items_loaded as f64 / items_total as f64 * 100.0).floor();
        let clamped = raw.clamp(0.0, 100.0) as u8;
        self.percentage = self.percentage.max(clamped);

        log::debug!(
            "Loading progress {}/{} -> {}%",
            items_loaded,
            items_total,
            self.percentage
        );
        if let Some(listener) = self.listener.as_mut() {
            listener(self.percentage);
        }
        self.percentage
    }

    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    pub fn items_loaded(&self) -> usize {
        self.items_loaded
    }

    pub fn items_total(&self) -> usize {
        self.items_total
    }

    /// Status of a resource; kinds that were never started report `Pending`
    pub fn status(&self, kind: ResourceKind) -> ResourceStatus {
        self.statuses
            .get(&kind)
            .cloned()
            .unwrap_or(ResourceStatus::Pending)
    }

    pub fn is_tracked(&self, kind: ResourceKind) -> bool {
        self.tracked.get(&kind).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::{cell::RefCell, rc::Rc};

    fn started() -> LoadingManager {
        let mut manager = LoadingManager::new();
        manager.item_start(ResourceKind::Texture, true);
        manager.item_start(ResourceKind::Geometry, true);
        manager.item_start(ResourceKind::Environment, false);
        manager
    }

    #[test]
    fn test_two_tracked_items() {
        let mut manager = started();
        manager.item_end(ResourceKind::Texture);
        assert_eq!(manager.percentage(), 50);
        manager.item_end(ResourceKind::Geometry);
        assert_eq!(manager.percentage(), 100);
    }

    #[test]
    fn test_untracked_item_does_not_move_percentage() {
        let mut manager = started();
        manager.item_end(ResourceKind::Environment);
        assert_eq!(manager.percentage(), 0);
        assert_eq!(manager.status(ResourceKind::Environment), ResourceStatus::Loaded);
    }

    #[test]
    fn test_failure_freezes_percentage() {
        let mut manager = started();
        manager.item_end(ResourceKind::Texture);
        manager.item_error(
            ResourceKind::Geometry,
            ResourceError::fetch("model.obj", "not found"),
        );

        assert_eq!(manager.percentage(), 50);
        assert!(matches!(
            manager.status(ResourceKind::Geometry),
            ResourceStatus::Failed(ResourceError::Fetch { .. })
        ));

        // terminal: a late success does not resurrect it
        manager.item_end(ResourceKind::Geometry);
        assert_eq!(manager.percentage(), 50);
    }

    #[test]
    fn test_listener_sees_each_report() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut manager = started();
        manager.set_listener(Box::new(move |pct| sink.borrow_mut().push(pct)));
        manager.item_end(ResourceKind::Geometry);
        manager.item_end(ResourceKind::Texture);

        assert_eq!(*seen.borrow(), vec![50, 100]);
    }

    #[test]
    fn test_three_items_floor() {
        let mut manager = LoadingManager::new();
        assert_eq!(manager.on_progress(1, 3), 33);
        assert_eq!(manager.on_progress(2, 3), 66);
    }

    #[test]
    fn test_random_reports_are_monotonic_and_bounded() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let mut manager = LoadingManager::new();
            let mut previous = 0;
            for _ in 0..50 {
                let total = rng.random_range(1..20usize);
                let loaded = rng.random_range(0..30usize);
                let pct = manager.on_progress(loaded, total);
                assert!(pct <= 100);
                assert!(pct >= previous);
                previous = pct;
            }
        }
    }
}
