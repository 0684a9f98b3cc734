// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciliation of store files against their snapshots.
//!
//! A pass runs after the debounce interval. It re-reads the owning store file,
//! diffs it against its snapshot and reports one externally attributed event per
//! changed key. For the system scope it also walks every other store file in the
//! settings directory the same way, which is how live changes of all
//! applications reach the system store. Each pass finally re-arms lost watches.

use crate::adapters::SettingsLocation;
use crate::domain::{Scope, SettingsEvent, SettingsMap};
use crate::engine::{SnapshotCache, WatchSet};
use crate::ports::SettingsFormat;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// How the pass following a local write treats the owning store file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelfWritePolicy {
    /// The next pass reports nothing for the owning file and re-seeds its
    /// snapshot from disk. An external write landing in the same debounce
    /// window as a local write is absorbed without an event.
    #[default]
    SkipNextPass,
    /// The next pass still diffs the owning file. Local writes already updated
    /// the snapshot, so only changes made by someone else are reported.
    DiffAgainstCache,
}

/// A store file other than the owning one (system scope only).
#[derive(Clone, Debug)]
struct SiblingFile {
    origin: String,
    snapshot: SnapshotCache,
}

/// What a reconciliation pass produced.
#[derive(Clone, Debug, Default)]
pub struct PassReport {
    /// Events to publish, owning file first, then siblings ordered by path
    pub events: Vec<SettingsEvent>,
    /// The fresh content of the owning file, if it could be read
    pub own_entries: Option<SettingsMap>,
    /// `true` if the owning file's changes were suppressed as a local write
    pub suppressed: bool,
}

/// Change detection for one store and, in the system scope, its siblings.
#[derive(Debug)]
pub struct ChangeReconciler {
    origin: String,
    path: PathBuf,
    snapshot: SnapshotCache,
    self_write_pending: bool,
    policy: SelfWritePolicy,
    siblings: Option<BTreeMap<PathBuf, SiblingFile>>,
}

impl ChangeReconciler {
    /// Creates a reconciler for the store file at `path`, seeded with its
    /// current content.
    pub fn new(scope: &Scope, path: PathBuf, initial: SettingsMap, policy: SelfWritePolicy) -> Self {
        Self {
            origin: scope.origin().to_string(),
            path,
            snapshot: SnapshotCache::seeded(initial),
            self_write_pending: false,
            policy,
            siblings: scope.is_system().then(BTreeMap::new),
        }
    }

    /// Marks the owning file as about to be written locally.
    pub fn arm_self_write(&mut self) {
        self.self_write_pending = true;
    }

    /// Withdraws the mark after a local write failed to persist.
    pub fn disarm_self_write(&mut self) {
        self.self_write_pending = false;
    }

    /// Returns `true` if the next pass will treat the owning file as written
    /// locally.
    pub fn self_write_pending(&self) -> bool {
        self.self_write_pending
    }

    /// Returns the policy applied after local writes.
    pub fn policy(&self) -> SelfWritePolicy {
        self.policy
    }

    /// Returns the owning file's snapshot.
    pub fn snapshot(&self) -> &SnapshotCache {
        &self.snapshot
    }

    /// Returns the owning file's snapshot for local-write bookkeeping.
    pub fn snapshot_mut(&mut self) -> &mut SnapshotCache {
        &mut self.snapshot
    }

    /// Returns the snapshot of a sibling store, by origin identity.
    pub fn sibling_snapshot(&self, origin: &str) -> Option<&SnapshotCache> {
        self.siblings
            .as_ref()?
            .values()
            .find(|sibling| sibling.origin == origin)
            .map(|sibling| &sibling.snapshot)
    }

    /// Returns the origin identities of the tracked siblings.
    pub fn sibling_origins(&self) -> Vec<String> {
        self.siblings
            .iter()
            .flat_map(|siblings| siblings.values())
            .map(|sibling| sibling.origin.clone())
            .collect()
    }

    /// Seeds and watches every sibling store present in the directory.
    ///
    /// Does nothing outside the system scope.
    pub fn seed_siblings(
        &mut self,
        location: &SettingsLocation,
        format: &dyn SettingsFormat,
        watch_set: &mut WatchSet,
    ) {
        if self.siblings.is_none() {
            return;
        }
        for path in location.discover() {
            if path == self.path {
                continue;
            }
            self.track_sibling(location, &path, format);
            watch_set.ensure_file(&path);
        }
    }

    /// Runs one reconciliation pass.
    pub fn run_pass(
        &mut self,
        location: &SettingsLocation,
        format: &dyn SettingsFormat,
        watch_set: &mut WatchSet,
    ) -> PassReport {
        let mut report = PassReport::default();

        self.reconcile_own_file(format, &mut report);
        if self.siblings.is_some() {
            self.reconcile_siblings(location, format, watch_set, &mut report);
        }

        watch_set.ensure_dir(location.dir());
        watch_set.ensure_file(&self.path);

        tracing::debug!(
            "Reconciliation pass for '{}' produced {} event(s)",
            self.origin,
            report.events.len()
        );
        report
    }

    fn reconcile_own_file(&mut self, format: &dyn SettingsFormat, report: &mut PassReport) {
        let current = match format.load(&self.path) {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!("Failed to re-read {}: {}", self.path.display(), e);
                return;
            }
        };

        if std::mem::take(&mut self.self_write_pending) && self.policy == SelfWritePolicy::SkipNextPass {
            tracing::debug!("Skipping own changes of '{}' after a local write", self.origin);
            self.snapshot.reseed(current.clone());
            report.suppressed = true;
        } else {
            let diff = self.snapshot.diff(current.clone());
            report
                .events
                .extend(external_events(&self.origin, diff.into_changes()));
        }

        report.own_entries = Some(current);
    }

    fn reconcile_siblings(
        &mut self,
        location: &SettingsLocation,
        format: &dyn SettingsFormat,
        watch_set: &mut WatchSet,
        report: &mut PassReport,
    ) {
        let discovered: BTreeSet<PathBuf> = location
            .discover()
            .into_iter()
            .filter(|path| *path != self.path)
            .collect();

        let tracked: BTreeSet<PathBuf> = self
            .siblings
            .iter()
            .flat_map(|siblings| siblings.keys().cloned())
            .collect();

        for path in discovered.union(&tracked) {
            if !tracked.contains(path) {
                self.track_sibling(location, path, format);
            } else if let Some(sibling) = self.siblings.as_mut().and_then(|s| s.get_mut(path)) {
                match format.load(path) {
                    Ok(current) => {
                        let diff = sibling.snapshot.diff(current);
                        report
                            .events
                            .extend(external_events(&sibling.origin, diff.into_changes()));
                    }
                    Err(e) => tracing::warn!("Failed to re-read {}: {}", path.display(), e),
                }
            }

            if discovered.contains(path) {
                watch_set.ensure_file(path);
            }
        }
    }

    /// Starts tracking a sibling, seeding its snapshot without reporting.
    fn track_sibling(&mut self, location: &SettingsLocation, path: &Path, format: &dyn SettingsFormat) {
        let Some(origin) = location.origin_of(path) else {
            return;
        };
        let Some(siblings) = self.siblings.as_mut() else {
            return;
        };
        match format.load(path) {
            Ok(entries) => {
                tracing::debug!("Tracking '{}' with {} key(s)", origin, entries.len());
                siblings.insert(
                    path.to_path_buf(),
                    SiblingFile {
                        origin,
                        snapshot: SnapshotCache::seeded(entries),
                    },
                );
            }
            Err(e) => tracing::warn!("Failed to read {}: {}", path.display(), e),
        }
    }
}

fn external_events(
    origin: &str,
    changes: Vec<(String, Option<crate::domain::SettingsValue>)>,
) -> impl Iterator<Item = SettingsEvent> + '_ {
    changes
        .into_iter()
        .map(move |(key, value)| SettingsEvent::External {
            origin: origin.to_string(),
            key,
            value,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{IniFormat, NullWatcher};
    use crate::domain::SettingsValue;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        location: SettingsLocation,
        format: IniFormat,
        watch_set: WatchSet,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let location = SettingsLocation::new(dir.path());
            Self {
                dir,
                location,
                format: IniFormat::new(),
                watch_set: WatchSet::new(Box::new(NullWatcher)),
            }
        }

        fn write(&self, name: &str, content: &str) -> PathBuf {
            let path = self.location.dir().join(name);
            fs::write(&path, content).unwrap();
            path
        }

        fn reconciler(&mut self, scope: Scope, policy: SelfWritePolicy) -> ChangeReconciler {
            let path = self.location.store_file(&scope);
            let initial = self.format.load(&path).unwrap();
            let mut reconciler = ChangeReconciler::new(&scope, path, initial, policy);
            reconciler.seed_siblings(&self.location, &self.format, &mut self.watch_set);
            reconciler
        }

        fn pass(&mut self, reconciler: &mut ChangeReconciler) -> PassReport {
            reconciler.run_pass(&self.location, &self.format, &mut self.watch_set)
        }
    }

    fn external(origin: &str, key: &str, value: Option<SettingsValue>) -> SettingsEvent {
        SettingsEvent::External {
            origin: origin.to_string(),
            key: key.to_string(),
            value,
        }
    }

    #[test]
    fn test_external_change_to_own_file() {
        let mut fx = Fixture::new();
        fx.write("foo.conf", "theme=light\nsize=10\n");
        let mut reconciler = fx.reconciler(Scope::application("foo").unwrap(), SelfWritePolicy::default());

        fx.write("foo.conf", "theme=dark\n");
        let report = fx.pass(&mut reconciler);

        assert_eq!(
            report.events,
            vec![
                external("foo", "size", None),
                external("foo", "theme", Some(SettingsValue::from("dark"))),
            ]
        );
        assert_eq!(reconciler.snapshot().entries(), report.own_entries.as_ref().unwrap());
    }

    #[test]
    fn test_skip_next_pass_after_local_write() {
        let mut fx = Fixture::new();
        let mut reconciler = fx.reconciler(Scope::application("foo").unwrap(), SelfWritePolicy::SkipNextPass);

        reconciler.arm_self_write();
        fx.write("foo.conf", "theme=dark\nother=1\n");
        let report = fx.pass(&mut reconciler);

        assert!(report.suppressed);
        assert!(report.events.is_empty());
        assert!(!reconciler.self_write_pending());
        assert_eq!(reconciler.snapshot().len(), 2);

        // The flag covers exactly one pass.
        fx.write("foo.conf", "theme=light\nother=1\n");
        let report = fx.pass(&mut reconciler);
        assert_eq!(report.events.len(), 1);
    }

    #[test]
    fn test_diff_against_cache_reports_concurrent_external_write() {
        let mut fx = Fixture::new();
        let mut reconciler =
            fx.reconciler(Scope::application("foo").unwrap(), SelfWritePolicy::DiffAgainstCache);

        reconciler.arm_self_write();
        reconciler.snapshot_mut().record("theme", SettingsValue::from("dark"));
        fx.write("foo.conf", "theme=dark\nexternal=yes\n");
        let report = fx.pass(&mut reconciler);

        assert!(!report.suppressed);
        assert_eq!(
            report.events,
            vec![external("foo", "external", Some(SettingsValue::from("yes")))]
        );
    }

    #[test]
    fn test_missing_own_file_is_empty_store() {
        let mut fx = Fixture::new();
        let path = fx.write("foo.conf", "a=1\n");
        let mut reconciler = fx.reconciler(Scope::application("foo").unwrap(), SelfWritePolicy::default());

        fs::remove_file(path).unwrap();
        let report = fx.pass(&mut reconciler);
        assert_eq!(report.events, vec![external("foo", "a", None)]);
        assert!(reconciler.snapshot().is_empty());
    }

    #[test]
    fn test_system_scope_seeds_siblings_silently() {
        let mut fx = Fixture::new();
        fx.write("bar.conf", "size=1\n");
        fx.write("baz.conf", "mode=a\n");
        let mut reconciler = fx.reconciler(Scope::System, SelfWritePolicy::default());

        assert_eq!(reconciler.sibling_origins(), vec!["bar", "baz"]);
        let report = fx.pass(&mut reconciler);
        assert!(report.events.is_empty());
    }

    #[test]
    fn test_system_scope_reports_sibling_changes() {
        let mut fx = Fixture::new();
        fx.write("bar.conf", "size=1\n");
        let mut reconciler = fx.reconciler(Scope::System, SelfWritePolicy::default());

        fx.write("bar.conf", "size=2\n");
        fx.write("system.conf", "accent=blue\n");
        let report = fx.pass(&mut reconciler);

        assert_eq!(
            report.events,
            vec![
                external("system", "accent", Some(SettingsValue::from("blue"))),
                external("bar", "size", Some(SettingsValue::from(2))),
            ]
        );
    }

    #[test]
    fn test_new_sibling_is_seeded_then_tracked() {
        let mut fx = Fixture::new();
        let mut reconciler = fx.reconciler(Scope::System, SelfWritePolicy::default());

        fx.write("late.conf", "a=1\n");
        assert!(fx.pass(&mut reconciler).events.is_empty());
        assert!(reconciler.sibling_snapshot("late").is_some());
        assert!(fx.watch_set.is_watching(&fx.location.dir().join("late.conf")));

        fx.write("late.conf", "a=2\n");
        assert_eq!(
            fx.pass(&mut reconciler).events,
            vec![external("late", "a", Some(SettingsValue::from(2)))]
        );
    }

    #[test]
    fn test_deleted_and_recreated_sibling() {
        let mut fx = Fixture::new();
        let path = fx.write("bar.conf", "old=1\n");
        let mut reconciler = fx.reconciler(Scope::System, SelfWritePolicy::default());

        fs::remove_file(&path).unwrap();
        assert_eq!(fx.pass(&mut reconciler).events, vec![external("bar", "old", None)]);

        fx.write("bar.conf", "fresh=1\n");
        assert_eq!(
            fx.pass(&mut reconciler).events,
            vec![external("bar", "fresh", Some(SettingsValue::from(1)))]
        );
    }

    #[test]
    fn test_application_scope_ignores_siblings() {
        let mut fx = Fixture::new();
        fx.write("bar.conf", "a=1\n");
        let mut reconciler = fx.reconciler(Scope::application("foo").unwrap(), SelfWritePolicy::default());
        fx.write("bar.conf", "a=2\n");
        assert!(fx.pass(&mut reconciler).events.is_empty());
        assert!(reconciler.sibling_origins().is_empty());
    }

    #[test]
    fn test_pass_rearms_watches() {
        let mut fx = Fixture::new();
        let mut reconciler = fx.reconciler(Scope::application("foo").unwrap(), SelfWritePolicy::default());
        let own = fx.location.dir().join("foo.conf");
        assert!(!fx.watch_set.is_watching(&own));

        fx.write("foo.conf", "a=1\n");
        fx.pass(&mut reconciler);
        assert!(fx.watch_set.is_watching(&own));
        assert!(fx.watch_set.is_watching(fx.location.dir()));
    }
}
