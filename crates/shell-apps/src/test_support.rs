//! Fake collaborators and a preassembled harness for application-core tests.
//!
//! The window-manager fakes live in `shell_wm::test_support`; this module adds
//! the database, launcher, tracker and usage fakes plus [`TestShell`], which
//! wires everything into a registry.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use parking_lot::Mutex;
use shell_wm::{
    ShellWindow, Subscription, WindowId,
    test_support::{FakeDisplay, FakeSession},
};

use crate::{
    app::App,
    registry::AppRegistry,
    services::{
        AppDirectory, DesktopEntry, InstalledObserver, LaunchContext, LaunchFailure, Launcher,
        Services, UsageRecorder, WindowTracker,
    },
};

/// Shorthand descriptor constructor.
#[must_use]
pub fn entry(id: &str, name: &str) -> Arc<DesktopEntry> {
    Arc::new(DesktopEntry {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        startup_wm_class: None,
    })
}

/// Shorthand descriptor constructor with a startup class hint.
#[must_use]
pub fn entry_with_class(id: &str, name: &str, startup_wm_class: &str) -> Arc<DesktopEntry> {
    Arc::new(DesktopEntry {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        startup_wm_class: Some(startup_wm_class.to_string()),
    })
}

/// An in-memory application database.
#[derive(Clone, Default)]
pub struct FakeDirectory {
    entries: Arc<Mutex<HashMap<String, Arc<DesktopEntry>>>>,
    next_key: Arc<AtomicU64>,
    observers: Arc<Mutex<HashMap<u64, Arc<dyn InstalledObserver>>>>,
}

impl FakeDirectory {
    /// An empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a descriptor and notify observers.
    pub fn install(&self, entry: Arc<DesktopEntry>) {
        self.entries.lock().insert(entry.id.clone(), entry);
        self.notify();
    }

    /// Install a descriptor without notifying, for initial population.
    pub fn seed(&self, entry: Arc<DesktopEntry>) {
        self.entries.lock().insert(entry.id.clone(), entry);
    }

    /// Uninstall a descriptor and notify observers.
    pub fn remove(&self, id: &str) {
        self.entries.lock().remove(id);
        self.notify();
    }

    fn notify(&self) {
        let observers: Vec<_> = self.observers.lock().values().cloned().collect();
        for obs in observers {
            obs.installed_changed();
        }
    }
}

impl AppDirectory for FakeDirectory {
    fn resolve(&self, id: &str) -> Option<Arc<DesktopEntry>> {
        self.entries.lock().get(id).cloned()
    }

    fn entries(&self) -> Vec<Arc<DesktopEntry>> {
        self.entries.lock().values().cloned().collect()
    }

    fn observe_installed(&self, observer: Arc<dyn InstalledObserver>) -> Subscription {
        let key = self.next_key.fetch_add(1, Ordering::SeqCst);
        self.observers.lock().insert(key, observer);
        let table = self.observers.clone();
        Subscription::new(move || {
            table.lock().remove(&key);
        })
    }
}

/// A launcher that records requests and optionally fails.
#[derive(Clone, Default)]
pub struct FakeLauncher {
    launches: Arc<Mutex<Vec<(String, LaunchContext)>>>,
    fail_with: Arc<Mutex<Option<String>>>,
    child_pids: Arc<Mutex<Vec<i32>>>,
}

impl FakeLauncher {
    /// A launcher that always succeeds and spawns no children.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent launch fail with `message`.
    pub fn set_fail(&self, message: &str) {
        *self.fail_with.lock() = Some(message.to_string());
    }

    /// Report these pids through the child callback on each launch.
    pub fn set_child_pids(&self, pids: Vec<i32>) {
        *self.child_pids.lock() = pids;
    }

    /// Recorded launches as `(descriptor id, context)` pairs.
    #[must_use]
    pub fn launches(&self) -> Vec<(String, LaunchContext)> {
        self.launches.lock().clone()
    }
}

impl Launcher for FakeLauncher {
    fn launch(
        &self,
        entry: &DesktopEntry,
        context: LaunchContext,
        on_child: Box<dyn Fn(i32) + Send + Sync>,
    ) -> Result<(), LaunchFailure> {
        if let Some(message) = self.fail_with.lock().clone() {
            return Err(LaunchFailure(message));
        }
        self.launches.lock().push((entry.id.clone(), context));
        for pid in self.child_pids.lock().iter() {
            on_child(*pid);
        }
        Ok(())
    }
}

/// A tracker predicate with a per-window uninteresting override, recording
/// process associations.
#[derive(Clone, Default)]
pub struct FakeTracker {
    uninteresting: Arc<Mutex<HashSet<WindowId>>>,
    associated: Arc<Mutex<Vec<(i32, String)>>>,
}

impl FakeTracker {
    /// A tracker that finds every window interesting.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a window uninteresting regardless of its hints.
    pub fn set_uninteresting(&self, id: WindowId) {
        self.uninteresting.lock().insert(id);
    }

    /// Recorded `(pid, app id)` associations.
    #[must_use]
    pub fn associations(&self) -> Vec<(i32, String)> {
        self.associated.lock().clone()
    }
}

impl WindowTracker for FakeTracker {
    fn is_window_interesting(&self, window: &Arc<dyn ShellWindow>) -> bool {
        !self.uninteresting.lock().contains(&window.id())
    }

    fn associate_process(&self, pid: i32, app: &Arc<App>) {
        self.associated.lock().push((pid, app.id()));
    }
}

/// A usage recorder that logs events as `start:<token>:<id>` and
/// `stop:<token>` strings.
#[derive(Clone, Default)]
pub struct FakeUsage {
    events: Arc<Mutex<Vec<String>>>,
}

impl FakeUsage {
    /// An empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events in order.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl UsageRecorder for FakeUsage {
    fn record_start(&self, app_token: &str, entry_id: &str) {
        self.events.lock().push(format!("start:{app_token}:{entry_id}"));
    }

    fn record_stop(&self, app_token: &str) {
        self.events.lock().push(format!("stop:{app_token}"));
    }
}

/// A registry wired to fakes, with the fakes kept accessible for driving
/// and asserting.
pub struct TestShell {
    /// The registry under test.
    pub registry: Arc<AppRegistry>,
    /// Application database fake.
    pub directory: FakeDirectory,
    /// Display fake.
    pub display: FakeDisplay,
    /// Session-bus fake; proxy requests park until completed.
    pub session: FakeSession,
    /// Launcher fake.
    pub launcher: FakeLauncher,
    /// Tracker fake.
    pub tracker: FakeTracker,
    /// Usage recorder fake.
    pub usage: FakeUsage,
}

impl Default for TestShell {
    fn default() -> Self {
        Self::new()
    }
}

impl TestShell {
    /// Assemble a registry over fresh fakes.
    #[must_use]
    pub fn new() -> Self {
        let directory = FakeDirectory::new();
        let display = FakeDisplay::new();
        let session = FakeSession::new();
        let launcher = FakeLauncher::new();
        let tracker = FakeTracker::new();
        let usage = FakeUsage::new();
        let registry = AppRegistry::new(Services {
            directory: Arc::new(directory.clone()),
            display: Arc::new(display.clone()),
            session: Arc::new(session.clone()),
            launcher: Arc::new(launcher.clone()),
            tracker: Arc::new(tracker.clone()),
            usage: Some(Arc::new(usage.clone())),
        });
        Self {
            registry,
            directory,
            display,
            session,
            launcher,
            tracker,
            usage,
        }
    }

    /// Seed a descriptor and return its cached entity.
    #[must_use]
    pub fn installed_app(&self, id: &str, name: &str) -> Arc<App> {
        self.directory.seed(entry(id, name));
        self.registry
            .lookup_app(id)
            .expect("seeded descriptor must resolve")
    }
}
