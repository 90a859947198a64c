//! The application registry: the id-to-entity cache, heuristic descriptor
//! lookups, and the running/starting sets.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Weak},
};

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use shell_wm::{ShellWindow, Subscription, WindowId};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::{
    app::{App, AppState},
    compare::cmp_apps,
    events::SystemEvent,
    services::{InstalledObserver, Services},
    wm_class::canonicalize_wm_class,
};

/// Registry event channel capacity.
const SYSTEM_EVENT_CAPACITY: usize = 64;

/// Distribution prefixes historically prepended to descriptor ids; tried in
/// order during heuristic lookup.
const VENDOR_PREFIXES: &[&str] = &["gnome-", "fedora-", "mozilla-", "debian-"];

struct RegistryInner {
    /// Entity cache; one entity per descriptor id for the registry's
    /// lifetime, evicted only when the descriptor is uninstalled.
    id_to_app: HashMap<String, Arc<App>>,
    /// Window-backed entities, keyed by the window they represent.
    window_backed: HashMap<WindowId, Arc<App>>,
    /// StartupWMClass hint to descriptor id, rebuilt on install changes.
    startup_wm_class_to_id: HashMap<String, String>,
    running: HashMap<u64, Arc<App>>,
    starting: HashMap<u64, Arc<App>>,
    next_instance: u64,
    _installed_sub: Option<Subscription>,
}

/// Owns every [`App`] entity and answers "which application is this"
/// questions for the rest of the shell.
pub struct AppRegistry {
    services: Services,
    /// Self-handle passed into the entities this registry creates.
    weak: Weak<Self>,
    events: broadcast::Sender<SystemEvent>,
    inner: Mutex<RegistryInner>,
}

impl AppRegistry {
    /// Build a registry over the given collaborators and register for
    /// install-change notifications.
    pub fn new(services: Services) -> Arc<Self> {
        let (events, _) = broadcast::channel(SYSTEM_EVENT_CAPACITY);
        let registry = Arc::new_cyclic(|weak| Self {
            services,
            weak: weak.clone(),
            events,
            inner: Mutex::new(RegistryInner {
                id_to_app: HashMap::new(),
                window_backed: HashMap::new(),
                startup_wm_class_to_id: HashMap::new(),
                running: HashMap::new(),
                starting: HashMap::new(),
                next_instance: 0,
                _installed_sub: None,
            }),
        });
        {
            let mut inner = registry.inner.lock();
            inner.startup_wm_class_to_id =
                Self::scan_startup_wm_classes(&registry.services);
        }
        let watch = Arc::new(InstalledWatch {
            registry: Arc::downgrade(&registry),
        });
        let sub = registry.services.directory.observe_installed(watch);
        registry.inner.lock()._installed_sub = Some(sub);
        registry
    }

    /// Subscribe to registry-level events.
    pub fn subscribe(&self) -> broadcast::Receiver<SystemEvent> {
        self.events.subscribe()
    }

    fn next_instance(&self) -> u64 {
        let mut inner = self.inner.lock();
        let n = inner.next_instance;
        inner.next_instance += 1;
        n
    }

    /// Look up an application by exact descriptor id.
    ///
    /// Returns the cached entity if one exists; otherwise resolves the id
    /// against the database and caches a new Stopped entity. `None` means
    /// the id is not installed, which is normal and common.
    pub fn lookup_app(&self, id: &str) -> Option<Arc<App>> {
        if let Some(app) = self.inner.lock().id_to_app.get(id) {
            return Some(app.clone());
        }
        let entry = self.services.directory.resolve(id)?;
        let app =
            App::new_with_entry(self.weak.clone(), self.services.clone(), self.next_instance(), entry);
        trace!(id, "cached new application entity");
        let app = self
            .inner
            .lock()
            .id_to_app
            .entry(id.to_string())
            .or_insert(app)
            .clone();
        Some(app)
    }

    /// Look up by descriptor basename, retrying with each known vendor
    /// prefix prepended.
    pub fn lookup_heuristic_basename(&self, name: &str) -> Option<Arc<App>> {
        if let Some(app) = self.lookup_app(name) {
            return Some(app);
        }
        VENDOR_PREFIXES
            .iter()
            .find_map(|prefix| self.lookup_app(&format!("{prefix}{name}")))
    }

    /// Look up the application whose descriptor file a WM_CLASS value names.
    ///
    /// The class is tried verbatim before canonicalization, which handles
    /// reverse-DNS ids like `org.example.Editor` directly.
    pub fn lookup_desktop_wmclass(&self, wm_class: Option<&str>) -> Option<Arc<App>> {
        let wm_class = wm_class?;
        if let Some(app) = self.lookup_heuristic_basename(&format!("{wm_class}.desktop")) {
            return Some(app);
        }
        let canonical = canonicalize_wm_class(wm_class);
        self.lookup_heuristic_basename(&format!("{canonical}.desktop"))
    }

    /// Look up the application whose descriptor declares `wm_class` as its
    /// startup class hint. The hint is matched verbatim.
    pub fn lookup_startup_wmclass(&self, wm_class: Option<&str>) -> Option<Arc<App>> {
        let wm_class = wm_class?;
        let id = self
            .inner
            .lock()
            .startup_wm_class_to_id
            .get(wm_class)
            .cloned()?;
        self.lookup_app(&id)
    }

    /// Resolve the application for `window`, falling back to a window-backed
    /// entity when no descriptor matches.
    ///
    /// Resolution order: startup class hint, then canonicalized WM_CLASS.
    /// Window-backed entities are cached per window; creating one associates
    /// the window with it.
    pub fn app_for_window(&self, window: &Arc<dyn ShellWindow>) -> Arc<App> {
        let wm_class = window.wm_class();
        if let Some(app) = self.lookup_startup_wmclass(wm_class.as_deref()) {
            return app;
        }
        if let Some(app) = self.lookup_desktop_wmclass(wm_class.as_deref()) {
            return app;
        }

        if let Some(app) = self.inner.lock().window_backed.get(&window.id()) {
            return app.clone();
        }
        debug!(window = window.id().seq(), ?wm_class, "no descriptor match, creating window-backed entity");
        let app =
            App::new_for_window(self.weak.clone(), self.services.clone(), self.next_instance(), window);
        self.inner
            .lock()
            .window_backed
            .entry(window.id())
            .or_insert(app)
            .clone()
    }

    /// Applications currently Running, most relevant first.
    pub fn get_running(&self) -> Vec<Arc<App>> {
        let mut apps: Vec<_> = self.inner.lock().running.values().cloned().collect();
        apps.sort_by(cmp_apps);
        apps
    }

    /// Applications currently Starting, most relevant first.
    pub fn get_starting(&self) -> Vec<Arc<App>> {
        let mut apps: Vec<_> = self.inner.lock().starting.values().cloned().collect();
        apps.sort_by(cmp_apps);
        apps
    }

    /// Maintain the running/starting sets and usage accounting for a state
    /// transition. Called by the entity after its own state is updated, with
    /// no entity lock held.
    pub(crate) fn record_state_change(&self, app: &Arc<App>, state: AppState) {
        let instance = app.instance();
        let window_backed = app.is_window_backed();
        let was_running = {
            let mut inner = self.inner.lock();
            let was_running = inner.running.contains_key(&instance);
            match state {
                AppState::Running => {
                    inner.starting.remove(&instance);
                    inner.running.insert(instance, app.clone());
                }
                AppState::Starting => {
                    inner.starting.insert(instance, app.clone());
                }
                AppState::Stopped => {
                    inner.running.remove(&instance);
                    inner.starting.remove(&instance);
                    if window_backed {
                        // The entity is gone for good; drop its cache slot.
                        inner.window_backed.retain(|_, a| a.instance() != instance);
                    }
                }
            }
            was_running
        };

        // Usage accounting covers identified applications only.
        if let Some(usage) = &self.services.usage {
            if !window_backed {
                match state {
                    AppState::Running if !was_running => {
                        usage.record_start(app.usage_token(), &app.id());
                    }
                    AppState::Stopped if was_running => usage.record_stop(app.usage_token()),
                    _ => {}
                }
            }
        }

        let _ = self.events.send(SystemEvent::AppStateChanged(app.clone()));
    }

    fn scan_startup_wm_classes(services: &Services) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for entry in services.directory.entries() {
            let Some(class) = &entry.startup_wm_class else {
                continue;
            };
            // When several descriptors claim the same class, the one whose
            // id equals the class wins.
            if !map.contains_key(class) || entry.id == *class {
                map.insert(class.clone(), entry.id.clone());
            }
        }
        map
    }

    /// Re-sync cached entities with the application database after an
    /// install change: refresh descriptors in place, evict entities whose
    /// descriptor disappeared (window-backed entities are exempt) and
    /// rebuild the startup-class index.
    pub fn reconcile_installed(&self) {
        let index = Self::scan_startup_wm_classes(&self.services);
        let directory = self.services.directory.clone();
        {
            let mut inner = self.inner.lock();
            inner.startup_wm_class_to_id = index;
            inner.id_to_app.retain(|id, app| {
                if app.is_window_backed() {
                    return true;
                }
                match directory.resolve(id) {
                    Some(entry) => {
                        if app.entry().as_deref() != Some(&*entry) {
                            app.set_entry(entry);
                        }
                        true
                    }
                    None => {
                        debug!(%id, "evicting uninstalled application");
                        false
                    }
                }
            });
        }
        let _ = self.events.send(SystemEvent::InstalledChanged);
    }
}

impl fmt::Debug for AppRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("AppRegistry")
            .field("cached", &inner.id_to_app.len())
            .field("running", &inner.running.len())
            .field("starting", &inner.starting.len())
            .finish_non_exhaustive()
    }
}

/// Install-change adapter; reconciles and re-emits.
struct InstalledWatch {
    registry: Weak<AppRegistry>,
}

impl InstalledObserver for InstalledWatch {
    fn installed_changed(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.reconcile_installed();
        }
    }
}

static GLOBAL: Lazy<RwLock<Option<Arc<AppRegistry>>>> = Lazy::new(|| RwLock::new(None));

/// Install the process-wide registry. Panics if one is already installed.
pub fn install_global(registry: Arc<AppRegistry>) {
    let mut slot = GLOBAL.write();
    assert!(slot.is_none(), "global application registry already installed");
    *slot = Some(registry);
}

/// The process-wide registry, if installed.
#[must_use]
pub fn global() -> Option<Arc<AppRegistry>> {
    GLOBAL.read().clone()
}

/// Clear the process-wide registry.
pub fn reset_global() {
    GLOBAL.write().take();
}
