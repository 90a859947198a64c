//! The application entity: one instance per logical application, wrapping an
//! optional installed descriptor with running state, window membership and
//! remote menu/busy handles.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;
use shell_wm::{
    BusyObserver, RemoteActionGroup, RemoteMenuModel, ShellWindow, WindowId, WindowObserver,
    WindowType, WorkspaceObserver,
};
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::{
    compare::cmp_windows,
    error::{Error, Result},
    events::AppEvent,
    registry::AppRegistry,
    running::{RunningInner, RunningState},
    services::{DesktopEntry, LaunchContext, Services},
};

/// Per-app event channel capacity; subscribers are expected to keep up.
const APP_EVENT_CAPACITY: usize = 32;

/// Role marker for splash/announcement windows, which never count toward
/// taskbar presence.
const SPLASH_ROLE: &str = "startup-splash";

/// High-level lifecycle state of an application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppState {
    /// No windows and no launch in progress.
    Stopped,
    /// A launch or startup-notification sequence is in progress.
    Starting,
    /// At least one interesting window is open.
    Running,
}

/// A startup-notification sequence event, as reported by the launch
/// feedback machinery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StartupSequence {
    /// Whether the sequence has completed.
    pub completed: bool,
    /// Timestamp the sequence was initiated with.
    pub timestamp: u32,
    /// Workspace the launch was directed at, if any.
    pub workspace: Option<u32>,
}

struct AppInner {
    state: AppState,
    started_on_workspace: Option<u32>,
    entry: Option<Arc<DesktopEntry>>,
    collation_key: String,
    /// Synthesized identity for window-backed applications.
    window_id_string: Option<String>,
    running: Option<Arc<RunningState>>,
}

/// The shell's representation of one running or launchable application.
///
/// Descriptor-backed entities are created by [`AppRegistry`] lookups;
/// window-backed entities (no descriptor, representing a single orphan
/// window) come from [`AppRegistry::app_for_window`]. Entities are shared as
/// `Arc<App>` and mutated only from the shell's event thread.
pub struct App {
    instance: u64,
    token: String,
    services: Services,
    registry: Weak<AppRegistry>,
    /// Self-handle for observer adapters and spawned tasks.
    weak: Weak<Self>,
    events: broadcast::Sender<AppEvent>,
    inner: Mutex<AppInner>,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Case-folded collation key for bytewise display-name ordering.
fn collation_key_for(name: &str) -> String {
    name.to_lowercase()
}

/// The transition the state machine wants after an interesting-window count
/// change, or `None` to stay put. The Stopped leg is guarded so a Starting
/// application is not knocked back by its windows coming and going.
fn sync_decision(current: AppState, interesting: u32) -> Option<AppState> {
    if interesting == 0 {
        (current != AppState::Starting).then_some(AppState::Stopped)
    } else {
        Some(AppState::Running)
    }
}

impl App {
    pub(crate) fn new_with_entry(
        registry: Weak<AppRegistry>,
        services: Services,
        instance: u64,
        entry: Arc<DesktopEntry>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(APP_EVENT_CAPACITY);
        Arc::new_cyclic(|weak| Self {
            instance,
            token: format!("app-{instance}"),
            services,
            registry,
            weak: weak.clone(),
            events,
            inner: Mutex::new(AppInner {
                state: AppState::Stopped,
                started_on_workspace: None,
                collation_key: collation_key_for(&entry.name),
                entry: Some(entry),
                window_id_string: None,
                running: None,
            }),
        })
    }

    pub(crate) fn new_for_window(
        registry: Weak<AppRegistry>,
        services: Services,
        instance: u64,
        window: &Arc<dyn ShellWindow>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(APP_EVENT_CAPACITY);
        let name = window.wm_class().unwrap_or_else(|| "Unknown".to_string());
        let app = Arc::new_cyclic(|weak| Self {
            instance,
            token: format!("app-{instance}"),
            services,
            registry,
            weak: weak.clone(),
            events,
            inner: Mutex::new(AppInner {
                state: AppState::Stopped,
                started_on_workspace: None,
                collation_key: collation_key_for(&name),
                entry: None,
                window_id_string: Some(format!("window:{}", window.id().seq())),
                running: None,
            }),
        });
        app.add_window(window);
        app
    }

    fn id_from(inner: &AppInner) -> String {
        inner
            .entry
            .as_ref()
            .map(|e| e.id.clone())
            .or_else(|| inner.window_id_string.clone())
            .unwrap_or_default()
    }

    /// Identifier of this application: the descriptor id, or a synthesized
    /// `window:<seq>` string for window-backed entities.
    #[must_use]
    pub fn id(&self) -> String {
        Self::id_from(&self.inner.lock())
    }

    /// Display name: the descriptor name, or the first window's WM_CLASS for
    /// window-backed entities.
    #[must_use]
    pub fn name(&self) -> String {
        let inner = self.inner.lock();
        if let Some(entry) = &inner.entry {
            return entry.name.clone();
        }
        inner
            .running
            .as_ref()
            .and_then(|r| r.inner.lock().windows.first().cloned())
            .and_then(|w| w.wm_class())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Longer description from the descriptor, if any.
    #[must_use]
    pub fn description(&self) -> Option<String> {
        self.inner
            .lock()
            .entry
            .as_ref()
            .and_then(|e| e.description.clone())
    }

    /// The backing descriptor, or `None` for window-backed entities.
    #[must_use]
    pub fn entry(&self) -> Option<Arc<DesktopEntry>> {
        self.inner.lock().entry.clone()
    }

    /// Whether this entity represents just an open window, with no
    /// descriptor association (so it cannot be launched again).
    #[must_use]
    pub fn is_window_backed(&self) -> bool {
        self.inner.lock().entry.is_none()
    }

    /// Associate a descriptor with a (typically window-backed) entity. Id
    /// resolution switches to the descriptor id and the name collation key
    /// is recomputed.
    pub fn set_entry(&self, entry: Arc<DesktopEntry>) {
        let mut inner = self.inner.lock();
        inner.collation_key = collation_key_for(&entry.name);
        inner.entry = Some(entry);
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> AppState {
        self.inner.lock().state
    }

    /// Workspace index captured when the entity entered Starting, if any.
    #[must_use]
    pub fn started_on_workspace(&self) -> Option<u32> {
        self.inner.lock().started_on_workspace
    }

    /// Whether the remote application reports itself busy. False whenever no
    /// busy-watch proxy is established.
    #[must_use]
    pub fn busy(&self) -> bool {
        let inner = self.inner.lock();
        inner.running.as_ref().is_some_and(|r| {
            r.inner
                .lock()
                .application_proxy
                .as_ref()
                .is_some_and(|p| p.is_busy())
        })
    }

    /// The remote menu model exported by the application, if resolved.
    #[must_use]
    pub fn menu(&self) -> Option<Arc<dyn RemoteMenuModel>> {
        let inner = self.inner.lock();
        inner
            .running
            .as_ref()
            .and_then(|r| r.inner.lock().remote_menu.clone())
    }

    /// A remote action group by muxer prefix (`"app"` or `"win"`).
    #[must_use]
    pub fn action_group(&self, prefix: &str) -> Option<Arc<dyn RemoteActionGroup>> {
        let inner = self.inner.lock();
        inner
            .running
            .as_ref()
            .and_then(|r| r.inner.lock().muxer.get(prefix))
    }

    /// Subscribe to this entity's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }

    pub(crate) fn instance(&self) -> u64 {
        self.instance
    }

    pub(crate) fn usage_token(&self) -> &str {
        &self.token
    }

    pub(crate) fn collation_key(&self) -> String {
        self.inner.lock().collation_key.clone()
    }

    /// Number of associated windows.
    #[must_use]
    pub fn n_windows(&self) -> usize {
        let inner = self.inner.lock();
        inner
            .running
            .as_ref()
            .map_or(0, |r| r.inner.lock().windows.len())
    }

    /// The windows associated with this application, sorted by workspace
    /// (active first), visibility, then most recent user interaction. The
    /// sort is memoized and recomputed only when stale.
    #[must_use]
    pub fn windows(&self) -> Vec<Arc<dyn ShellWindow>> {
        let inner = self.inner.lock();
        let Some(running) = &inner.running else {
            return Vec::new();
        };
        let mut rs = running.inner.lock();
        if rs.sort_stale {
            let active = self.services.display.active_workspace();
            rs.windows
                .sort_by(|a, b| cmp_windows(active, a, b));
            rs.sort_stale = false;
        }
        rs.windows.clone()
    }

    /// Deduplicated process ids owning this application's windows.
    #[must_use]
    pub fn pids(&self) -> Vec<i32> {
        let mut result = Vec::new();
        for window in self.windows() {
            let pid = window.pid();
            if !result.contains(&pid) {
                result.push(pid);
            }
        }
        result
    }

    /// Maximum user-interaction timestamp across the window set, 0 if none.
    pub(crate) fn last_user_time(&self) -> u32 {
        let inner = self.inner.lock();
        inner.running.as_ref().map_or(0, |r| {
            r.inner
                .lock()
                .windows
                .iter()
                .map(|w| w.user_time())
                .max()
                .unwrap_or(0)
        })
    }

    /// Whether the application is present on `workspace`: a Starting entity
    /// matches its captured launch workspace (or every workspace when
    /// unset), otherwise any associated window on `workspace` counts.
    #[must_use]
    pub fn is_on_workspace(&self, workspace: u32) -> bool {
        let inner = self.inner.lock();
        if inner.state == AppState::Starting {
            return inner.started_on_workspace.is_none_or(|ws| ws == workspace);
        }
        let Some(running) = &inner.running else {
            return false;
        };
        running
            .inner
            .lock()
            .windows
            .iter()
            .any(|w| w.workspace() == Some(workspace))
    }

    fn is_interesting_window(&self, window: &Arc<dyn ShellWindow>) -> bool {
        if window.is_skip_taskbar() {
            return false;
        }
        if window.role().as_deref() == Some(SPLASH_ROLE) {
            return false;
        }
        self.services.tracker.is_window_interesting(window)
    }

    fn create_running_state(&self) -> Arc<RunningState> {
        let watch = Arc::new(WorkspaceWatch {
            app: self.weak.clone(),
        });
        let sub = self.services.display.observe_workspace_switches(watch);
        RunningState::new(self.services.session.clone(), sub)
    }

    /// Associate a window with this application.
    ///
    /// Lazily creates the running sub-state, subscribes to the window's
    /// notifications, resolves remote menu/action handles, kicks the busy
    /// watch and re-evaluates the state machine. No-op if the window is
    /// already present.
    pub fn add_window(&self, window: &Arc<dyn ShellWindow>) {
        let id = window.id();
        let (running, next) = {
            let mut inner = self.inner.lock();
            if let Some(running) = &inner.running {
                if running.inner.lock().windows.iter().any(|w| w.id() == id) {
                    return;
                }
            }
            let running = match inner.running.clone() {
                Some(r) => r,
                None => {
                    let r = self.create_running_state();
                    inner.running = Some(r.clone());
                    r
                }
            };
            let next = {
                let mut rs = running.inner.lock();
                rs.sort_stale = true;
                rs.windows.insert(0, window.clone());
                let watch = Arc::new(WindowWatch {
                    app: self.weak.clone(),
                });
                rs.window_subs.insert(id, window.observe(watch));
                Self::update_app_menu_locked(&running, &mut rs, window);
                if self.is_interesting_window(window) {
                    rs.interesting_windows += 1;
                }
                sync_decision(inner.state, rs.interesting_windows)
            };
            (running, next)
        };
        trace!(app = %self.id(), window = window.id().seq(), "window added");
        self.ensure_busy_watch(&running);
        if let Some(next) = next {
            self.transition(next);
        }
        let _ = self.events.send(AppEvent::WindowsChanged);
    }

    /// Dissociate a window from this application.
    ///
    /// Drops the window's notification subscriptions, releases the running
    /// sub-state when the set becomes empty (cancelling any in-flight
    /// busy-watch request) and re-evaluates the state machine. No-op if the
    /// window is not present.
    pub fn remove_window(&self, window: &Arc<dyn ShellWindow>) {
        self.remove_window_by_id(window.id());
    }

    fn remove_window_by_id(&self, id: WindowId) {
        let next = {
            let mut inner = self.inner.lock();
            let running = inner
                .running
                .clone()
                .expect("window removal requires running sub-state");
            let now_empty = {
                let mut rs = running.inner.lock();
                let Some(pos) = rs.windows.iter().position(|w| w.id() == id) else {
                    return;
                };
                let window = rs.windows.remove(pos);
                rs.window_subs.remove(&id);
                rs.sort_stale = true;
                if self.is_interesting_window(&window) {
                    rs.interesting_windows = rs.interesting_windows.saturating_sub(1);
                }
                rs.windows.is_empty()
            };
            let interesting = running.inner.lock().interesting_windows;
            if now_empty {
                // Releases our reference; teardown runs when the last owner
                // (possibly an in-flight busy-watch task) lets go.
                inner.running = None;
            }
            if inner.state == AppState::Starting {
                None
            } else if now_empty {
                Some(AppState::Stopped)
            } else {
                sync_decision(inner.state, interesting)
            }
        };
        trace!(app = %self.id(), window = id.seq(), "window removed");
        if let Some(next) = next {
            self.transition(next);
        }
        let _ = self.events.send(AppEvent::WindowsChanged);
    }

    /// Resolve the per-window remote action group and expose it under the
    /// `win` muxer prefix.
    pub fn update_window_actions(&self, window: &Arc<dyn ShellWindow>) {
        let Some(path) = window.gtk_window_object_path() else {
            return;
        };
        let Some(bus) = window.gtk_unique_bus_name() else {
            return;
        };
        let running = {
            let inner = self.inner.lock();
            let Some(running) = inner.running.clone() else {
                return;
            };
            running
        };
        let actions = running.session.action_group(&bus, &path);
        running.inner.lock().muxer.insert("win", actions);
    }

    /// The object paths are assumed identical across the app's windows; the
    /// first window that carries them wins, and the handles are only
    /// replaced when a window shows up under a different bus name.
    fn update_app_menu_locked(
        running: &Arc<RunningState>,
        rs: &mut RunningInner,
        window: &Arc<dyn ShellWindow>,
    ) {
        let bus_name = window.gtk_unique_bus_name();
        if rs.remote_menu.is_some() && rs.unique_bus_name == bus_name {
            return;
        }
        let (Some(bus), Some(app_path), Some(menu_path)) = (
            bus_name,
            window.gtk_application_object_path(),
            window.gtk_app_menu_object_path(),
        ) else {
            return;
        };
        rs.unique_bus_name = Some(bus.clone());
        rs.remote_menu = Some(running.session.menu_model(&bus, &menu_path));
        let actions = running.session.action_group(&bus, &app_path);
        rs.muxer.insert("app", actions);
    }

    /// Establish the busy-watch proxy if the bus identity is known and no
    /// proxy or request already exists. The spawned task holds the entity
    /// alive and re-checks sub-state liveness on completion.
    fn ensure_busy_watch(&self, running: &Arc<RunningState>) {
        let (bus, path) = {
            let mut rs = running.inner.lock();
            if rs.application_proxy.is_some() || rs.proxy_in_flight {
                return;
            }
            let Some(bus) = rs.unique_bus_name.clone() else {
                return;
            };
            let Some(path) = rs
                .windows
                .first()
                .and_then(|w| w.gtk_application_object_path())
            else {
                return;
            };
            rs.proxy_in_flight = true;
            (bus, path)
        };

        let Some(app) = self.weak.upgrade() else {
            return;
        };
        let cancel = running.cancel.child_token();
        let session = running.session.clone();
        let state = Arc::downgrade(running);
        tokio::spawn(async move {
            let result = session.application_proxy(&bus, &path, cancel).await;
            // The sub-state may have been torn down while the request was in
            // flight; never resurrect it.
            let Some(running) = state.upgrade() else {
                trace!(app = %app.id(), "busy-watch completion after teardown, ignoring");
                return;
            };
            let mut rs = running.inner.lock();
            rs.proxy_in_flight = false;
            match result {
                Ok(proxy) => {
                    let watch = Arc::new(BusyWatch {
                        app: app.weak.clone(),
                    });
                    rs.busy_sub = Some(proxy.observe_busy(watch));
                    let busy = proxy.is_busy();
                    rs.application_proxy = Some(proxy);
                    drop(rs);
                    if busy {
                        let _ = app.events.send(AppEvent::BusyChanged);
                    }
                }
                Err(err) => {
                    drop(rs);
                    // Degrade silently to "no busy state available".
                    debug!(app = %app.id(), "busy watch unavailable: {err}");
                }
            }
        });
    }

    fn transition(&self, next: AppState) {
        {
            let mut inner = self.inner.lock();
            if inner.state == next {
                return;
            }
            assert!(
                !(inner.state == AppState::Running && next == AppState::Starting),
                "application '{}': forbidden Running -> Starting transition",
                Self::id_from(&inner)
            );
            debug!(app = %Self::id_from(&inner), from = ?inner.state, to = ?next, "state transition");
            inner.state = next;
        }
        if let (Some(registry), Some(app)) = (self.registry.upgrade(), self.weak.upgrade()) {
            registry.record_state_change(&app, next);
        }
        let _ = self.events.send(AppEvent::StateChanged(next));
    }

    /// React to a startup-notification sequence event.
    ///
    /// A beginning sequence moves a Stopped entity to Starting, captures the
    /// launch workspace and focuses the no-focus window so nothing visually
    /// takes focus. A completed sequence settles the entity to Running or
    /// Stopped depending on window presence; an already-Running entity is
    /// left alone.
    pub fn handle_startup_sequence(&self, sequence: &StartupSequence) {
        let starting = !sequence.completed;

        if starting && self.state() == AppState::Stopped {
            self.transition(AppState::Starting);
            self.services
                .display
                .focus_no_focus_window(sequence.timestamp);
            self.inner.lock().started_on_workspace = sequence.workspace;
        }

        if !starting {
            let has_windows = {
                let inner = self.inner.lock();
                inner
                    .running
                    .as_ref()
                    .is_some_and(|r| !r.inner.lock().windows.is_empty())
            };
            if has_windows {
                self.transition(AppState::Running);
            } else {
                // Sequences can complete without a window, e.g. when an
                // application ships several descriptors.
                self.transition(AppState::Stopped);
            }
        }
    }

    /// Perform the default action for this application: launch it when
    /// Stopped, activate its most recent window when Running.
    pub fn activate(&self) -> Result<()> {
        self.activate_full(None, 0)
    }

    /// Like [`App::activate`], with an explicit target workspace (ignored
    /// when activating an existing window) and event timestamp (0 for the
    /// current time).
    pub fn activate_full(&self, workspace: Option<u32>, timestamp: u32) -> Result<()> {
        let time = if timestamp == 0 {
            self.services.display.current_time()
        } else {
            timestamp
        };
        match self.state() {
            AppState::Stopped => self.launch(time, workspace)?,
            AppState::Starting => {}
            AppState::Running => self.activate_window(None, time),
        }
        Ok(())
    }

    /// Bring all of this application's windows on the target's workspace to
    /// the foreground, with `window` (or the most recently used window) on
    /// top. No-op unless the application is Running; refuses windows that
    /// are not members of this entity.
    pub fn activate_window(&self, window: Option<&Arc<dyn ShellWindow>>, timestamp: u32) {
        if self.state() != AppState::Running {
            return;
        }
        let windows = self.windows();
        let Some(target) = window.cloned().or_else(|| windows.first().cloned()) else {
            return;
        };
        if !windows.iter().any(|w| w.id() == target.id()) {
            return;
        }

        let display = &self.services.display;
        // A zero timestamp would spuriously trip focus-stealing prevention;
        // fetch a real one instead.
        let time = if timestamp == 0 {
            display.current_time()
        } else {
            timestamp
        };
        if display.time_is_before(time, display.last_user_time()) {
            target.set_demands_attention();
            return;
        }

        let workspace = target.workspace();
        // Raise the app's other windows on the same workspace, in reverse
        // stacking order so their relative order is preserved.
        for other in windows.iter().rev() {
            if other.id() != target.id() && other.workspace() == workspace {
                other.raise();
            }
        }

        // If the user touched a transient (say, a file chooser) more
        // recently than the window itself, focus that instead.
        let mut target = target;
        if let Some(transient) = self.most_recent_transient(&target) {
            if display.time_is_before(target.user_time(), transient.user_time()) {
                target = transient;
            }
        }

        let active = display.active_workspace();
        match workspace {
            Some(ws) if ws != active => display.activate_workspace_with_focus(ws, &target, time),
            _ => target.activate(time),
        }
    }

    /// The topmost Normal/Dialog transient of `reference` on its workspace.
    fn most_recent_transient(
        &self,
        reference: &Arc<dyn ShellWindow>,
    ) -> Option<Arc<dyn ShellWindow>> {
        let workspace = reference.workspace();
        let transients: Vec<_> = reference
            .transients()
            .into_iter()
            .filter(|t| workspace.is_none() || t.workspace() == workspace)
            .collect();
        let stacked = self.services.display.sort_by_stacking(transients);
        // Top to bottom; skip utility palettes and the like.
        stacked
            .into_iter()
            .rev()
            .find(|t| matches!(t.window_type(), WindowType::Normal | WindowType::Dialog))
    }

    /// Launch the application via the OS primitive.
    ///
    /// For window-backed entities there is no process to spawn; the sole
    /// window is focused instead. A Stopped entity transitions to Starting
    /// before the primitive is invoked; on failure the caller is informed
    /// and decides whether to force the entity back.
    pub fn launch(&self, timestamp: u32, workspace: Option<u32>) -> Result<()> {
        let entry = self.inner.lock().entry.clone();
        let Some(entry) = entry else {
            let window = {
                let inner = self.inner.lock();
                inner
                    .running
                    .as_ref()
                    .and_then(|r| r.inner.lock().windows.first().cloned())
                    .expect("window-backed application has no window")
            };
            window.activate(timestamp);
            return Ok(());
        };

        if self.state() == AppState::Stopped {
            self.transition(AppState::Starting);
        }

        let display = &self.services.display;
        let time = if timestamp == 0 {
            display.current_time()
        } else {
            timestamp
        };
        let workspace = workspace.unwrap_or_else(|| display.active_workspace());

        debug!(app = %entry.id, workspace, "launching");
        let tracker = self.services.tracker.clone();
        let weak = self.weak.clone();
        self.services
            .launcher
            .launch(
                &entry,
                LaunchContext {
                    timestamp: time,
                    workspace,
                },
                Box::new(move |pid| {
                    if let Some(app) = weak.upgrade() {
                        tracker.associate_process(pid, &app);
                    }
                }),
            )
            .map_err(|err| {
                warn!(app = %entry.id, "launch failed: {err}");
                Error::Launch {
                    name: entry.name.clone(),
                    message: err.to_string(),
                }
            })
    }

    /// Request a new window by launching the application again; a second
    /// process or IPC to the existing instance, depending on the app.
    pub fn open_new_window(&self, workspace: Option<u32>) -> Result<()> {
        assert!(
            !self.is_window_backed(),
            "open_new_window requires a descriptor"
        );
        self.launch(0, workspace)
    }

    /// Ask the application to quit by deleting its interesting windows. The
    /// application may interact with the user and the user may cancel.
    /// Returns whether a quit request was issued.
    pub fn request_quit(&self) -> bool {
        if self.state() != AppState::Running {
            return false;
        }
        let time = self.services.display.current_time();
        for window in self.windows() {
            if !self.is_interesting_window(&window) {
                continue;
            }
            window.request_delete(time);
        }
        true
    }

    /// Drain the window set and verify the disposal post-conditions: the
    /// entity must settle to Stopped with no running sub-state.
    pub fn dispose(&self) {
        loop {
            let window = {
                let inner = self.inner.lock();
                let Some(running) = &inner.running else { break };
                running.inner.lock().windows.first().cloned()
            };
            match window {
                Some(w) => self.remove_window(&w),
                None => break,
            }
        }
        let inner = self.inner.lock();
        assert_eq!(
            inner.state,
            AppState::Stopped,
            "disposed application must settle to Stopped"
        );
        assert!(
            inner.running.is_none(),
            "disposed application must release its running sub-state"
        );
    }

    fn on_user_time_changed(&self, id: WindowId) {
        let emit = {
            let inner = self.inner.lock();
            let Some(running) = &inner.running else { return };
            let mut rs = running.inner.lock();
            // If the first window interacted again the order cannot change;
            // skip the resort and the notification.
            if rs.windows.first().map(|w| w.id()) == Some(id) {
                false
            } else {
                rs.sort_stale = true;
                true
            }
        };
        if emit {
            let _ = self.events.send(AppEvent::WindowsChanged);
        }
    }

    fn on_skip_taskbar_changed(&self, id: WindowId) {
        let next = {
            let inner = self.inner.lock();
            let Some(running) = &inner.running else { return };
            let mut rs = running.inner.lock();
            let Some(window) = rs.windows.iter().find(|w| w.id() == id).cloned() else {
                return;
            };
            // A window vetoed by role or by the tracker was never counted,
            // so its hint flipping must not touch the count.
            if window.role().as_deref() == Some(SPLASH_ROLE)
                || !self.services.tracker.is_window_interesting(&window)
            {
                return;
            }
            // Relies on the hint only being notified when it actually
            // changes.
            if window.is_skip_taskbar() {
                rs.interesting_windows = rs.interesting_windows.saturating_sub(1);
            } else {
                rs.interesting_windows += 1;
            }
            sync_decision(inner.state, rs.interesting_windows)
        };
        if let Some(next) = next {
            self.transition(next);
        }
    }

    fn on_workspace_switched(&self) {
        {
            let inner = self.inner.lock();
            let Some(running) = &inner.running else { return };
            running.inner.lock().sort_stale = true;
        }
        let _ = self.events.send(AppEvent::WindowsChanged);
    }
}

/// Per-window notification adapter owned by the running sub-state's
/// subscription table.
struct WindowWatch {
    app: Weak<App>,
}

impl WindowObserver for WindowWatch {
    fn unmanaged(&self, window: WindowId) {
        if let Some(app) = self.app.upgrade() {
            app.remove_window_by_id(window);
        }
    }

    fn user_time_changed(&self, window: WindowId) {
        if let Some(app) = self.app.upgrade() {
            app.on_user_time_changed(window);
        }
    }

    fn skip_taskbar_changed(&self, window: WindowId) {
        if let Some(app) = self.app.upgrade() {
            app.on_skip_taskbar_changed(window);
        }
    }
}

/// Workspace-switch adapter; dirties the window sort order.
struct WorkspaceWatch {
    app: Weak<App>,
}

impl WorkspaceObserver for WorkspaceWatch {
    fn workspace_switched(&self) {
        if let Some(app) = self.app.upgrade() {
            app.on_workspace_switched();
        }
    }
}

/// Busy-changed adapter for the application proxy.
struct BusyWatch {
    app: Weak<App>,
}

impl BusyObserver for BusyWatch {
    fn busy_changed(&self) {
        if let Some(app) = self.app.upgrade() {
            let _ = app.events.send(AppEvent::BusyChanged);
        }
    }
}

#[cfg(test)]
mod tests {
    use shell_wm::test_support::FakeWindow;

    use super::*;
    use crate::test_support::TestShell;

    #[test]
    fn sync_decision_guards_the_stopped_leg() {
        assert_eq!(sync_decision(AppState::Starting, 0), None);
        assert_eq!(
            sync_decision(AppState::Running, 0),
            Some(AppState::Stopped)
        );
        assert_eq!(
            sync_decision(AppState::Stopped, 0),
            Some(AppState::Stopped)
        );
    }

    #[test]
    fn sync_decision_runs_on_any_interesting_window() {
        assert_eq!(
            sync_decision(AppState::Starting, 1),
            Some(AppState::Running)
        );
        assert_eq!(
            sync_decision(AppState::Stopped, 2),
            Some(AppState::Running)
        );
    }

    #[test]
    fn collation_keys_fold_case() {
        assert_eq!(collation_key_for("GNU Image Editor"), "gnu image editor");
    }

    #[test]
    #[should_panic(expected = "forbidden Running -> Starting")]
    fn running_never_regresses_to_starting() {
        let shell = TestShell::new();
        let app = shell.installed_app("editor.desktop", "Editor");
        app.add_window(&FakeWindow::new(1).handle());
        assert_eq!(app.state(), AppState::Running);

        app.transition(AppState::Starting);
    }
}
