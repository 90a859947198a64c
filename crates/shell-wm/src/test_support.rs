//! Fake window-manager collaborators for tests of the application core.
//!
//! These mirror the contract traits with settable state, recorded commands
//! and observer fan-out, so lifecycle tests can drive window events without a
//! compositor. Everything here is deterministic and in-process.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::{
    ApplicationProxy, BusError, BusSession, BusyObserver, Display, RemoteActionGroup,
    RemoteMenuModel, ShellWindow, Subscription, WindowId, WindowObserver, WindowType,
    WorkspaceObserver,
};

/// Observer table keyed by a registration id, shared by all the fakes.
struct Observers<T: ?Sized> {
    next: AtomicU64,
    map: Arc<Mutex<HashMap<u64, Arc<T>>>>,
}

impl<T: ?Sized> Default for Observers<T> {
    fn default() -> Self {
        Self {
            next: AtomicU64::new(0),
            map: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> Observers<T> {
    fn insert(&self, observer: Arc<T>) -> Subscription {
        let key = self.next.fetch_add(1, Ordering::SeqCst);
        self.map.lock().insert(key, observer);
        let map = Arc::clone(&self.map);
        Subscription::new(move || {
            map.lock().remove(&key);
        })
    }

    fn snapshot(&self) -> Vec<Arc<T>> {
        self.map.lock().values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.map.lock().len()
    }
}

#[derive(Clone)]
struct WindowState {
    wm_class: Option<String>,
    pid: i32,
    workspace: Option<u32>,
    window_type: WindowType,
    role: Option<String>,
    skip_taskbar: bool,
    showing: bool,
    user_time: u32,
    bus_name: Option<String>,
    app_object_path: Option<String>,
    app_menu_object_path: Option<String>,
    window_object_path: Option<String>,
}

/// A settable in-memory window implementing [`ShellWindow`].
///
/// Clones share state; hand [`FakeWindow::handle`] to the core and keep the
/// fake around to mutate it and fire notifications.
#[derive(Clone)]
pub struct FakeWindow {
    id: WindowId,
    state: Arc<Mutex<WindowState>>,
    transients: Arc<Mutex<Vec<Arc<dyn ShellWindow>>>>,
    observers: Arc<Observers<dyn WindowObserver>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeWindow {
    /// Create a normal, visible window on workspace 0 with the given stable
    /// sequence number.
    #[must_use]
    pub fn new(seq: u64) -> Self {
        Self {
            id: WindowId::new(seq),
            state: Arc::new(Mutex::new(WindowState {
                wm_class: None,
                pid: 1000,
                workspace: Some(0),
                window_type: WindowType::Normal,
                role: None,
                skip_taskbar: false,
                showing: true,
                user_time: 0,
                bus_name: None,
                app_object_path: None,
                app_menu_object_path: None,
                window_object_path: None,
            })),
            transients: Arc::new(Mutex::new(Vec::new())),
            observers: Arc::new(Observers::default()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The window as the trait object the core consumes.
    #[must_use]
    pub fn handle(&self) -> Arc<dyn ShellWindow> {
        Arc::new(self.clone())
    }

    /// Builder: set the WM_CLASS.
    #[must_use]
    pub fn with_wm_class(self, class: &str) -> Self {
        self.state.lock().wm_class = Some(class.to_string());
        self
    }

    /// Builder: set the owning pid.
    #[must_use]
    pub fn with_pid(self, pid: i32) -> Self {
        self.state.lock().pid = pid;
        self
    }

    /// Builder: set the workspace (or `None` for sticky windows).
    #[must_use]
    pub fn with_workspace(self, workspace: Option<u32>) -> Self {
        self.state.lock().workspace = workspace;
        self
    }

    /// Builder: set the window type.
    #[must_use]
    pub fn with_window_type(self, ty: WindowType) -> Self {
        self.state.lock().window_type = ty;
        self
    }

    /// Builder: set the window role.
    #[must_use]
    pub fn with_role(self, role: &str) -> Self {
        self.state.lock().role = Some(role.to_string());
        self
    }

    /// Builder: set the skip-taskbar hint without notifying.
    #[must_use]
    pub fn with_skip_taskbar(self, skip: bool) -> Self {
        self.state.lock().skip_taskbar = skip;
        self
    }

    /// Builder: set visibility on the window's own workspace.
    #[must_use]
    pub fn with_showing(self, showing: bool) -> Self {
        self.state.lock().showing = showing;
        self
    }

    /// Builder: set the user-interaction timestamp without notifying.
    #[must_use]
    pub fn with_user_time(self, time: u32) -> Self {
        self.state.lock().user_time = time;
        self
    }

    /// Builder: set the GTK bus identity and object paths.
    #[must_use]
    pub fn with_gtk_hints(self, bus_name: &str, app_path: &str, menu_path: &str) -> Self {
        {
            let mut st = self.state.lock();
            st.bus_name = Some(bus_name.to_string());
            st.app_object_path = Some(app_path.to_string());
            st.app_menu_object_path = Some(menu_path.to_string());
        }
        self
    }

    /// Builder: set the per-window object path.
    #[must_use]
    pub fn with_window_object_path(self, path: &str) -> Self {
        self.state.lock().window_object_path = Some(path.to_string());
        self
    }

    /// Attach a transient window.
    pub fn add_transient(&self, transient: &Self) {
        self.transients.lock().push(transient.handle());
    }

    /// Move the window to another workspace. Does not notify; the core
    /// re-reads workspaces on demand.
    pub fn set_workspace(&self, workspace: Option<u32>) {
        self.state.lock().workspace = workspace;
    }

    /// Change the user-interaction timestamp and notify observers.
    pub fn set_user_time(&self, time: u32) {
        self.state.lock().user_time = time;
        for obs in self.observers.snapshot() {
            obs.user_time_changed(self.id);
        }
    }

    /// Toggle the skip-taskbar hint and notify observers.
    pub fn set_skip_taskbar(&self, skip: bool) {
        self.state.lock().skip_taskbar = skip;
        for obs in self.observers.snapshot() {
            obs.skip_taskbar_changed(self.id);
        }
    }

    /// Unmanage the window, notifying observers.
    pub fn unmanage(&self) {
        for obs in self.observers.snapshot() {
            obs.unmanaged(self.id);
        }
    }

    /// Number of live observer registrations, for leak checks.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Whether a command was recorded, e.g. `"raise"` or `"activate@5"`.
    #[must_use]
    pub fn calls_contain(&self, call: &str) -> bool {
        self.calls.lock().iter().any(|c| c == call)
    }

    /// All recorded commands in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn note(&self, call: String) {
        self.calls.lock().push(call);
    }
}

impl ShellWindow for FakeWindow {
    fn id(&self) -> WindowId {
        self.id
    }
    fn wm_class(&self) -> Option<String> {
        self.state.lock().wm_class.clone()
    }
    fn pid(&self) -> i32 {
        self.state.lock().pid
    }
    fn workspace(&self) -> Option<u32> {
        self.state.lock().workspace
    }
    fn window_type(&self) -> WindowType {
        self.state.lock().window_type
    }
    fn role(&self) -> Option<String> {
        self.state.lock().role.clone()
    }
    fn is_skip_taskbar(&self) -> bool {
        self.state.lock().skip_taskbar
    }
    fn showing_on_its_workspace(&self) -> bool {
        self.state.lock().showing
    }
    fn user_time(&self) -> u32 {
        self.state.lock().user_time
    }
    fn gtk_unique_bus_name(&self) -> Option<String> {
        self.state.lock().bus_name.clone()
    }
    fn gtk_application_object_path(&self) -> Option<String> {
        self.state.lock().app_object_path.clone()
    }
    fn gtk_app_menu_object_path(&self) -> Option<String> {
        self.state.lock().app_menu_object_path.clone()
    }
    fn gtk_window_object_path(&self) -> Option<String> {
        self.state.lock().window_object_path.clone()
    }
    fn transients(&self) -> Vec<Arc<dyn ShellWindow>> {
        self.transients.lock().clone()
    }
    fn raise(&self) {
        self.note("raise".to_string());
    }
    fn activate(&self, time: u32) {
        self.note(format!("activate@{time}"));
    }
    fn set_demands_attention(&self) {
        self.note("demands_attention".to_string());
    }
    fn request_delete(&self, time: u32) {
        self.note(format!("delete@{time}"));
    }
    fn observe(&self, observer: Arc<dyn WindowObserver>) -> Subscription {
        self.observers.insert(observer)
    }
}

#[derive(Clone)]
struct DisplayState {
    current_time: u32,
    last_user_time: u32,
    active_workspace: u32,
    stacking: Vec<WindowId>,
}

/// A settable in-memory display implementing [`Display`].
#[derive(Clone)]
pub struct FakeDisplay {
    state: Arc<Mutex<DisplayState>>,
    observers: Arc<Observers<dyn WorkspaceObserver>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl Default for FakeDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDisplay {
    /// A display at time 0, workspace 0, empty stacking order.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DisplayState {
                current_time: 0,
                last_user_time: 0,
                active_workspace: 0,
                stacking: Vec::new(),
            })),
            observers: Arc::new(Observers::default()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the current event timestamp.
    pub fn set_current_time(&self, time: u32) {
        self.state.lock().current_time = time;
    }

    /// Set the last user-interaction timestamp.
    pub fn set_last_user_time(&self, time: u32) {
        self.state.lock().last_user_time = time;
    }

    /// Set the bottom-to-top stacking order used by
    /// [`Display::sort_by_stacking`].
    pub fn set_stacking(&self, order: Vec<WindowId>) {
        self.state.lock().stacking = order;
    }

    /// Switch the active workspace and notify workspace observers.
    pub fn switch_workspace(&self, workspace: u32) {
        self.state.lock().active_workspace = workspace;
        for obs in self.observers.snapshot() {
            obs.workspace_switched();
        }
    }

    /// Number of live workspace-switch registrations, for leak checks.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Whether a command was recorded.
    #[must_use]
    pub fn calls_contain(&self, call: &str) -> bool {
        self.calls.lock().iter().any(|c| c == call)
    }
}

impl Display for FakeDisplay {
    fn current_time(&self) -> u32 {
        self.state.lock().current_time
    }
    fn last_user_time(&self) -> u32 {
        self.state.lock().last_user_time
    }
    fn time_is_before(&self, a: u32, b: u32) -> bool {
        // Wraparound-aware: a precedes b when the forward distance is less
        // than half the timestamp space.
        a != b && b.wrapping_sub(a) < 0x8000_0000
    }
    fn active_workspace(&self) -> u32 {
        self.state.lock().active_workspace
    }
    fn activate_workspace_with_focus(
        &self,
        workspace: u32,
        window: &Arc<dyn ShellWindow>,
        time: u32,
    ) {
        self.calls.lock().push(format!(
            "activate_workspace@{workspace}:{}:{time}",
            window.id().seq()
        ));
        self.state.lock().active_workspace = workspace;
    }
    fn focus_no_focus_window(&self, time: u32) {
        self.calls.lock().push(format!("focus_no_focus_window@{time}"));
    }
    fn sort_by_stacking(&self, mut windows: Vec<Arc<dyn ShellWindow>>) -> Vec<Arc<dyn ShellWindow>> {
        let stacking = self.state.lock().stacking.clone();
        windows.sort_by_key(|w| {
            stacking
                .iter()
                .position(|id| *id == w.id())
                .unwrap_or(usize::MAX)
        });
        windows
    }
    fn observe_workspace_switches(&self, observer: Arc<dyn WorkspaceObserver>) -> Subscription {
        self.observers.insert(observer)
    }
}

/// A settable busy proxy implementing [`ApplicationProxy`].
#[derive(Clone)]
pub struct FakeProxy {
    busy: Arc<Mutex<bool>>,
    observers: Arc<Observers<dyn BusyObserver>>,
}

impl Default for FakeProxy {
    fn default() -> Self {
        Self::new(false)
    }
}

impl FakeProxy {
    /// Create a proxy with the given initial busy flag.
    #[must_use]
    pub fn new(busy: bool) -> Self {
        Self {
            busy: Arc::new(Mutex::new(busy)),
            observers: Arc::new(Observers::default()),
        }
    }

    /// Change the busy flag and notify observers.
    pub fn set_busy(&self, busy: bool) {
        *self.busy.lock() = busy;
        for obs in self.observers.snapshot() {
            obs.busy_changed();
        }
    }
}

impl ApplicationProxy for FakeProxy {
    fn is_busy(&self) -> bool {
        *self.busy.lock()
    }
    fn observe_busy(&self, observer: Arc<dyn BusyObserver>) -> Subscription {
        self.observers.insert(observer)
    }
}

/// Handle returned by [`FakeSession::menu_model`].
pub struct FakeMenuModel {
    /// Bus name the model was fetched from.
    pub bus_name: String,
    /// Object path the model was fetched from.
    pub object_path: String,
}

impl RemoteMenuModel for FakeMenuModel {}

/// Handle returned by [`FakeSession::action_group`].
pub struct FakeActionGroup {
    /// Bus name the group was fetched from.
    pub bus_name: String,
    /// Object path the group was fetched from.
    pub object_path: String,
}

impl RemoteActionGroup for FakeActionGroup {}

type ProxyResult = Result<Arc<dyn ApplicationProxy>, BusError>;

struct PendingProxy {
    bus_name: String,
    respond: oneshot::Sender<ProxyResult>,
}

/// An in-memory [`BusSession`].
///
/// By default `application_proxy` parks until the test resolves it with
/// [`FakeSession::complete_next`], which lets tests race completion against
/// sub-state teardown. Call [`FakeSession::set_immediate_proxy`] for the
/// uncontended path.
#[derive(Clone, Default)]
pub struct FakeSession {
    immediate: Arc<Mutex<Option<FakeProxy>>>,
    pending: Arc<Mutex<Vec<PendingProxy>>>,
    proxy_requests: Arc<Mutex<Vec<(String, String)>>>,
    menus: Arc<Mutex<Vec<(String, String)>>>,
    action_groups: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeSession {
    /// A session whose proxy requests park until completed by the test.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve all future proxy requests immediately with clones of `proxy`.
    pub fn set_immediate_proxy(&self, proxy: FakeProxy) {
        *self.immediate.lock() = Some(proxy);
    }

    /// Number of proxy requests currently parked.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Total proxy requests ever issued, with their bus names and paths.
    #[must_use]
    pub fn proxy_requests(&self) -> Vec<(String, String)> {
        self.proxy_requests.lock().clone()
    }

    /// All menu-model fetches, with their bus names and paths.
    #[must_use]
    pub fn menus(&self) -> Vec<(String, String)> {
        self.menus.lock().clone()
    }

    /// All action-group fetches, with their bus names and paths.
    #[must_use]
    pub fn action_groups(&self) -> Vec<(String, String)> {
        self.action_groups.lock().clone()
    }

    /// Resolve the oldest parked proxy request. Returns the bus name it was
    /// issued against, or `None` if nothing was parked.
    pub fn complete_next(&self, result: ProxyResult) -> Option<String> {
        let pending = {
            let mut g = self.pending.lock();
            if g.is_empty() { None } else { Some(g.remove(0)) }
        }?;
        let bus_name = pending.bus_name.clone();
        let _ = pending.respond.send(result);
        Some(bus_name)
    }
}

#[async_trait]
impl BusSession for FakeSession {
    fn menu_model(&self, bus_name: &str, object_path: &str) -> Arc<dyn RemoteMenuModel> {
        self.menus
            .lock()
            .push((bus_name.to_string(), object_path.to_string()));
        Arc::new(FakeMenuModel {
            bus_name: bus_name.to_string(),
            object_path: object_path.to_string(),
        })
    }

    fn action_group(&self, bus_name: &str, object_path: &str) -> Arc<dyn RemoteActionGroup> {
        self.action_groups
            .lock()
            .push((bus_name.to_string(), object_path.to_string()));
        Arc::new(FakeActionGroup {
            bus_name: bus_name.to_string(),
            object_path: object_path.to_string(),
        })
    }

    async fn application_proxy(
        &self,
        bus_name: &str,
        object_path: &str,
        cancel: CancellationToken,
    ) -> ProxyResult {
        self.proxy_requests
            .lock()
            .push((bus_name.to_string(), object_path.to_string()));

        if let Some(proxy) = self.immediate.lock().clone() {
            return Ok(Arc::new(proxy));
        }

        let (tx, rx) = oneshot::channel();
        self.pending.lock().push(PendingProxy {
            bus_name: bus_name.to_string(),
            respond: tx,
        });

        tokio::select! {
            _ = cancel.cancelled() => Err(BusError::Cancelled),
            res = rx => res.unwrap_or(Err(BusError::Failed("session dropped".into()))),
        }
    }
}
