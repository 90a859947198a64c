//! Running sub-state: the window set, IPC handles and watch subscriptions
//! that exist only while an application has windows.
//!
//! Mostly a memory optimization (far fewer applications run at once than are
//! installed), but it also keeps the teardown story in one place: the state
//! is shared by `Arc`, and the drop of the last owner cancels the in-flight
//! busy-watch request and releases every subscription.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use shell_wm::{
    ApplicationProxy, BusSession, RemoteActionGroup, RemoteMenuModel, ShellWindow, Subscription,
    WindowId,
};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Remote action groups keyed by prefix (`app` for the application-wide
/// group, `win` for the focused window's group).
#[derive(Default)]
pub(crate) struct ActionMuxer {
    groups: HashMap<String, Arc<dyn RemoteActionGroup>>,
}

impl ActionMuxer {
    pub(crate) fn insert(&mut self, prefix: &str, group: Arc<dyn RemoteActionGroup>) {
        self.groups.insert(prefix.to_string(), group);
    }

    pub(crate) fn get(&self, prefix: &str) -> Option<Arc<dyn RemoteActionGroup>> {
        self.groups.get(prefix).cloned()
    }
}

pub(crate) struct RunningInner {
    /// Associated windows, most recently added first until sorted.
    pub(crate) windows: Vec<Arc<dyn ShellWindow>>,
    /// Per-window notification registrations, dropped on window removal.
    pub(crate) window_subs: HashMap<WindowId, Subscription>,
    /// Whether the window list needs re-sorting; done on demand.
    pub(crate) sort_stale: bool,
    /// Count of windows that should show up in a taskbar.
    pub(crate) interesting_windows: u32,
    /// Bus identity the menu/action handles were resolved against.
    pub(crate) unique_bus_name: Option<String>,
    pub(crate) remote_menu: Option<Arc<dyn RemoteMenuModel>>,
    pub(crate) muxer: ActionMuxer,
    /// Busy-state proxy, once established.
    pub(crate) application_proxy: Option<Arc<dyn ApplicationProxy>>,
    pub(crate) busy_sub: Option<Subscription>,
    /// Guards the single in-flight proxy request.
    pub(crate) proxy_in_flight: bool,
}

pub(crate) struct RunningState {
    /// Shared session handle, established lazily with the sub-state.
    pub(crate) session: Arc<dyn BusSession>,
    /// Cancelled on teardown; the busy-watch request derives from it.
    pub(crate) cancel: CancellationToken,
    /// Keeps the workspace-switch registration alive for the sub-state's
    /// lifetime.
    _workspace_sub: Subscription,
    pub(crate) inner: Mutex<RunningInner>,
}

impl RunningState {
    pub(crate) fn new(session: Arc<dyn BusSession>, workspace_sub: Subscription) -> Arc<Self> {
        Arc::new(Self {
            session,
            cancel: CancellationToken::new(),
            _workspace_sub: workspace_sub,
            inner: Mutex::new(RunningInner {
                windows: Vec::new(),
                window_subs: HashMap::new(),
                sort_stale: false,
                interesting_windows: 0,
                unique_bus_name: None,
                remote_menu: None,
                muxer: ActionMuxer::default(),
                application_proxy: None,
                busy_sub: None,
                proxy_in_flight: false,
            }),
        })
    }
}

impl Drop for RunningState {
    fn drop(&mut self) {
        trace!("tearing down running sub-state");
        self.cancel.cancel();
    }
}
