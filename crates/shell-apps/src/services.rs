//! Collaborator contracts for the application core, and the [`Services`]
//! bundle that groups them for construction sites.

use std::sync::Arc;

use shell_wm::{BusSession, Display, ShellWindow, Subscription};
use thiserror::Error;

use crate::app::App;

/// An installed application descriptor, owned by the application database.
///
/// Descriptors are immutable; a database change produces new descriptors
/// rather than mutating old ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopEntry {
    /// Canonical identifier, e.g. `org.example.Editor.desktop`.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Window-manager startup class hint declared by the descriptor, if any.
    pub startup_wm_class: Option<String>,
}

/// Callback for application-database changes.
pub trait InstalledObserver: Send + Sync {
    /// The set of installed applications changed.
    fn installed_changed(&self);
}

/// The external application database.
pub trait AppDirectory: Send + Sync {
    /// Resolve an identifier to a descriptor. Absence is normal and common.
    fn resolve(&self, id: &str) -> Option<Arc<DesktopEntry>>;

    /// Snapshot of every installed descriptor.
    fn entries(&self) -> Vec<Arc<DesktopEntry>>;

    /// Register for install-change notifications. The registration lives as
    /// long as the returned guard.
    fn observe_installed(&self, observer: Arc<dyn InstalledObserver>) -> Subscription;
}

/// Timestamp and workspace context handed to the launch primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchContext {
    /// Event timestamp driving startup notification.
    pub timestamp: u32,
    /// Workspace the application should start on.
    pub workspace: u32,
}

/// Failure reported by the OS launch primitive.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct LaunchFailure(
    /// Human-readable failure message.
    pub String,
);

/// The OS "start this application" primitive.
pub trait Launcher: Send + Sync {
    /// Launch `entry` with the given context. `on_child` is invoked for each
    /// process id spawned on behalf of the application.
    fn launch(
        &self,
        entry: &DesktopEntry,
        context: LaunchContext,
        on_child: Box<dyn Fn(i32) + Send + Sync>,
    ) -> Result<(), LaunchFailure>;
}

/// The window tracker's contributions to the core: the user-relevance
/// predicate and the child-process association sink.
pub trait WindowTracker: Send + Sync {
    /// Whether the window is relevant to the user at all (the tracker's own
    /// filtering, beyond the skip-taskbar and role checks the core applies).
    fn is_window_interesting(&self, window: &Arc<dyn ShellWindow>) -> bool;

    /// Remember that `pid` was spawned for `app`, so future windows from
    /// that process are associated with the entity.
    fn associate_process(&self, pid: i32, app: &Arc<App>);
}

/// Optional usage telemetry sink. Calls are identifier-gated by the
/// registry: window-backed entities are never recorded.
pub trait UsageRecorder: Send + Sync {
    /// An application entered the running set.
    fn record_start(&self, app_token: &str, entry_id: &str);
    /// An application left the running set.
    fn record_stop(&self, app_token: &str);
}

/// Groups the long-lived collaborators the core consumes, to keep
/// dependencies explicit at construction sites.
#[derive(Clone)]
pub struct Services {
    /// Application database.
    pub directory: Arc<dyn AppDirectory>,
    /// Display/compositor queries and commands.
    pub display: Arc<dyn Display>,
    /// Shared session-bus facility.
    pub session: Arc<dyn BusSession>,
    /// OS launch primitive.
    pub launcher: Arc<dyn Launcher>,
    /// Window tracker predicate + process association sink.
    pub tracker: Arc<dyn WindowTracker>,
    /// Usage telemetry, if enabled.
    pub usage: Option<Arc<dyn UsageRecorder>>,
}
