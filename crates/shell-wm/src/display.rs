use std::sync::Arc;

use crate::{ShellWindow, Subscription};

/// Callback for global workspace switches.
pub trait WorkspaceObserver: Send + Sync {
    /// The active workspace changed.
    fn workspace_switched(&self);
}

/// Display/compositor queries and commands consumed by the application core.
///
/// Timestamps are X-server-style 32-bit event times; ordering must go through
/// [`Display::time_is_before`], which is wraparound-aware, never through `<`.
pub trait Display: Send + Sync {
    /// Timestamp of the event currently being processed, fetched with a
    /// round-trip if necessary.
    fn current_time(&self) -> u32;

    /// Timestamp of the last user interaction on the display.
    fn last_user_time(&self) -> u32;

    /// Whether time `a` is strictly before time `b`, accounting for
    /// timestamp wraparound.
    fn time_is_before(&self, a: u32, b: u32) -> bool;

    /// Index of the currently active workspace.
    fn active_workspace(&self) -> u32;

    /// Switch to `workspace` and focus `window` there.
    fn activate_workspace_with_focus(&self, workspace: u32, window: &Arc<dyn ShellWindow>, time: u32);

    /// Focus the no-focus window so that nothing visually takes focus while
    /// an application is starting.
    fn focus_no_focus_window(&self, time: u32);

    /// Sort `windows` bottom-to-top by current stacking order.
    fn sort_by_stacking(&self, windows: Vec<Arc<dyn ShellWindow>>) -> Vec<Arc<dyn ShellWindow>>;

    /// Register for workspace-switch notifications. The registration lives as
    /// long as the returned guard.
    fn observe_workspace_switches(&self, observer: Arc<dyn WorkspaceObserver>) -> Subscription;
}
