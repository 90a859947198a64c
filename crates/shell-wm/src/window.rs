use std::sync::Arc;

use crate::{Subscription, WindowId};

/// Window-manager classification of a window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowType {
    /// A regular toplevel window.
    Normal,
    /// A dialog, transient for some other window.
    Dialog,
    /// A utility palette (e.g. a toolbox).
    Utility,
    /// A splash screen shown while an application starts.
    Splash,
    /// A torn-off or standalone menu.
    Menu,
    /// Anything else the window manager tracks.
    Other,
}

/// Callbacks delivered for per-window notifications.
///
/// Implementors are registered via [`ShellWindow::observe`] and identified to
/// the callbacks by [`WindowId`]; the receiver is expected to hold the window
/// itself and resolve the id against its own bookkeeping.
pub trait WindowObserver: Send + Sync {
    /// The window was unmanaged (closed or withdrawn).
    fn unmanaged(&self, window: WindowId);
    /// The user-interaction timestamp of the window changed.
    fn user_time_changed(&self, window: WindowId);
    /// The skip-taskbar hint of the window was toggled.
    fn skip_taskbar_changed(&self, window: WindowId);
}

/// A window as exposed by the window manager.
///
/// The application core holds windows as `Arc<dyn ShellWindow>` and treats
/// [`ShellWindow::id`] as the identity; two handles with equal ids refer to
/// the same window.
pub trait ShellWindow: Send + Sync {
    /// Stable identity of this window.
    fn id(&self) -> WindowId;

    /// The WM_CLASS of the window, if set.
    fn wm_class(&self) -> Option<String>;

    /// Process id owning the window.
    fn pid(&self) -> i32;

    /// Workspace index the window is on, or `None` when the window is not
    /// pinned to a specific workspace.
    fn workspace(&self) -> Option<u32>;

    /// Window-manager type of the window.
    fn window_type(&self) -> WindowType;

    /// The window role, if the client set one.
    fn role(&self) -> Option<String>;

    /// Whether the window asked to be omitted from taskbars.
    fn is_skip_taskbar(&self) -> bool;

    /// Whether the window is currently visible on its own workspace.
    fn showing_on_its_workspace(&self) -> bool;

    /// Timestamp of the last user interaction with this window.
    fn user_time(&self) -> u32;

    /// Unique session-bus name of the owning process, if exported.
    fn gtk_unique_bus_name(&self) -> Option<String>;

    /// Object path of the exported application object, if any.
    fn gtk_application_object_path(&self) -> Option<String>;

    /// Object path of the exported application menu, if any.
    fn gtk_app_menu_object_path(&self) -> Option<String>;

    /// Object path of the exported per-window object, if any.
    fn gtk_window_object_path(&self) -> Option<String>;

    /// Windows transient for this one.
    fn transients(&self) -> Vec<Arc<dyn ShellWindow>>;

    /// Raise the window in the stacking order without focusing it.
    fn raise(&self);

    /// Activate (focus and raise) the window.
    fn activate(&self, time: u32);

    /// Flag the window as demanding attention instead of focusing it.
    fn set_demands_attention(&self);

    /// Ask the client to close the window.
    fn request_delete(&self, time: u32);

    /// Register for per-window notifications. The registration lives as long
    /// as the returned guard.
    fn observe(&self, observer: Arc<dyn WindowObserver>) -> Subscription;
}
