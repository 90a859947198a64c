//! shell-apps: the shell's application model.
//!
//! [`AppRegistry`] owns one [`App`] entity per installed descriptor (plus
//! window-backed entities for unmatched windows) and answers lookups by id,
//! basename and WM_CLASS heuristics. Each entity runs the
//! Stopped/Starting/Running lifecycle from its window set and launch
//! feedback, and carries remote menu, action and busy-state handles while
//! running.
//!
//! The window manager, session bus and application database are consumed
//! through the `shell-wm` contracts, so the whole model is testable in
//! process; see [`test_support`].

mod app;
mod compare;
mod error;
mod events;
mod registry;
mod running;
mod services;
mod wm_class;

pub mod test_support;

pub use app::{App, AppState, StartupSequence};
pub use compare::{cmp_apps, cmp_by_name};
pub use error::{Error, Result};
pub use events::{AppEvent, SystemEvent};
pub use registry::{AppRegistry, global, install_global, reset_global};
pub use services::{
    AppDirectory, DesktopEntry, InstalledObserver, LaunchContext, LaunchFailure, Launcher,
    Services, UsageRecorder, WindowTracker,
};
pub use wm_class::canonicalize_wm_class;
