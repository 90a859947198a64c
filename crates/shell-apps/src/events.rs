use std::{fmt, sync::Arc};

use crate::app::{App, AppState};

/// Per-application notifications, delivered on the entity's broadcast
/// channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppEvent {
    /// The application's lifecycle state changed.
    StateChanged(AppState),
    /// The window set (membership or order) changed.
    WindowsChanged,
    /// The remote busy flag changed.
    BusyChanged,
}

/// Registry-level notifications, delivered on the registry's broadcast
/// channel.
#[derive(Clone)]
pub enum SystemEvent {
    /// An application transitioned between lifecycle states.
    AppStateChanged(Arc<App>),
    /// The set of installed applications changed and the registry finished
    /// reconciling against it.
    InstalledChanged,
}

impl fmt::Debug for SystemEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AppStateChanged(app) => f.debug_tuple("AppStateChanged").field(&app.id()).finish(),
            Self::InstalledChanged => write!(f, "InstalledChanged"),
        }
    }
}
