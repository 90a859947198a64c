//! shell-wm: window-manager contracts for the shell application core.
//!
//! The application core never talks to a compositor, a session bus, or an
//! application database directly. It consumes the traits defined here through
//! `Arc<dyn Trait>` seams, which keeps the core synchronous, single-owner and
//! testable against the fakes in [`test_support`].

use std::fmt;

mod bus;
mod display;
mod window;

pub mod test_support;

pub use bus::{ApplicationProxy, BusError, BusSession, BusyObserver, RemoteActionGroup, RemoteMenuModel};
pub use display::{Display, WorkspaceObserver};
pub use window::{ShellWindow, WindowObserver, WindowType};

/// Stable identifier for a window, assigned by the window manager at map time
/// and never reused within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl WindowId {
    /// Construct an identifier from the window manager's stable sequence
    /// number.
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// The underlying stable sequence number.
    #[must_use]
    pub const fn seq(self) -> u64 {
        self.0
    }
}

/// RAII guard for an observer registration.
///
/// Dropping the guard runs its teardown closure exactly once, removing the
/// observer from whatever emitted it. Holding subscriptions in a table and
/// dropping them on removal gives the guaranteed-unsubscription discipline
/// the application core relies on.
pub struct Subscription(Option<Box<dyn FnOnce() + Send + Sync>>);

impl Subscription {
    /// Wrap a teardown closure.
    pub fn new(unsubscribe: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self(Some(Box::new(unsubscribe)))
    }

    /// A subscription with no teardown. Useful for fakes and tests.
    #[must_use]
    pub fn noop() -> Self {
        Self(None)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Subscription")
            .field(&self.0.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use super::*;

    #[test]
    fn subscription_runs_teardown_once() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let sub = Subscription::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        drop(sub);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn window_id_round_trips() {
        assert_eq!(WindowId::new(42).seq(), 42);
    }
}
