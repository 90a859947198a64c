use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::Subscription;

/// Errors from session-bus operations.
#[derive(Debug, Error)]
pub enum BusError {
    /// The request was cancelled before it completed.
    #[error("bus request cancelled")]
    Cancelled,

    /// The remote peer rejected or failed the request.
    #[error("bus request failed: {0}")]
    Failed(String),
}

/// Opaque handle to a menu model exported by a remote application.
///
/// The application core only stores and hands these out; rendering them is
/// the shell UI's business.
pub trait RemoteMenuModel: Send + Sync {}

/// Opaque handle to an action group exported by a remote application.
pub trait RemoteActionGroup: Send + Sync {}

/// Callback for busy-state changes on an [`ApplicationProxy`].
pub trait BusyObserver: Send + Sync {
    /// The remote busy flag changed.
    fn busy_changed(&self);
}

/// Proxy to a remote `org.gtk.Application`-style object exposing a busy flag.
pub trait ApplicationProxy: Send + Sync {
    /// Whether the remote application currently reports itself busy.
    fn is_busy(&self) -> bool;

    /// Register for busy-changed notifications. The registration lives as
    /// long as the returned guard.
    fn observe_busy(&self, observer: Arc<dyn BusyObserver>) -> Subscription;
}

/// Shared session-bus facility.
///
/// Menu models and action groups are plain handle fetches; only
/// [`BusSession::application_proxy`] is genuinely asynchronous, and it must
/// honor its cancellation token promptly.
#[async_trait]
pub trait BusSession: Send + Sync {
    /// Obtain the menu model exported at `object_path` by `bus_name`.
    fn menu_model(&self, bus_name: &str, object_path: &str) -> Arc<dyn RemoteMenuModel>;

    /// Obtain the action group exported at `object_path` by `bus_name`.
    fn action_group(&self, bus_name: &str, object_path: &str) -> Arc<dyn RemoteActionGroup>;

    /// Establish a proxy to the remote application object. Resolves with
    /// [`BusError::Cancelled`] if `cancel` fires first.
    async fn application_proxy(
        &self,
        bus_name: &str,
        object_path: &str,
        cancel: CancellationToken,
    ) -> Result<Arc<dyn ApplicationProxy>, BusError>;
}
