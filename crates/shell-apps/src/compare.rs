//! Ordering rules for presenting applications and windows.

use std::{cmp::Ordering, sync::Arc};

use shell_wm::ShellWindow;

use crate::app::{App, AppState};

/// Sort rank of a lifecycle state: running entities present first, then
/// starting, then stopped.
fn state_rank(state: AppState) -> u8 {
    match state {
        AppState::Running => 0,
        AppState::Starting => 1,
        AppState::Stopped => 2,
    }
}

/// Cross-application ordering used for running/starting lists.
///
/// Running applications sort before non-running ones; among running
/// applications, those with windows sort before those without, and the most
/// recently interacted-with sorts first. Applications in the same
/// non-running state compare equal, so a stable sort preserves input order.
#[must_use]
pub fn cmp_apps(a: &Arc<App>, b: &Arc<App>) -> Ordering {
    let (sa, sb) = (a.state(), b.state());
    match state_rank(sa).cmp(&state_rank(sb)) {
        Ordering::Equal => {}
        ord => return ord,
    }

    if sa == AppState::Running {
        match (a.n_windows() > 0, b.n_windows() > 0) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        return b.last_user_time().cmp(&a.last_user_time());
    }

    Ordering::Equal
}

/// Order two applications by display name, via their precomputed collation
/// keys.
#[must_use]
pub fn cmp_by_name(a: &Arc<App>, b: &Arc<App>) -> Ordering {
    a.collation_key().cmp(&b.collation_key())
}

/// Per-entity window ordering: active-workspace windows first, then windows
/// visible on their own workspace, then by descending user time.
pub(crate) fn cmp_windows(
    active_workspace: u32,
    a: &Arc<dyn ShellWindow>,
    b: &Arc<dyn ShellWindow>,
) -> Ordering {
    let ws_a = a.workspace() == Some(active_workspace);
    let ws_b = b.workspace() == Some(active_workspace);
    match (ws_a, ws_b) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    let vis_a = a.showing_on_its_workspace();
    let vis_b = b.showing_on_its_workspace();
    match (vis_a, vis_b) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    b.user_time().cmp(&a.user_time())
}
