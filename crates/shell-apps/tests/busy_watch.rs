//! Busy-state watching over the session bus: proxy establishment,
//! single-flight requests and teardown races.

use std::sync::Arc;

use shell_apps::{AppEvent, AppState, test_support::TestShell};
use shell_wm::{
    BusError,
    test_support::{FakeProxy, FakeWindow},
};
use tokio::{sync::broadcast, task::yield_now};

/// Let spawned busy-watch tasks make progress on the current-thread runtime.
async fn settle() {
    for _ in 0..8 {
        yield_now().await;
    }
}

fn gtk_window(seq: u64, bus: &str) -> FakeWindow {
    FakeWindow::new(seq).with_gtk_hints(bus, "/org/example/App", "/org/example/App/menus/appmenu")
}

#[tokio::test]
async fn busy_proxy_reflects_remote_state() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    let mut events = app.subscribe();
    app.add_window(&gtk_window(1, ":1.7").handle());
    settle().await;
    assert_eq!(shell.session.pending_count(), 1);
    assert!(!app.busy());

    let proxy = FakeProxy::new(true);
    shell
        .session
        .complete_next(Ok(Arc::new(proxy.clone())))
        .unwrap();
    settle().await;
    assert!(app.busy());
    assert!(drain(&mut events).contains(&AppEvent::BusyChanged));

    proxy.set_busy(false);
    assert!(!app.busy());
    assert!(drain(&mut events).contains(&AppEvent::BusyChanged));
}

#[tokio::test]
async fn proxy_requests_are_single_flight() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    app.add_window(&gtk_window(1, ":1.7").handle());
    app.add_window(&gtk_window(2, ":1.7").handle());
    settle().await;
    assert_eq!(shell.session.proxy_requests().len(), 1);

    shell
        .session
        .complete_next(Ok(Arc::new(FakeProxy::new(false))))
        .unwrap();
    settle().await;

    // Established proxies are not re-requested either.
    app.add_window(&gtk_window(3, ":1.7").handle());
    settle().await;
    assert_eq!(shell.session.proxy_requests().len(), 1);
}

#[tokio::test]
async fn teardown_cancels_the_inflight_request() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    let win = gtk_window(1, ":1.7");
    app.add_window(&win.handle());
    settle().await;
    assert_eq!(shell.session.pending_count(), 1);

    app.remove_window(&win.handle());
    settle().await;
    assert_eq!(app.state(), AppState::Stopped);
    assert!(!app.busy());
}

#[tokio::test]
async fn late_completion_after_teardown_is_ignored() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    let win = gtk_window(1, ":1.7");
    app.add_window(&win.handle());
    settle().await;

    app.remove_window(&win.handle());
    let _ = shell.session.complete_next(Ok(Arc::new(FakeProxy::new(true))));
    settle().await;
    assert_eq!(app.state(), AppState::Stopped);
    assert!(!app.busy());
    assert!(app.menu().is_none());
}

#[tokio::test]
async fn proxy_failure_degrades_to_not_busy() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    app.add_window(&gtk_window(1, ":1.7").handle());
    settle().await;

    shell
        .session
        .complete_next(Err(BusError::Failed("no such name".into())))
        .unwrap();
    settle().await;
    assert!(!app.busy());
    assert_eq!(app.state(), AppState::Running);
}

#[tokio::test]
async fn menu_and_action_handles_resolve_from_window_hints() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    let win = gtk_window(1, ":1.7").with_window_object_path("/org/example/App/window/1");
    app.add_window(&win.handle());

    assert!(app.menu().is_some());
    assert!(app.action_group("app").is_some());
    assert!(app.action_group("win").is_none());

    app.update_window_actions(&win.handle());
    assert!(app.action_group("win").is_some());

    let menus = shell.session.menus();
    assert_eq!(
        menus,
        vec![(":1.7".to_string(), "/org/example/App/menus/appmenu".to_string())]
    );
    let groups = shell.session.action_groups();
    assert!(groups.contains(&(":1.7".to_string(), "/org/example/App".to_string())));
    assert!(groups.contains(&(":1.7".to_string(), "/org/example/App/window/1".to_string())));
}

#[tokio::test]
async fn new_bus_identity_replaces_the_handles() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    app.add_window(&gtk_window(1, ":1.7").handle());
    app.add_window(&gtk_window(2, ":1.8").handle());

    let menus = shell.session.menus();
    assert_eq!(menus.len(), 2);
    assert_eq!(menus[1].0, ":1.8");
}

fn drain(events: &mut broadcast::Receiver<AppEvent>) -> Vec<AppEvent> {
    let mut seen = Vec::new();
    while let Ok(ev) = events.try_recv() {
        seen.push(ev);
    }
    seen
}
