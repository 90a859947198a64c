//! State-machine behavior: window membership, interesting-window counting,
//! startup sequences and disposal.

use shell_apps::{AppEvent, AppState, StartupSequence, test_support::TestShell};
use shell_wm::test_support::FakeWindow;

#[test]
fn interesting_window_starts_and_stops_the_app() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    assert_eq!(app.state(), AppState::Stopped);

    let win = FakeWindow::new(1);
    app.add_window(&win.handle());
    assert_eq!(app.state(), AppState::Running);
    assert_eq!(app.n_windows(), 1);

    app.remove_window(&win.handle());
    assert_eq!(app.state(), AppState::Stopped);
    assert_eq!(app.n_windows(), 0);
}

#[test]
fn uninteresting_window_does_not_start_the_app() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");

    let win = FakeWindow::new(1).with_skip_taskbar(true);
    app.add_window(&win.handle());
    assert_eq!(app.state(), AppState::Stopped);
    assert_eq!(app.n_windows(), 1);
}

#[test]
fn skip_taskbar_toggle_drives_transitions() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    let win = FakeWindow::new(1);
    app.add_window(&win.handle());
    assert_eq!(app.state(), AppState::Running);

    win.set_skip_taskbar(true);
    assert_eq!(app.state(), AppState::Stopped);

    win.set_skip_taskbar(false);
    assert_eq!(app.state(), AppState::Running);
}

#[test]
fn tracker_veto_keeps_window_uninteresting() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    let win = FakeWindow::new(1);
    shell.tracker.set_uninteresting(win.handle().id());

    app.add_window(&win.handle());
    assert_eq!(app.state(), AppState::Stopped);
}

#[test]
fn startup_sequence_begins_and_completes() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");

    app.handle_startup_sequence(&StartupSequence {
        completed: false,
        timestamp: 42,
        workspace: Some(1),
    });
    assert_eq!(app.state(), AppState::Starting);
    assert_eq!(app.started_on_workspace(), Some(1));
    assert!(shell.display.calls_contain("focus_no_focus_window@42"));

    let win = FakeWindow::new(1);
    app.add_window(&win.handle());
    assert_eq!(app.state(), AppState::Running);

    app.handle_startup_sequence(&StartupSequence {
        completed: true,
        timestamp: 43,
        workspace: Some(1),
    });
    assert_eq!(app.state(), AppState::Running);
}

#[test]
fn completed_sequence_without_windows_stops_the_app() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");

    app.handle_startup_sequence(&StartupSequence {
        completed: false,
        timestamp: 42,
        workspace: None,
    });
    assert_eq!(app.state(), AppState::Starting);

    app.handle_startup_sequence(&StartupSequence {
        completed: true,
        timestamp: 43,
        workspace: None,
    });
    assert_eq!(app.state(), AppState::Stopped);
}

#[test]
fn starting_survives_last_window_removal() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    app.handle_startup_sequence(&StartupSequence {
        completed: false,
        timestamp: 42,
        workspace: None,
    });

    // A splash window comes and goes while the launch is in progress.
    let splash = FakeWindow::new(1).with_skip_taskbar(true);
    app.add_window(&splash.handle());
    assert_eq!(app.state(), AppState::Starting);
    app.remove_window(&splash.handle());
    assert_eq!(app.state(), AppState::Starting);
}

#[test]
fn splash_role_never_counts() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    let win = FakeWindow::new(1).with_role("startup-splash");
    app.add_window(&win.handle());
    assert_eq!(app.state(), AppState::Stopped);
}

#[test]
fn duplicate_add_is_a_no_op() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    let win = FakeWindow::new(1);
    app.add_window(&win.handle());
    app.add_window(&win.handle());
    assert_eq!(app.n_windows(), 1);
    assert_eq!(win.observer_count(), 1);
}

#[test]
fn removal_releases_window_subscriptions() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    let win = FakeWindow::new(1);
    app.add_window(&win.handle());
    assert_eq!(win.observer_count(), 1);
    assert_eq!(shell.display.observer_count(), 1);

    app.remove_window(&win.handle());
    assert_eq!(win.observer_count(), 0);
    assert_eq!(shell.display.observer_count(), 0);
}

#[test]
fn unmanaged_window_is_removed_automatically() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    let win = FakeWindow::new(1);
    app.add_window(&win.handle());

    win.unmanage();
    assert_eq!(app.state(), AppState::Stopped);
    assert_eq!(app.n_windows(), 0);
}

#[test]
fn window_backed_app_runs_from_its_window() {
    let shell = TestShell::new();
    let win = FakeWindow::new(7).with_wm_class("Xterm");
    let app = shell.registry.app_for_window(&win.handle());

    assert!(app.is_window_backed());
    assert_eq!(app.id(), "window:7");
    assert_eq!(app.name(), "Xterm");
    assert_eq!(app.state(), AppState::Running);
}

#[test]
fn state_events_reach_subscribers() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    let mut events = app.subscribe();

    let win = FakeWindow::new(1);
    app.add_window(&win.handle());

    assert_eq!(
        events.try_recv().unwrap(),
        AppEvent::StateChanged(AppState::Running)
    );
    assert_eq!(events.try_recv().unwrap(), AppEvent::WindowsChanged);
}

#[test]
fn user_time_change_dirties_window_order() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    let w1 = FakeWindow::new(1).with_user_time(10);
    let w2 = FakeWindow::new(2).with_user_time(20);
    app.add_window(&w1.handle());
    app.add_window(&w2.handle());
    assert_eq!(app.windows()[0].id().seq(), 2);

    w1.set_user_time(30);
    assert_eq!(app.windows()[0].id().seq(), 1);
}

#[test]
fn hidden_windows_sort_below_visible_ones() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    let hidden = FakeWindow::new(1).with_user_time(50).with_showing(false);
    let visible = FakeWindow::new(2).with_user_time(10);
    app.add_window(&hidden.handle());
    app.add_window(&visible.handle());

    // Visibility outranks recency for windows on the same workspace.
    let order: Vec<u64> = app.windows().iter().map(|w| w.id().seq()).collect();
    assert_eq!(order, vec![2, 1]);
}

#[test]
fn vetoed_window_hint_toggle_leaves_the_count_alone() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    let normal = FakeWindow::new(1);
    let splash = FakeWindow::new(2)
        .with_role("startup-splash")
        .with_skip_taskbar(true);
    app.add_window(&normal.handle());
    app.add_window(&splash.handle());
    assert_eq!(app.state(), AppState::Running);

    // The role veto keeps the splash uncounted regardless of the hint.
    splash.set_skip_taskbar(false);
    assert_eq!(app.state(), AppState::Running);

    app.remove_window(&normal.handle());
    assert_eq!(app.state(), AppState::Stopped);
}

#[test]
fn dispose_drains_windows_and_settles() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    let w1 = FakeWindow::new(1);
    let w2 = FakeWindow::new(2);
    app.add_window(&w1.handle());
    app.add_window(&w2.handle());

    app.dispose();
    assert_eq!(app.state(), AppState::Stopped);
    assert_eq!(app.n_windows(), 0);
    assert_eq!(w1.observer_count(), 0);
    assert_eq!(w2.observer_count(), 0);
}
