//! Activation, launching and quit requests.

use shell_apps::{AppState, Error, test_support::TestShell};
use shell_wm::{WindowType, test_support::FakeWindow};

#[test]
fn activate_raises_siblings_and_focuses_most_recent() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    let w1 = FakeWindow::new(1).with_user_time(10);
    let w2 = FakeWindow::new(2).with_user_time(20);
    app.add_window(&w1.handle());
    app.add_window(&w2.handle());

    let windows = app.windows();
    assert_eq!(windows[0].id().seq(), 2);
    assert_eq!(windows[1].id().seq(), 1);

    app.activate_window(None, 100);
    assert!(w1.calls_contain("raise"));
    assert!(w2.calls_contain("activate@100"));
    assert!(!w2.calls_contain("raise"));
}

#[test]
fn stale_timestamp_requests_attention_instead_of_focus() {
    let shell = TestShell::new();
    shell.display.set_last_user_time(100);
    let app = shell.installed_app("editor.desktop", "Editor");
    let win = FakeWindow::new(1);
    app.add_window(&win.handle());

    app.activate_window(None, 50);
    assert!(win.calls_contain("demands_attention"));
    assert!(!win.calls_contain("activate@50"));
}

#[test]
fn zero_timestamp_uses_the_current_time() {
    let shell = TestShell::new();
    shell.display.set_current_time(200);
    shell.display.set_last_user_time(100);
    let app = shell.installed_app("editor.desktop", "Editor");
    let win = FakeWindow::new(1);
    app.add_window(&win.handle());

    app.activate_window(None, 0);
    assert!(win.calls_contain("activate@200"));
}

#[test]
fn activation_switches_to_the_target_workspace() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    let win = FakeWindow::new(1).with_workspace(Some(1));
    app.add_window(&win.handle());

    app.activate_window(None, 100);
    assert!(shell.display.calls_contain("activate_workspace@1:1:100"));
    assert!(!win.calls_contain("activate@100"));
}

#[test]
fn fresher_transient_is_focused_instead() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    let main = FakeWindow::new(1).with_user_time(10);
    let dialog = FakeWindow::new(2)
        .with_window_type(WindowType::Dialog)
        .with_user_time(50);
    let palette = FakeWindow::new(3)
        .with_window_type(WindowType::Utility)
        .with_user_time(60);
    main.add_transient(&dialog);
    main.add_transient(&palette);
    app.add_window(&main.handle());

    app.activate_window(None, 100);
    assert!(dialog.calls_contain("activate@100"));
    assert!(!main.calls_contain("activate@100"));
    assert!(!palette.calls_contain("activate@100"));
}

#[test]
fn foreign_windows_are_refused() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    app.add_window(&FakeWindow::new(1).handle());

    let stranger = FakeWindow::new(2);
    app.activate_window(Some(&stranger.handle()), 100);
    assert!(stranger.calls().is_empty());
}

#[test]
fn activating_a_stopped_app_launches_it() {
    let shell = TestShell::new();
    shell.display.set_current_time(77);
    let app = shell.installed_app("editor.desktop", "Editor");

    app.activate().unwrap();
    assert_eq!(app.state(), AppState::Starting);
    let launches = shell.launcher.launches();
    assert_eq!(launches.len(), 1);
    assert_eq!(launches[0].0, "editor.desktop");
    assert_eq!(launches[0].1.timestamp, 77);
    assert_eq!(launches[0].1.workspace, 0);
}

#[test]
fn activating_a_starting_app_is_a_no_op() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    app.activate().unwrap();
    app.activate().unwrap();
    assert_eq!(shell.launcher.launches().len(), 1);
}

#[test]
fn launch_failure_names_the_application() {
    let shell = TestShell::new();
    shell.launcher.set_fail("exec not found");
    let app = shell.installed_app("editor.desktop", "Editor");

    let err = app.activate().unwrap_err();
    match err {
        Error::Launch { name, message } => {
            assert_eq!(name, "Editor");
            assert_eq!(message, "exec not found");
        }
    }
    // The entity stays Starting; forcing it back is the caller's call.
    assert_eq!(app.state(), AppState::Starting);
}

#[test]
fn launch_reports_child_processes() {
    let shell = TestShell::new();
    shell.launcher.set_child_pids(vec![4242]);
    let app = shell.installed_app("editor.desktop", "Editor");

    app.activate().unwrap();
    assert_eq!(shell.tracker.associations(), vec![(4242, "editor.desktop".to_string())]);
}

#[test]
fn open_new_window_targets_a_workspace() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    app.add_window(&FakeWindow::new(1).handle());

    app.open_new_window(Some(3)).unwrap();
    let launches = shell.launcher.launches();
    assert_eq!(launches.len(), 1);
    assert_eq!(launches[0].1.workspace, 3);
}

#[test]
fn window_backed_launch_focuses_the_window() {
    let shell = TestShell::new();
    let win = FakeWindow::new(1).with_wm_class("Mystery");
    let app = shell.registry.app_for_window(&win.handle());

    app.launch(55, None).unwrap();
    assert!(win.calls_contain("activate@55"));
    assert!(shell.launcher.launches().is_empty());
}

#[test]
fn request_quit_deletes_interesting_windows() {
    let shell = TestShell::new();
    shell.display.set_current_time(99);
    let app = shell.installed_app("editor.desktop", "Editor");
    let main = FakeWindow::new(1);
    let palette = FakeWindow::new(2).with_skip_taskbar(true);
    app.add_window(&main.handle());
    app.add_window(&palette.handle());

    assert!(app.request_quit());
    assert!(main.calls_contain("delete@99"));
    assert!(!palette.calls_contain("delete@99"));
}

#[test]
fn request_quit_requires_a_running_app() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    assert!(!app.request_quit());
}

#[test]
fn pids_are_deduplicated() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    app.add_window(&FakeWindow::new(1).with_pid(10).handle());
    app.add_window(&FakeWindow::new(2).with_pid(10).handle());
    app.add_window(&FakeWindow::new(3).with_pid(11).handle());

    let mut pids = app.pids();
    pids.sort_unstable();
    assert_eq!(pids, vec![10, 11]);
}

#[test]
fn workspace_membership_follows_state() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    app.handle_startup_sequence(&shell_apps::StartupSequence {
        completed: false,
        timestamp: 1,
        workspace: Some(2),
    });
    assert!(app.is_on_workspace(2));
    assert!(!app.is_on_workspace(0));

    app.add_window(&FakeWindow::new(1).with_workspace(Some(1)).handle());
    assert!(app.is_on_workspace(1));
    assert!(!app.is_on_workspace(2));
}

#[test]
fn workspace_switch_reorders_windows() {
    let shell = TestShell::new();
    let app = shell.installed_app("editor.desktop", "Editor");
    let w1 = FakeWindow::new(1).with_workspace(Some(0)).with_user_time(10);
    let w2 = FakeWindow::new(2).with_workspace(Some(1)).with_user_time(20);
    app.add_window(&w1.handle());
    app.add_window(&w2.handle());
    assert_eq!(app.windows()[0].id().seq(), 1);

    shell.display.switch_workspace(1);
    assert_eq!(app.windows()[0].id().seq(), 2);
}
