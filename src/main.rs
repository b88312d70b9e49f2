mod app;
mod app_state;
mod bridge;
mod components;
mod control;
mod controller;
mod edit_dialog;
mod error;
mod log_viewer;
mod openconnect;
mod runner;
mod session;
mod settings;
mod stats;
mod system;
mod text_input;
mod theme;

use gpui::{
    Application, Bounds, KeyBinding, WindowBackgroundAppearance, WindowBounds, WindowOptions,
    prelude::*, px, size,
};

use crate::{
    app::{
        Activate, AppInitialization, FocusNext, FocusPrevious, OpenConnectApp, Quit, ShowLog,
    },
    app_state::AppState,
    bridge::SessionLog,
    controller::Controller,
    edit_dialog::CancelEdit,
    log_viewer::{CloseLog, CopyLog},
    openconnect::CliSessionFactory,
    settings::ProfileStore,
    text_input::{
        Backspace, Copy, Cut, Delete, End, Home, Left, Paste, Right, SelectAll, SelectLeft,
        SelectRight, Submit,
    },
    theme::{WINDOW_HEIGHT, WINDOW_WIDTH},
};

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("openconnect_ui=info"),
    )
    .init();

    log::info!(
        "openconnect-ui v{} starting (RUST_LOG={})",
        env!("CARGO_PKG_VERSION"),
        std::env::var("RUST_LOG").unwrap_or_else(|_| "<default: info>".into()),
    );

    log::info!(
        "[env] XDG_CURRENT_DESKTOP={}, XDG_SESSION_TYPE={}, DISPLAY={}, WAYLAND_DISPLAY={}",
        std::env::var("XDG_CURRENT_DESKTOP").unwrap_or_default(),
        std::env::var("XDG_SESSION_TYPE").unwrap_or_default(),
        std::env::var("DISPLAY").unwrap_or_default(),
        std::env::var("WAYLAND_DISPLAY").unwrap_or_default(),
    );

    let (binary_path, binary_found) = system::find_openconnect_binary();
    log::info!("[startup] openconnect binary: {binary_path} (found={binary_found})");

    let version = if binary_found {
        system::openconnect_version(&binary_path)
    } else {
        None
    };
    let version_label = system::version_label(version.as_deref());

    let session_log = SessionLog::new();
    if !binary_found {
        log::warn!("[startup] openconnect is not installed or not in PATH");
        session_log.append("Could not find the openconnect binary; connecting will fail");
    }

    let store = ProfileStore::open_default();
    log::info!("[startup] settings file: {}", store.path().display());
    let app_state = AppState::load();

    Application::new().run(move |context| {
        let bounds = Bounds::centered(None, size(px(WINDOW_WIDTH), px(WINDOW_HEIGHT)), context);

        bind_keys(context);

        let factory = CliSessionFactory::new(binary_path);
        let (controller, events) = Controller::new(Box::new(factory), session_log);
        let initialization = AppInitialization {
            controller,
            events,
            store,
            app_state,
            version_label,
        };

        let window = context.open_window(
            WindowOptions {
                window_bounds: Some(WindowBounds::Windowed(bounds)),
                titlebar: None,
                window_background: WindowBackgroundAppearance::Opaque,
                ..Default::default()
            },
            |_, context| context.new(|context| OpenConnectApp::new(initialization, context)),
        );

        match window {
            Ok(window) => {
                if let Err(error) = window.update(context, |view, window, context| {
                    let handle = view.server_input(context);
                    window.focus(&handle, context);
                    view.quit_on_close(window, context);
                    context.activate(true);
                }) {
                    log::error!("[startup] failed to initialize application window: {error}");
                    context.quit();
                    return;
                }

                context.on_action(|_: &Quit, context| context.quit());
            }
            Err(error) => {
                log::error!("[startup] failed to open application window: {error}");
                context.quit();
            }
        }
    });
}

fn bind_keys(context: &mut gpui::App) {
    context.bind_keys([
        KeyBinding::new("backspace", Backspace, Some("TextInput")),
        KeyBinding::new("delete", Delete, Some("TextInput")),
        KeyBinding::new("left", Left, Some("TextInput")),
        KeyBinding::new("right", Right, Some("TextInput")),
        KeyBinding::new("shift-left", SelectLeft, Some("TextInput")),
        KeyBinding::new("shift-right", SelectRight, Some("TextInput")),
        KeyBinding::new("home", Home, Some("TextInput")),
        KeyBinding::new("end", End, Some("TextInput")),
        KeyBinding::new("enter", Submit, Some("TextInput")),
        KeyBinding::new("cmd-a", SelectAll, Some("TextInput")),
        KeyBinding::new("cmd-v", Paste, Some("TextInput")),
        KeyBinding::new("cmd-c", Copy, Some("TextInput")),
        KeyBinding::new("cmd-x", Cut, Some("TextInput")),
        KeyBinding::new("ctrl-a", SelectAll, Some("TextInput")),
        KeyBinding::new("ctrl-v", Paste, Some("TextInput")),
        KeyBinding::new("ctrl-c", Copy, Some("TextInput")),
        KeyBinding::new("ctrl-x", Cut, Some("TextInput")),
    ]);

    context.bind_keys([
        KeyBinding::new("cmd-c", CopyLog, Some("LogViewer")),
        KeyBinding::new("ctrl-c", CopyLog, Some("LogViewer")),
        KeyBinding::new("escape", CloseLog, Some("LogViewer")),
    ]);

    context.bind_keys([
        KeyBinding::new("tab", FocusNext, Some("EditDialog")),
        KeyBinding::new("shift-tab", FocusPrevious, Some("EditDialog")),
        KeyBinding::new("enter", Activate, Some("EditDialog")),
        KeyBinding::new("escape", CancelEdit, Some("EditDialog")),
    ]);

    context.bind_keys([
        KeyBinding::new("tab", FocusNext, Some("OpenConnectApp")),
        KeyBinding::new("shift-tab", FocusPrevious, Some("OpenConnectApp")),
        KeyBinding::new("enter", Activate, Some("OpenConnectApp")),
        KeyBinding::new("cmd-l", ShowLog, Some("OpenConnectApp")),
        KeyBinding::new("ctrl-l", ShowLog, Some("OpenConnectApp")),
        KeyBinding::new("cmd-q", Quit, Some("OpenConnectApp")),
        KeyBinding::new("ctrl-q", Quit, Some("OpenConnectApp")),
    ]);
}
