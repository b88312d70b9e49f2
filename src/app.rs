use futures::StreamExt;
use gpui::{
    App, AsyncApp, Bounds, Context, CursorStyle, Entity, FocusHandle, Focusable, MouseButton,
    MouseUpEvent, ScrollHandle, Task, WeakEntity, Window, WindowBackgroundAppearance,
    WindowBounds, WindowHandle, WindowOptions, actions, div, prelude::*, px, rgb, size,
};

use crate::{
    app_state::AppState,
    bridge::{BridgeMessage, CredentialRequest, Credentials, EventReceiver},
    components::*,
    controller::{
        BLINK_INTERVAL, ConnectionStatus, Controller, Effect, STATS_POLL_INTERVAL,
        STATUS_MESSAGE_DURATION,
    },
    edit_dialog::{self, EditDialog},
    log_viewer::LogViewer,
    settings::{ProfileStore, ServerProfile},
    text_input::{Submit, TextInput},
    theme::*,
};

actions!(
    openconnect,
    [
        Connect,
        Disconnect,
        NewServer,
        EditServer,
        RemoveServer,
        ShowLog,
        FocusNext,
        FocusPrevious,
        Activate,
        Quit,
    ]
);

pub struct AppInitialization {
    pub controller: Controller,
    pub events: EventReceiver,
    pub store: ProfileStore,
    pub app_state: AppState,
    pub version_label: String,
}

/// An interactive authentication attempt waiting on the user. Dropping it
/// answers the session thread with "cancelled".
struct CredentialPrompt {
    request: CredentialRequest,
    username_input: Entity<TextInput>,
    password_input: Entity<TextInput>,
    group_input: Entity<TextInput>,
    save_password: bool,
}

pub struct OpenConnectApp {
    controller: Controller,
    store: ProfileStore,
    app_state: AppState,
    server_names: Vec<String>,
    server_input: Entity<TextInput>,
    server_scroll_handle: ScrollHandle,
    version_label: String,
    alert: Option<String>,
    remove_confirmation: Option<String>,
    credential_prompt: Option<CredentialPrompt>,
    status_message: Option<String>,
    blink_on: bool,
    minimize_requested: bool,
    pending_focus: Option<FocusHandle>,
    log_viewer: Option<WindowHandle<LogViewer>>,
    edit_window: Option<WindowHandle<EditDialog>>,
    _bridge_task: Task<()>,
    stats_task: Option<Task<()>>,
    blink_task: Option<Task<()>>,
    status_message_task: Option<Task<()>>,
    focus_handle: FocusHandle,
    server_focus_handles: Vec<FocusHandle>,
    new_focus_handle: FocusHandle,
    edit_focus_handle: FocusHandle,
    remove_focus_handle: FocusHandle,
    connect_focus_handle: FocusHandle,
    disconnect_focus_handle: FocusHandle,
    show_log_focus_handle: FocusHandle,
    alert_focus_handle: FocusHandle,
    confirm_remove_focus_handle: FocusHandle,
    cancel_remove_focus_handle: FocusHandle,
    prompt_save_focus_handle: FocusHandle,
    prompt_ok_focus_handle: FocusHandle,
    prompt_cancel_focus_handle: FocusHandle,
}

impl OpenConnectApp {
    pub fn new(initialization: AppInitialization, context: &mut Context<Self>) -> Self {
        let AppInitialization {
            controller,
            mut events,
            store,
            app_state,
            version_label,
        } = initialization;

        let server_names = store.server_names();
        let selected = app_state
            .selected_index(&server_names)
            .map(|index| server_names[index].clone());
        let server_input = TextInput::new(
            context,
            "vpn.example.com:443",
            false,
            selected.as_deref(),
        );

        let bridge_task = context.spawn(async move |this: WeakEntity<Self>, context: &mut AsyncApp| {
            while let Some(message) = events.next().await {
                if let Err(error) = this.update(context, |this, context| {
                    this.on_bridge_message(message, context)
                }) {
                    log::warn!("[bridge] main view is gone, stopping: {error}");
                    break;
                }
            }
            log::debug!("[bridge] event stream closed");
        });

        Self {
            controller,
            store,
            app_state,
            server_focus_handles: server_names
                .iter()
                .map(|_| context.focus_handle())
                .collect(),
            server_names,
            server_input,
            server_scroll_handle: ScrollHandle::new(),
            version_label,
            alert: None,
            remove_confirmation: None,
            credential_prompt: None,
            status_message: None,
            blink_on: false,
            minimize_requested: false,
            pending_focus: None,
            log_viewer: None,
            edit_window: None,
            _bridge_task: bridge_task,
            stats_task: None,
            blink_task: None,
            status_message_task: None,
            focus_handle: context.focus_handle(),
            new_focus_handle: context.focus_handle(),
            edit_focus_handle: context.focus_handle(),
            remove_focus_handle: context.focus_handle(),
            connect_focus_handle: context.focus_handle(),
            disconnect_focus_handle: context.focus_handle(),
            show_log_focus_handle: context.focus_handle(),
            alert_focus_handle: context.focus_handle(),
            confirm_remove_focus_handle: context.focus_handle(),
            cancel_remove_focus_handle: context.focus_handle(),
            prompt_save_focus_handle: context.focus_handle(),
            prompt_ok_focus_handle: context.focus_handle(),
            prompt_cancel_focus_handle: context.focus_handle(),
        }
    }

    pub fn server_input(&self, context: &App) -> FocusHandle {
        self.server_input.read(context).focus_handle.clone()
    }

    fn selected_server(&self, context: &App) -> String {
        self.server_input.read(context).text().trim().to_string()
    }

    fn is_locked(&self) -> bool {
        self.controller.status() != ConnectionStatus::Disconnected
            || self.credential_prompt.is_some()
    }

    fn on_bridge_message(&mut self, message: BridgeMessage, context: &mut Context<Self>) {
        let effects = self.controller.handle(message, &mut self.store);
        self.apply(effects, context);
    }

    fn apply(&mut self, effects: Vec<Effect>, context: &mut Context<Self>) {
        for effect in effects {
            match effect {
                Effect::Log(line) => {
                    self.refresh_log_viewer(context);
                    self.show_status_message(line, context);
                }
                Effect::Alert(message) => {
                    log::warn!("[ui] {message}");
                    self.alert = Some(message);
                    self.pending_focus = Some(self.alert_focus_handle.clone());
                }
                Effect::StartStatsPolling => self.start_stats_polling(context),
                Effect::StopStatsPolling => self.stats_task = None,
                Effect::Minimize => self.minimize_requested = true,
                Effect::PromptCredentials(request) => self.show_credential_prompt(request, context),
                Effect::ProfileSaved(name) => {
                    log::info!("[settings] stored credentials for {name}");
                    self.reload_servers(None, context);
                }
            }
        }
        self.sync_blink(context);
        context.notify();
    }

    fn refresh_log_viewer(&mut self, context: &mut Context<Self>) {
        let closed = match self.log_viewer.as_ref() {
            Some(handle) => handle
                .update(context, |viewer, _, context| viewer.refresh(context))
                .is_err(),
            None => false,
        };
        if closed {
            self.log_viewer = None;
        }
    }

    fn show_status_message(&mut self, message: String, context: &mut Context<Self>) {
        self.status_message = Some(message);
        self.status_message_task = Some(context.spawn(
            async move |this: WeakEntity<Self>, context: &mut AsyncApp| {
                context
                    .background_executor()
                    .timer(STATUS_MESSAGE_DURATION)
                    .await;
                if let Err(error) = this.update(context, |this, context| {
                    this.status_message = None;
                    context.notify();
                }) {
                    log::debug!("[ui] status message expired after view closed: {error}");
                }
            },
        ));
    }

    fn start_stats_polling(&mut self, context: &mut Context<Self>) {
        log::debug!("[stats] polling every {STATS_POLL_INTERVAL:?}");
        self.stats_task = Some(context.spawn(
            async move |this: WeakEntity<Self>, context: &mut AsyncApp| {
                loop {
                    context
                        .background_executor()
                        .timer(STATS_POLL_INTERVAL)
                        .await;
                    let polling = this
                        .update(context, |this, context| {
                            let effects = this.controller.poll_stats();
                            this.apply(effects, context);
                            this.stats_task.is_some()
                        })
                        .unwrap_or(false);
                    if !polling {
                        break;
                    }
                }
            },
        ));
    }

    fn sync_blink(&mut self, context: &mut Context<Self>) {
        let connecting = self.controller.status() == ConnectionStatus::Connecting;
        if !connecting {
            self.blink_task = None;
            self.blink_on = false;
            return;
        }
        if self.blink_task.is_some() {
            return;
        }
        self.blink_on = true;
        self.blink_task = Some(context.spawn(
            async move |this: WeakEntity<Self>, context: &mut AsyncApp| {
                loop {
                    context.background_executor().timer(BLINK_INTERVAL).await;
                    let blinking = this
                        .update(context, |this, context| {
                            this.blink_on = !this.blink_on;
                            context.notify();
                            this.blink_task.is_some()
                        })
                        .unwrap_or(false);
                    if !blinking {
                        break;
                    }
                }
            },
        ));
    }

    fn show_credential_prompt(&mut self, request: CredentialRequest, context: &mut Context<Self>) {
        log::info!("[auth] credentials requested for {}", request.server);
        let save_password = self
            .store
            .load(&request.server)
            .is_some_and(|profile| profile.save_password);
        let username_input =
            TextInput::new(context, "Username", false, Some(&request.username));
        let password_input = TextInput::new(context, "Password", true, None);
        let group_input = TextInput::new(context, "Default group", false, Some(&request.group));

        let first_empty = if request.username.is_empty() {
            &username_input
        } else {
            &password_input
        };
        self.pending_focus = Some(first_empty.read(context).focus_handle.clone());

        self.credential_prompt = Some(CredentialPrompt {
            request,
            username_input,
            password_input,
            group_input,
            save_password,
        });
    }

    fn submit_credentials(&mut self, context: &mut Context<Self>) {
        let Some(prompt) = self.credential_prompt.take() else {
            return;
        };
        let credentials = Credentials {
            username: prompt.username_input.read(context).text().trim().to_string(),
            password: prompt.password_input.read(context).text(),
            group: prompt.group_input.read(context).text().trim().to_string(),
            save_password: prompt.save_password,
        };
        if prompt.request.reply.send(Some(credentials)).is_err() {
            log::warn!("[auth] session stopped waiting for credentials");
        }
        context.notify();
    }

    fn cancel_credentials(&mut self, context: &mut Context<Self>) {
        if let Some(prompt) = self.credential_prompt.take() {
            log::info!("[auth] prompt for {} cancelled", prompt.request.server);
            if prompt.request.reply.send(None).is_err() {
                log::debug!("[auth] session already gone");
            }
        }
        context.notify();
    }

    fn reload_servers(&mut self, select: Option<String>, context: &mut Context<Self>) {
        self.server_names = self.store.server_names();
        self.server_focus_handles = self
            .server_names
            .iter()
            .map(|_| context.focus_handle())
            .collect();
        if let Some(name) = select {
            self.select_server(&name, context);
        }
        context.notify();
    }

    fn select_server(&mut self, name: &str, context: &mut Context<Self>) {
        self.server_input
            .update(context, |input, context| input.set_text(name, context));
        self.remember_selection(name);
        context.notify();
    }

    fn remember_selection(&mut self, name: &str) {
        let selected = (!name.is_empty()).then(|| name.to_string());
        if self.app_state.selected_server != selected {
            self.app_state.selected_server = selected;
            self.app_state.save();
        }
    }

    /// Persists a profile coming from the edit window.
    pub fn store_profile(
        &mut self,
        original_name: &str,
        profile: ServerProfile,
        context: &mut Context<Self>,
    ) -> Result<(), String> {
        edit_dialog::validate(&profile, original_name, &self.store)?;
        self.store
            .save_renamed(original_name, &profile)
            .map_err(|error| {
                log::warn!("[settings] {error}");
                error.to_string()
            })?;

        let selected = self.selected_server(context);
        let select = (selected == original_name || selected.is_empty())
            .then(|| profile.name.clone());
        self.reload_servers(select, context);
        Ok(())
    }

    pub fn forget_credentials(&mut self, name: &str) -> Result<(), String> {
        self.store.clear_credentials(name).map_err(|error| {
            log::warn!("[settings] {error}");
            error.to_string()
        })?;
        log::info!("[settings] cleared stored credentials for {name}");
        Ok(())
    }

    fn connect(&mut self, _: &Connect, _window: &mut Window, context: &mut Context<Self>) {
        if !self.controller.can_connect() || self.credential_prompt.is_some() {
            return;
        }
        self.alert = None;
        self.remove_confirmation = None;
        let server = self.selected_server(context);
        log::info!("━━━ CONNECT {server} ━━━");
        let effects = self.controller.connect(&server, &self.store);
        if !effects
            .iter()
            .any(|effect| matches!(effect, Effect::Alert(_)))
        {
            self.remember_selection(&server);
        }
        self.apply(effects, context);
    }

    fn disconnect(&mut self, _: &Disconnect, _window: &mut Window, context: &mut Context<Self>) {
        if !self.controller.can_disconnect() {
            return;
        }
        log::info!("━━━ DISCONNECT ━━━");
        let effects = self.controller.disconnect();
        self.cancel_credentials(context);
        self.apply(effects, context);
    }

    fn new_server(&mut self, _: &NewServer, _window: &mut Window, context: &mut Context<Self>) {
        if self.is_locked() {
            return;
        }
        self.open_edit_dialog(None, context);
    }

    fn edit_server(&mut self, _: &EditServer, _window: &mut Window, context: &mut Context<Self>) {
        if self.is_locked() {
            return;
        }
        let name = self.selected_server(context);
        if name.is_empty() {
            self.open_edit_dialog(None, context);
        } else {
            let profile = self.store.load_or_new(&name);
            self.open_edit_dialog(Some(profile), context);
        }
    }

    fn open_edit_dialog(&mut self, profile: Option<ServerProfile>, context: &mut Context<Self>) {
        if let Some(handle) = self.edit_window.as_ref()
            && handle
                .update(context, |_, window, _| window.activate_window())
                .is_ok()
        {
            return;
        }

        let owner = context.entity().downgrade();
        let bounds = Bounds::centered(
            None,
            size(px(EDIT_WINDOW_WIDTH), px(EDIT_WINDOW_HEIGHT)),
            context,
        );
        match context.open_window(secondary_window_options(bounds), |window, context| {
            let dialog = context.new(|context| EditDialog::new(profile, owner, context));
            let handle = dialog.read(context).name_input(context);
            window.focus(&handle, context);
            dialog
        }) {
            Ok(handle) => self.edit_window = Some(handle),
            Err(error) => {
                log::error!("[edit] failed to open edit window: {error}");
                self.alert = Some("Failed to open the edit window".into());
                context.notify();
            }
        }
    }

    fn remove_server(
        &mut self,
        _: &RemoveServer,
        _window: &mut Window,
        context: &mut Context<Self>,
    ) {
        if self.is_locked() {
            return;
        }
        let name = self.selected_server(context);
        if name.is_empty() || !self.store.contains(&name) {
            return;
        }
        self.remove_confirmation = Some(name);
        self.pending_focus = Some(self.cancel_remove_focus_handle.clone());
        context.notify();
    }

    fn confirm_remove(&mut self, context: &mut Context<Self>) {
        let Some(name) = self.remove_confirmation.take() else {
            return;
        };
        match self.store.remove(&name) {
            Ok(_) => {
                self.reload_servers(Some(String::new()), context);
            }
            Err(error) => {
                log::warn!("[settings] {error}");
                self.alert = Some(format!("Failed to remove {name}: {error}"));
            }
        }
        context.notify();
    }

    fn cancel_remove(&mut self, context: &mut Context<Self>) {
        self.remove_confirmation = None;
        context.notify();
    }

    fn show_log(&mut self, _: &ShowLog, _window: &mut Window, context: &mut Context<Self>) {
        if let Some(handle) = self.log_viewer.as_ref()
            && handle
                .update(context, |_, window, _| window.activate_window())
                .is_ok()
        {
            return;
        }

        let log = self.controller.log().clone();
        let bounds = Bounds::centered(
            None,
            size(px(LOG_WINDOW_WIDTH), px(LOG_WINDOW_HEIGHT)),
            context,
        );
        match context.open_window(secondary_window_options(bounds), |window, context| {
            let viewer = context.new(|context| LogViewer::new(log, context));
            let handle = viewer.read(context).focus_handle(context);
            window.focus(&handle, context);
            viewer
        }) {
            Ok(handle) => self.log_viewer = Some(handle),
            Err(error) => {
                log::error!("[log_viewer] failed to open log window: {error}");
                self.alert = Some("Failed to open the log window".into());
                context.notify();
            }
        }
    }

    fn on_submit(&mut self, _: &Submit, window: &mut Window, context: &mut Context<Self>) {
        if self.credential_prompt.is_some() {
            self.submit_credentials(context);
        } else if self.remove_confirmation.is_none() {
            self.connect(&Connect, window, context);
        }
    }

    fn on_server_click(
        &mut self,
        index: usize,
        event: &MouseUpEvent,
        window: &mut Window,
        context: &mut Context<Self>,
    ) {
        if self.is_locked() {
            return;
        }
        let Some(name) = self.server_names.get(index).cloned() else {
            return;
        };
        self.remove_confirmation = None;
        self.select_server(&name, context);
        if event.click_count >= 2 {
            self.connect(&Connect, window, context);
        }
    }

    fn focus_order(&self, context: &App) -> Vec<FocusHandle> {
        let mut handles = Vec::new();
        if let Some(prompt) = self.credential_prompt.as_ref() {
            handles.extend(
                [
                    &prompt.username_input,
                    &prompt.password_input,
                    &prompt.group_input,
                ]
                .into_iter()
                .map(|input| input.read(context).focus_handle.clone()),
            );
            handles.extend([
                self.prompt_save_focus_handle.clone(),
                self.prompt_ok_focus_handle.clone(),
                self.prompt_cancel_focus_handle.clone(),
            ]);
            return handles;
        }
        if self.remove_confirmation.is_some() {
            return vec![
                self.cancel_remove_focus_handle.clone(),
                self.confirm_remove_focus_handle.clone(),
            ];
        }
        handles.push(self.server_input(context));
        handles.extend(self.server_focus_handles.iter().cloned());
        handles.extend([
            self.new_focus_handle.clone(),
            self.edit_focus_handle.clone(),
            self.remove_focus_handle.clone(),
            self.connect_focus_handle.clone(),
            self.disconnect_focus_handle.clone(),
            self.show_log_focus_handle.clone(),
        ]);
        if self.alert.is_some() {
            handles.push(self.alert_focus_handle.clone());
        }
        handles
    }

    fn focus_next(&mut self, _: &FocusNext, window: &mut Window, context: &mut Context<Self>) {
        let handles = self.focus_order(context);
        cycle_focus(&handles, true, window, context);
    }

    fn focus_previous(
        &mut self,
        _: &FocusPrevious,
        window: &mut Window,
        context: &mut Context<Self>,
    ) {
        let handles = self.focus_order(context);
        cycle_focus(&handles, false, window, context);
    }

    fn activate(&mut self, _: &Activate, window: &mut Window, context: &mut Context<Self>) {
        if let Some(index) = self
            .server_focus_handles
            .iter()
            .position(|handle| handle.is_focused(window))
        {
            if !self.is_locked()
                && let Some(name) = self.server_names.get(index).cloned()
            {
                self.select_server(&name, context);
            }
            return;
        }

        if self.alert_focus_handle.is_focused(window) {
            self.alert = None;
            context.notify();
        } else if self.cancel_remove_focus_handle.is_focused(window) {
            self.cancel_remove(context);
        } else if self.confirm_remove_focus_handle.is_focused(window) {
            self.confirm_remove(context);
        } else if self.prompt_save_focus_handle.is_focused(window) {
            if let Some(prompt) = self.credential_prompt.as_mut() {
                prompt.save_password = !prompt.save_password;
                context.notify();
            }
        } else if self.prompt_ok_focus_handle.is_focused(window) {
            self.submit_credentials(context);
        } else if self.prompt_cancel_focus_handle.is_focused(window) {
            self.cancel_credentials(context);
        } else if self.new_focus_handle.is_focused(window) {
            self.new_server(&NewServer, window, context);
        } else if self.edit_focus_handle.is_focused(window) {
            self.edit_server(&EditServer, window, context);
        } else if self.remove_focus_handle.is_focused(window) {
            self.remove_server(&RemoveServer, window, context);
        } else if self.disconnect_focus_handle.is_focused(window) {
            self.disconnect(&Disconnect, window, context);
        } else if self.show_log_focus_handle.is_focused(window) {
            self.show_log(&ShowLog, window, context);
        } else {
            self.connect(&Connect, window, context);
        }
    }

    fn close_secondary_windows(&mut self, context: &mut Context<Self>) {
        if let Some(handle) = self.log_viewer.take()
            && let Err(error) = handle.update(context, |_, window, _| window.remove_window())
        {
            log::debug!("[quit] log window already closed: {error}");
        }
        if let Some(handle) = self.edit_window.take()
            && let Err(error) = handle.update(context, |_, window, _| window.remove_window())
        {
            log::debug!("[quit] edit window already closed: {error}");
        }
    }

    /// Closing the main window from the window manager takes the same path as Quit.
    pub fn quit_on_close(&self, window: &mut Window, context: &mut Context<Self>) {
        let this = context.weak_entity();
        window.on_window_should_close(context, move |_, context| {
            if let Err(error) = this.update(context, |this, context| this.shut_down(context)) {
                log::debug!("[quit] main view already released: {error}");
            }
            context.quit();
            true
        });
    }

    fn shut_down(&mut self, context: &mut Context<Self>) {
        log::info!("[quit] shutting down");
        self.stats_task = None;
        self.blink_task = None;
        self.cancel_credentials(context);
        if !self.controller.shutdown() {
            log::warn!("[quit] session thread did not finish in time, leaving it behind");
        }
        self.close_secondary_windows(context);
    }

    fn quit(&mut self, _: &Quit, _window: &mut Window, context: &mut Context<Self>) {
        self.shut_down(context);
        context.quit();
    }
}

fn secondary_window_options(bounds: Bounds<gpui::Pixels>) -> WindowOptions {
    WindowOptions {
        window_bounds: Some(WindowBounds::Windowed(bounds)),
        titlebar: None,
        window_background: WindowBackgroundAppearance::Opaque,
        ..Default::default()
    }
}

impl Drop for OpenConnectApp {
    fn drop(&mut self) {
        log::info!("[drop] OpenConnectApp shutting down");
        if self.controller.session_running() && !self.controller.shutdown() {
            log::warn!("[drop] abandoning session thread");
        }
    }
}

impl Focusable for OpenConnectApp {
    fn focus_handle(&self, _: &App) -> FocusHandle {
        self.focus_handle.clone()
    }
}

impl Render for OpenConnectApp {
    fn render(&mut self, window: &mut Window, context: &mut Context<Self>) -> impl IntoElement {
        if std::mem::take(&mut self.minimize_requested) {
            window.minimize_window();
        }
        if let Some(handle) = self.pending_focus.take() {
            window.focus(&handle, context);
        }

        let locked = self.is_locked();
        self.server_input
            .update(context, |input, context| input.set_disabled(locked, context));

        div()
            .key_context("OpenConnectApp")
            .track_focus(&self.focus_handle(context))
            .on_action(context.listener(Self::connect))
            .on_action(context.listener(Self::disconnect))
            .on_action(context.listener(Self::new_server))
            .on_action(context.listener(Self::edit_server))
            .on_action(context.listener(Self::remove_server))
            .on_action(context.listener(Self::show_log))
            .on_action(context.listener(Self::on_submit))
            .on_action(context.listener(Self::focus_next))
            .on_action(context.listener(Self::focus_previous))
            .on_action(context.listener(Self::activate))
            .on_action(context.listener(Self::quit))
            .flex()
            .flex_col()
            .size_full()
            .bg(rgb(SURFACE))
            .child(self.render_titlebar(context))
            .child(
                div()
                    .flex()
                    .flex_row()
                    .flex_1()
                    .overflow_hidden()
                    .child(self.render_server_column(locked, context))
                    .child(self.render_connection_column(context)),
            )
            .child(status_bar(
                self.status_message.as_deref(),
                &self.version_label,
            ))
    }
}

impl OpenConnectApp {
    fn render_titlebar(&self, context: &mut Context<Self>) -> impl IntoElement {
        div()
            .flex()
            .flex_row()
            .items_center()
            .w_full()
            .h(px(TITLEBAR_HEIGHT))
            .bg(rgb(TITLEBAR_BACKGROUND))
            .child(
                titlebar_title("OpenConnect VPN")
                    .cursor(CursorStyle::default())
                    .on_mouse_down(
                        MouseButton::Left,
                        context.listener(|_, _, window, _| window.start_window_move()),
                    ),
            )
            .child(titlebar_close("Exit").on_mouse_up(
                MouseButton::Left,
                context.listener(|this, _, window, context| this.quit(&Quit, window, context)),
            ))
    }

    fn render_server_column(&self, locked: bool, context: &mut Context<Self>) -> impl IntoElement {
        let selected = self.selected_server(context);
        let removable = !locked && self.store.contains(&selected);

        let mut list = div()
            .id("server-list")
            .flex()
            .flex_col()
            .flex_1()
            .gap(px(GAP_EXTRA_SMALL))
            .overflow_y_scroll()
            .track_scroll(&self.server_scroll_handle);
        if self.server_names.is_empty() {
            list = list.child(status_detail(
                "No saved servers. Type a gateway above or add one.".into(),
            ));
        }
        for (index, name) in self.server_names.iter().enumerate() {
            list = list.child(
                server_item(name, *name == selected, locked)
                    .track_focus(&self.server_focus_handles[index])
                    .on_mouse_up(
                        MouseButton::Left,
                        context.listener(move |this, event: &MouseUpEvent, window, context| {
                            this.on_server_click(index, event, window, context)
                        }),
                    ),
            );
        }

        div()
            .flex()
            .flex_col()
            .w(px(LEFT_COLUMN_WIDTH))
            .flex_shrink_0()
            .border_r_1()
            .border_color(rgb(BORDER))
            .px(px(PADDING_COLUMN))
            .pb(px(PADDING_COLUMN))
            .pt(px(PADDING_COLUMN_TOP))
            .gap(px(GAP_MEDIUM))
            .child(field("Server", &self.server_input))
            .child(label("Saved servers"))
            .child(list)
            .child(
                div()
                    .flex()
                    .flex_row()
                    .gap(px(GAP_SMALL))
                    .child(button_ghost("New", locked, &self.new_focus_handle).when(
                        !locked,
                        |element| {
                            element.on_mouse_up(
                                MouseButton::Left,
                                context.listener(|this, _, window, context| {
                                    this.new_server(&NewServer, window, context)
                                }),
                            )
                        },
                    ))
                    .child(button_ghost("Edit", locked, &self.edit_focus_handle).when(
                        !locked,
                        |element| {
                            element.on_mouse_up(
                                MouseButton::Left,
                                context.listener(|this, _, window, context| {
                                    this.edit_server(&EditServer, window, context)
                                }),
                            )
                        },
                    ))
                    .child(
                        button_ghost("Remove", !removable, &self.remove_focus_handle).when(
                            removable,
                            |element| {
                                element.on_mouse_up(
                                    MouseButton::Left,
                                    context.listener(|this, _, window, context| {
                                        this.remove_server(&RemoveServer, window, context)
                                    }),
                                )
                            },
                        ),
                    ),
            )
            .when_some(self.remove_confirmation.clone(), |element, name| {
                element.child(
                    notice(
                        &format!("Are you sure you want to remove {name}?"),
                        BUTTON_DANGER,
                    )
                    .child(
                        div()
                            .flex()
                            .flex_row()
                            .gap(px(GAP_SMALL))
                            .child(
                                button_ghost("Cancel", false, &self.cancel_remove_focus_handle)
                                    .on_mouse_up(
                                        MouseButton::Left,
                                        context.listener(|this, _, _, context| {
                                            this.cancel_remove(context)
                                        }),
                                    ),
                            )
                            .child(
                                button_action(
                                    "Remove",
                                    BUTTON_DANGER,
                                    BUTTON_DANGER_HOVER,
                                    false,
                                    &self.confirm_remove_focus_handle,
                                )
                                .on_mouse_up(
                                    MouseButton::Left,
                                    context.listener(|this, _, _, context| {
                                        this.confirm_remove(context)
                                    }),
                                ),
                            ),
                    ),
                )
            })
    }

    fn render_connection_column(&self, context: &mut Context<Self>) -> impl IntoElement {
        let status = self.controller.status();
        let (status_text, icon_color, text_color) = match status {
            ConnectionStatus::Disconnected => ("Disconnected", COLOR_OFF, TEXT_DIM),
            ConnectionStatus::Connecting => (
                "Connecting…",
                if self.blink_on {
                    COLOR_CONNECTING
                } else {
                    COLOR_CONNECTING_DIM
                },
                COLOR_CONNECTING,
            ),
            ConnectionStatus::Connected => ("Connected", COLOR_ON, COLOR_ON),
        };
        let network = self.controller.network();
        let traffic = self.controller.traffic();
        let can_connect = self.controller.can_connect() && self.credential_prompt.is_none();
        let can_disconnect = self.controller.can_disconnect();

        div()
            .flex()
            .flex_col()
            .flex_1()
            .overflow_hidden()
            .px(px(PADDING_COLUMN))
            .pb(px(PADDING_COLUMN))
            .pt(px(PADDING_COLUMN_TOP))
            .gap(px(GAP_MEDIUM))
            .child(
                div()
                    .flex()
                    .flex_row()
                    .items_center()
                    .gap(px(GAP_MEDIUM))
                    .child(status_icon(icon_color))
                    .child(status_label(status_text, text_color)),
            )
            .child(
                div()
                    .flex()
                    .flex_col()
                    .gap(px(GAP_EXTRA_SMALL))
                    .child(info_row("IP", &network.ip))
                    .child(info_row("IPv6", &network.ip6))
                    .child(info_row("DNS", &network.dns))
                    .child(info_row(
                        "TX",
                        &traffic.map(|stats| stats.tx_label()).unwrap_or_default(),
                    ))
                    .child(info_row(
                        "RX",
                        &traffic.map(|stats| stats.rx_label()).unwrap_or_default(),
                    )),
            )
            .when_some(self.alert.clone(), |element, message| {
                element.child(
                    notice(&message, COLOR_RED).child(
                        div().w(px(DIALOG_BUTTON_WIDTH)).child(
                            button_ghost("OK", false, &self.alert_focus_handle).on_mouse_up(
                                MouseButton::Left,
                                context.listener(|this, _, _, context| {
                                    this.alert = None;
                                    context.notify();
                                }),
                            ),
                        ),
                    ),
                )
            })
            .when(self.credential_prompt.is_some(), |element| {
                element.child(self.render_credential_prompt(context))
            })
            .child(
                div()
                    .flex()
                    .flex_row()
                    .gap(px(GAP_SMALL))
                    .child(
                        button_action(
                            "Connect",
                            BUTTON_FILLED,
                            BUTTON_FILLED_HOVER,
                            !can_connect,
                            &self.connect_focus_handle,
                        )
                        .when(can_connect, |element| {
                            element.on_mouse_up(
                                MouseButton::Left,
                                context.listener(|this, _, window, context| {
                                    this.connect(&Connect, window, context)
                                }),
                            )
                        }),
                    )
                    .child(
                        button_action(
                            "Disconnect",
                            BUTTON_DANGER,
                            BUTTON_DANGER_HOVER,
                            !can_disconnect,
                            &self.disconnect_focus_handle,
                        )
                        .when(can_disconnect, |element| {
                            element.on_mouse_up(
                                MouseButton::Left,
                                context.listener(|this, _, window, context| {
                                    this.disconnect(&Disconnect, window, context)
                                }),
                            )
                        }),
                    ),
            )
            .child(
                button_ghost("Show log", false, &self.show_log_focus_handle).on_mouse_up(
                    MouseButton::Left,
                    context.listener(|this, _, window, context| {
                        this.show_log(&ShowLog, window, context)
                    }),
                ),
            )
    }

    fn render_credential_prompt(&self, context: &mut Context<Self>) -> impl IntoElement {
        let Some(prompt) = self.credential_prompt.as_ref() else {
            return div();
        };

        notice(
            &format!("Authentication required for {}", prompt.request.server),
            BORDER_FOCUS,
        )
        .child(field("Username", &prompt.username_input))
        .child(field("Password", &prompt.password_input))
        .child(field("Group", &prompt.group_input))
        .child(toggle(
            "Save password",
            prompt.save_password,
            false,
            &self.prompt_save_focus_handle,
            context.listener(|this, _, _, context| {
                if let Some(prompt) = this.credential_prompt.as_mut() {
                    prompt.save_password = !prompt.save_password;
                    context.notify();
                }
            }),
        ))
        .child(
            div()
                .flex()
                .flex_row()
                .gap(px(GAP_SMALL))
                .child(
                    button_action(
                        "Log in",
                        BUTTON_PRIMARY,
                        BUTTON_HOVER,
                        false,
                        &self.prompt_ok_focus_handle,
                    )
                    .on_mouse_up(
                        MouseButton::Left,
                        context.listener(|this, _, _, context| this.submit_credentials(context)),
                    ),
                )
                .child(
                    button_ghost("Cancel", false, &self.prompt_cancel_focus_handle).on_mouse_up(
                        MouseButton::Left,
                        context.listener(|this, _, _, context| this.cancel_credentials(context)),
                    ),
                ),
        )
    }
}
