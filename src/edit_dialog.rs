use gpui::{
    App, Context, CursorStyle, Entity, FocusHandle, Focusable, MouseButton, WeakEntity, Window,
    actions, div, prelude::*, px, rgb,
};

use crate::{
    app::{Activate, FocusNext, FocusPrevious, OpenConnectApp},
    components::*,
    session::Gateway,
    settings::{ProfileStore, Protocol, ServerProfile},
    text_input::{Submit, TextInput},
    theme::*,
};

actions!(edit_dialog, [SaveServer, CancelEdit, ForgetCredentials]);

/// Checks an edited profile before it replaces `original_name` in `store`.
pub fn validate(
    profile: &ServerProfile,
    original_name: &str,
    store: &ProfileStore,
) -> Result<(), String> {
    if profile.name.is_empty() {
        return Err("The server name must not be empty".into());
    }
    if profile.server.is_empty() {
        return Err("You need to specify a gateway. E.g. vpn.example.com:443".into());
    }
    if profile.name != original_name && store.contains(&profile.name) {
        return Err(format!("A server named {} already exists", profile.name));
    }
    Gateway::parse(&profile.server).map_err(|error| error.to_string())?;
    Ok(())
}

pub struct EditDialog {
    focus_handle: FocusHandle,
    owner: WeakEntity<OpenConnectApp>,
    original_name: String,
    name_input: Entity<TextInput>,
    gateway_input: Entity<TextInput>,
    username_input: Entity<TextInput>,
    group_input: Entity<TextInput>,
    password_input: Entity<TextInput>,
    certificate_input: Entity<TextInput>,
    protocol: Protocol,
    save_password: bool,
    minimize_on_connect: bool,
    use_system_proxy: bool,
    disable_dtls: bool,
    error: Option<String>,
    protocol_focus_handles: Vec<FocusHandle>,
    save_password_focus_handle: FocusHandle,
    minimize_focus_handle: FocusHandle,
    system_proxy_focus_handle: FocusHandle,
    disable_dtls_focus_handle: FocusHandle,
    save_focus_handle: FocusHandle,
    cancel_focus_handle: FocusHandle,
    forget_focus_handle: FocusHandle,
}

impl EditDialog {
    /// `profile` is `None` for a new server.
    pub fn new(
        profile: Option<ServerProfile>,
        owner: WeakEntity<OpenConnectApp>,
        context: &mut Context<Self>,
    ) -> Self {
        let original_name = profile
            .as_ref()
            .map(|profile| profile.name.clone())
            .unwrap_or_default();
        let profile = profile.unwrap_or_else(|| ServerProfile::new(""));

        let name_input = TextInput::new(context, "Work VPN", false, Some(&profile.name));
        let gateway_input =
            TextInput::new(context, "vpn.example.com:443", false, Some(&profile.server));
        let username_input = TextInput::new(context, "Username", false, Some(&profile.username));
        let group_input = TextInput::new(context, "Default group", false, Some(&profile.group));
        let password_input =
            TextInput::new(context, "Asked on connect", true, Some(&profile.password));
        let certificate_input = TextInput::new(
            context,
            "pin-sha256:…",
            false,
            Some(&profile.server_certificate),
        );

        Self {
            focus_handle: context.focus_handle(),
            owner,
            original_name,
            name_input,
            gateway_input,
            username_input,
            group_input,
            password_input,
            certificate_input,
            protocol: profile.protocol,
            save_password: profile.save_password,
            minimize_on_connect: profile.minimize_on_connect,
            use_system_proxy: profile.use_system_proxy,
            disable_dtls: profile.disable_dtls,
            error: None,
            protocol_focus_handles: Protocol::ALL
                .iter()
                .map(|_| context.focus_handle())
                .collect(),
            save_password_focus_handle: context.focus_handle(),
            minimize_focus_handle: context.focus_handle(),
            system_proxy_focus_handle: context.focus_handle(),
            disable_dtls_focus_handle: context.focus_handle(),
            save_focus_handle: context.focus_handle(),
            cancel_focus_handle: context.focus_handle(),
            forget_focus_handle: context.focus_handle(),
        }
    }

    pub fn name_input(&self, context: &App) -> FocusHandle {
        self.name_input.read(context).focus_handle.clone()
    }

    fn collect(&self, context: &App) -> ServerProfile {
        let text = |input: &Entity<TextInput>| input.read(context).text().trim().to_string();
        ServerProfile {
            name: text(&self.name_input),
            server: text(&self.gateway_input),
            username: text(&self.username_input),
            password: self.password_input.read(context).text(),
            group: text(&self.group_input),
            save_password: self.save_password,
            minimize_on_connect: self.minimize_on_connect,
            protocol: self.protocol,
            server_certificate: text(&self.certificate_input),
            use_system_proxy: self.use_system_proxy,
            disable_dtls: self.disable_dtls,
        }
    }

    fn save(&mut self, _: &SaveServer, window: &mut Window, context: &mut Context<Self>) {
        let profile = self.collect(context);
        let original_name = self.original_name.clone();
        let result = self.owner.update(context, |app, context| {
            app.store_profile(&original_name, profile, context)
        });
        match result {
            Ok(Ok(())) => window.remove_window(),
            Ok(Err(message)) => {
                log::info!("[edit] rejected: {message}");
                self.error = Some(message);
                context.notify();
            }
            Err(error) => {
                log::warn!("[edit] main window is gone: {error}");
                window.remove_window();
            }
        }
    }

    fn submit(&mut self, _: &Submit, window: &mut Window, context: &mut Context<Self>) {
        self.save(&SaveServer, window, context);
    }

    /// Drops the stored password and group of the server being edited.
    fn forget_credentials(
        &mut self,
        _: &ForgetCredentials,
        _: &mut Window,
        context: &mut Context<Self>,
    ) {
        if self.original_name.is_empty() {
            return;
        }
        let name = self.original_name.clone();
        let result = self
            .owner
            .update(context, |app, _| app.forget_credentials(&name));
        match result {
            Ok(Ok(())) => {
                self.error = None;
                self.password_input
                    .update(context, |input, context| input.set_text("", context));
                self.group_input
                    .update(context, |input, context| input.set_text("", context));
            }
            Ok(Err(message)) => self.error = Some(message),
            Err(error) => log::warn!("[edit] main window is gone: {error}"),
        }
        context.notify();
    }

    fn cancel(&mut self, _: &CancelEdit, window: &mut Window, _: &mut Context<Self>) {
        window.remove_window();
    }

    fn focus_order(&self, context: &App) -> Vec<FocusHandle> {
        let mut handles: Vec<FocusHandle> = [
            &self.name_input,
            &self.gateway_input,
            &self.username_input,
            &self.group_input,
            &self.password_input,
        ]
        .into_iter()
        .map(|input| input.read(context).focus_handle.clone())
        .collect();
        handles.push(self.save_password_focus_handle.clone());
        handles.extend(self.protocol_focus_handles.iter().cloned());
        handles.push(self.certificate_input.read(context).focus_handle.clone());
        handles.extend([
            self.minimize_focus_handle.clone(),
            self.system_proxy_focus_handle.clone(),
            self.disable_dtls_focus_handle.clone(),
            self.save_focus_handle.clone(),
            self.cancel_focus_handle.clone(),
        ]);
        if !self.original_name.is_empty() {
            handles.push(self.forget_focus_handle.clone());
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
            .protocol_focus_handles
            .iter()
            .position(|handle| handle.is_focused(window))
        {
            self.protocol = Protocol::ALL[index];
        } else if self.save_password_focus_handle.is_focused(window) {
            self.save_password = !self.save_password;
        } else if self.minimize_focus_handle.is_focused(window) {
            self.minimize_on_connect = !self.minimize_on_connect;
        } else if self.system_proxy_focus_handle.is_focused(window) {
            self.use_system_proxy = !self.use_system_proxy;
        } else if self.disable_dtls_focus_handle.is_focused(window) {
            self.disable_dtls = !self.disable_dtls;
        } else if self.save_focus_handle.is_focused(window) {
            self.save(&SaveServer, window, context);
            return;
        } else if self.cancel_focus_handle.is_focused(window) {
            self.cancel(&CancelEdit, window, context);
            return;
        } else if self.forget_focus_handle.is_focused(window) {
            self.forget_credentials(&ForgetCredentials, window, context);
            return;
        } else {
            return;
        }
        context.notify();
    }

    fn render_protocol_selector(&self, context: &mut Context<Self>) -> impl IntoElement {
        let mut row = selector_row();
        for (index, protocol) in Protocol::ALL.into_iter().enumerate() {
            row = row.child(
                selector_option(
                    protocol.label(),
                    self.protocol == protocol,
                    false,
                    &self.protocol_focus_handles[index],
                )
                .on_mouse_up(
                    MouseButton::Left,
                    context.listener(move |this, _, _, context| {
                        this.protocol = protocol;
                        context.notify();
                    }),
                ),
            );
        }
        selector("Protocol", row)
    }

    fn render_toggles(&self, context: &mut Context<Self>) -> impl IntoElement {
        div()
            .flex()
            .flex_col()
            .gap(px(GAP_SMALL))
            .child(toggle(
                "Minimize on connect",
                self.minimize_on_connect,
                false,
                &self.minimize_focus_handle,
                context.listener(|this, _, _, context| {
                    this.minimize_on_connect = !this.minimize_on_connect;
                    context.notify();
                }),
            ))
            .child(toggle(
                "Use system proxy",
                self.use_system_proxy,
                false,
                &self.system_proxy_focus_handle,
                context.listener(|this, _, _, context| {
                    this.use_system_proxy = !this.use_system_proxy;
                    context.notify();
                }),
            ))
            .child(toggle(
                "Disable UDP (DTLS)",
                self.disable_dtls,
                false,
                &self.disable_dtls_focus_handle,
                context.listener(|this, _, _, context| {
                    this.disable_dtls = !this.disable_dtls;
                    context.notify();
                }),
            ))
    }
}

impl Focusable for EditDialog {
    fn focus_handle(&self, _: &App) -> FocusHandle {
        self.focus_handle.clone()
    }
}

impl Render for EditDialog {
    fn render(&mut self, _window: &mut Window, context: &mut Context<Self>) -> impl IntoElement {
        let title = if self.original_name.is_empty() {
            "New server".to_string()
        } else {
            format!("Edit {}", self.original_name)
        };

        div()
            .key_context("EditDialog")
            .track_focus(&self.focus_handle(context))
            .on_action(context.listener(Self::save))
            .on_action(context.listener(Self::submit))
            .on_action(context.listener(Self::cancel))
            .on_action(context.listener(Self::forget_credentials))
            .on_action(context.listener(Self::focus_next))
            .on_action(context.listener(Self::focus_previous))
            .on_action(context.listener(Self::activate))
            .flex()
            .flex_col()
            .size_full()
            .bg(rgb(SURFACE))
            .child(
                div()
                    .flex()
                    .flex_row()
                    .items_center()
                    .w_full()
                    .h(px(TITLEBAR_HEIGHT))
                    .bg(rgb(TITLEBAR_BACKGROUND))
                    .child(
                        titlebar_title(&title)
                            .cursor(CursorStyle::default())
                            .on_mouse_down(
                                MouseButton::Left,
                                context.listener(|_, _, window, _| window.start_window_move()),
                            ),
                    )
                    .child(titlebar_close("Cancel").on_mouse_up(
                        MouseButton::Left,
                        context.listener(|this, _, window, context| {
                            this.cancel(&CancelEdit, window, context)
                        }),
                    )),
            )
            .child(
                div()
                    .id("edit-scroll")
                    .flex()
                    .flex_col()
                    .flex_1()
                    .overflow_y_scroll()
                    .gap(px(GAP_MEDIUM))
                    .px(px(PADDING_COLUMN))
                    .pb(px(PADDING_COLUMN))
                    .pt(px(PADDING_COLUMN_TOP))
                    .child(field("Name", &self.name_input))
                    .child(field("Gateway", &self.gateway_input))
                    .child(field("Username", &self.username_input))
                    .child(field("Group", &self.group_input))
                    .child(field("Password", &self.password_input))
                    .child(toggle(
                        "Save password",
                        self.save_password,
                        false,
                        &self.save_password_focus_handle,
                        context.listener(|this, _, _, context| {
                            this.save_password = !this.save_password;
                            context.notify();
                        }),
                    ))
                    .child(self.render_protocol_selector(context))
                    .child(field("Server certificate", &self.certificate_input))
                    .child(self.render_toggles(context))
                    .when_some(self.error.clone(), |element, error| {
                        element.child(notice(&error, COLOR_RED))
                    })
                    .child(
                        div()
                            .flex()
                            .flex_row()
                            .gap(px(GAP_SMALL))
                            .child(
                                button_action(
                                    "Save",
                                    BUTTON_FILLED,
                                    BUTTON_FILLED_HOVER,
                                    false,
                                    &self.save_focus_handle,
                                )
                                .on_mouse_up(
                                    MouseButton::Left,
                                    context.listener(|this, _, window, context| {
                                        this.save(&SaveServer, window, context)
                                    }),
                                ),
                            )
                            .child(
                                button_ghost("Cancel", false, &self.cancel_focus_handle)
                                    .on_mouse_up(
                                        MouseButton::Left,
                                        context.listener(|this, _, window, context| {
                                            this.cancel(&CancelEdit, window, context)
                                        }),
                                    ),
                            )
                            .when(!self.original_name.is_empty(), |element| {
                                element.child(
                                    button_ghost(
                                        "Forget credentials",
                                        false,
                                        &self.forget_focus_handle,
                                    )
                                    .on_mouse_up(
                                        MouseButton::Left,
                                        context.listener(|this, _, window, context| {
                                            this.forget_credentials(
                                                &ForgetCredentials,
                                                window,
                                                context,
                                            )
                                        }),
                                    ),
                                )
                            }),
                    ),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SETTINGS_FILE_NAME;

    fn store_with(names: &[&str]) -> (tempfile::TempDir, ProfileStore) {
        let directory = tempfile::tempdir().unwrap();
        let mut store = ProfileStore::open(&directory.path().join(SETTINGS_FILE_NAME)).unwrap();
        for name in names {
            store.save(&ServerProfile::new(name)).unwrap();
        }
        (directory, store)
    }

    #[test]
    fn test_requires_name_and_gateway() {
        let (_directory, store) = store_with(&[]);
        let mut profile = ServerProfile::new("");
        assert!(validate(&profile, "", &store).is_err());

        profile.name = "work".into();
        let error = validate(&profile, "", &store).unwrap_err();
        assert!(error.contains("gateway"));

        profile.server = "vpn.example.com".into();
        assert_eq!(validate(&profile, "", &store), Ok(()));
    }

    #[test]
    fn test_rename_onto_existing_name_rejected() {
        let (_directory, store) = store_with(&["a.example.com", "b.example.com"]);
        let mut profile = store.load("a.example.com").unwrap();
        profile.name = "b.example.com".into();
        assert!(validate(&profile, "a.example.com", &store).is_err());

        profile.name = "a.example.com".into();
        assert_eq!(validate(&profile, "a.example.com", &store), Ok(()));
    }

    #[test]
    fn test_unparsable_gateway_rejected() {
        let (_directory, store) = store_with(&[]);
        let mut profile = ServerProfile::new("work");
        profile.server = "ftp://gw".into();
        let error = validate(&profile, "", &store).unwrap_err();
        assert_eq!(error, "Failed to parse server URL 'ftp://gw'");
    }
}
