use gpui::{
    App, ClipboardItem, Context, CursorStyle, FocusHandle, Focusable, MouseButton, ScrollHandle,
    Window, actions, div, prelude::*, px, rgb,
};

use crate::{bridge::SessionLog, components::*, theme::*};

actions!(log_viewer, [ClearLog, CopyLog, CloseLog]);

/// Read-only view of the session log. [`LogViewer::refresh`] runs on the UI
/// thread whenever a bridge log message is drained and pulls everything past
/// the last position shown.
pub struct LogViewer {
    focus_handle: FocusHandle,
    log: SessionLog,
    lines: Vec<String>,
    position: u64,
    scroll_handle: ScrollHandle,
    clear_focus_handle: FocusHandle,
    copy_focus_handle: FocusHandle,
    close_focus_handle: FocusHandle,
}

impl LogViewer {
    pub fn new(log: SessionLog, context: &mut Context<Self>) -> Self {
        let (lines, position) = log.since(0);
        let scroll_handle = ScrollHandle::new();
        scroll_handle.scroll_to_bottom();
        Self {
            focus_handle: context.focus_handle(),
            log,
            lines,
            position,
            scroll_handle,
            clear_focus_handle: context.focus_handle(),
            copy_focus_handle: context.focus_handle(),
            close_focus_handle: context.focus_handle(),
        }
    }

    pub fn refresh(&mut self, context: &mut Context<Self>) {
        let (lines, position) = self.log.since(self.position);
        self.position = position;
        if lines.is_empty() {
            return;
        }
        self.lines.extend(lines);
        self.scroll_handle.scroll_to_bottom();
        context.notify();
    }

    fn clear(&mut self, _: &ClearLog, _: &mut Window, context: &mut Context<Self>) {
        log::info!("[log_viewer] clearing {} lines", self.log.len());
        self.log.clear();
        self.lines.clear();
        context.notify();
    }

    fn copy(&mut self, _: &CopyLog, _: &mut Window, context: &mut Context<Self>) {
        context.write_to_clipboard(ClipboardItem::new_string(self.lines.join("\n")));
    }

    fn close(&mut self, _: &CloseLog, window: &mut Window, _: &mut Context<Self>) {
        window.remove_window();
    }
}

impl Focusable for LogViewer {
    fn focus_handle(&self, _: &App) -> FocusHandle {
        self.focus_handle.clone()
    }
}

impl Render for LogViewer {
    fn render(&mut self, _window: &mut Window, context: &mut Context<Self>) -> impl IntoElement {
        let empty = self.lines.is_empty();

        div()
            .key_context("LogViewer")
            .track_focus(&self.focus_handle(context))
            .on_action(context.listener(Self::clear))
            .on_action(context.listener(Self::copy))
            .on_action(context.listener(Self::close))
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
                        titlebar_title("Log")
                            .cursor(CursorStyle::default())
                            .on_mouse_down(
                                MouseButton::Left,
                                context.listener(|_, _, window, _| window.start_window_move()),
                            ),
                    )
                    .child(titlebar_close("Close").on_mouse_up(
                        MouseButton::Left,
                        context.listener(|this, _, window, context| {
                            this.close(&CloseLog, window, context)
                        }),
                    )),
            )
            .child(
                div()
                    .flex()
                    .flex_col()
                    .flex_1()
                    .overflow_hidden()
                    .gap(px(GAP_MEDIUM))
                    .px(px(PADDING_COLUMN))
                    .pb(px(PADDING_COLUMN))
                    .pt(px(PADDING_COLUMN_TOP))
                    .child(
                        log_container("log-viewer-scroll")
                            .track_scroll(&self.scroll_handle)
                            .text_size(px(TEXT_SIZE_EXTRA_SMALL))
                            .line_height(px(LINE_HEIGHT_EXTRA_SMALL))
                            .text_color(rgb(LOG_TEXT))
                            .when(empty, |element| {
                                element.child(
                                    div()
                                        .text_color(rgb(LOG_PLACEHOLDER))
                                        .child("No log output yet…"),
                                )
                            })
                            .children(
                                self.lines
                                    .iter()
                                    .map(|line| div().w_full().child(line.clone())),
                            ),
                    )
                    .child(
                        div()
                            .flex()
                            .flex_row()
                            .justify_end()
                            .gap(px(GAP_SMALL))
                            .child(
                                div().w(px(DIALOG_BUTTON_WIDTH)).child(
                                    button_ghost("Clear", empty, &self.clear_focus_handle).when(
                                        !empty,
                                        |element| {
                                            element.on_mouse_up(
                                                MouseButton::Left,
                                                context.listener(|this, _, window, context| {
                                                    this.clear(&ClearLog, window, context)
                                                }),
                                            )
                                        },
                                    ),
                                ),
                            )
                            .child(
                                div().w(px(DIALOG_BUTTON_WIDTH)).child(
                                    button_ghost("Copy", empty, &self.copy_focus_handle).when(
                                        !empty,
                                        |element| {
                                            element.on_mouse_up(
                                                MouseButton::Left,
                                                context.listener(|this, _, window, context| {
                                                    this.copy(&CopyLog, window, context)
                                                }),
                                            )
                                        },
                                    ),
                                ),
                            )
                            .child(
                                div().w(px(DIALOG_BUTTON_WIDTH)).child(
                                    button_action(
                                        "Close",
                                        BUTTON_FILLED,
                                        BUTTON_FILLED_HOVER,
                                        false,
                                        &self.close_focus_handle,
                                    )
                                    .on_mouse_up(
                                        MouseButton::Left,
                                        context.listener(|this, _, window, context| {
                                            this.close(&CloseLog, window, context)
                                        }),
                                    ),
                                ),
                            ),
                    ),
            )
    }
}
