// Light theme shared by the main window and the secondary dialogs.
//
// Inputs are outlined on the surface, the primary action is a dark filled
// button, and the orange accent is kept for focus rings, toggles and the
// connecting indicator.

// Backgrounds
pub const SURFACE: u32 = 0xeeeeee;
pub const TITLEBAR_BACKGROUND: u32 = 0xfafafa;
pub const INPUT_BACKGROUND: u32 = 0xeeeeee;
pub const LOG_BACKGROUND: u32 = 0xf5f5f4;
pub const PANEL_BACKGROUND: u32 = 0xfafafa;

// Borders
pub const BORDER: u32 = 0xccc9c7;
pub const BORDER_STRONG: u32 = 0x4d4947;
pub const BORDER_FOCUS: u32 = 0xef6f2e;

// Text
pub const TEXT_PRIMARY: u32 = 0x020202;
pub const TEXT_DIM: u32 = 0x5c5855;
pub const TEXT_WHITE: u32 = 0xffffff;
pub const INPUT_PLACEHOLDER: u32 = 0xa49d9a66;
pub const LOG_TEXT: u32 = 0x4d4947;
pub const LOG_PLACEHOLDER: u32 = 0xb8b3b0;

// Selected server row
pub const ACTIVE_BACKGROUND: u32 = 0xd6d3d2;
pub const ACTIVE_HOVER: u32 = 0xccc9c7;

// Buttons
pub const BUTTON_FILLED: u32 = 0x020202;
pub const BUTTON_FILLED_HOVER: u32 = 0x4d4947;
pub const BUTTON_PRIMARY: u32 = 0xef6f2e;
pub const BUTTON_HOVER: u32 = 0xd15010;
pub const BUTTON_DANGER: u32 = 0xd93050;
pub const BUTTON_DANGER_HOVER: u32 = 0xb8283e;

// Status icon frames: off, connecting (two frames), on
pub const COLOR_OFF: u32 = 0xa49d9a;
pub const COLOR_CONNECTING: u32 = 0xc47a10;
pub const COLOR_CONNECTING_DIM: u32 = 0xe8c48a;
pub const COLOR_ON: u32 = 0x2f9e44;
pub const COLOR_RED: u32 = 0xd93050;

pub const SELECTION: u32 = 0xef6f2e40;

// Typography
pub const TEXT_SIZE_LARGE: f32 = 15.0;
pub const TEXT_SIZE_MEDIUM: f32 = 13.0;
pub const TEXT_SIZE_SMALL: f32 = 12.0;
pub const TEXT_SIZE_EXTRA_SMALL: f32 = 10.0;

pub const LINE_HEIGHT_MEDIUM: f32 = 18.0;
pub const LINE_HEIGHT_EXTRA_SMALL: f32 = 14.0;

// Element sizing
pub const ELEMENT_HEIGHT: f32 = 32.0;
pub const TITLEBAR_HEIGHT: f32 = 32.0;
pub const STATUS_BAR_HEIGHT: f32 = 24.0;
pub const STATUS_ICON_SIZE: f32 = 56.0;
pub const INFO_LABEL_WIDTH: f32 = 56.0;

pub const RADIUS: f32 = 4.0;
pub const CURSOR_WIDTH: f32 = 2.0;

// Spacing
pub const GAP_EXTRA_SMALL: f32 = 4.0;
pub const GAP_SMALL: f32 = 8.0;
pub const GAP_MEDIUM: f32 = 12.0;

pub const PADDING_INPUT_HORIZONTAL: f32 = 10.0;
pub const PADDING_INPUT_VERTICAL: f32 = 6.0;
pub const PADDING_COLUMN: f32 = 20.0;
pub const PADDING_COLUMN_TOP: f32 = 8.0;
pub const PADDING_LOG: f32 = 8.0;

// Windows
pub const WINDOW_WIDTH: f32 = 760.0;
pub const WINDOW_HEIGHT: f32 = 540.0;
pub const LEFT_COLUMN_WIDTH: f32 = 320.0;
pub const EDIT_WINDOW_WIDTH: f32 = 460.0;
pub const EDIT_WINDOW_HEIGHT: f32 = 700.0;
pub const LOG_WINDOW_WIDTH: f32 = 720.0;
pub const LOG_WINDOW_HEIGHT: f32 = 480.0;
pub const DIALOG_BUTTON_WIDTH: f32 = 96.0;

// Toggle
pub const TOGGLE_WIDTH: f32 = 34.0;
pub const TOGGLE_HEIGHT: f32 = 18.0;
pub const TOGGLE_DOT_SIZE: f32 = 14.0;
pub const TOGGLE_DOT_ON_OFFSET: f32 = 18.0;
pub const TOGGLE_DOT_OFF_OFFSET: f32 = 2.0;
