use x11rb::protocol::xproto::{StackMode, Window};

use crate::bar::BarState;
use crate::client::SizeHints;
use crate::errors::WmError;
use crate::geometry::Rect;
use crate::keyboard::ButtonBinding;

pub type WmResult<T> = Result<T, WmError>;

/// ICCCM WM_STATE values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Withdrawn = 0,
    Normal = 1,
    Iconic = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WmHints {
    pub urgent: bool,
    /// `None` when the client did not set the input field.
    pub input: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowType {
    pub fullscreen: bool,
    pub dialog: bool,
}

/// A ConfigureRequest with only the fields the client asked for.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConfigureRequest {
    pub window: Window,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub border_width: Option<i32>,
    pub sibling: Option<Window>,
    pub stack_mode: Option<StackMode>,
}

impl ConfigureRequest {
    pub fn changes_geometry(&self) -> bool {
        self.x.is_some() || self.y.is_some() || self.width.is_some() || self.height.is_some()
    }
}

/// Commands and queries the window manager issues against the display server.
pub trait Protocol {
    fn root(&self) -> Window;
    fn screen_size(&self) -> (i32, i32);
    /// Physical screens, or `None` when the server has no multi-head support.
    fn query_screens(&self) -> Option<Vec<Rect>>;
    fn pointer_position(&self) -> Option<(i32, i32)>;
    /// Modifier bit Num Lock is currently mapped to.
    fn numlock_mask(&self) -> u16;

    /// Moves and resizes `window`, then tells it about its new geometry.
    fn configure_client(&mut self, window: Window, rect: Rect, border_width: i32)
    -> WmResult<()>;
    /// Synthetic ConfigureNotify for a client whose request was refused.
    fn send_configure_notify(
        &mut self,
        window: Window,
        rect: Rect,
        border_width: i32,
    ) -> WmResult<()>;
    fn move_window(&mut self, window: Window, x: i32, y: i32) -> WmResult<()>;
    fn raise_window(&mut self, window: Window) -> WmResult<()>;
    fn stack_below(&mut self, window: Window, sibling: Window) -> WmResult<()>;
    fn set_border_width(&mut self, window: Window, width: i32) -> WmResult<()>;
    fn set_border_color(&mut self, window: Window, focused: bool) -> WmResult<()>;
    fn grab_buttons(
        &mut self,
        window: Window,
        focused: bool,
        buttons: &[ButtonBinding],
    ) -> WmResult<()>;

    /// Gives `window` input focus and publishes it as the active window. `None`
    /// focuses the root and clears the active window.
    fn set_input_focus(&mut self, window: Option<Window>) -> WmResult<()>;
    fn set_active_window(&mut self, window: Window) -> WmResult<()>;
    /// Sends WM_TAKE_FOCUS if the client supports it.
    fn send_take_focus(&mut self, window: Window) -> WmResult<bool>;
    /// Politely asks the client to close, killing it if it does not support
    /// WM_DELETE_WINDOW.
    fn close_window(&mut self, window: Window) -> WmResult<()>;
    fn set_window_state(&mut self, window: Window, state: WindowState) -> WmResult<()>;
    fn set_urgency_hint(&mut self, window: Window, urgent: bool) -> WmResult<()>;
    fn set_fullscreen_property(&mut self, window: Window, fullscreen: bool) -> WmResult<()>;
    fn update_client_list(&mut self, windows: &[Window]) -> WmResult<()>;

    fn size_hints(&self, window: Window) -> Option<SizeHints>;
    fn wm_hints(&self, window: Window) -> Option<WmHints>;
    fn title(&self, window: Window) -> Option<String>;
    /// `(class, instance)`, empty strings when unset.
    fn class_instance(&self, window: Window) -> (String, String);
    fn transient_for(&self, window: Window) -> Option<Window>;
    fn window_type(&self, window: Window) -> WindowType;

    fn select_client_events(&mut self, window: Window) -> WmResult<()>;
    fn map_window(&mut self, window: Window) -> WmResult<()>;
    /// Hands a still-existing window back when it stops being managed.
    fn release_window(&mut self, window: Window, border_width: i32) -> WmResult<()>;
    fn configure_passthrough(&mut self, request: &ConfigureRequest) -> WmResult<()>;
    /// Flushes requests and discards EnterNotify events they generated.
    fn sync_and_drain_enter(&mut self) -> WmResult<()>;
}

/// Bar drawing.
pub trait Renderer {
    fn bar_height(&self) -> i32;
    /// Text width including horizontal padding.
    fn text_width(&self, text: &str) -> i32;
    fn create_bar(&mut self, rect: Rect) -> WmResult<Window>;
    fn move_bar(&mut self, bar: Window, rect: Rect) -> WmResult<()>;
    fn destroy_bar(&mut self, bar: Window) -> WmResult<()>;
    fn draw_bar(&mut self, bar: Window, state: &BarState) -> WmResult<()>;
}

pub trait Backend: Protocol + Renderer {}

impl<T: Protocol + Renderer> Backend for T {}
