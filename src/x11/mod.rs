use std::collections::{HashMap, VecDeque};

use x11rb::connection::{Connection, RequestConnection};
use x11rb::cursor::Handle as CursorHandle;
use x11rb::errors::ReplyError;
use x11rb::protocol::Event;
use x11rb::protocol::xinerama::{self, ConnectionExt as _};
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{CURRENT_TIME, NONE};

use crate::backend::{
    ConfigureRequest, Protocol, Renderer, WindowState, WindowType, WmHints, WmResult,
};
use crate::bar::{Bar, BarState, Font};
use crate::client::SizeHints;
use crate::errors::{WmError, X11Error};
use crate::geometry::Rect;
use crate::keyboard::handlers::{
    self, ButtonBinding, Click, KeyBinding, KeyboardMapping, ignored_modifiers, modifiers_to_mask,
};
use crate::window_manager::DragKind;
use crate::{ColorScheme, Config};

pub mod atom;
pub mod events;
pub mod properties;

use atom::AtomCache;

pub type X11Result<T> = Result<T, X11Error>;

const FALLBACK_FONT: &str = "fixed";

struct Cursors {
    normal: Cursor,
    resize: Cursor,
    moving: Cursor,
}

/// The display server side of the window manager: one X connection, the bar
/// windows and the font they draw with.
pub struct X11Backend {
    connection: RustConnection,
    screen: Screen,
    root: Window,
    atoms: AtomCache,
    cursors: Cursors,
    font: Font,
    bars: HashMap<Window, Bar>,
    check_window: Window,
    scheme_normal: ColorScheme,
    scheme_selected: ColorScheme,
    border_focused: u32,
    border_unfocused: u32,
    keyboard_mapping: Option<KeyboardMapping>,
    /// Events read while syncing that still need handling.
    pending: VecDeque<Event>,
}

impl X11Backend {
    /// Connects to the display and takes over window management on the
    /// default screen.
    pub fn connect(config: &Config) -> WmResult<Self> {
        let (connection, screen_number) = x11rb::connect(None)?;
        let screen = connection.setup().roots[screen_number].clone();
        let root = screen.root;

        let redirect = connection
            .change_window_attributes(
                root,
                &ChangeWindowAttributesAux::new().event_mask(EventMask::SUBSTRUCTURE_REDIRECT),
            )?
            .check();
        if let Err(ReplyError::X11Error(_)) = redirect {
            return Err(WmError::OtherWmRunning);
        }
        redirect?;

        let database = x11rb::resource_manager::new_from_default(&connection)?;
        let handle = CursorHandle::new(&connection, screen_number, &database)?.reply()?;
        let cursors = Cursors {
            normal: handle.load_cursor(&connection, "left_ptr")?,
            resize: handle.load_cursor(&connection, "sizing")?,
            moving: handle.load_cursor(&connection, "fleur")?,
        };

        let font = match Font::open(&connection, &config.font) {
            Ok(font) => font,
            Err(error) => {
                tracing::warn!(%error, fallback = FALLBACK_FONT, "using fallback font");
                Font::open(&connection, FALLBACK_FONT)?
            }
        };

        let atoms = AtomCache::new(&connection)?;
        let check_window = connection.generate_id()?;
        connection.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            check_window,
            root,
            0,
            0,
            1,
            1,
            0,
            WindowClass::INPUT_OUTPUT,
            0,
            &CreateWindowAux::new(),
        )?;
        for window in [check_window, root] {
            connection.change_property32(
                PropMode::REPLACE,
                window,
                atoms.net_supporting_wm_check,
                AtomEnum::WINDOW,
                &[check_window],
            )?;
        }
        connection.change_property8(
            PropMode::REPLACE,
            check_window,
            atoms.net_wm_name,
            atoms.utf8_string,
            b"pwm",
        )?;
        connection.change_property32(
            PropMode::REPLACE,
            root,
            atoms.net_supported,
            AtomEnum::ATOM,
            &atoms.supported(),
        )?;
        connection.delete_property(root, atoms.net_client_list)?;

        connection
            .change_window_attributes(
                root,
                &ChangeWindowAttributesAux::new()
                    .cursor(cursors.normal)
                    .event_mask(
                        EventMask::SUBSTRUCTURE_REDIRECT
                            | EventMask::SUBSTRUCTURE_NOTIFY
                            | EventMask::BUTTON_PRESS
                            | EventMask::POINTER_MOTION
                            | EventMask::ENTER_WINDOW
                            | EventMask::LEAVE_WINDOW
                            | EventMask::STRUCTURE_NOTIFY
                            | EventMask::PROPERTY_CHANGE,
                    ),
            )?
            .check()?;

        tracing::info!(screen = screen_number, "connected to X server");

        Ok(Self {
            connection,
            screen,
            root,
            atoms,
            cursors,
            font,
            bars: HashMap::new(),
            check_window,
            scheme_normal: config.scheme_normal,
            scheme_selected: config.scheme_selected,
            border_focused: config.border_focused,
            border_unfocused: config.border_unfocused,
            keyboard_mapping: None,
            pending: VecDeque::new(),
        })
    }

    pub fn connection(&self) -> &RustConnection {
        &self.connection
    }

    pub fn atoms(&self) -> &AtomCache {
        &self.atoms
    }

    pub fn keyboard_mapping(&self) -> Option<&KeyboardMapping> {
        self.keyboard_mapping.as_ref()
    }

    pub fn grab_keys(&mut self, bindings: &[KeyBinding]) -> WmResult<()> {
        let mapping = handlers::grab_keys(&self.connection, self.root, bindings)?;
        self.keyboard_mapping = Some(mapping);
        Ok(())
    }

    /// Next event, handing out anything queued while syncing first.
    pub fn next_event(&mut self) -> WmResult<Event> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(event);
        }
        self.connection.flush()?;
        Ok(self.connection.wait_for_event()?)
    }

    /// Root window name, used as status text.
    pub fn root_name(&self) -> Option<String> {
        self.text_property(self.root, self.atoms.wm_name)
    }

    /// ICCCM WM_STATE of `window`, if it has one.
    pub fn wm_state(&self, window: Window) -> Option<u32> {
        let reply = self
            .connection
            .get_property(false, window, self.atoms.wm_state, self.atoms.wm_state, 0, 2)
            .ok()?
            .reply()
            .ok()?;
        reply.value32()?.next()
    }

    pub fn grab_pointer(&mut self, kind: DragKind) -> WmResult<bool> {
        let cursor = match kind {
            DragKind::Move => self.cursors.moving,
            DragKind::Resize => self.cursors.resize,
        };
        let reply = self
            .connection
            .grab_pointer(
                false,
                self.root,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                cursor,
                CURRENT_TIME,
            )?
            .reply()?;
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    pub fn ungrab_pointer(&mut self) -> WmResult<()> {
        self.connection.ungrab_pointer(CURRENT_TIME)?;
        Ok(())
    }

    pub fn warp_pointer(&mut self, window: Window, x: i32, y: i32) -> WmResult<()> {
        self.connection
            .warp_pointer(NONE, window, 0, 0, 0, 0, x as i16, y as i16)?;
        Ok(())
    }

    pub fn replay_pointer(&mut self, time: Timestamp) -> WmResult<()> {
        self.connection.allow_events(Allow::REPLAY_POINTER, time)?;
        Ok(())
    }

    /// Frees everything created at startup.
    pub fn cleanup(&mut self) -> WmResult<()> {
        for cursor in [self.cursors.normal, self.cursors.resize, self.cursors.moving] {
            self.connection.free_cursor(cursor)?;
        }
        self.font.close(&self.connection)?;
        self.connection.destroy_window(self.check_window)?;
        self.connection
            .delete_property(self.root, self.atoms.net_active_window)?;
        self.connection
            .set_input_focus(InputFocus::POINTER_ROOT, InputFocus::POINTER_ROOT, CURRENT_TIME)?;
        self.connection.flush()?;
        Ok(())
    }

    fn text_property(&self, window: Window, property: Atom) -> Option<String> {
        let reply = self
            .connection
            .get_property(false, window, property, AtomEnum::ANY, 0, 256)
            .ok()?
            .reply()
            .ok()?;
        if reply.value.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(&reply.value);
        Some(text.trim_end_matches('\0').to_string())
    }

    fn atom_list(&self, window: Window, property: Atom) -> Vec<Atom> {
        self.connection
            .get_property(false, window, property, AtomEnum::ATOM, 0, 32)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .and_then(|reply| reply.value32().map(|atoms| atoms.collect()))
            .unwrap_or_default()
    }

    fn hints_words(&self, window: Window) -> Option<Vec<u32>> {
        let reply = self
            .connection
            .get_property(false, window, AtomEnum::WM_HINTS, AtomEnum::WM_HINTS, 0, 9)
            .ok()?
            .reply()
            .ok()?;
        reply.value32().map(|words| words.collect())
    }

    /// Sends a WM_PROTOCOLS message if the client lists `protocol`.
    fn send_protocol(&mut self, window: Window, protocol: Atom) -> WmResult<bool> {
        if !self
            .atom_list(window, self.atoms.wm_protocols)
            .contains(&protocol)
        {
            return Ok(false);
        }

        let event = ClientMessageEvent {
            response_type: CLIENT_MESSAGE_EVENT,
            format: 32,
            sequence: 0,
            window,
            type_: self.atoms.wm_protocols,
            data: ClientMessageData::from([protocol, CURRENT_TIME, 0, 0, 0]),
        };
        self.connection
            .send_event(false, window, EventMask::NO_EVENT, event)?;
        Ok(true)
    }
}

impl Protocol for X11Backend {
    fn root(&self) -> Window {
        self.root
    }

    fn screen_size(&self) -> (i32, i32) {
        (
            self.screen.width_in_pixels as i32,
            self.screen.height_in_pixels as i32,
        )
    }

    fn query_screens(&self) -> Option<Vec<Rect>> {
        self.connection
            .extension_information(xinerama::X11_EXTENSION_NAME)
            .ok()??;
        let active = self.connection.xinerama_is_active().ok()?.reply().ok()?;
        if active.state == 0 {
            return None;
        }
        let reply = self
            .connection
            .xinerama_query_screens()
            .ok()?
            .reply()
            .ok()?;
        Some(
            reply
                .screen_info
                .iter()
                .map(|info| {
                    Rect::new(
                        info.x_org.into(),
                        info.y_org.into(),
                        info.width.into(),
                        info.height.into(),
                    )
                })
                .collect(),
        )
    }

    fn pointer_position(&self) -> Option<(i32, i32)> {
        let reply = self.connection.query_pointer(self.root).ok()?.reply().ok()?;
        Some((reply.root_x.into(), reply.root_y.into()))
    }

    fn numlock_mask(&self) -> u16 {
        self.keyboard_mapping
            .as_ref()
            .map_or(0, |mapping| mapping.numlock_mask)
    }

    fn configure_client(&mut self, window: Window, rect: Rect, border_width: i32) -> WmResult<()> {
        self.connection.configure_window(
            window,
            &ConfigureWindowAux::new()
                .x(rect.x)
                .y(rect.y)
                .width(rect.width.max(1) as u32)
                .height(rect.height.max(1) as u32)
                .border_width(border_width.max(0) as u32),
        )?;
        self.send_configure_notify(window, rect, border_width)
    }

    fn send_configure_notify(
        &mut self,
        window: Window,
        rect: Rect,
        border_width: i32,
    ) -> WmResult<()> {
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: NONE,
            x: rect.x as i16,
            y: rect.y as i16,
            width: rect.width.max(1) as u16,
            height: rect.height.max(1) as u16,
            border_width: border_width.max(0) as u16,
            override_redirect: false,
        };
        self.connection
            .send_event(false, window, EventMask::STRUCTURE_NOTIFY, event)?;
        Ok(())
    }

    fn move_window(&mut self, window: Window, x: i32, y: i32) -> WmResult<()> {
        self.connection
            .configure_window(window, &ConfigureWindowAux::new().x(x).y(y))?;
        Ok(())
    }

    fn raise_window(&mut self, window: Window) -> WmResult<()> {
        self.connection.configure_window(
            window,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        Ok(())
    }

    fn stack_below(&mut self, window: Window, sibling: Window) -> WmResult<()> {
        self.connection.configure_window(
            window,
            &ConfigureWindowAux::new()
                .sibling(sibling)
                .stack_mode(StackMode::BELOW),
        )?;
        Ok(())
    }

    fn set_border_width(&mut self, window: Window, width: i32) -> WmResult<()> {
        self.connection.configure_window(
            window,
            &ConfigureWindowAux::new().border_width(width.max(0) as u32),
        )?;
        Ok(())
    }

    fn set_border_color(&mut self, window: Window, focused: bool) -> WmResult<()> {
        let color = if focused {
            self.border_focused
        } else {
            self.border_unfocused
        };
        self.connection.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().border_pixel(color),
        )?;
        Ok(())
    }

    fn grab_buttons(
        &mut self,
        window: Window,
        focused: bool,
        buttons: &[ButtonBinding],
    ) -> WmResult<()> {
        self.connection
            .ungrab_button(ButtonIndex::ANY, window, ModMask::ANY)?;

        if !focused {
            self.connection.grab_button(
                false,
                window,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
                GrabMode::SYNC,
                GrabMode::SYNC,
                NONE,
                NONE,
                ButtonIndex::ANY,
                ModMask::ANY,
            )?;
        }

        for binding in buttons.iter().filter(|b| b.click == Click::ClientWindow) {
            let mask = modifiers_to_mask(&binding.modifiers);
            for ignore_mask in ignored_modifiers(self.numlock_mask()) {
                self.connection.grab_button(
                    false,
                    window,
                    EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
                    GrabMode::ASYNC,
                    GrabMode::SYNC,
                    NONE,
                    NONE,
                    ButtonIndex::from(binding.button),
                    ModMask::from(mask | ignore_mask),
                )?;
            }
        }
        Ok(())
    }

    fn set_input_focus(&mut self, window: Option<Window>) -> WmResult<()> {
        match window {
            Some(window) => {
                self.connection
                    .set_input_focus(InputFocus::POINTER_ROOT, window, CURRENT_TIME)?;
                self.set_active_window(window)?;
            }
            None => {
                self.connection
                    .set_input_focus(InputFocus::POINTER_ROOT, self.root, CURRENT_TIME)?;
                self.connection
                    .delete_property(self.root, self.atoms.net_active_window)?;
            }
        }
        Ok(())
    }

    fn set_active_window(&mut self, window: Window) -> WmResult<()> {
        self.connection.change_property32(
            PropMode::REPLACE,
            self.root,
            self.atoms.net_active_window,
            AtomEnum::WINDOW,
            &[window],
        )?;
        Ok(())
    }

    fn send_take_focus(&mut self, window: Window) -> WmResult<bool> {
        self.send_protocol(window, self.atoms.wm_take_focus)
    }

    fn close_window(&mut self, window: Window) -> WmResult<()> {
        if self.send_protocol(window, self.atoms.wm_delete_window)? {
            return Ok(());
        }
        tracing::info!(window, "client ignores WM_DELETE_WINDOW, killing it");
        self.connection.grab_server()?;
        self.connection.set_close_down_mode(CloseDown::DESTROY_ALL)?;
        self.connection.kill_client(window)?;
        self.connection.ungrab_server()?;
        Ok(())
    }

    fn set_window_state(&mut self, window: Window, state: WindowState) -> WmResult<()> {
        self.connection.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.wm_state,
            self.atoms.wm_state,
            &[state as u32, NONE],
        )?;
        Ok(())
    }

    fn set_urgency_hint(&mut self, window: Window, urgent: bool) -> WmResult<()> {
        let Some(mut words) = self.hints_words(window).filter(|words| !words.is_empty()) else {
            return Ok(());
        };
        if urgent {
            words[0] |= properties::hint_flags::URGENCY;
        } else {
            words[0] &= !properties::hint_flags::URGENCY;
        }
        self.connection.change_property32(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_HINTS,
            AtomEnum::WM_HINTS,
            &words,
        )?;
        Ok(())
    }

    fn set_fullscreen_property(&mut self, window: Window, fullscreen: bool) -> WmResult<()> {
        let atoms: &[Atom] = if fullscreen {
            &[self.atoms.net_wm_state_fullscreen]
        } else {
            &[]
        };
        self.connection.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.net_wm_state,
            AtomEnum::ATOM,
            atoms,
        )?;
        Ok(())
    }

    fn update_client_list(&mut self, windows: &[Window]) -> WmResult<()> {
        self.connection.change_property32(
            PropMode::REPLACE,
            self.root,
            self.atoms.net_client_list,
            AtomEnum::WINDOW,
            windows,
        )?;
        Ok(())
    }

    fn size_hints(&self, window: Window) -> Option<SizeHints> {
        let reply = self
            .connection
            .get_property(
                false,
                window,
                AtomEnum::WM_NORMAL_HINTS,
                AtomEnum::WM_SIZE_HINTS,
                0,
                properties::SIZE_HINTS_WORDS,
            )
            .ok()?
            .reply()
            .ok()?;
        let words: Vec<u32> = reply.value32()?.collect();
        (!words.is_empty()).then(|| properties::parse_size_hints(&words))
    }

    fn wm_hints(&self, window: Window) -> Option<WmHints> {
        properties::parse_wm_hints(&self.hints_words(window)?)
    }

    fn title(&self, window: Window) -> Option<String> {
        self.text_property(window, self.atoms.net_wm_name)
            .filter(|title| !title.is_empty())
            .or_else(|| self.text_property(window, self.atoms.wm_name))
    }

    fn class_instance(&self, window: Window) -> (String, String) {
        self.connection
            .get_property(false, window, AtomEnum::WM_CLASS, AtomEnum::STRING, 0, 1024)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .map(|reply| properties::parse_class(&reply.value))
            .unwrap_or_default()
    }

    fn transient_for(&self, window: Window) -> Option<Window> {
        let reply = self
            .connection
            .get_property(
                false,
                window,
                AtomEnum::WM_TRANSIENT_FOR,
                AtomEnum::WINDOW,
                0,
                1,
            )
            .ok()?
            .reply()
            .ok()?;
        reply.value32()?.next().filter(|&parent| parent != NONE)
    }

    fn window_type(&self, window: Window) -> WindowType {
        let state = self.atom_list(window, self.atoms.net_wm_state);
        let types = self.atom_list(window, self.atoms.net_wm_window_type);
        WindowType {
            fullscreen: state.contains(&self.atoms.net_wm_state_fullscreen),
            dialog: types.contains(&self.atoms.net_wm_window_type_dialog),
        }
    }

    fn select_client_events(&mut self, window: Window) -> WmResult<()> {
        self.connection.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().event_mask(
                EventMask::ENTER_WINDOW
                    | EventMask::FOCUS_CHANGE
                    | EventMask::PROPERTY_CHANGE
                    | EventMask::STRUCTURE_NOTIFY,
            ),
        )?;
        Ok(())
    }

    fn map_window(&mut self, window: Window) -> WmResult<()> {
        self.connection.map_window(window)?;
        Ok(())
    }

    fn release_window(&mut self, window: Window, border_width: i32) -> WmResult<()> {
        self.connection.grab_server()?;
        self.connection.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::NO_EVENT),
        )?;
        self.set_border_width(window, border_width)?;
        self.connection
            .ungrab_button(ButtonIndex::ANY, window, ModMask::ANY)?;
        self.set_window_state(window, WindowState::Withdrawn)?;
        self.connection.ungrab_server()?;
        self.connection.flush()?;
        Ok(())
    }

    fn configure_passthrough(&mut self, request: &ConfigureRequest) -> WmResult<()> {
        let mut aux = ConfigureWindowAux::new();
        if let Some(x) = request.x {
            aux = aux.x(x);
        }
        if let Some(y) = request.y {
            aux = aux.y(y);
        }
        if let Some(width) = request.width {
            aux = aux.width(width.max(1) as u32);
        }
        if let Some(height) = request.height {
            aux = aux.height(height.max(1) as u32);
        }
        if let Some(border_width) = request.border_width {
            aux = aux.border_width(border_width.max(0) as u32);
        }
        if let Some(sibling) = request.sibling {
            aux = aux.sibling(sibling);
        }
        if let Some(stack_mode) = request.stack_mode {
            aux = aux.stack_mode(stack_mode);
        }
        self.connection.configure_window(request.window, &aux)?;
        Ok(())
    }

    fn sync_and_drain_enter(&mut self) -> WmResult<()> {
        self.connection.get_input_focus()?.reply()?;
        while let Some(event) = self.connection.poll_for_event()? {
            if !matches!(event, Event::EnterNotify(_)) {
                self.pending.push_back(event);
            }
        }
        Ok(())
    }
}

impl Renderer for X11Backend {
    fn bar_height(&self) -> i32 {
        self.font.height() + 2
    }

    fn text_width(&self, text: &str) -> i32 {
        self.font.text_width(text) + self.font.height()
    }

    fn create_bar(&mut self, rect: Rect) -> WmResult<Window> {
        let bar = Bar::new(
            &self.connection,
            &self.screen,
            &self.font,
            self.scheme_normal,
            rect,
        )?;
        self.connection.change_window_attributes(
            bar.window(),
            &ChangeWindowAttributesAux::new().cursor(self.cursors.normal),
        )?;
        let window = bar.window();
        self.bars.insert(window, bar);
        Ok(window)
    }

    fn move_bar(&mut self, bar: Window, rect: Rect) -> WmResult<()> {
        if let Some(bar) = self.bars.get_mut(&bar) {
            bar.move_resize(&self.connection, rect)?;
        }
        Ok(())
    }

    fn destroy_bar(&mut self, bar: Window) -> WmResult<()> {
        if let Some(bar) = self.bars.remove(&bar) {
            bar.destroy(&self.connection)?;
        }
        Ok(())
    }

    fn draw_bar(&mut self, bar: Window, state: &BarState) -> WmResult<()> {
        if let Some(bar) = self.bars.get(&bar) {
            bar.draw(
                &self.connection,
                &self.font,
                self.scheme_normal,
                self.scheme_selected,
                state,
            )?;
        }
        Ok(())
    }
}
