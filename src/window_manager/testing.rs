//! In-memory backend that records every request, for driving the window
//! manager in tests.

use std::collections::{HashMap, HashSet};

use x11rb::protocol::xproto::{KeyButMask, Window};

use super::WindowManager;
use crate::Config;
use crate::backend::{
    ConfigureRequest, Protocol, Renderer, WindowState, WindowType, WmHints, WmResult,
};
use crate::bar::BarState;
use crate::client::SizeHints;
use crate::geometry::Rect;
use crate::keyboard::ButtonBinding;

pub(crate) const ROOT: Window = 0xffff;
const FIRST_BAR: Window = 1000;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Configure(Window, Rect, i32),
    Notify(Window, Rect, i32),
    Move(Window, i32, i32),
    Raise(Window),
    StackBelow(Window, Window),
    BorderWidth(Window, i32),
    BorderColor(Window, bool),
    GrabButtons(Window, bool),
    InputFocus(Option<Window>),
    ActiveWindow(Window),
    Close(Window),
    State(Window, WindowState),
    Urgency(Window, bool),
    Fullscreen(Window, bool),
    ClientList(Vec<Window>),
    SelectEvents(Window),
    Map(Window),
    Release(Window, i32),
    Passthrough(Window),
    Sync,
    CreateBar(Window, Rect),
    MoveBar(Window, Rect),
    DestroyBar(Window),
}

#[derive(Debug, Default)]
pub(crate) struct MockBackend {
    pub calls: Vec<Call>,
    pub screens: Option<Vec<Rect>>,
    pub screen_size: (i32, i32),
    pub pointer: Option<(i32, i32)>,
    pub numlock_mask: u16,
    pub titles: HashMap<Window, String>,
    pub classes: HashMap<Window, (String, String)>,
    pub transients: HashMap<Window, Window>,
    pub size_hints: HashMap<Window, SizeHints>,
    pub wm_hints: HashMap<Window, WmHints>,
    pub window_types: HashMap<Window, WindowType>,
    pub drawn: HashMap<Window, BarState>,
    pub destroyed_bars: Vec<Window>,
    next_bar: Window,
}

impl MockBackend {
    pub fn new(screens: Vec<Rect>) -> Self {
        let width = screens.iter().map(Rect::right).max().unwrap_or(0);
        let height = screens.iter().map(Rect::bottom).max().unwrap_or(0);
        Self {
            screens: Some(screens),
            screen_size: (width, height),
            pointer: Some((0, 0)),
            numlock_mask: u16::from(KeyButMask::MOD2),
            next_bar: FIRST_BAR,
            ..Self::default()
        }
    }

    /// The most recent input focus request.
    pub fn last_focus(&self) -> Option<Option<Window>> {
        self.calls.iter().rev().find_map(|call| match call {
            Call::InputFocus(window) => Some(*window),
            _ => None,
        })
    }
}

impl Protocol for MockBackend {
    fn root(&self) -> Window {
        ROOT
    }

    fn screen_size(&self) -> (i32, i32) {
        self.screen_size
    }

    fn query_screens(&self) -> Option<Vec<Rect>> {
        self.screens.clone()
    }

    fn pointer_position(&self) -> Option<(i32, i32)> {
        self.pointer
    }

    fn numlock_mask(&self) -> u16 {
        self.numlock_mask
    }

    fn configure_client(&mut self, window: Window, rect: Rect, border_width: i32) -> WmResult<()> {
        self.calls.push(Call::Configure(window, rect, border_width));
        Ok(())
    }

    fn send_configure_notify(
        &mut self,
        window: Window,
        rect: Rect,
        border_width: i32,
    ) -> WmResult<()> {
        self.calls.push(Call::Notify(window, rect, border_width));
        Ok(())
    }

    fn move_window(&mut self, window: Window, x: i32, y: i32) -> WmResult<()> {
        self.calls.push(Call::Move(window, x, y));
        Ok(())
    }

    fn raise_window(&mut self, window: Window) -> WmResult<()> {
        self.calls.push(Call::Raise(window));
        Ok(())
    }

    fn stack_below(&mut self, window: Window, sibling: Window) -> WmResult<()> {
        self.calls.push(Call::StackBelow(window, sibling));
        Ok(())
    }

    fn set_border_width(&mut self, window: Window, width: i32) -> WmResult<()> {
        self.calls.push(Call::BorderWidth(window, width));
        Ok(())
    }

    fn set_border_color(&mut self, window: Window, focused: bool) -> WmResult<()> {
        self.calls.push(Call::BorderColor(window, focused));
        Ok(())
    }

    fn grab_buttons(
        &mut self,
        window: Window,
        focused: bool,
        _buttons: &[ButtonBinding],
    ) -> WmResult<()> {
        self.calls.push(Call::GrabButtons(window, focused));
        Ok(())
    }

    fn set_input_focus(&mut self, window: Option<Window>) -> WmResult<()> {
        self.calls.push(Call::InputFocus(window));
        Ok(())
    }

    fn set_active_window(&mut self, window: Window) -> WmResult<()> {
        self.calls.push(Call::ActiveWindow(window));
        Ok(())
    }

    fn send_take_focus(&mut self, _window: Window) -> WmResult<bool> {
        Ok(false)
    }

    fn close_window(&mut self, window: Window) -> WmResult<()> {
        self.calls.push(Call::Close(window));
        Ok(())
    }

    fn set_window_state(&mut self, window: Window, state: WindowState) -> WmResult<()> {
        self.calls.push(Call::State(window, state));
        Ok(())
    }

    fn set_urgency_hint(&mut self, window: Window, urgent: bool) -> WmResult<()> {
        self.calls.push(Call::Urgency(window, urgent));
        Ok(())
    }

    fn set_fullscreen_property(&mut self, window: Window, fullscreen: bool) -> WmResult<()> {
        self.calls.push(Call::Fullscreen(window, fullscreen));
        Ok(())
    }

    fn update_client_list(&mut self, windows: &[Window]) -> WmResult<()> {
        self.calls.push(Call::ClientList(windows.to_vec()));
        Ok(())
    }

    fn size_hints(&self, window: Window) -> Option<SizeHints> {
        self.size_hints.get(&window).copied()
    }

    fn wm_hints(&self, window: Window) -> Option<WmHints> {
        self.wm_hints.get(&window).copied()
    }

    fn title(&self, window: Window) -> Option<String> {
        self.titles.get(&window).cloned()
    }

    fn class_instance(&self, window: Window) -> (String, String) {
        self.classes.get(&window).cloned().unwrap_or_default()
    }

    fn transient_for(&self, window: Window) -> Option<Window> {
        self.transients.get(&window).copied()
    }

    fn window_type(&self, window: Window) -> WindowType {
        self.window_types.get(&window).copied().unwrap_or_default()
    }

    fn select_client_events(&mut self, window: Window) -> WmResult<()> {
        self.calls.push(Call::SelectEvents(window));
        Ok(())
    }

    fn map_window(&mut self, window: Window) -> WmResult<()> {
        self.calls.push(Call::Map(window));
        Ok(())
    }

    fn release_window(&mut self, window: Window, border_width: i32) -> WmResult<()> {
        self.calls.push(Call::Release(window, border_width));
        Ok(())
    }

    fn configure_passthrough(&mut self, request: &ConfigureRequest) -> WmResult<()> {
        self.calls.push(Call::Passthrough(request.window));
        Ok(())
    }

    fn sync_and_drain_enter(&mut self) -> WmResult<()> {
        self.calls.push(Call::Sync);
        Ok(())
    }
}

impl Renderer for MockBackend {
    fn bar_height(&self) -> i32 {
        20
    }

    fn text_width(&self, text: &str) -> i32 {
        text.chars().count() as i32 * 6 + 6
    }

    fn create_bar(&mut self, rect: Rect) -> WmResult<Window> {
        let bar = self.next_bar;
        self.next_bar += 1;
        self.calls.push(Call::CreateBar(bar, rect));
        Ok(bar)
    }

    fn move_bar(&mut self, bar: Window, rect: Rect) -> WmResult<()> {
        self.calls.push(Call::MoveBar(bar, rect));
        Ok(())
    }

    fn destroy_bar(&mut self, bar: Window) -> WmResult<()> {
        self.calls.push(Call::DestroyBar(bar));
        self.destroyed_bars.push(bar);
        Ok(())
    }

    fn draw_bar(&mut self, bar: Window, state: &BarState) -> WmResult<()> {
        self.drawn.insert(bar, state.clone());
        Ok(())
    }
}

pub(crate) type TestManager = WindowManager<MockBackend>;

pub(crate) fn manager_with_screens(screens: Vec<Rect>) -> TestManager {
    WindowManager::new(Config::default(), MockBackend::new(screens)).unwrap()
}

pub(crate) fn single_screen() -> TestManager {
    manager_with_screens(vec![Rect::new(0, 0, 1920, 1080)])
}

pub(crate) fn manage_window(wm: &mut TestManager, window: Window) {
    wm.manage(window, Rect::new(10, 10, 400, 300), 1).unwrap();
}

/// Single screen with windows `1..=count` managed in order, so the newest
/// is selected and at the head of the client list.
pub(crate) fn manager_with_clients(count: Window) -> TestManager {
    let mut wm = single_screen();
    for window in 1..=count {
        manage_window(&mut wm, window);
    }
    wm
}

/// Every monitor's client list and focus stack hold the same windows, each
/// once, and every managed client sits in exactly one monitor's lists.
pub(crate) fn assert_lists_agree(wm: &TestManager) {
    let mut seen = 0;
    for (index, monitor) in wm.monitors.iter().enumerate() {
        let clients: HashSet<_> = monitor.clients.iter().collect();
        let stack: HashSet<_> = monitor.stack.iter().collect();
        assert_eq!(clients, stack);
        assert_eq!(clients.len(), monitor.clients.len());
        assert_eq!(stack.len(), monitor.stack.len());
        for window in &monitor.clients {
            assert_eq!(wm.clients[window].monitor_index, index);
        }
        seen += monitor.clients.len();
    }
    assert_eq!(seen, wm.clients.len());
}
