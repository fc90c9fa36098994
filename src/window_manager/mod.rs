mod actions;
mod arrange;
mod clients;
mod drag;
mod focus;
mod placement;
mod reconcile;
mod stack;
mod tags;
#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashMap;

use x11rb::protocol::xproto::Window;

use crate::Config;
use crate::backend::{Backend, WmResult};
use crate::bar::{BarState, TagState};
use crate::client::{Client, TagMask};
use crate::monitor::Monitor;
use crate::signal::Children;

pub use clients::Property;
pub use drag::{Drag, DragKind};
pub use placement::Edge;

pub struct WindowManager<B: Backend> {
    pub(crate) config: Config,
    pub(crate) backend: B,
    pub(crate) clients: HashMap<Window, Client>,
    pub(crate) monitors: Vec<Monitor>,
    pub(crate) selected_monitor: usize,
    pub(crate) screen_width: i32,
    pub(crate) screen_height: i32,
    pub(crate) bar_height: i32,
    pub(crate) status_text: String,
    pub(crate) running: bool,
    /// Monitor the pointer was last seen on while moving over the root.
    pub(crate) motion_monitor: Option<usize>,
    pub(crate) pending_drag: Option<DragKind>,
    pub(crate) children: Children,
}

impl<B: Backend> WindowManager<B> {
    pub fn new(config: Config, backend: B) -> WmResult<Self> {
        let (screen_width, screen_height) = backend.screen_size();
        let bar_height = backend.bar_height();

        let mut window_manager = Self {
            config,
            backend,
            clients: HashMap::new(),
            monitors: Vec::new(),
            selected_monitor: 0,
            screen_width,
            screen_height,
            bar_height,
            status_text: default_status(),
            running: true,
            motion_monitor: None,
            pending_drag: None,
            children: Children::default(),
        };

        window_manager.update_geometry()?;
        window_manager.update_bars()?;
        window_manager.focus(None)?;

        tracing::info!(
            monitors = window_manager.monitors.len(),
            width = screen_width,
            height = screen_height,
            "window manager initialised"
        );

        Ok(window_manager)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn quit(&mut self) {
        tracing::info!("quit requested");
        self.running = false;
    }

    pub fn start_autostart(&mut self) {
        for command in &self.config.autostart {
            self.children.autostart(command);
        }
    }

    pub fn reap_children(&mut self) {
        self.children.reap();
    }

    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    pub fn selected_monitor(&self) -> usize {
        self.selected_monitor
    }

    pub fn client(&self, window: Window) -> Option<&Client> {
        self.clients.get(&window)
    }

    pub fn is_managed(&self, window: Window) -> bool {
        self.clients.contains_key(&window)
    }

    pub fn selected_client(&self) -> Option<Window> {
        self.monitors
            .get(self.selected_monitor)
            .and_then(|monitor| monitor.selected_client)
    }

    pub fn take_pending_drag(&mut self) -> Option<DragKind> {
        self.pending_drag.take()
    }

    pub(crate) fn tag_mask(&self) -> TagMask {
        self.config.tag_mask()
    }

    pub(crate) fn is_visible(&self, window: Window) -> bool {
        let Some(client) = self.clients.get(&window) else {
            return false;
        };
        self.monitors
            .get(client.monitor_index)
            .is_some_and(|monitor| monitor.is_visible(client.tags))
    }

    pub(crate) fn is_tiled(&self, window: Window) -> bool {
        self.is_visible(window) && self.clients.get(&window).is_some_and(|c| !c.is_floating)
    }

    /// Root window name changed. `None` restores the default text.
    pub fn set_status_text(&mut self, text: Option<String>) -> WmResult<()> {
        self.status_text = text.unwrap_or_else(default_status);
        self.draw_bar(self.selected_monitor)
    }

    pub fn bar_state(&self, monitor_index: usize) -> BarState {
        let Some(monitor) = self.monitors.get(monitor_index) else {
            return BarState::default();
        };
        let is_selected_monitor = monitor_index == self.selected_monitor;

        let mut occupied: TagMask = 0;
        let mut urgent: TagMask = 0;
        for client in monitor.clients.iter().filter_map(|w| self.clients.get(w)) {
            occupied |= client.tags;
            if client.is_urgent {
                urgent |= client.tags;
            }
        }

        let selected = monitor.selected_client.and_then(|w| self.clients.get(&w));
        let focused_tags = selected
            .filter(|_| is_selected_monitor)
            .map_or(0, |client| client.tags);

        let tags = self
            .config
            .tags
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let bit = 1 << index;
                TagState {
                    name: name.clone(),
                    selected: monitor.get_selected_tag() & bit != 0,
                    occupied: occupied & bit != 0,
                    urgent: urgent & bit != 0,
                    has_focused: focused_tags & bit != 0,
                }
            })
            .collect();

        BarState {
            width: monitor.window_area_width,
            tags,
            layout_symbol: monitor.layout_symbol.clone(),
            monitor_mark: monitor.mark(),
            title: selected.map(|client| client.name.clone()),
            title_floating: selected.is_some_and(|client| client.is_floating),
            title_fixed: selected.is_some_and(|client| client.is_fixed),
            status: is_selected_monitor.then(|| self.status_text.clone()),
            is_selected_monitor,
        }
    }

    pub(crate) fn draw_bar(&mut self, monitor_index: usize) -> WmResult<()> {
        let Some(monitor) = self.monitors.get(monitor_index) else {
            return Ok(());
        };
        let Some(bar) = monitor.bar_window.filter(|_| monitor.show_bar) else {
            return Ok(());
        };
        let state = self.bar_state(monitor_index);
        self.backend.draw_bar(bar, &state)
    }

    pub(crate) fn draw_bars(&mut self) -> WmResult<()> {
        for index in 0..self.monitors.len() {
            self.draw_bar(index)?;
        }
        Ok(())
    }

    /// Creates a bar for every monitor that does not have one yet.
    pub(crate) fn update_bars(&mut self) -> WmResult<()> {
        for index in 0..self.monitors.len() {
            if self.monitors[index].bar_window.is_some() {
                continue;
            }
            let rect = self.monitors[index].bar_rect(self.bar_height);
            let bar = self.backend.create_bar(rect)?;
            self.monitors[index].bar_window = Some(bar);
        }
        Ok(())
    }

    pub fn bar_exposed(&mut self, window: Window) -> WmResult<()> {
        if let Some(index) = self.monitor_of_bar(window) {
            self.draw_bar(index)?;
        }
        Ok(())
    }

    pub(crate) fn monitor_of_bar(&self, window: Window) -> Option<usize> {
        self.monitors
            .iter()
            .position(|monitor| monitor.bar_window == Some(window))
    }

    pub fn toggle_bar(&mut self) -> WmResult<()> {
        let bar_height = self.bar_height;
        let Some(monitor) = self.monitors.get_mut(self.selected_monitor) else {
            return Ok(());
        };
        monitor.show_bar = !monitor.show_bar;
        monitor.update_bar_position(bar_height);
        let rect = monitor.bar_rect(bar_height);
        if let Some(bar) = monitor.bar_window {
            self.backend.move_bar(bar, rect)?;
        }
        self.arrange(Some(self.selected_monitor))
    }

    pub fn kill_client(&mut self) -> WmResult<()> {
        if let Some(window) = self.selected_client() {
            self.backend.close_window(window)?;
        }
        Ok(())
    }

    pub(crate) fn update_client_list(&mut self) -> WmResult<()> {
        let windows: Vec<Window> = self
            .monitors
            .iter()
            .flat_map(|monitor| monitor.clients.iter().copied())
            .collect();
        self.backend.update_client_list(&windows)
    }

    /// Releases every client and removes the bars.
    pub fn shutdown(&mut self) -> WmResult<()> {
        self.view(!0)?;
        for monitor in &mut self.monitors {
            monitor.layouts[monitor.selected_layout_index] = crate::layout::LayoutType::Floating;
        }
        for index in 0..self.monitors.len() {
            while let Some(&window) = self.monitors[index].stack.first() {
                self.unmanage(window, false)?;
            }
        }
        for monitor in &mut self.monitors {
            if let Some(bar) = monitor.bar_window.take() {
                self.backend.destroy_bar(bar)?;
            }
        }
        self.children.terminate_autostart();
        self.backend.set_input_focus(None)
    }
}

fn default_status() -> String {
    format!("pwm-{}", env!("CARGO_PKG_VERSION"))
}
