use x11rb::protocol::xproto::Window;

use super::WindowManager;
use crate::backend::{Backend, WmResult};
use crate::geometry::Rect;
use crate::monitor::{Monitor, unique_screens};

impl<B: Backend> WindowManager<B> {
    /// Brings the monitor list in line with the physical screens. Returns
    /// whether anything changed.
    pub fn update_geometry(&mut self) -> WmResult<bool> {
        let mut dirty = false;

        match self.backend.query_screens().filter(|screens| !screens.is_empty()) {
            Some(screens) => {
                let screens = unique_screens(&screens);
                let existing = self.monitors.len();

                while self.monitors.len() < screens.len() {
                    self.monitors.push(Monitor::new(&self.config));
                }

                for (index, screen) in screens.iter().enumerate() {
                    let monitor = &mut self.monitors[index];
                    if index >= existing || monitor.screen() != *screen {
                        dirty = true;
                        monitor.monitor_number = index;
                        monitor.set_screen(*screen, self.bar_height);
                        tracing::info!(monitor = index, ?screen, "monitor geometry updated");
                    }
                }

                dirty |= self.remove_surplus_monitors(screens.len())?;
            }
            None => {
                if self.monitors.is_empty() {
                    self.monitors.push(Monitor::new(&self.config));
                }
                dirty |= self.remove_surplus_monitors(1)?;

                let monitor = &mut self.monitors[0];
                if monitor.screen_width != self.screen_width
                    || monitor.screen_height != self.screen_height
                {
                    dirty = true;
                    let screen = Rect::new(
                        monitor.screen_x,
                        monitor.screen_y,
                        self.screen_width,
                        self.screen_height,
                    );
                    monitor.set_screen(screen, self.bar_height);
                }
            }
        }

        if dirty {
            self.selected_monitor = 0;
            self.selected_monitor = self.window_to_monitor(self.backend.root());
        }
        Ok(dirty)
    }

    /// Drops trailing monitors beyond `keep`, moving their clients to the
    /// first monitor. Returns whether any monitor was removed.
    fn remove_surplus_monitors(&mut self, keep: usize) -> WmResult<bool> {
        let mut removed_any = false;

        while self.monitors.len() > keep.max(1) {
            let removed_index = self.monitors.len() - 1;
            let Some(removed) = self.monitors.pop() else {
                break;
            };
            removed_any = true;

            let tags = self.monitors[0].get_selected_tag();
            for &window in &removed.clients {
                if let Some(client) = self.clients.get_mut(&window) {
                    client.monitor_index = 0;
                    client.tags = tags;
                }
                self.monitors[0].clients.insert(0, window);
                self.monitors[0].stack.insert(0, window);
            }

            if self.selected_monitor >= removed_index {
                self.selected_monitor = 0;
            }
            if self.motion_monitor.is_some_and(|index| index >= removed_index) {
                self.motion_monitor = None;
            }
            if let Some(bar) = removed.bar_window {
                self.backend.destroy_bar(bar)?;
            }
            tracing::info!(
                monitor = removed_index,
                clients = removed.clients.len(),
                "monitor removed"
            );
        }
        Ok(removed_any)
    }

    /// The root window's size changed, or the screen layout may have.
    pub fn root_configured(&mut self, width: i32, height: i32) -> WmResult<()> {
        let resized = self.screen_width != width || self.screen_height != height;
        self.screen_width = width;
        self.screen_height = height;

        if self.update_geometry()? || resized {
            self.update_bars()?;
            for index in 0..self.monitors.len() {
                let screen = self.monitors[index].screen();
                let fullscreen: Vec<Window> = self.monitors[index]
                    .clients
                    .iter()
                    .copied()
                    .filter(|w| self.clients.get(w).is_some_and(|c| c.is_fullscreen))
                    .collect();
                for window in fullscreen {
                    self.resize_client(window, screen)?;
                }

                let monitor = &self.monitors[index];
                if let Some(bar) = monitor.bar_window {
                    let rect = monitor.bar_rect(self.bar_height);
                    self.backend.move_bar(bar, rect)?;
                }
            }
            self.focus(None)?;
            self.arrange(None)?;
        }
        Ok(())
    }

    /// Monitor with the largest overlap with `rect`, the selected one if none
    /// overlaps.
    pub fn rect_to_monitor(&self, rect: Rect) -> usize {
        let mut best = self.selected_monitor;
        let mut best_area = 0;
        for (index, monitor) in self.monitors.iter().enumerate() {
            let area = rect.intersection_area(&monitor.window_area());
            if area > best_area {
                best_area = area;
                best = index;
            }
        }
        best
    }

    pub fn window_to_monitor(&self, window: Window) -> usize {
        if window == self.backend.root()
            && let Some((x, y)) = self.backend.pointer_position()
        {
            return self.rect_to_monitor(Rect::new(x, y, 1, 1));
        }
        if let Some(index) = self.monitor_of_bar(window) {
            return index;
        }
        self.clients
            .get(&window)
            .map_or(self.selected_monitor, |client| client.monitor_index)
    }

    fn direction_to_monitor(&self, direction: i32) -> usize {
        let count = self.monitors.len();
        if direction > 0 {
            (self.selected_monitor + 1) % count
        } else {
            (self.selected_monitor + count - 1) % count
        }
    }

    fn number_to_monitor(&self, number: i32) -> usize {
        usize::try_from(number)
            .unwrap_or(0)
            .min(self.monitors.len().saturating_sub(1))
    }

    /// Moves `window` to another monitor, adopting that monitor's view.
    pub fn send_to_monitor(&mut self, window: Window, target: usize) -> WmResult<()> {
        let Some(client) = self.clients.get(&window) else {
            return Ok(());
        };
        if client.monitor_index == target || target >= self.monitors.len() {
            return Ok(());
        }

        self.unfocus(window, true)?;
        self.move_client(window, target);
        self.focus(None)?;
        self.arrange(None)
    }

    fn move_client(&mut self, window: Window, target: usize) {
        self.detach(window);
        self.detach_stack(window);
        let tags = self.monitors[target].get_selected_tag();
        if let Some(client) = self.clients.get_mut(&window) {
            client.monitor_index = target;
            client.tags = tags;
        }
        self.attach(window);
        self.attach_stack(window);
    }

    pub fn focus_monitor(&mut self, direction: i32) -> WmResult<()> {
        if self.monitors.len() <= 1 {
            return Ok(());
        }
        let target = self.direction_to_monitor(direction);
        if target == self.selected_monitor {
            return Ok(());
        }
        if let Some(selected) = self.selected_client() {
            self.unfocus(selected, false)?;
        }
        self.selected_monitor = target;
        self.focus(None)
    }

    pub fn tag_monitor(&mut self, direction: i32) -> WmResult<()> {
        if self.monitors.len() <= 1 {
            return Ok(());
        }
        let Some(selected) = self.selected_client() else {
            return Ok(());
        };
        let target = self.direction_to_monitor(direction);
        self.send_to_monitor(selected, target)
    }

    /// Sends the selected client to monitor `number`, clamped to the last one.
    pub fn send_to_monitor_index(&mut self, number: i32) -> WmResult<()> {
        if self.monitors.len() <= 1 {
            return Ok(());
        }
        let Some(selected) = self.selected_client() else {
            return Ok(());
        };
        let target = self.number_to_monitor(number);
        self.send_to_monitor(selected, target)
    }

    /// Like `send_to_monitor_index`, but focus follows the client.
    pub fn send_to_monitor_index_and_focus(&mut self, number: i32) -> WmResult<()> {
        let Some(selected) = self.selected_client() else {
            return Ok(());
        };
        let target = self.number_to_monitor(number);
        let previous = self.selected_monitor;
        if target == previous {
            return Ok(());
        }

        self.unfocus(selected, false)?;
        self.move_client(selected, target);
        self.selected_monitor = target;
        self.focus(Some(selected))?;
        self.arrange(Some(previous))?;
        self.arrange(Some(target))
    }
}
