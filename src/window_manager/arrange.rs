use x11rb::protocol::xproto::Window;

use super::WindowManager;
use crate::backend::{Backend, WmResult};
use crate::errors::WmError;
use crate::client::Bounds;
use crate::geometry::Rect;
use crate::layout::TiledClient;

impl<B: Backend> WindowManager<B> {
    /// Recomputes visibility and layout for one monitor, or all of them.
    pub fn arrange(&mut self, monitor_index: Option<usize>) -> WmResult<()> {
        let targets: Vec<usize> = match monitor_index {
            Some(index) if index < self.monitors.len() => vec![index],
            Some(_) => return Ok(()),
            None => (0..self.monitors.len()).collect(),
        };

        for &index in &targets {
            self.show_hide(index)?;
        }
        for &index in &targets {
            self.arrange_monitor(index)?;
        }
        for &index in &targets {
            self.restack(index)?;
        }
        Ok(())
    }

    /// Visible clients are shown top-down, then hidden ones are parked off
    /// screen bottom-up.
    fn show_hide(&mut self, monitor_index: usize) -> WmResult<()> {
        let stack = self.monitors[monitor_index].stack.clone();
        let is_tiling = self.monitors[monitor_index].is_tiling();

        for &window in &stack {
            if !self.is_visible(window) {
                continue;
            }
            let Some(client) = self.clients.get(&window) else {
                continue;
            };
            let rect = client.rect();
            let needs_resize = (!is_tiling || client.is_floating) && !client.is_fullscreen;
            self.backend.move_window(window, rect.x, rect.y)?;
            if needs_resize {
                self.resize(window, rect, false)?;
            }
        }

        for &window in stack.iter().rev() {
            if self.is_visible(window) {
                continue;
            }
            let Some(client) = self.clients.get(&window) else {
                continue;
            };
            let x = client.width_with_border() * -2;
            let y = client.y;
            self.backend.move_window(window, x, y)?;
        }
        Ok(())
    }

    pub(crate) fn tiled_clients(&self, monitor_index: usize) -> Vec<Window> {
        self.monitors
            .get(monitor_index)
            .map(|monitor| {
                monitor
                    .clients
                    .iter()
                    .copied()
                    .filter(|&window| self.is_tiled(window))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn arrange_monitor(&mut self, monitor_index: usize) -> WmResult<()> {
        let tiled = self.tiled_clients(monitor_index);
        let monitor = &mut self.monitors[monitor_index];
        let layout = monitor.layout();
        monitor.layout_symbol = layout.display_symbol(tiled.len());

        let area = monitor.window_area();
        let master_factor = monitor.master_factor;
        let num_master = monitor.num_master;

        let borders: Vec<TiledClient> = tiled
            .iter()
            .map(|window| TiledClient {
                border_width: self.clients.get(window).map_or(0, |c| c.border_width),
            })
            .collect();

        layout.arrange(area, &borders, master_factor, num_master, |index, rect| {
            let window = tiled[index];
            self.resize(window, rect, false)?;
            let requested = rect.height + 2 * borders[index].border_width;
            let height = self
                .clients
                .get(&window)
                .map_or(requested, |client| client.height_with_border());
            Ok::<_, WmError>(height)
        })
    }

    /// Repaints the bar and fixes the stacking order: the selected client is
    /// raised when it floats, tiled clients sit below the bar in focus order.
    pub fn restack(&mut self, monitor_index: usize) -> WmResult<()> {
        self.draw_bar(monitor_index)?;

        let Some(monitor) = self.monitors.get(monitor_index) else {
            return Ok(());
        };
        let Some(selected) = monitor.selected_client else {
            return Ok(());
        };
        let is_tiling = monitor.is_tiling();
        let bar = monitor.bar_window;
        let stack = monitor.stack.clone();

        let selected_floats = self.clients.get(&selected).is_some_and(|c| c.is_floating);
        if selected_floats || !is_tiling {
            self.backend.raise_window(selected)?;
        }

        if is_tiling {
            let tiled: Vec<Window> = stack.into_iter().filter(|&w| self.is_tiled(w)).collect();
            let mut sibling = bar;
            for window in tiled {
                if let Some(sibling) = sibling {
                    self.backend.stack_below(window, sibling)?;
                }
                sibling = Some(window);
            }
        }

        self.backend.sync_and_drain_enter()
    }

    fn honors_size_hints(&self, window: Window) -> bool {
        let Some(client) = self.clients.get(&window) else {
            return false;
        };
        let is_tiling = self
            .monitors
            .get(client.monitor_index)
            .is_some_and(|monitor| monitor.is_tiling());
        self.config.resize_hints || client.is_floating || !is_tiling
    }

    /// Applies size constraints to `rect` and moves the client there if that
    /// changes anything.
    pub(crate) fn resize(&mut self, window: Window, mut rect: Rect, interact: bool) -> WmResult<()> {
        let honor_hints = self.honors_size_hints(window);
        if honor_hints && self.clients.get(&window).is_some_and(|c| !c.hints_valid) {
            self.update_size_hints(window);
        }

        let Some(client) = self.clients.get(&window) else {
            return Ok(());
        };
        let Some(monitor) = self.monitors.get(client.monitor_index) else {
            return Ok(());
        };
        let bounds = Bounds {
            screen_width: self.screen_width,
            screen_height: self.screen_height,
            window_area: monitor.window_area(),
            min_size: self.bar_height,
        };

        if client.constrain(&mut rect, &bounds, interact, honor_hints) {
            self.resize_client(window, rect)?;
        }
        Ok(())
    }

    /// Moves the client to `rect` unconditionally.
    pub(crate) fn resize_client(&mut self, window: Window, rect: Rect) -> WmResult<()> {
        let Some(client) = self.clients.get_mut(&window) else {
            return Ok(());
        };
        client.set_geometry(rect);
        let border_width = client.border_width;
        self.backend.configure_client(window, rect, border_width)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{Call, manager_with_clients};
    use crate::client::SizeHints;
    use crate::geometry::Rect;
    use crate::layout::LayoutType;

    #[test]
    fn tile_places_master_and_stack() {
        let mut wm = manager_with_clients(3);
        // Newest first: 3 is master.
        assert_eq!(wm.monitors[0].clients, vec![3, 2, 1]);
        let area = wm.monitors[0].window_area();
        let border = wm.config.border_width as i32;
        let half = (area.width as f32 * 0.5) as i32;

        assert_eq!(
            wm.clients[&3].rect(),
            Rect::new(area.x, area.y, half - 2 * border, area.height - 2 * border)
        );
        assert_eq!(wm.clients[&2].x, area.x + half);
        assert_eq!(wm.clients[&1].x, area.x + half);
        assert!(wm.clients[&1].y > wm.clients[&2].y);

        wm.arrange(Some(0)).unwrap();
        assert_eq!(wm.clients[&2].x, area.x + half);
    }

    #[test]
    fn monocle_fills_area_and_counts_clients() {
        let mut wm = manager_with_clients(2);
        wm.set_layout(Some(LayoutType::Monocle)).unwrap();
        let area = wm.monitors[0].window_area();
        let border = wm.config.border_width as i32;
        for window in [1, 2] {
            assert_eq!(
                wm.clients[&window].rect(),
                Rect::new(area.x, area.y, area.width - 2 * border, area.height - 2 * border)
            );
        }
        assert_eq!(wm.monitors[0].layout_symbol, "[2]");
    }

    #[test]
    fn hidden_clients_are_parked_off_screen() {
        let mut wm = manager_with_clients(1);
        wm.backend.calls.clear();
        wm.view(0b10).unwrap();
        let width = wm.clients[&1].width_with_border();
        assert!(
            wm.backend
                .calls
                .contains(&Call::Move(1, -2 * width, wm.clients[&1].y))
        );
    }

    #[test]
    fn restack_chains_tiled_clients_below_bar() {
        let mut wm = manager_with_clients(2);
        let bar = wm.monitors[0].bar_window.unwrap();
        wm.backend.calls.clear();
        wm.restack(0).unwrap();
        let selected = wm.selected_client().unwrap();
        let other = if selected == 1 { 2 } else { 1 };
        assert!(wm.backend.calls.contains(&Call::StackBelow(selected, bar)));
        assert!(wm.backend.calls.contains(&Call::StackBelow(other, selected)));
    }

    #[test]
    fn stack_repacks_below_hinted_heights() {
        let mut wm = manager_with_clients(3);
        wm.config.resize_hints = true;
        let hints = SizeHints {
            increment_height: 100,
            ..SizeHints::default()
        };
        wm.backend.size_hints.insert(2, hints);
        wm.clients.get_mut(&2).unwrap().hints_valid = false;
        wm.arrange(Some(0)).unwrap();

        let area = wm.monitors[0].window_area();
        assert_eq!(wm.clients[&2].y, area.y);
        assert_eq!(wm.clients[&2].height % 100, 0);
        assert_eq!(wm.clients[&1].y, area.y + wm.clients[&2].height_with_border());
        assert_eq!(wm.clients[&1].y + wm.clients[&1].height_with_border(), area.bottom());
    }
}
