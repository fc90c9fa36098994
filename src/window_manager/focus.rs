use x11rb::protocol::xproto::Window;

use super::WindowManager;
use crate::backend::{Backend, WmResult};
use crate::geometry::Rect;

impl<B: Backend> WindowManager<B> {
    /// Focuses `target`, or the most recently focused visible client on the
    /// selected monitor when `target` is absent or hidden.
    pub fn focus(&mut self, target: Option<Window>) -> WmResult<()> {
        let mut target = target.filter(|&window| self.is_visible(window));
        if target.is_none() {
            target = self.monitors.get(self.selected_monitor).and_then(|monitor| {
                monitor
                    .stack
                    .iter()
                    .copied()
                    .find(|&window| self.is_visible(window))
            });
        }

        if let Some(current) = self.selected_client()
            && Some(current) != target
        {
            self.unfocus(current, false)?;
        }

        match target {
            Some(window) => {
                let Some(client) = self.clients.get(&window) else {
                    return Ok(());
                };
                let is_urgent = client.is_urgent;
                self.selected_monitor = client.monitor_index;

                if is_urgent {
                    self.set_urgent(window, false)?;
                }
                self.detach_stack(window);
                self.attach_stack(window);
                self.backend
                    .grab_buttons(window, true, &self.config.buttons)?;
                self.backend.set_border_color(window, true)?;
                self.set_focus(window)?;
            }
            None => self.backend.set_input_focus(None)?,
        }

        if let Some(monitor) = self.monitors.get_mut(self.selected_monitor) {
            monitor.selected_client = target;
        }
        self.draw_bars()
    }

    pub(crate) fn unfocus(&mut self, window: Window, reset_input_focus: bool) -> WmResult<()> {
        if !self.clients.contains_key(&window) {
            return Ok(());
        }
        self.backend
            .grab_buttons(window, false, &self.config.buttons)?;
        self.backend.set_border_color(window, false)?;
        if reset_input_focus {
            self.backend.set_input_focus(None)?;
        }
        Ok(())
    }

    pub(crate) fn set_focus(&mut self, window: Window) -> WmResult<()> {
        let never_focus = self.clients.get(&window).is_some_and(|c| c.never_focus);
        if !never_focus {
            self.backend.set_input_focus(Some(window))?;
        }
        self.backend.send_take_focus(window)?;
        Ok(())
    }

    pub(crate) fn set_urgent(&mut self, window: Window, urgent: bool) -> WmResult<()> {
        let Some(client) = self.clients.get_mut(&window) else {
            return Ok(());
        };
        client.is_urgent = urgent;
        self.backend.set_urgency_hint(window, urgent)
    }

    /// Focuses the next (`direction > 0`) or previous visible client in
    /// attachment order, wrapping around.
    pub fn focus_stack(&mut self, direction: i32) -> WmResult<()> {
        let Some(selected) = self.selected_client() else {
            return Ok(());
        };
        let locked = self.config.lock_fullscreen
            && self.clients.get(&selected).is_some_and(|c| c.is_fullscreen);
        if locked {
            return Ok(());
        }

        let clients = self.monitors[self.selected_monitor].clients.clone();
        let Some(position) = clients.iter().position(|&w| w == selected) else {
            return Ok(());
        };

        let target = if direction > 0 {
            clients[position + 1..]
                .iter()
                .chain(clients.iter())
                .copied()
                .find(|&w| self.is_visible(w))
        } else {
            clients[..position]
                .iter()
                .rev()
                .chain(clients[position..].iter().rev())
                .copied()
                .find(|&w| self.is_visible(w))
        };

        if let Some(window) = target {
            self.focus(Some(window))?;
            self.restack(self.selected_monitor)?;
        }
        Ok(())
    }

    /// Some clients grab focus on their own; hand it back to the selection.
    pub fn focus_in(&mut self, window: Window) -> WmResult<()> {
        if let Some(selected) = self.selected_client()
            && selected != window
        {
            self.set_focus(selected)?;
        }
        Ok(())
    }

    pub fn pointer_entered(&mut self, window: Window) -> WmResult<()> {
        let client = self.clients.get(&window).map(|c| (window, c.monitor_index));
        let monitor_index = match client {
            Some((_, index)) => index,
            None => self.window_to_monitor(window),
        };

        if monitor_index != self.selected_monitor {
            if let Some(selected) = self.selected_client() {
                self.unfocus(selected, true)?;
            }
            self.selected_monitor = monitor_index;
        } else if client.is_none() || self.selected_client() == Some(window) {
            return Ok(());
        }

        self.focus(client.map(|(window, _)| window))
    }

    /// Pointer motion over the root: follow it across monitors.
    pub fn pointer_moved(&mut self, x: i32, y: i32) -> WmResult<()> {
        let monitor_index = self.rect_to_monitor(Rect::new(x, y, 1, 1));
        if let Some(previous) = self.motion_monitor
            && previous != monitor_index
        {
            if let Some(selected) = self.selected_client() {
                self.unfocus(selected, true)?;
            }
            self.selected_monitor = monitor_index;
            self.focus(None)?;
        }
        self.motion_monitor = Some(monitor_index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{Call, manager_with_clients};

    #[test]
    fn focus_moves_client_to_stack_head() {
        let mut wm = manager_with_clients(3);
        wm.focus(Some(1)).unwrap();
        assert_eq!(wm.selected_client(), Some(1));
        assert_eq!(wm.monitors[0].stack[0], 1);
        assert!(wm.backend.calls.contains(&Call::InputFocus(Some(1))));
    }

    #[test]
    fn removal_falls_back_to_next_visible_in_stack() {
        let mut wm = manager_with_clients(3);
        wm.focus(Some(2)).unwrap();
        wm.focus(Some(1)).unwrap();
        // Stack is now 1, 2, 3. Hide 2 so the fallback must skip it.
        wm.clients.get_mut(&2).unwrap().tags = 0b10;
        wm.unmanage(1, true).unwrap();
        assert_eq!(wm.selected_client(), Some(3));
    }

    #[test]
    fn nothing_visible_focuses_root() {
        let mut wm = manager_with_clients(1);
        wm.view(0b100).unwrap();
        assert_eq!(wm.selected_client(), None);
        assert_eq!(wm.backend.last_focus(), Some(None));
    }

    #[test]
    fn focus_stack_wraps_in_attach_order() {
        let mut wm = manager_with_clients(3);
        // Attach order is 3, 2, 1 and 3 was managed last.
        assert_eq!(wm.selected_client(), Some(3));
        wm.focus_stack(1).unwrap();
        assert_eq!(wm.selected_client(), Some(2));
        wm.focus_stack(-1).unwrap();
        wm.focus_stack(-1).unwrap();
        assert_eq!(wm.selected_client(), Some(1));
    }

    #[test]
    fn focus_stack_is_locked_by_fullscreen() {
        let mut wm = manager_with_clients(2);
        wm.set_fullscreen(2, true).unwrap();
        wm.focus_stack(1).unwrap();
        assert_eq!(wm.selected_client(), Some(2));
    }

    #[test]
    fn urgency_is_cleared_on_focus() {
        let mut wm = manager_with_clients(2);
        wm.activate_request(1).unwrap();
        assert!(wm.clients[&1].is_urgent);
        wm.focus(Some(1)).unwrap();
        assert!(!wm.clients[&1].is_urgent);
        assert!(wm.backend.calls.contains(&Call::Urgency(1, false)));
    }
}
