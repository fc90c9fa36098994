use x11rb::protocol::xproto::Window;

use super::WindowManager;
use crate::backend::{Backend, WmResult};

impl<B: Backend> WindowManager<B> {
    fn monitor_index_of(&self, window: Window) -> Option<usize> {
        self.clients
            .get(&window)
            .map(|client| client.monitor_index)
            .filter(|&index| index < self.monitors.len())
    }

    pub(crate) fn attach(&mut self, window: Window) {
        if let Some(index) = self.monitor_index_of(window) {
            self.monitors[index].clients.insert(0, window);
        }
    }

    pub(crate) fn detach(&mut self, window: Window) {
        if let Some(index) = self.monitor_index_of(window) {
            self.monitors[index].clients.retain(|&w| w != window);
        }
    }

    pub(crate) fn attach_stack(&mut self, window: Window) {
        if let Some(index) = self.monitor_index_of(window) {
            self.monitors[index].stack.insert(0, window);
        }
    }

    /// Removes `window` from its monitor's stack. If it was selected, the
    /// selection passes to the first remaining visible client.
    pub(crate) fn detach_stack(&mut self, window: Window) {
        let Some(index) = self.monitor_index_of(window) else {
            return;
        };
        self.monitors[index].stack.retain(|&w| w != window);

        if self.monitors[index].selected_client == Some(window) {
            let replacement = self.monitors[index]
                .stack
                .iter()
                .copied()
                .find(|&w| self.is_visible(w));
            self.monitors[index].selected_client = replacement;
        }
    }

    /// The selected client if it can be moved within the tiled sequence.
    fn selected_tiled(&self) -> Option<Window> {
        self.selected_client()
            .filter(|window| self.clients.get(window).is_some_and(|c| !c.is_floating))
    }

    /// Moves the selected client one tiled position towards the tail, or back
    /// to the head when it is already last.
    pub fn push_down(&mut self) -> WmResult<()> {
        let Some(selected) = self.selected_tiled() else {
            return Ok(());
        };
        let index = self.selected_monitor;
        let clients = &self.monitors[index].clients;
        let Some(position) = clients.iter().position(|&w| w == selected) else {
            return Ok(());
        };
        let next = clients[position + 1..]
            .iter()
            .copied()
            .find(|&w| self.is_tiled(w));

        let clients = &mut self.monitors[index].clients;
        clients.remove(position);
        match next.and_then(|next| clients.iter().position(|&w| w == next)) {
            Some(after) => clients.insert(after + 1, selected),
            None => clients.insert(0, selected),
        }

        self.focus(Some(selected))?;
        self.arrange(Some(index))
    }

    /// Moves the selected client one tiled position towards the head, or to
    /// the tail when it is already first.
    pub fn push_up(&mut self) -> WmResult<()> {
        let Some(selected) = self.selected_tiled() else {
            return Ok(());
        };
        let index = self.selected_monitor;
        let clients = &self.monitors[index].clients;
        let Some(position) = clients.iter().position(|&w| w == selected) else {
            return Ok(());
        };
        let previous = clients[..position]
            .iter()
            .rev()
            .copied()
            .find(|&w| self.is_tiled(w));

        let clients = &mut self.monitors[index].clients;
        clients.remove(position);
        match previous.and_then(|previous| clients.iter().position(|&w| w == previous)) {
            Some(before) => clients.insert(before, selected),
            None => clients.push(selected),
        }

        self.focus(Some(selected))?;
        self.arrange(Some(index))
    }

    /// Swaps the selected client with the next or previous tiled client,
    /// wrapping around.
    pub fn move_stack(&mut self, direction: i32) -> WmResult<()> {
        let Some(selected) = self.selected_client() else {
            return Ok(());
        };
        let index = self.selected_monitor;
        let clients = &self.monitors[index].clients;
        let Some(position) = clients.iter().position(|&w| w == selected) else {
            return Ok(());
        };

        let target = if direction > 0 {
            clients[position + 1..]
                .iter()
                .chain(clients.iter())
                .copied()
                .find(|&w| self.is_tiled(w))
        } else {
            clients[..position]
                .iter()
                .rev()
                .chain(clients[position..].iter().rev())
                .copied()
                .find(|&w| self.is_tiled(w))
        };

        let Some(target) = target.filter(|&w| w != selected) else {
            return Ok(());
        };
        let clients = &mut self.monitors[index].clients;
        if let Some(target_position) = clients.iter().position(|&w| w == target) {
            clients.swap(position, target_position);
            self.arrange(Some(index))?;
        }
        Ok(())
    }

    /// Promotes the selected tiled client to master. The current master swaps
    /// places with the next tiled client instead.
    pub fn zoom(&mut self) -> WmResult<()> {
        let index = self.selected_monitor;
        if !self.monitors[index].is_tiling() {
            return Ok(());
        }
        let Some(mut window) = self.selected_tiled() else {
            return Ok(());
        };

        let tiled = self.tiled_clients(index);
        if tiled.first() == Some(&window) {
            match tiled.get(1) {
                Some(&next) => window = next,
                None => return Ok(()),
            }
        }
        self.pop(window)
    }

    fn pop(&mut self, window: Window) -> WmResult<()> {
        self.detach(window);
        self.attach(window);
        self.focus(Some(window))?;
        let index = self.monitor_index_of(window);
        self.arrange(index)
    }
}
