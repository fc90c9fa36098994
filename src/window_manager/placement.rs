use x11rb::protocol::xproto::Window;

use super::WindowManager;
use crate::backend::{Backend, WmResult};
use crate::geometry::Rect;

/// Where `move_to_edge` puts a client along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    Center,
    End,
    Stay,
}

impl Edge {
    pub fn from_step(step: i32) -> Self {
        match step {
            -1 => Edge::Start,
            0 => Edge::Center,
            1 => Edge::End,
            _ => Edge::Stay,
        }
    }
}

impl<B: Backend> WindowManager<B> {
    /// The selected client, if keyboard moves may touch it: it floats or the
    /// layout does not arrange it.
    fn freely_movable(&self) -> Option<Window> {
        let window = self.selected_client()?;
        let client = self.clients.get(&window)?;
        let is_tiling = self
            .monitors
            .get(client.monitor_index)
            .is_some_and(|monitor| monitor.is_tiling());
        (client.is_floating || !is_tiling).then_some(window)
    }

    /// Pushes the selected floating client against an edge of its monitor,
    /// or centers it, independently per axis.
    pub fn move_to_edge(&mut self, horizontal: Edge, vertical: Edge) -> WmResult<()> {
        let Some(window) = self.freely_movable() else {
            return Ok(());
        };
        let Some(client) = self.clients.get(&window) else {
            return Ok(());
        };
        let screen = self.monitors[client.monitor_index].screen();
        let border = self.config.border_width as i32;
        let bar_height = self.bar_height;

        let x = match horizontal {
            Edge::Start => screen.x + border,
            Edge::Center => screen.x + (screen.width - client.width) / 2,
            Edge::End => screen.right() - (client.width + 2 * border),
            Edge::Stay => client.x,
        };
        let y = match vertical {
            Edge::Start => screen.y + bar_height + border,
            Edge::Center => screen.y + (screen.height - (client.height + bar_height)) / 2,
            Edge::End => screen.bottom() - (client.height + 2 * border),
            Edge::Stay => client.y,
        };
        let rect = Rect::new(x, y, client.width, client.height);

        self.backend.raise_window(window)?;
        self.resize(window, rect, true)?;
        self.backend.sync_and_drain_enter()
    }

    /// Moves and resizes the selected floating client by the given deltas.
    pub fn move_resize(&mut self, delta: Rect) -> WmResult<()> {
        let Some(window) = self.freely_movable() else {
            return Ok(());
        };
        let Some(client) = self.clients.get(&window) else {
            return Ok(());
        };
        let rect = Rect::new(
            client.x + delta.x,
            client.y + delta.y,
            client.width + delta.width,
            client.height + delta.height,
        );

        self.resize(window, rect, true)?;
        self.backend.sync_and_drain_enter()
    }

    /// `move_resize`, then parks the client in the bottom right corner.
    pub fn move_resize_to_corner(&mut self, delta: Rect) -> WmResult<()> {
        if self.freely_movable().is_none() {
            return Ok(());
        }
        self.move_resize(delta)?;
        self.move_to_edge(Edge::End, Edge::End)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{Call, manager_with_clients};
    use super::*;
    use crate::layout::LayoutType;

    #[test]
    fn tiled_clients_are_left_alone() {
        let mut wm = manager_with_clients(1);
        let before = wm.clients[&1].rect();
        wm.move_to_edge(Edge::Start, Edge::Start).unwrap();
        wm.move_resize(Rect::new(10, 10, 10, 10)).unwrap();
        assert_eq!(wm.clients[&1].rect(), before);
    }

    #[test]
    fn floating_client_goes_to_the_corners() {
        let mut wm = manager_with_clients(1);
        wm.toggle_floating().unwrap();
        let border = wm.config.border_width as i32;
        let bar_height = wm.bar_height;

        wm.move_to_edge(Edge::Start, Edge::Start).unwrap();
        assert_eq!((wm.clients[&1].x, wm.clients[&1].y), (border, bar_height + border));

        wm.move_to_edge(Edge::End, Edge::End).unwrap();
        let client = &wm.clients[&1];
        assert_eq!(client.x + client.width + 2 * border, 1920);
        assert_eq!(client.y + client.height + 2 * border, 1080);
        assert!(wm.backend.calls.contains(&Call::Raise(1)));
    }

    #[test]
    fn stay_keeps_the_axis() {
        let mut wm = manager_with_clients(1);
        wm.set_layout(Some(LayoutType::Floating)).unwrap();
        let y = wm.clients[&1].y;
        wm.move_to_edge(Edge::Center, Edge::Stay).unwrap();
        let client = &wm.clients[&1];
        assert_eq!(client.x, (1920 - client.width) / 2);
        assert_eq!(client.y, y);
    }

    #[test]
    fn move_resize_applies_deltas() {
        let mut wm = manager_with_clients(1);
        wm.toggle_floating().unwrap();
        let before = wm.clients[&1].rect();
        wm.move_resize(Rect::new(25, 30, -100, -50)).unwrap();
        assert_eq!(
            wm.clients[&1].rect(),
            Rect::new(before.x + 25, before.y + 30, before.width - 100, before.height - 50)
        );
        assert_eq!(wm.backend.calls.last(), Some(&Call::Sync));
    }

    #[test]
    fn corner_variant_shrinks_then_parks() {
        let mut wm = manager_with_clients(1);
        wm.toggle_floating().unwrap();
        let before = wm.clients[&1].rect();
        let border = wm.config.border_width as i32;
        wm.move_resize_to_corner(Rect::new(0, 0, -100, -100)).unwrap();
        let client = &wm.clients[&1];
        assert_eq!(client.width, before.width - 100);
        assert_eq!(client.x + client.width + 2 * border, 1920);
    }
}
