use x11rb::protocol::xproto::{Timestamp, Window};

use super::WindowManager;
use crate::backend::{Backend, WmResult};
use crate::geometry::Rect;

/// Minimum time between two handled motion events, about 60 per second.
const MOTION_INTERVAL_MS: Timestamp = 1000 / 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Move,
    Resize,
}

/// A pointer drag in progress on one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drag {
    pub kind: DragKind,
    pub window: Window,
    client_x: i32,
    client_y: i32,
    pointer_x: i32,
    pointer_y: i32,
    /// Window-relative point the pointer is warped to before resizing.
    pub anchor: Option<(i32, i32)>,
    last_motion: Timestamp,
}

impl Drag {
    /// Whether a motion event at `time` should be handled, dropping the rest.
    pub fn accept_motion(&mut self, time: Timestamp) -> bool {
        if time.wrapping_sub(self.last_motion) <= MOTION_INTERVAL_MS {
            return false;
        }
        self.last_motion = time;
        true
    }
}

impl<B: Backend> WindowManager<B> {
    /// Starts dragging the selected client from the pointer at `pointer`.
    /// Fullscreen clients stay put.
    pub fn begin_drag(&mut self, kind: DragKind, pointer: (i32, i32)) -> WmResult<Option<Drag>> {
        let Some(window) = self.selected_client() else {
            return Ok(None);
        };
        let Some(client) = self.clients.get(&window) else {
            return Ok(None);
        };
        if client.is_fullscreen {
            return Ok(None);
        }

        let (client_x, client_y) = (client.x, client.y);
        let anchor = match kind {
            DragKind::Move => None,
            DragKind::Resize => Some((
                client.width + client.border_width - 1,
                client.height + client.border_width - 1,
            )),
        };
        let (pointer_x, pointer_y) = match anchor {
            Some((x, y)) => (client_x + x, client_y + y),
            None => pointer,
        };

        self.restack(self.selected_monitor)?;
        tracing::debug!(window, ?kind, "drag started");

        Ok(Some(Drag {
            kind,
            window,
            client_x,
            client_y,
            pointer_x,
            pointer_y,
            anchor,
            last_motion: 0,
        }))
    }

    pub fn drag_motion(&mut self, drag: &Drag, x: i32, y: i32) -> WmResult<()> {
        match drag.kind {
            DragKind::Move => self.drag_move(drag, x, y),
            DragKind::Resize => self.drag_resize(drag, x, y),
        }
    }

    fn drag_move(&mut self, drag: &Drag, x: i32, y: i32) -> WmResult<()> {
        let Some(client) = self.clients.get(&drag.window) else {
            return Ok(());
        };
        let monitor = &self.monitors[self.selected_monitor];
        let area = monitor.window_area();
        let is_tiling = monitor.is_tiling();
        let snap = self.config.snap as i32;

        let mut new_x = drag.client_x + (x - drag.pointer_x);
        let mut new_y = drag.client_y + (y - drag.pointer_y);
        let (width, height) = (client.width_with_border(), client.height_with_border());

        if (area.x - new_x).abs() < snap {
            new_x = area.x;
        } else if (area.right() - (new_x + width)).abs() < snap {
            new_x = area.right() - width;
        }
        if (area.y - new_y).abs() < snap {
            new_y = area.y;
        } else if (area.bottom() - (new_y + height)).abs() < snap {
            new_y = area.bottom() - height;
        }

        let rect = Rect::new(new_x, new_y, client.width, client.height);
        let tear_off = !client.is_floating
            && is_tiling
            && ((new_x - client.x).abs() > snap || (new_y - client.y).abs() > snap);
        if tear_off {
            self.toggle_floating()?;
        }

        let floating = self.clients.get(&drag.window).is_some_and(|c| c.is_floating);
        if !is_tiling || floating {
            self.resize(drag.window, rect, true)?;
        }
        Ok(())
    }

    fn drag_resize(&mut self, drag: &Drag, x: i32, y: i32) -> WmResult<()> {
        let Some(client) = self.clients.get(&drag.window) else {
            return Ok(());
        };
        let selected = &self.monitors[self.selected_monitor];
        let own_area = self.monitors[client.monitor_index].window_area();
        let area = selected.window_area();
        let is_tiling = selected.is_tiling();
        let snap = self.config.snap as i32;

        let width = (x - drag.client_x - 2 * client.border_width + 1).max(1);
        let height = (y - drag.client_y - 2 * client.border_width + 1).max(1);

        let inside = own_area.x + width >= area.x
            && own_area.x + width <= area.right()
            && own_area.y + height >= area.y
            && own_area.y + height <= area.bottom();
        let tear_off = inside
            && !client.is_floating
            && is_tiling
            && ((width - client.width).abs() > snap || (height - client.height).abs() > snap);
        let rect = Rect::new(client.x, client.y, width, height);
        if tear_off {
            self.toggle_floating()?;
        }

        let floating = self.clients.get(&drag.window).is_some_and(|c| c.is_floating);
        if !is_tiling || floating {
            self.resize(drag.window, rect, true)?;
        }
        Ok(())
    }

    /// Hands the client to whichever monitor it was dropped on.
    pub fn end_drag(&mut self, drag: &Drag) -> WmResult<()> {
        let Some(client) = self.clients.get(&drag.window) else {
            return Ok(());
        };
        let target = self.rect_to_monitor(client.rect());
        if target != self.selected_monitor {
            self.send_to_monitor(drag.window, target)?;
            self.selected_monitor = target;
            self.focus(None)?;
        }
        tracing::debug!(window = drag.window, monitor = target, "drag finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{manage_window, manager_with_clients, manager_with_screens};
    use super::*;
    use crate::layout::LayoutType;

    #[test]
    fn nothing_selected_means_no_drag() {
        let mut wm = manager_with_clients(0);
        assert_eq!(wm.begin_drag(DragKind::Move, (0, 0)).unwrap(), None);
    }

    #[test]
    fn fullscreen_clients_are_not_dragged() {
        let mut wm = manager_with_clients(1);
        wm.set_fullscreen(1, true).unwrap();
        assert_eq!(wm.begin_drag(DragKind::Move, (0, 0)).unwrap(), None);
    }

    #[test]
    fn motion_is_throttled() {
        let mut wm = manager_with_clients(1);
        let mut drag = wm.begin_drag(DragKind::Move, (0, 0)).unwrap().unwrap();
        assert!(drag.accept_motion(100));
        assert!(!drag.accept_motion(110));
        assert!(drag.accept_motion(120));
    }

    #[test]
    fn moving_snaps_to_the_work_area_edge() {
        let mut wm = manager_with_clients(1);
        wm.set_layout(Some(LayoutType::Floating)).unwrap();
        let area = wm.monitors[0].window_area();
        let start = wm.clients[&1].rect();

        let drag = wm.begin_drag(DragKind::Move, (500, 500)).unwrap().unwrap();
        wm.drag_motion(&drag, 510, 600).unwrap();
        assert_eq!(wm.clients[&1].x, area.x);
        assert_eq!(wm.clients[&1].y, start.y + 100);
    }

    #[test]
    fn small_moves_keep_tiled_clients_tiled() {
        let mut wm = manager_with_clients(1);
        let start = wm.clients[&1].rect();
        let drag = wm.begin_drag(DragKind::Move, (500, 500)).unwrap().unwrap();
        wm.drag_motion(&drag, 510, 510).unwrap();
        assert!(!wm.clients[&1].is_floating);
        assert_eq!(wm.clients[&1].rect(), start);
    }

    #[test]
    fn dragging_past_the_snap_distance_floats_the_client() {
        let mut wm = manager_with_clients(1);
        let start = wm.clients[&1].rect();
        let drag = wm.begin_drag(DragKind::Move, (500, 500)).unwrap().unwrap();
        wm.drag_motion(&drag, 700, 700).unwrap();
        assert!(wm.clients[&1].is_floating);
        assert_eq!(wm.clients[&1].x, start.x + 200);
    }

    #[test]
    fn resizing_follows_the_pointer() {
        let mut wm = manager_with_clients(1);
        wm.toggle_floating().unwrap();
        let start = wm.clients[&1].rect();
        let border = wm.clients[&1].border_width;

        let drag = wm.begin_drag(DragKind::Resize, (0, 0)).unwrap().unwrap();
        assert_eq!(
            drag.anchor,
            Some((start.width + border - 1, start.height + border - 1))
        );
        wm.drag_motion(&drag, start.x + 300, start.y + 200).unwrap();
        assert_eq!(wm.clients[&1].width, 300 - 2 * border + 1);
        assert_eq!(wm.clients[&1].height, 200 - 2 * border + 1);
    }

    #[test]
    fn dropping_on_another_monitor_moves_the_client() {
        let mut wm = manager_with_screens(vec![
            Rect::new(0, 0, 1000, 800),
            Rect::new(1000, 0, 1000, 800),
        ]);
        manage_window(&mut wm, 1);
        wm.toggle_floating().unwrap();

        let drag = wm.begin_drag(DragKind::Move, (50, 50)).unwrap().unwrap();
        wm.drag_motion(&drag, 1300, 100).unwrap();
        wm.end_drag(&drag).unwrap();

        assert_eq!(wm.clients[&1].monitor_index, 1);
        assert_eq!(wm.selected_monitor, 1);
        assert_eq!(wm.selected_client(), Some(1));
    }
}
