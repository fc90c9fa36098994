use std::str::FromStr;

use x11rb::protocol::xproto::Window;

use super::{DragKind, Edge, WindowManager};
use crate::backend::{Backend, WmResult};
use crate::bar::click_at;
use crate::geometry::Rect;
use crate::keyboard::handlers::{clean_mask, modifiers_to_mask};
use crate::keyboard::{Arg, Click, KeyAction};
use crate::layout::LayoutType;
use crate::signal;

impl<B: Backend> WindowManager<B> {
    pub fn handle_key_action(&mut self, action: KeyAction, arg: &Arg) -> WmResult<()> {
        match action {
            KeyAction::Spawn => self.spawn(arg),
            KeyAction::KillClient => self.kill_client()?,
            KeyAction::FocusStack => {
                if let Some(direction) = numeric(action, arg) {
                    self.focus_stack(direction)?;
                }
            }
            KeyAction::PushUp => self.push_up()?,
            KeyAction::PushDown => self.push_down()?,
            KeyAction::MoveStack => {
                if let Some(direction) = numeric(action, arg) {
                    self.move_stack(direction)?;
                }
            }
            KeyAction::Zoom => self.zoom()?,
            KeyAction::Quit => self.quit(),
            KeyAction::ViewTag => {
                if let Some(bit) = self.tag_arg(action, arg) {
                    self.view(bit)?;
                }
            }
            KeyAction::ViewPrevious => self.view(0)?,
            KeyAction::ViewAll => self.view(!0)?,
            KeyAction::ToggleView => {
                if let Some(bit) = self.tag_arg(action, arg) {
                    self.toggle_view(bit)?;
                }
            }
            KeyAction::MoveToTag => {
                if let Some(bit) = self.tag_arg(action, arg) {
                    self.tag(bit)?;
                }
            }
            KeyAction::TagAll => self.tag(!0)?,
            KeyAction::ToggleTag => {
                if let Some(bit) = self.tag_arg(action, arg) {
                    self.toggle_tag(bit)?;
                }
            }
            KeyAction::ViewTagAllMonitors => {
                if let Some(bit) = self.tag_arg(action, arg) {
                    self.view_all_monitors(bit)?;
                }
            }
            KeyAction::ToggleViewAllMonitors => {
                if let Some(bit) = self.tag_arg(action, arg) {
                    self.toggle_view_all_monitors(bit)?;
                }
            }
            KeyAction::ResetView => self.reset_view()?,
            KeyAction::ToggleFloating => self.toggle_floating()?,
            KeyAction::ToggleFullScreen => self.toggle_fullscreen()?,
            KeyAction::ChangeLayout => {
                let layout = match arg {
                    Arg::Str(name) => match LayoutType::from_str(name) {
                        Ok(layout) => Some(layout),
                        Err(error) => {
                            tracing::warn!(%error, "ignoring layout change");
                            return Ok(());
                        }
                    },
                    _ => None,
                };
                self.set_layout(layout)?;
            }
            KeyAction::ToggleLayout => self.set_layout(None)?,
            KeyAction::SetMasterFactor => match arg.as_float() {
                Some(factor) => self.set_master_factor(factor)?,
                None => tracing::warn!(?action, ?arg, "ignoring non-numeric argument"),
            },
            KeyAction::IncNumMaster => {
                if let Some(delta) = numeric(action, arg) {
                    self.inc_num_master(delta)?;
                }
            }
            KeyAction::ToggleBar => self.toggle_bar()?,
            KeyAction::FocusMonitor => {
                if let Some(direction) = numeric(action, arg) {
                    self.focus_monitor(direction)?;
                }
            }
            KeyAction::TagMonitor => {
                if let Some(direction) = numeric(action, arg) {
                    self.tag_monitor(direction)?;
                }
            }
            KeyAction::SendToMonitor => {
                if let Some(index) = numeric(action, arg) {
                    self.send_to_monitor_index(index)?;
                }
            }
            KeyAction::SendToMonitorAndFocus => {
                if let Some(index) = numeric(action, arg) {
                    self.send_to_monitor_index_and_focus(index)?;
                }
            }
            KeyAction::MoveMouse => self.pending_drag = Some(DragKind::Move),
            KeyAction::ResizeMouse => self.pending_drag = Some(DragKind::Resize),
            KeyAction::MoveToEdge => {
                if let Some([x, y]) = integers::<2>(action, arg) {
                    self.move_to_edge(Edge::from_step(x), Edge::from_step(y))?;
                }
            }
            KeyAction::MoveResize => {
                if let Some([x, y, width, height]) = integers::<4>(action, arg) {
                    self.move_resize(Rect::new(x, y, width, height))?;
                }
            }
            KeyAction::MoveResizeToCorner => {
                if let Some([x, y, width, height]) = integers::<4>(action, arg) {
                    self.move_resize_to_corner(Rect::new(x, y, width, height))?;
                }
            }
            KeyAction::None => {}
        }
        Ok(())
    }

    /// Tag bit for a 0-based tag index argument.
    fn tag_arg(&self, action: KeyAction, arg: &Arg) -> Option<u32> {
        self.tag_bit(numeric(action, arg)?)
    }

    fn spawn(&mut self, arg: &Arg) {
        match arg {
            Arg::Str(command) => self.children.spawn_shell(command),
            Arg::Array(command) => {
                if let Some((program, args)) = signal::command_args(command, self.selected_monitor)
                {
                    self.children.spawn_with_args(program, &args);
                }
            }
            _ => tracing::warn!(?arg, "spawn needs a command"),
        }
    }

    /// Switches to `layout`, or to the other remembered layout when `None` or
    /// when `layout` is already active.
    pub fn set_layout(&mut self, layout: Option<LayoutType>) -> WmResult<()> {
        let index = self.selected_monitor;
        let Some(monitor) = self.monitors.get_mut(index) else {
            return Ok(());
        };

        if layout != Some(monitor.layout()) {
            monitor.selected_layout_index ^= 1;
        }
        if let Some(layout) = layout {
            monitor.layouts[monitor.selected_layout_index] = layout;
        }
        monitor.layout_symbol = monitor.layout().symbol().to_string();

        if monitor.selected_client.is_some() {
            self.arrange(Some(index))
        } else {
            self.draw_bar(index)
        }
    }

    /// Values below 1.0 adjust the master factor, larger ones set it to
    /// `factor - 1.0`. Results outside [0.05, 0.95] are ignored.
    pub fn set_master_factor(&mut self, factor: f32) -> WmResult<()> {
        let index = self.selected_monitor;
        let Some(monitor) = self.monitors.get_mut(index) else {
            return Ok(());
        };
        if !monitor.is_tiling() {
            return Ok(());
        }

        let factor = if factor < 1.0 {
            factor + monitor.master_factor
        } else {
            factor - 1.0
        };
        if !(0.05..=0.95).contains(&factor) {
            return Ok(());
        }
        monitor.master_factor = factor;
        self.arrange(Some(index))
    }

    pub fn inc_num_master(&mut self, delta: i32) -> WmResult<()> {
        let index = self.selected_monitor;
        let Some(monitor) = self.monitors.get_mut(index) else {
            return Ok(());
        };
        let num_master = monitor.num_master as i64 + i64::from(delta);
        monitor.num_master = num_master.max(0) as usize;
        self.arrange(Some(index))
    }

    /// Resolves what was clicked and runs every matching button binding.
    pub fn button_pressed(
        &mut self,
        window: Window,
        event_x: i32,
        button: u8,
        state: u16,
    ) -> WmResult<()> {
        let monitor_index = self.window_to_monitor(window);
        if monitor_index != self.selected_monitor {
            if let Some(selected) = self.selected_client() {
                self.unfocus(selected, true)?;
            }
            self.selected_monitor = monitor_index;
            self.focus(None)?;
        }

        let mut tag_index = None;
        let click = if self.monitors[self.selected_monitor].bar_window == Some(window) {
            let state = self.bar_state(self.selected_monitor);
            let backend = &self.backend;
            let (click, index) =
                click_at(&state, &self.status_text, event_x, |text| backend.text_width(text));
            tag_index = index;
            click
        } else if self.clients.contains_key(&window) {
            self.focus(Some(window))?;
            self.restack(self.selected_monitor)?;
            Click::ClientWindow
        } else {
            Click::RootWindow
        };

        let numlock = self.backend.numlock_mask();
        let state = clean_mask(state, numlock);
        let matching: Vec<(KeyAction, Arg)> = self
            .config
            .buttons
            .iter()
            .filter(|binding| {
                binding.click == click
                    && binding.button == button
                    && clean_mask(modifiers_to_mask(&binding.modifiers), numlock) == state
            })
            .map(|binding| {
                let arg = match (&binding.arg, tag_index) {
                    (Arg::None, Some(index)) if click == Click::TagBar => Arg::Int(index as i32),
                    (arg, _) => arg.clone(),
                };
                (binding.func, arg)
            })
            .collect();

        for (action, arg) in matching {
            self.handle_key_action(action, &arg)?;
        }
        Ok(())
    }
}

fn numeric(action: KeyAction, arg: &Arg) -> Option<i32> {
    let value = arg.as_int();
    if value.is_none() {
        tracing::warn!(?action, ?arg, "ignoring non-numeric argument");
    }
    value
}

/// Exactly `N` integers, written as `"1 -1"` or as an array of numbers.
fn integers<const N: usize>(action: KeyAction, arg: &Arg) -> Option<[i32; N]> {
    let parsed: Option<Vec<i32>> = match arg {
        Arg::Str(text) => text.split_whitespace().map(|word| word.parse().ok()).collect(),
        Arg::Array(words) => words.iter().map(|word| word.trim().parse().ok()).collect(),
        _ => None,
    };
    let values = parsed.and_then(|values| <[i32; N]>::try_from(values).ok());
    if values.is_none() {
        tracing::warn!(?action, ?arg, expected = N, "ignoring malformed integer argument");
    }
    values
}

#[cfg(test)]
mod tests {
    use x11rb::protocol::xproto::KeyButMask;

    use super::super::testing::{manager_with_clients, single_screen};
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn master_factor_relative_and_absolute() {
        let mut wm = single_screen();
        wm.set_master_factor(0.05).unwrap();
        assert!(close(wm.monitors[0].master_factor, 0.55));
        wm.set_master_factor(1.3).unwrap();
        assert!(close(wm.monitors[0].master_factor, 0.3));
    }

    #[test]
    fn master_factor_out_of_range_is_rejected() {
        let mut wm = single_screen();
        wm.set_master_factor(-0.5).unwrap();
        assert!(close(wm.monitors[0].master_factor, 0.5));
        wm.set_master_factor(1.99).unwrap();
        assert!(close(wm.monitors[0].master_factor, 0.5));
    }

    #[test]
    fn master_factor_ignored_without_tiling() {
        let mut wm = single_screen();
        wm.set_layout(Some(LayoutType::Floating)).unwrap();
        wm.set_master_factor(0.1).unwrap();
        assert!(close(wm.monitors[0].master_factor, 0.5));
    }

    #[test]
    fn num_master_never_goes_negative() {
        let mut wm = manager_with_clients(2);
        wm.inc_num_master(-5).unwrap();
        assert_eq!(wm.monitors[0].num_master, 0);
        wm.inc_num_master(2).unwrap();
        assert_eq!(wm.monitors[0].num_master, 2);
    }

    #[test]
    fn layout_toggle_swaps_between_two_slots() {
        let mut wm = single_screen();
        assert_eq!(wm.monitors[0].layout(), LayoutType::Tiling);
        wm.set_layout(None).unwrap();
        assert_eq!(wm.monitors[0].layout(), LayoutType::Floating);
        assert_eq!(wm.monitors[0].layout_symbol, "><>");
        wm.set_layout(None).unwrap();
        assert_eq!(wm.monitors[0].layout(), LayoutType::Tiling);
    }

    #[test]
    fn choosing_the_active_layout_keeps_it() {
        let mut wm = single_screen();
        wm.set_layout(Some(LayoutType::Tiling)).unwrap();
        assert_eq!(wm.monitors[0].layout(), LayoutType::Tiling);
        assert_eq!(wm.monitors[0].selected_layout_index, 0);
    }

    #[test]
    fn tag_actions_take_an_index() {
        let mut wm = manager_with_clients(1);
        wm.handle_key_action(KeyAction::ViewTag, &Arg::Int(1))
            .unwrap();
        assert_eq!(wm.monitors[0].get_selected_tag(), 0b10);
        wm.handle_key_action(KeyAction::ViewTag, &Arg::Int(42))
            .unwrap();
        assert_eq!(wm.monitors[0].get_selected_tag(), 0b10);
        wm.handle_key_action(KeyAction::ViewAll, &Arg::None).unwrap();
        assert_eq!(wm.monitors[0].get_selected_tag(), 0x1ff);
    }

    #[test]
    fn unknown_layout_name_is_ignored() {
        let mut wm = single_screen();
        wm.handle_key_action(KeyAction::ChangeLayout, &Arg::Str("spiral".to_string()))
            .unwrap();
        assert_eq!(wm.monitors[0].layout(), LayoutType::Tiling);
    }

    #[test]
    fn mouse_actions_request_a_drag() {
        let mut wm = manager_with_clients(1);
        wm.handle_key_action(KeyAction::ResizeMouse, &Arg::None)
            .unwrap();
        assert_eq!(wm.take_pending_drag(), Some(DragKind::Resize));
        assert_eq!(wm.take_pending_drag(), None);
    }

    #[test]
    fn quit_stops_the_manager() {
        let mut wm = single_screen();
        wm.handle_key_action(KeyAction::Quit, &Arg::None).unwrap();
        assert!(!wm.is_running());
    }

    #[test]
    fn tag_bar_click_views_that_tag() {
        let mut wm = manager_with_clients(1);
        let bar = wm.monitors[0].bar_window.unwrap();
        // Each single character tag is 12 wide, so x = 30 falls on the third.
        wm.button_pressed(bar, 30, 1, 0).unwrap();
        assert_eq!(wm.monitors[0].get_selected_tag(), 0b100);
    }

    #[test]
    fn layout_symbol_click_toggles_layout() {
        let mut wm = manager_with_clients(1);
        let bar = wm.monitors[0].bar_window.unwrap();
        let tags_width = 9 * 12;
        wm.button_pressed(bar, tags_width + 2, 1, 0).unwrap();
        assert_eq!(wm.monitors[0].layout(), LayoutType::Floating);
    }

    #[test]
    fn client_click_focuses_and_honours_modifiers() {
        let mut wm = manager_with_clients(2);
        let modkey = u16::from(wm.config.modkey);
        wm.button_pressed(1, 5, 1, 0).unwrap();
        assert_eq!(wm.selected_client(), Some(1));
        assert_eq!(wm.take_pending_drag(), None);

        // Lock modifiers are ignored when matching.
        wm.button_pressed(1, 5, 1, modkey | 2).unwrap();
        assert_eq!(wm.take_pending_drag(), Some(DragKind::Move));
        wm.button_pressed(1, 5, 1, modkey | 16).unwrap();
        assert_eq!(wm.take_pending_drag(), Some(DragKind::Move));

        // With Num Lock on Mod3, Mod2 is an ordinary modifier.
        wm.backend.numlock_mask = u16::from(KeyButMask::MOD3);
        wm.button_pressed(1, 5, 1, modkey | 16).unwrap();
        assert_eq!(wm.take_pending_drag(), None);
        wm.button_pressed(1, 5, 1, modkey | 32).unwrap();
        assert_eq!(wm.take_pending_drag(), Some(DragKind::Move));
    }

    #[test]
    fn non_numeric_arguments_are_ignored() {
        let mut wm = manager_with_clients(3);
        let text = Arg::Str("oops".to_string());
        assert_eq!(wm.selected_client(), Some(3));

        wm.handle_key_action(KeyAction::FocusStack, &text).unwrap();
        assert_eq!(wm.selected_client(), Some(3));
        wm.handle_key_action(KeyAction::MoveToTag, &text).unwrap();
        assert_eq!(wm.clients[&3].tags, 1);
        wm.handle_key_action(KeyAction::IncNumMaster, &Arg::None).unwrap();
        assert_eq!(wm.monitors[0].num_master, 1);
        wm.handle_key_action(KeyAction::SetMasterFactor, &text).unwrap();
        assert!(close(wm.monitors[0].master_factor, 0.5));

        wm.view(0b100).unwrap();
        wm.handle_key_action(KeyAction::ViewTag, &text).unwrap();
        assert_eq!(wm.monitors[0].get_selected_tag(), 0b100);
    }

    #[test]
    fn keyboard_moves_parse_their_integers() {
        let mut wm = manager_with_clients(1);
        wm.toggle_floating().unwrap();
        let before = wm.clients[&1].rect();
        for arg in [
            Arg::Str("1".to_string()),
            Arg::Str("left top".to_string()),
            Arg::Str("1 2 3".to_string()),
            Arg::Int(1),
            Arg::None,
        ] {
            wm.handle_key_action(KeyAction::MoveToEdge, &arg).unwrap();
            wm.handle_key_action(KeyAction::MoveResize, &arg).unwrap();
            wm.handle_key_action(KeyAction::MoveResizeToCorner, &arg).unwrap();
        }
        assert_eq!(wm.clients[&1].rect(), before);

        let border = wm.config.border_width as i32;
        wm.handle_key_action(KeyAction::MoveToEdge, &Arg::Str("-1 -1".to_string()))
            .unwrap();
        assert_eq!(wm.clients[&1].x, border);

        let delta = ["10", "0", "0", "0"].map(String::from).to_vec();
        wm.handle_key_action(KeyAction::MoveResize, &Arg::Array(delta))
            .unwrap();
        assert_eq!(wm.clients[&1].x, border + 10);
    }
}
