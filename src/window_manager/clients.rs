use x11rb::protocol::xproto::Window;

use super::WindowManager;
use crate::backend::{Backend, ConfigureRequest, WindowState, WmResult};
use crate::client::Client;
use crate::geometry::Rect;

const BROKEN: &str = "broken";

/// Client properties whose changes the window manager reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    TransientFor,
    NormalHints,
    Hints,
    Title,
    WindowType,
}

impl<B: Backend> WindowManager<B> {
    /// Starts managing `window`, which currently has `geometry` and
    /// `border_width`.
    pub fn manage(&mut self, window: Window, geometry: Rect, border_width: i32) -> WmResult<()> {
        if self.clients.contains_key(&window) || self.monitors.is_empty() {
            return Ok(());
        }

        let mut client = Client::new(window, geometry, border_width, self.selected_monitor);
        client.name = self.fetch_title(window);

        let transient = self.backend.transient_for(window);
        match transient.and_then(|parent| self.clients.get(&parent)) {
            Some(parent) => {
                client.monitor_index = parent.monitor_index;
                client.tags = parent.tags;
            }
            None => self.apply_rules(&mut client),
        }

        let area = self.monitors[client.monitor_index].window_area();
        if client.x + client.width_with_border() > area.right() {
            client.x = area.right() - client.width_with_border();
        }
        if client.y + client.height_with_border() > area.bottom() {
            client.y = area.bottom() - client.height_with_border();
        }
        client.x = client.x.max(area.x);
        client.y = client.y.max(area.y);

        client.border_width = self.config.border_width as i32;
        let rect = client.rect();
        let monitor_index = client.monitor_index;
        self.clients.insert(window, client);

        self.backend
            .set_border_width(window, self.config.border_width as i32)?;
        self.backend.set_border_color(window, false)?;
        self.backend
            .send_configure_notify(window, rect, self.config.border_width as i32)?;

        self.update_window_type(window)?;
        self.update_size_hints(window);
        self.update_wm_hints(window)?;

        self.backend.select_client_events(window)?;
        self.backend
            .grab_buttons(window, false, &self.config.buttons)?;

        let Some(client) = self.clients.get_mut(&window) else {
            return Ok(());
        };
        if !client.is_floating {
            client.is_floating = transient.is_some() || client.is_fixed;
            client.was_floating = client.is_floating;
        }
        let is_floating = client.is_floating;
        if is_floating {
            self.backend.raise_window(window)?;
        }

        self.attach(window);
        self.attach_stack(window);
        self.update_client_list()?;

        self.backend
            .move_window(window, rect.x + 2 * self.screen_width, rect.y)?;
        self.backend.set_window_state(window, WindowState::Normal)?;

        if monitor_index == self.selected_monitor
            && let Some(selected) = self.selected_client()
        {
            self.unfocus(selected, false)?;
        }
        self.monitors[monitor_index].selected_client = Some(window);

        tracing::debug!(window, monitor = monitor_index, floating = is_floating, "managing window");

        self.arrange(Some(monitor_index))?;
        self.backend.map_window(window)?;
        self.focus(None)
    }

    fn apply_rules(&self, client: &mut Client) {
        let (class, instance) = self.backend.class_instance(client.window);
        let class = if class.is_empty() { BROKEN.to_string() } else { class };
        let instance = if instance.is_empty() { BROKEN.to_string() } else { instance };

        client.is_floating = false;
        client.tags = 0;
        for rule in &self.config.window_rules {
            if !rule.matches(&class, &instance, &client.name) {
                continue;
            }
            if let Some(is_floating) = rule.is_floating {
                client.is_floating = is_floating;
            }
            client.tags |= rule.tags.unwrap_or(0);
            if let Some(index) = rule.monitor.filter(|&index| index < self.monitors.len()) {
                client.monitor_index = index;
            }
        }

        let tags = client.tags & self.tag_mask();
        client.tags = if tags != 0 {
            tags
        } else {
            self.monitors[client.monitor_index].get_selected_tag()
        };
    }

    /// Stops managing `window`. `destroyed` means the window no longer exists
    /// and must not be touched.
    pub fn unmanage(&mut self, window: Window, destroyed: bool) -> WmResult<()> {
        let Some(client) = self.clients.get(&window) else {
            return Ok(());
        };
        let monitor_index = client.monitor_index;
        let old_border_width = client.old_border_width;

        self.detach(window);
        self.detach_stack(window);
        if !destroyed {
            self.backend.release_window(window, old_border_width)?;
        }
        self.clients.remove(&window);

        tracing::debug!(window, destroyed, "unmanaged window");

        self.focus(None)?;
        self.update_client_list()?;
        self.arrange(Some(monitor_index))
    }

    /// A synthetic unmap is the client withdrawing itself; a real one means
    /// it is gone.
    pub fn unmap_notify(&mut self, window: Window, synthetic: bool) -> WmResult<()> {
        if !self.clients.contains_key(&window) {
            return Ok(());
        }
        if synthetic {
            self.backend.set_window_state(window, WindowState::Withdrawn)
        } else {
            self.unmanage(window, false)
        }
    }

    fn fetch_title(&self, window: Window) -> String {
        self.backend
            .title(window)
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| BROKEN.to_string())
    }

    pub(crate) fn update_size_hints(&mut self, window: Window) {
        let hints = self.backend.size_hints(window).unwrap_or_default();
        if let Some(client) = self.clients.get_mut(&window) {
            client.set_hints(hints);
        }
    }

    fn update_wm_hints(&mut self, window: Window) -> WmResult<()> {
        let Some(hints) = self.backend.wm_hints(window) else {
            return Ok(());
        };
        let is_selected = self.selected_client() == Some(window);
        let Some(client) = self.clients.get_mut(&window) else {
            return Ok(());
        };

        client.never_focus = hints.input.is_some_and(|input| !input);
        if is_selected && hints.urgent {
            self.backend.set_urgency_hint(window, false)?;
        } else {
            client.is_urgent = hints.urgent;
        }
        Ok(())
    }

    fn update_window_type(&mut self, window: Window) -> WmResult<()> {
        let window_type = self.backend.window_type(window);
        if window_type.fullscreen {
            self.set_fullscreen(window, true)?;
        }
        if window_type.dialog
            && let Some(client) = self.clients.get_mut(&window)
        {
            client.is_floating = true;
        }
        Ok(())
    }

    pub fn set_fullscreen(&mut self, window: Window, fullscreen: bool) -> WmResult<()> {
        let Some(client) = self.clients.get_mut(&window) else {
            return Ok(());
        };

        if fullscreen && !client.is_fullscreen {
            client.is_fullscreen = true;
            client.was_floating = client.is_floating;
            client.old_border_width = client.border_width;
            client.border_width = 0;
            client.is_floating = true;
            let screen = self.monitors[client.monitor_index].screen();

            self.backend.set_fullscreen_property(window, true)?;
            self.resize_client(window, screen)?;
            self.backend.raise_window(window)?;
        } else if !fullscreen && client.is_fullscreen {
            client.is_fullscreen = false;
            client.is_floating = client.was_floating;
            client.border_width = client.old_border_width;
            let restore = Rect::new(
                client.old_x,
                client.old_y,
                client.old_width,
                client.old_height,
            );
            client.set_geometry(restore);
            let monitor_index = client.monitor_index;

            self.backend.set_fullscreen_property(window, false)?;
            self.resize_client(window, restore)?;
            self.arrange(Some(monitor_index))?;
        }
        Ok(())
    }

    pub fn toggle_fullscreen(&mut self) -> WmResult<()> {
        let Some(window) = self.selected_client() else {
            return Ok(());
        };
        let fullscreen = self.clients.get(&window).is_some_and(|c| c.is_fullscreen);
        self.set_fullscreen(window, !fullscreen)
    }

    pub fn toggle_floating(&mut self) -> WmResult<()> {
        let Some(window) = self.selected_client() else {
            return Ok(());
        };
        let Some(client) = self.clients.get_mut(&window) else {
            return Ok(());
        };
        if client.is_fullscreen {
            return Ok(());
        }

        client.is_floating = !client.is_floating || client.is_fixed;
        if client.is_floating {
            let rect = client.rect();
            self.resize(window, rect, false)?;
        }
        self.arrange(Some(self.selected_monitor))
    }

    /// Tiled clients only get told their current geometry. Floating clients,
    /// and any client under a floating layout, may move and resize.
    pub fn configure_request(&mut self, request: ConfigureRequest) -> WmResult<()> {
        let window = request.window;
        let selected_tiling = self
            .monitors
            .get(self.selected_monitor)
            .is_some_and(|monitor| monitor.is_tiling());
        let visible = self.is_visible(window);

        let Some(client) = self.clients.get_mut(&window) else {
            return self.backend.configure_passthrough(&request);
        };

        if let Some(border_width) = request.border_width {
            client.border_width = border_width;
            return Ok(());
        }

        if !client.is_floating && selected_tiling {
            let (rect, border_width) = (client.rect(), client.border_width);
            return self
                .backend
                .send_configure_notify(window, rect, border_width);
        }

        let screen = self.monitors[client.monitor_index].screen();
        if let Some(x) = request.x {
            client.old_x = client.x;
            client.x = screen.x + x;
        }
        if let Some(y) = request.y {
            client.old_y = client.y;
            client.y = screen.y + y;
        }
        if let Some(width) = request.width {
            client.old_width = client.width;
            client.width = width;
        }
        if let Some(height) = request.height {
            client.old_height = client.height;
            client.height = height;
        }

        if client.is_floating {
            if client.x + client.width > screen.right() {
                client.x = screen.x + (screen.width / 2 - client.width_with_border() / 2);
            }
            if client.y + client.height > screen.bottom() {
                client.y = screen.y + (screen.height / 2 - client.height_with_border() / 2);
            }
        }

        let (rect, border_width) = (client.rect(), client.border_width);
        let moved_only = (request.x.is_some() || request.y.is_some())
            && request.width.is_none()
            && request.height.is_none();
        if moved_only {
            self.backend
                .send_configure_notify(window, rect, border_width)?;
        }
        if visible {
            self.backend.configure_client(window, rect, border_width)?;
        }
        Ok(())
    }

    pub fn property_changed(&mut self, window: Window, property: Property) -> WmResult<()> {
        let Some(client) = self.clients.get(&window) else {
            return Ok(());
        };
        let monitor_index = client.monitor_index;

        match property {
            Property::TransientFor => {
                let parent_managed = self
                    .backend
                    .transient_for(window)
                    .is_some_and(|parent| self.clients.contains_key(&parent));
                if let Some(client) = self.clients.get_mut(&window)
                    && !client.is_floating
                    && parent_managed
                {
                    client.is_floating = true;
                    self.arrange(Some(monitor_index))?;
                }
            }
            Property::NormalHints => {
                if let Some(client) = self.clients.get_mut(&window) {
                    client.hints_valid = false;
                }
            }
            Property::Hints => {
                self.update_wm_hints(window)?;
                self.draw_bars()?;
            }
            Property::Title => {
                let title = self.fetch_title(window);
                if let Some(client) = self.clients.get_mut(&window) {
                    client.name = title;
                }
                if self.monitors[monitor_index].selected_client == Some(window) {
                    self.draw_bar(monitor_index)?;
                }
            }
            Property::WindowType => self.update_window_type(window)?,
        }
        Ok(())
    }

    /// `_NET_WM_STATE` fullscreen change: 0 removes, 1 adds, 2 toggles.
    pub fn fullscreen_request(&mut self, window: Window, action: u32) -> WmResult<()> {
        let Some(client) = self.clients.get(&window) else {
            return Ok(());
        };
        let fullscreen = action == 1 || (action == 2 && !client.is_fullscreen);
        self.set_fullscreen(window, fullscreen)
    }

    /// A client asked to be activated. It is marked urgent rather than
    /// focused.
    pub fn activate_request(&mut self, window: Window) -> WmResult<()> {
        let Some(client) = self.clients.get(&window) else {
            return Ok(());
        };
        if self.selected_client() != Some(window) && !client.is_urgent {
            self.set_urgent(window, true)?;
            self.draw_bars()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{
        Call, assert_lists_agree, manage_window, manager_with_clients, single_screen,
    };
    use super::*;
    use crate::WindowRule;
    use crate::backend::{WindowType, WmHints};
    use crate::client::SizeHints;

    #[test]
    fn rules_set_tags_and_floating() {
        let mut wm = single_screen();
        wm.config.window_rules = vec![WindowRule {
            class: Some("Gimp".to_string()),
            tags: Some(0b100),
            is_floating: Some(true),
            ..WindowRule::default()
        }];
        wm.backend
            .classes
            .insert(1, ("Gimp".to_string(), "gimp".to_string()));
        manage_window(&mut wm, 1);

        assert_eq!(wm.clients[&1].tags, 0b100);
        assert!(wm.clients[&1].is_floating);
        assert_eq!(wm.selected_client(), None);
    }

    #[test]
    fn rule_tags_outside_the_tag_set_fall_back_to_current_view() {
        let mut wm = single_screen();
        wm.config.window_rules = vec![WindowRule {
            instance: Some("term".to_string()),
            tags: Some(1 << 20),
            ..WindowRule::default()
        }];
        wm.backend
            .classes
            .insert(1, ("St".to_string(), "term".to_string()));
        manage_window(&mut wm, 1);
        assert_eq!(wm.clients[&1].tags, 0b1);
    }

    #[test]
    fn transient_inherits_parent_tags_and_floats() {
        let mut wm = manager_with_clients(1);
        wm.clients.get_mut(&1).unwrap().tags = 0b11;
        wm.backend.transients.insert(2, 1);
        manage_window(&mut wm, 2);
        assert_eq!(wm.clients[&2].tags, 0b11);
        assert!(wm.clients[&2].is_floating);
    }

    #[test]
    fn fixed_size_clients_float() {
        let mut wm = single_screen();
        wm.backend.size_hints.insert(
            1,
            SizeHints {
                min_width: 100,
                min_height: 100,
                max_width: 100,
                max_height: 100,
                ..SizeHints::default()
            },
        );
        manage_window(&mut wm, 1);
        assert!(wm.clients[&1].is_fixed);
        assert!(wm.clients[&1].is_floating);
    }

    #[test]
    fn missing_title_is_marked_broken() {
        let mut wm = manager_with_clients(1);
        assert_eq!(wm.clients[&1].name, "broken");
        wm.backend.titles.insert(1, "editor".to_string());
        wm.property_changed(1, Property::Title).unwrap();
        assert_eq!(wm.clients[&1].name, "editor");
    }

    #[test]
    fn managed_window_is_placed_inside_the_work_area() {
        let mut wm = single_screen();
        wm.backend.window_types.insert(
            1,
            WindowType {
                dialog: true,
                ..WindowType::default()
            },
        );
        wm.manage(1, Rect::new(5000, -40, 400, 300), 1).unwrap();
        let area = wm.monitors[0].window_area();
        let client = &wm.clients[&1];
        assert!(client.is_floating);
        // Clamped with the border the window arrived with.
        assert_eq!(client.x, area.right() - (400 + 2));
        assert_eq!(client.y, area.y);
        assert!(wm.backend.calls.contains(&Call::Map(1)));
    }

    #[test]
    fn unmanage_releases_live_windows() {
        let mut wm = manager_with_clients(2);
        wm.unmanage(2, false).unwrap();
        assert!(!wm.is_managed(2));
        assert_eq!(wm.monitors[0].clients, vec![1]);
        assert_eq!(wm.monitors[0].stack, vec![1]);
        assert_eq!(wm.selected_client(), Some(1));
        assert!(wm.backend.calls.contains(&Call::Release(2, 1)));
        assert_lists_agree(&wm);
    }

    #[test]
    fn synthetic_unmap_only_withdraws() {
        let mut wm = manager_with_clients(1);
        wm.unmap_notify(1, true).unwrap();
        assert!(wm.is_managed(1));
        assert!(
            wm.backend
                .calls
                .contains(&Call::State(1, WindowState::Withdrawn))
        );
        wm.unmap_notify(1, false).unwrap();
        assert!(!wm.is_managed(1));
        assert_lists_agree(&wm);
    }

    #[test]
    fn fullscreen_round_trip_restores_geometry() {
        let mut wm = manager_with_clients(1);
        let before = wm.clients[&1].rect();
        let border = wm.clients[&1].border_width;

        wm.set_fullscreen(1, true).unwrap();
        let client = &wm.clients[&1];
        assert_eq!(client.rect(), wm.monitors[0].screen());
        assert_eq!(client.border_width, 0);
        assert!(client.is_floating);

        wm.set_fullscreen(1, false).unwrap();
        let client = &wm.clients[&1];
        assert_eq!(client.rect(), before);
        assert_eq!(client.border_width, border);
        assert!(!client.is_floating);
    }

    #[test]
    fn fullscreen_request_toggles() {
        let mut wm = manager_with_clients(1);
        wm.fullscreen_request(1, 2).unwrap();
        assert!(wm.clients[&1].is_fullscreen);
        wm.fullscreen_request(1, 2).unwrap();
        assert!(!wm.clients[&1].is_fullscreen);
        wm.fullscreen_request(1, 0).unwrap();
        assert!(!wm.clients[&1].is_fullscreen);
    }

    #[test]
    fn fullscreen_blocks_floating_toggle() {
        let mut wm = manager_with_clients(1);
        wm.set_fullscreen(1, true).unwrap();
        wm.toggle_floating().unwrap();
        assert!(wm.clients[&1].is_floating);
        assert!(wm.clients[&1].is_fullscreen);
    }

    #[test]
    fn toggle_floating_keeps_fixed_clients_floating() {
        let mut wm = manager_with_clients(1);
        wm.toggle_floating().unwrap();
        assert!(wm.clients[&1].is_floating);
        wm.toggle_floating().unwrap();
        assert!(!wm.clients[&1].is_floating);

        wm.clients.get_mut(&1).unwrap().is_fixed = true;
        wm.toggle_floating().unwrap();
        wm.toggle_floating().unwrap();
        assert!(wm.clients[&1].is_floating);
    }

    #[test]
    fn tiled_client_configure_request_gets_current_geometry() {
        let mut wm = manager_with_clients(1);
        let rect = wm.clients[&1].rect();
        wm.backend.calls.clear();
        wm.configure_request(ConfigureRequest {
            window: 1,
            width: Some(10),
            ..ConfigureRequest::default()
        })
        .unwrap();
        assert_eq!(wm.clients[&1].rect(), rect);
        let border = wm.clients[&1].border_width;
        assert_eq!(wm.backend.calls, vec![Call::Notify(1, rect, border)]);
    }

    #[test]
    fn floating_client_configure_request_moves_relative_to_monitor() {
        let mut wm = manager_with_clients(1);
        wm.toggle_floating().unwrap();
        wm.configure_request(ConfigureRequest {
            window: 1,
            x: Some(50),
            y: Some(60),
            width: Some(200),
            height: Some(100),
            ..ConfigureRequest::default()
        })
        .unwrap();
        let screen = wm.monitors[0].screen();
        assert_eq!(
            wm.clients[&1].rect(),
            Rect::new(screen.x + 50, screen.y + 60, 200, 100)
        );
    }

    #[test]
    fn oversized_floating_request_is_centred() {
        let mut wm = manager_with_clients(1);
        wm.toggle_floating().unwrap();
        let screen = wm.monitors[0].screen();
        wm.configure_request(ConfigureRequest {
            window: 1,
            x: Some(screen.width - 10),
            ..ConfigureRequest::default()
        })
        .unwrap();
        let client = &wm.clients[&1];
        assert_eq!(
            client.x,
            screen.x + (screen.width / 2 - client.width_with_border() / 2)
        );
    }

    #[test]
    fn unmanaged_configure_request_passes_through() {
        let mut wm = manager_with_clients(1);
        let request = ConfigureRequest {
            window: 99,
            x: Some(1),
            ..ConfigureRequest::default()
        };
        wm.configure_request(request).unwrap();
        assert!(wm.backend.calls.contains(&Call::Passthrough(99)));
    }

    #[test]
    fn urgency_hint_is_cleared_for_the_selected_client() {
        let mut wm = manager_with_clients(2);
        let hints = WmHints {
            urgent: true,
            input: Some(false),
        };
        wm.backend.wm_hints.insert(1, hints);
        wm.backend.wm_hints.insert(2, hints);

        wm.property_changed(1, Property::Hints).unwrap();
        assert!(wm.clients[&1].is_urgent);
        assert!(wm.clients[&1].never_focus);

        wm.property_changed(2, Property::Hints).unwrap();
        assert!(!wm.clients[&2].is_urgent);
        assert!(wm.backend.calls.contains(&Call::Urgency(2, false)));
    }

    #[test]
    fn transient_hint_change_makes_client_float() {
        let mut wm = manager_with_clients(2);
        wm.backend.transients.insert(2, 1);
        wm.property_changed(2, Property::TransientFor).unwrap();
        assert!(wm.clients[&2].is_floating);
    }

    #[test]
    fn activation_of_selected_client_is_ignored() {
        let mut wm = manager_with_clients(2);
        wm.activate_request(2).unwrap();
        assert!(!wm.clients[&2].is_urgent);
    }
}
