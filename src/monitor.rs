use crate::Config;
use crate::client::TagMask;
use crate::geometry::Rect;
use crate::layout::LayoutType;
use x11rb::protocol::xproto::Window;

#[derive(Debug, Clone)]
pub struct Monitor {
    pub layout_symbol: String,
    pub master_factor: f32,
    pub num_master: usize,
    pub monitor_number: usize,
    pub bar_y_position: i32,
    pub screen_x: i32,
    pub screen_y: i32,
    pub screen_width: i32,
    pub screen_height: i32,
    pub window_area_x: i32,
    pub window_area_y: i32,
    pub window_area_width: i32,
    pub window_area_height: i32,
    pub selected_tags_index: usize,
    pub selected_layout_index: usize,
    pub tagset: [TagMask; 2],
    pub layouts: [LayoutType; 2],
    pub show_bar: bool,
    pub top_bar: bool,
    /// Attachment order, most recently attached first.
    pub clients: Vec<Window>,
    /// Focus order, most recently focused first.
    pub stack: Vec<Window>,
    pub selected_client: Option<Window>,
    pub bar_window: Option<Window>,
}

impl Monitor {
    pub fn new(config: &Config) -> Self {
        let first = config
            .layouts
            .first()
            .copied()
            .unwrap_or(LayoutType::Tiling);
        let layouts = [first, config.layouts.get(1).copied().unwrap_or(first)];
        Self {
            layout_symbol: layouts[0].symbol().to_string(),
            master_factor: config.master_factor,
            num_master: config.num_master,
            monitor_number: 0,
            bar_y_position: 0,
            screen_x: 0,
            screen_y: 0,
            screen_width: 0,
            screen_height: 0,
            window_area_x: 0,
            window_area_y: 0,
            window_area_width: 0,
            window_area_height: 0,
            selected_tags_index: 0,
            selected_layout_index: 0,
            tagset: [1, 1],
            layouts,
            show_bar: config.show_bar,
            top_bar: config.top_bar,
            clients: Vec::new(),
            stack: Vec::new(),
            selected_client: None,
            bar_window: None,
        }
    }

    pub fn screen(&self) -> Rect {
        Rect::new(
            self.screen_x,
            self.screen_y,
            self.screen_width,
            self.screen_height,
        )
    }

    pub fn window_area(&self) -> Rect {
        Rect::new(
            self.window_area_x,
            self.window_area_y,
            self.window_area_width,
            self.window_area_height,
        )
    }

    pub fn bar_rect(&self, bar_height: i32) -> Rect {
        Rect::new(
            self.window_area_x,
            self.bar_y_position,
            self.window_area_width,
            bar_height,
        )
    }

    pub fn get_selected_tag(&self) -> TagMask {
        self.tagset[self.selected_tags_index]
    }

    pub fn layout(&self) -> LayoutType {
        self.layouts[self.selected_layout_index]
    }

    pub fn is_tiling(&self) -> bool {
        self.layout().is_tiling()
    }

    pub fn is_visible(&self, tags: TagMask) -> bool {
        tags & self.get_selected_tag() != 0
    }

    pub fn mark(&self) -> String {
        format!("({})", self.monitor_number)
    }

    /// Overwrites screen and window area with `rect`, then reserves bar space.
    pub fn set_screen(&mut self, rect: Rect, bar_height: i32) {
        self.screen_x = rect.x;
        self.screen_y = rect.y;
        self.screen_width = rect.width;
        self.screen_height = rect.height;
        self.window_area_x = rect.x;
        self.window_area_width = rect.width;
        self.update_bar_position(bar_height);
    }

    pub fn update_bar_position(&mut self, bar_height: i32) {
        self.window_area_y = self.screen_y;
        self.window_area_height = self.screen_height;

        if self.show_bar {
            self.window_area_height -= bar_height;
            if self.top_bar {
                self.bar_y_position = self.window_area_y;
                self.window_area_y += bar_height;
            } else {
                self.bar_y_position = self.window_area_y + self.window_area_height;
            }
        } else {
            self.bar_y_position = -bar_height;
        }
    }
}

/// Drops screens whose geometry exactly repeats an earlier one. Some setups
/// report a cloned output once per connector.
pub fn unique_screens(screens: &[Rect]) -> Vec<Rect> {
    let mut unique: Vec<Rect> = Vec::with_capacity(screens.len());
    for screen in screens {
        if !unique.contains(screen) {
            unique.push(*screen);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_screens_are_collapsed() {
        let screens = [
            Rect::new(0, 0, 1920, 1080),
            Rect::new(0, 0, 1920, 1080),
            Rect::new(1920, 0, 1280, 1024),
        ];
        assert_eq!(
            unique_screens(&screens),
            vec![Rect::new(0, 0, 1920, 1080), Rect::new(1920, 0, 1280, 1024)]
        );
    }

    #[test]
    fn top_bar_reserves_space_above() {
        let mut monitor = Monitor::new(&Config::default());
        monitor.set_screen(Rect::new(0, 0, 1920, 1080), 20);
        assert_eq!(monitor.bar_y_position, 0);
        assert_eq!(monitor.window_area(), Rect::new(0, 20, 1920, 1060));
    }

    #[test]
    fn bottom_bar_reserves_space_below() {
        let mut monitor = Monitor::new(&Config::default());
        monitor.top_bar = false;
        monitor.set_screen(Rect::new(0, 0, 1920, 1080), 20);
        assert_eq!(monitor.bar_y_position, 1060);
        assert_eq!(monitor.window_area(), Rect::new(0, 0, 1920, 1060));
    }

    #[test]
    fn hidden_bar_is_parked_offscreen() {
        let mut monitor = Monitor::new(&Config::default());
        monitor.show_bar = false;
        monitor.set_screen(Rect::new(0, 0, 800, 600), 20);
        assert_eq!(monitor.bar_y_position, -20);
        assert_eq!(monitor.window_area(), monitor.screen());
    }
}
