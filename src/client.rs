use x11rb::protocol::xproto::Window;

use crate::geometry::Rect;

pub type TagMask = u32;

/// ICCCM WM_NORMAL_HINTS reduced to what the size constraint needs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SizeHints {
    pub base_width: i32,
    pub base_height: i32,
    pub increment_width: i32,
    pub increment_height: i32,
    pub max_width: i32,
    pub max_height: i32,
    pub min_width: i32,
    pub min_height: i32,
    pub min_aspect: f32,
    pub max_aspect: f32,
}

impl SizeHints {
    pub fn is_fixed(&self) -> bool {
        self.max_width > 0
            && self.max_height > 0
            && self.max_width == self.min_width
            && self.max_height == self.min_height
    }
}

/// Where a client may be placed while its geometry is constrained.
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    pub screen_width: i32,
    pub screen_height: i32,
    pub window_area: Rect,
    pub min_size: i32,
}

#[derive(Debug, Clone)]
pub struct Client {
    pub window: Window,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub old_x: i32,
    pub old_y: i32,
    pub old_width: i32,
    pub old_height: i32,
    pub border_width: i32,
    pub old_border_width: i32,
    pub hints: SizeHints,
    pub hints_valid: bool,
    pub tags: TagMask,
    pub is_fixed: bool,
    pub is_floating: bool,
    pub is_urgent: bool,
    pub never_focus: bool,
    pub is_fullscreen: bool,
    pub was_floating: bool,
    pub monitor_index: usize,
}

impl Client {
    pub fn new(window: Window, geometry: Rect, border_width: i32, monitor_index: usize) -> Self {
        Self {
            window,
            name: String::new(),
            x: geometry.x,
            y: geometry.y,
            width: geometry.width,
            height: geometry.height,
            old_x: geometry.x,
            old_y: geometry.y,
            old_width: geometry.width,
            old_height: geometry.height,
            border_width,
            old_border_width: border_width,
            hints: SizeHints::default(),
            hints_valid: false,
            tags: 0,
            is_fixed: false,
            is_floating: false,
            is_urgent: false,
            never_focus: false,
            is_fullscreen: false,
            was_floating: false,
            monitor_index,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn width_with_border(&self) -> i32 {
        self.width + 2 * self.border_width
    }

    pub fn height_with_border(&self) -> i32 {
        self.height + 2 * self.border_width
    }

    pub fn set_hints(&mut self, hints: SizeHints) {
        self.hints = hints;
        self.is_fixed = hints.is_fixed();
        self.hints_valid = true;
    }

    /// Stores `rect` as the current geometry and remembers the previous one.
    pub fn set_geometry(&mut self, rect: Rect) {
        self.old_x = self.x;
        self.old_y = self.y;
        self.old_width = self.width;
        self.old_height = self.height;
        self.x = rect.x;
        self.y = rect.y;
        self.width = rect.width;
        self.height = rect.height;
    }

    /// Coerces `rect` onto the screen and, when `honor_hints` is set, into the
    /// client's ICCCM size constraints. Returns whether the result differs from
    /// the current geometry.
    pub fn constrain(
        &self,
        rect: &mut Rect,
        bounds: &Bounds,
        interact: bool,
        honor_hints: bool,
    ) -> bool {
        rect.width = rect.width.max(1);
        rect.height = rect.height.max(1);

        let area = bounds.window_area;
        if interact {
            if rect.x > bounds.screen_width {
                rect.x = bounds.screen_width - self.width_with_border();
            }
            if rect.y > bounds.screen_height {
                rect.y = bounds.screen_height - self.height_with_border();
            }
            if rect.x + rect.width + 2 * self.border_width < 0 {
                rect.x = 0;
            }
            if rect.y + rect.height + 2 * self.border_width < 0 {
                rect.y = 0;
            }
        } else {
            if rect.x >= area.right() {
                rect.x = area.right() - self.width_with_border();
            }
            if rect.y >= area.bottom() {
                rect.y = area.bottom() - self.height_with_border();
            }
            if rect.x + rect.width + 2 * self.border_width <= area.x {
                rect.x = area.x;
            }
            if rect.y + rect.height + 2 * self.border_width <= area.y {
                rect.y = area.y;
            }
        }

        rect.height = rect.height.max(bounds.min_size);
        rect.width = rect.width.max(bounds.min_size);

        if honor_hints {
            let hints = &self.hints;
            let base_is_min =
                hints.base_width == hints.min_width && hints.base_height == hints.min_height;

            if !base_is_min {
                rect.width -= hints.base_width;
                rect.height -= hints.base_height;
            }

            if hints.min_aspect > 0.0 && hints.max_aspect > 0.0 && rect.width > 0 && rect.height > 0
            {
                let ratio = rect.width as f32 / rect.height as f32;
                if hints.max_aspect < ratio {
                    rect.width = (rect.height as f32 * hints.max_aspect + 0.5) as i32;
                } else if hints.min_aspect < rect.height as f32 / rect.width as f32 {
                    rect.height = (rect.width as f32 * hints.min_aspect + 0.5) as i32;
                }
            }

            if base_is_min {
                rect.width -= hints.base_width;
                rect.height -= hints.base_height;
            }

            if hints.increment_width > 0 {
                rect.width -= rect.width % hints.increment_width;
            }
            if hints.increment_height > 0 {
                rect.height -= rect.height % hints.increment_height;
            }

            rect.width = (rect.width + hints.base_width).max(hints.min_width);
            rect.height = (rect.height + hints.base_height).max(hints.min_height);

            if hints.max_width > 0 {
                rect.width = rect.width.min(hints.max_width);
            }
            if hints.max_height > 0 {
                rect.height = rect.height.min(hints.max_height);
            }
        }

        rect.x != self.x || rect.y != self.y || rect.width != self.width || rect.height != self.height
    }
}
