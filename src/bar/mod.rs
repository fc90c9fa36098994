#[allow(clippy::module_inception)]
mod bar;
mod font;

pub use bar::Bar;
pub use font::Font;

use crate::keyboard::Click;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagState {
    pub name: String,
    pub selected: bool,
    pub occupied: bool,
    pub urgent: bool,
    /// The focused client on the focused monitor carries this tag.
    pub has_focused: bool,
}

/// Everything a bar needs to draw itself for one monitor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BarState {
    pub width: i32,
    pub tags: Vec<TagState>,
    pub layout_symbol: String,
    pub monitor_mark: String,
    pub title: Option<String>,
    pub title_floating: bool,
    pub title_fixed: bool,
    /// Only set on the focused monitor.
    pub status: Option<String>,
    pub is_selected_monitor: bool,
}

/// Region of the bar under `x`, with the tag index for tag clicks.
pub fn click_at(
    state: &BarState,
    status: &str,
    x: i32,
    text_width: impl Fn(&str) -> i32,
) -> (Click, Option<usize>) {
    let mut right = 0;
    for (index, tag) in state.tags.iter().enumerate() {
        right += text_width(&tag.name);
        if x < right {
            return (Click::TagBar, Some(index));
        }
    }

    right += text_width(&state.layout_symbol);
    if x < right {
        return (Click::LayoutSymbol, None);
    }

    right += text_width(&state.monitor_mark);
    if x < right {
        return (Click::MonitorMark, None);
    }

    if x > state.width - text_width(status) {
        (Click::StatusText, None)
    } else {
        (Click::WindowTitle, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> BarState {
        BarState {
            width: 400,
            tags: ["1", "2", "3"]
                .iter()
                .map(|name| TagState {
                    name: name.to_string(),
                    selected: false,
                    occupied: false,
                    urgent: false,
                    has_focused: false,
                })
                .collect(),
            layout_symbol: "[]=".to_string(),
            monitor_mark: "(0)".to_string(),
            ..BarState::default()
        }
    }

    // Every character is 6 pixels wide with 6 pixels of padding.
    fn width(text: &str) -> i32 {
        text.len() as i32 * 6 + 6
    }

    #[test]
    fn tag_regions_map_to_indices() {
        let state = state();
        assert_eq!(click_at(&state, "", 0, width), (Click::TagBar, Some(0)));
        assert_eq!(click_at(&state, "", 12, width), (Click::TagBar, Some(1)));
        assert_eq!(click_at(&state, "", 35, width), (Click::TagBar, Some(2)));
    }

    #[test]
    fn symbol_mark_title_and_status() {
        let state = state();
        assert_eq!(click_at(&state, "", 36, width), (Click::LayoutSymbol, None));
        assert_eq!(click_at(&state, "", 60, width), (Click::MonitorMark, None));
        assert_eq!(click_at(&state, "load 0.5", 100, width), (Click::WindowTitle, None));
        assert_eq!(click_at(&state, "load 0.5", 390, width), (Click::StatusText, None));
    }
}
