pub mod backend;
pub mod bar;
pub mod client;
pub mod config;
pub mod errors;
pub mod geometry;
pub mod keyboard;
pub mod layout;
pub mod monitor;
pub mod signal;
pub mod window_manager;
pub mod x11;

pub mod prelude {
    pub use crate::ColorScheme;
    pub use crate::WindowRule;
    pub use crate::keyboard::{Arg, ButtonBinding, Click, KeyAction, KeyBinding, keysyms};
    pub use crate::layout::LayoutType;
    pub use x11rb::protocol::xproto::KeyButMask;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowRule {
    pub class: Option<String>,
    pub instance: Option<String>,
    pub title: Option<String>,
    pub tags: Option<u32>,
    pub is_floating: Option<bool>,
    pub monitor: Option<usize>,
}

impl WindowRule {
    pub fn matches(&self, class: &str, instance: &str, title: &str) -> bool {
        let class_matches = self
            .class
            .as_ref()
            .is_none_or(|c| class.contains(c.as_str()));
        let instance_matches = self
            .instance
            .as_ref()
            .is_none_or(|i| instance.contains(i.as_str()));
        let title_matches = self
            .title
            .as_ref()
            .is_none_or(|t| title.contains(t.as_str()));
        class_matches && instance_matches && title_matches
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Appearance
    pub border_width: u32,
    pub border_focused: u32,
    pub border_unfocused: u32,
    pub font: String,
    pub show_bar: bool,
    pub top_bar: bool,

    // Layout
    pub layouts: Vec<crate::layout::LayoutType>,
    pub master_factor: f32,
    pub num_master: usize,
    pub resize_hints: bool,
    pub lock_fullscreen: bool,
    pub snap: u32,
    pub reset_tags: u32,

    // Basics
    pub terminal: String,
    pub modkey: x11rb::protocol::xproto::KeyButMask,
    pub tags: Vec<String>,
    pub keybindings: Vec<crate::keyboard::KeyBinding>,
    pub buttons: Vec<crate::keyboard::ButtonBinding>,
    pub window_rules: Vec<WindowRule>,

    // Bar colors
    pub scheme_normal: ColorScheme,
    pub scheme_selected: ColorScheme,

    pub autostart: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorScheme {
    pub foreground: u32,
    pub background: u32,
}

impl Config {
    /// Bit mask covering every configured tag.
    pub fn tag_mask(&self) -> u32 {
        let count = self.tags.len().min(31);
        (1u32 << count) - 1
    }
}

impl Default for Config {
    fn default() -> Self {
        use crate::keyboard::handlers::{ButtonBinding, Click, KeyBinding};
        use crate::keyboard::{Arg, KeyAction, keysyms};
        use crate::layout::LayoutType;
        use x11rb::protocol::xproto::KeyButMask;

        const MODKEY: KeyButMask = KeyButMask::MOD4;
        const ALTKEY: KeyButMask = KeyButMask::MOD1;
        const SHIFT: KeyButMask = KeyButMask::SHIFT;
        const CONTROL: KeyButMask = KeyButMask::CONTROL;

        let terminal = "st".to_string();

        let key = |modifiers: Vec<KeyButMask>, keysym, func, arg| {
            KeyBinding::new(modifiers, keysym, func, arg)
        };

        let mut keybindings = vec![
            key(
                vec![MODKEY],
                keysyms::XK_D,
                KeyAction::Spawn,
                Arg::Array(vec!["dmenu_run".to_string()]),
            ),
            key(
                vec![MODKEY],
                keysyms::XK_RETURN,
                KeyAction::Spawn,
                Arg::Str(terminal.clone()),
            ),
            key(
                vec![MODKEY, SHIFT],
                keysyms::XK_W,
                KeyAction::MoveResizeToCorner,
                Arg::Str("0 0 -320 -240".to_string()),
            ),
            key(vec![MODKEY], keysyms::XK_B, KeyAction::ToggleBar, Arg::None),
            key(vec![MODKEY], keysyms::XK_J, KeyAction::FocusStack, Arg::Int(1)),
            key(vec![MODKEY], keysyms::XK_K, KeyAction::FocusStack, Arg::Int(-1)),
            key(vec![MODKEY, SHIFT], keysyms::XK_J, KeyAction::PushDown, Arg::None),
            key(vec![MODKEY, SHIFT], keysyms::XK_K, KeyAction::PushUp, Arg::None),
            key(vec![MODKEY], keysyms::XK_I, KeyAction::IncNumMaster, Arg::Int(1)),
            key(vec![MODKEY], keysyms::XK_O, KeyAction::IncNumMaster, Arg::Int(-1)),
            key(
                vec![MODKEY],
                keysyms::XK_H,
                KeyAction::SetMasterFactor,
                Arg::Float(-0.05),
            ),
            key(
                vec![MODKEY],
                keysyms::XK_L,
                KeyAction::SetMasterFactor,
                Arg::Float(0.05),
            ),
            key(vec![MODKEY], keysyms::XK_TAB, KeyAction::ViewPrevious, Arg::None),
            key(vec![MODKEY, SHIFT], keysyms::XK_Q, KeyAction::KillClient, Arg::None),
            key(
                vec![MODKEY],
                keysyms::XK_T,
                KeyAction::ChangeLayout,
                Arg::Str("tiling".to_string()),
            ),
            key(
                vec![MODKEY],
                keysyms::XK_F,
                KeyAction::ChangeLayout,
                Arg::Str("floating".to_string()),
            ),
            key(
                vec![MODKEY],
                keysyms::XK_M,
                KeyAction::ChangeLayout,
                Arg::Str("monocle".to_string()),
            ),
            key(vec![MODKEY], keysyms::XK_SPACE, KeyAction::ToggleLayout, Arg::None),
            key(
                vec![MODKEY, SHIFT],
                keysyms::XK_SPACE,
                KeyAction::ToggleFloating,
                Arg::None,
            ),
            key(
                vec![MODKEY, SHIFT],
                keysyms::XK_F,
                KeyAction::ToggleFullScreen,
                Arg::None,
            ),
            key(vec![MODKEY], keysyms::XK_0, KeyAction::ViewAll, Arg::None),
            key(vec![MODKEY, SHIFT], keysyms::XK_0, KeyAction::TagAll, Arg::None),
            key(vec![MODKEY], keysyms::XK_COMMA, KeyAction::FocusMonitor, Arg::Int(-1)),
            key(vec![MODKEY], keysyms::XK_PERIOD, KeyAction::FocusMonitor, Arg::Int(1)),
            key(
                vec![MODKEY, SHIFT],
                keysyms::XK_COMMA,
                KeyAction::TagMonitor,
                Arg::Int(-1),
            ),
            key(
                vec![MODKEY, SHIFT],
                keysyms::XK_PERIOD,
                KeyAction::TagMonitor,
                Arg::Int(1),
            ),
            key(vec![MODKEY], keysyms::XK_GRAVE, KeyAction::ResetView, Arg::None),
            key(vec![MODKEY, SHIFT], keysyms::XK_E, KeyAction::Quit, Arg::None),
            key(vec![ALTKEY], keysyms::XK_J, KeyAction::FocusMonitor, Arg::Int(1)),
            key(vec![ALTKEY], keysyms::XK_K, KeyAction::FocusMonitor, Arg::Int(-1)),
            key(
                vec![ALTKEY],
                keysyms::XK_H,
                KeyAction::SendToMonitorAndFocus,
                Arg::Int(0),
            ),
            key(
                vec![ALTKEY],
                keysyms::XK_L,
                KeyAction::SendToMonitorAndFocus,
                Arg::Int(1),
            ),
            key(
                vec![ALTKEY, SHIFT],
                keysyms::XK_H,
                KeyAction::SendToMonitor,
                Arg::Int(0),
            ),
            key(
                vec![ALTKEY, SHIFT],
                keysyms::XK_L,
                KeyAction::SendToMonitor,
                Arg::Int(1),
            ),
        ];

        for tag in 0..9 {
            let keysym = keysyms::XK_0 + 1 + tag as u32;
            keybindings.extend([
                key(vec![MODKEY], keysym, KeyAction::ViewTag, Arg::Int(tag)),
                key(vec![MODKEY, CONTROL], keysym, KeyAction::ToggleView, Arg::Int(tag)),
                key(
                    vec![MODKEY, ALTKEY],
                    keysym,
                    KeyAction::ViewTagAllMonitors,
                    Arg::Int(tag),
                ),
                key(
                    vec![MODKEY, ALTKEY, CONTROL],
                    keysym,
                    KeyAction::ToggleViewAllMonitors,
                    Arg::Int(tag),
                ),
                key(vec![MODKEY, SHIFT], keysym, KeyAction::MoveToTag, Arg::Int(tag)),
                key(
                    vec![MODKEY, CONTROL, SHIFT],
                    keysym,
                    KeyAction::ToggleTag,
                    Arg::Int(tag),
                ),
            ]);
        }

        let button = |click, modifiers: Vec<KeyButMask>, button, func, arg| {
            ButtonBinding::new(click, modifiers, button, func, arg)
        };

        let buttons = vec![
            button(Click::LayoutSymbol, vec![], 1, KeyAction::ToggleLayout, Arg::None),
            button(
                Click::LayoutSymbol,
                vec![],
                3,
                KeyAction::ChangeLayout,
                Arg::Str("monocle".to_string()),
            ),
            button(Click::MonitorMark, vec![], 1, KeyAction::FocusMonitor, Arg::Int(1)),
            button(Click::MonitorMark, vec![], 3, KeyAction::FocusMonitor, Arg::Int(-1)),
            button(Click::MonitorMark, vec![], 2, KeyAction::ResetView, Arg::None),
            button(Click::WindowTitle, vec![], 2, KeyAction::Zoom, Arg::None),
            button(
                Click::StatusText,
                vec![],
                2,
                KeyAction::Spawn,
                Arg::Str(terminal.clone()),
            ),
            button(Click::ClientWindow, vec![MODKEY], 1, KeyAction::MoveMouse, Arg::None),
            button(
                Click::ClientWindow,
                vec![MODKEY],
                2,
                KeyAction::ToggleFloating,
                Arg::None,
            ),
            button(
                Click::ClientWindow,
                vec![MODKEY],
                3,
                KeyAction::ResizeMouse,
                Arg::None,
            ),
            button(Click::TagBar, vec![], 1, KeyAction::ViewTag, Arg::None),
            button(Click::TagBar, vec![], 3, KeyAction::ToggleView, Arg::None),
            button(
                Click::TagBar,
                vec![MODKEY, ALTKEY],
                1,
                KeyAction::ViewTagAllMonitors,
                Arg::None,
            ),
            button(
                Click::TagBar,
                vec![MODKEY, ALTKEY],
                3,
                KeyAction::ToggleViewAllMonitors,
                Arg::None,
            ),
            button(Click::TagBar, vec![MODKEY], 1, KeyAction::MoveToTag, Arg::None),
            button(Click::TagBar, vec![MODKEY], 3, KeyAction::ToggleTag, Arg::None),
        ];

        Self {
            border_width: 3,
            border_focused: 0x273b6b,
            border_unfocused: 0x444444,
            font: "fixed".to_string(),
            show_bar: true,
            top_bar: true,
            layouts: vec![LayoutType::Tiling, LayoutType::Floating, LayoutType::Monocle],
            master_factor: 0.5,
            num_master: 1,
            resize_hints: false,
            lock_fullscreen: true,
            snap: 32,
            reset_tags: 0b1111,
            terminal,
            modkey: MODKEY,
            tags: vec!["1", "2", "3", "4", "5", "6", "7", "8", "9"]
                .into_iter()
                .map(String::from)
                .collect(),
            keybindings,
            buttons,
            window_rules: vec![WindowRule {
                class: Some("Gimp".to_string()),
                is_floating: Some(true),
                ..WindowRule::default()
            }],
            scheme_normal: ColorScheme {
                foreground: 0xbbbbbb,
                background: 0x282c34,
            },
            scheme_selected: ColorScheme {
                foreground: 0xeeeeee,
                background: 0x3e4452,
            },
            autostart: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_fields_match_by_substring() {
        let rule = WindowRule {
            class: Some("Gimp".to_string()),
            title: Some("Toolbox".to_string()),
            ..WindowRule::default()
        };
        assert!(rule.matches("Gimp-2.10", "gimp", "Toolbox - Tools"));
        assert!(!rule.matches("Firefox", "Navigator", "Toolbox"));
    }

    #[test]
    fn tag_mask_covers_configured_tags() {
        let config = Config::default();
        assert_eq!(config.tag_mask(), 0x1ff);
    }
}
