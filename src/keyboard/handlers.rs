use std::str::FromStr;

use serde::Deserialize;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;

use crate::errors::{ConfigError, X11Error};
use crate::keyboard::keysyms::{Keysym, XK_NUM_LOCK, format_keysym};

/// When adding a new action, update:
/// 1. Add variant here and to `FromStr`
/// 2. config/lua_api.rs: the matching `pwm.*` constructor
/// 3. window_manager/actions.rs: handle_key_action()
/// 4. templates/config.lua
#[derive(Debug, Copy, Clone, Deserialize, PartialEq, Eq)]
pub enum KeyAction {
    Spawn,
    KillClient,
    FocusStack,
    PushUp,
    PushDown,
    MoveStack,
    Zoom,
    Quit,
    ViewTag,
    ViewPrevious,
    ViewAll,
    ToggleView,
    MoveToTag,
    TagAll,
    ToggleTag,
    ViewTagAllMonitors,
    ToggleViewAllMonitors,
    ResetView,
    ToggleFloating,
    ToggleFullScreen,
    ChangeLayout,
    ToggleLayout,
    SetMasterFactor,
    IncNumMaster,
    ToggleBar,
    FocusMonitor,
    TagMonitor,
    SendToMonitor,
    SendToMonitorAndFocus,
    MoveMouse,
    ResizeMouse,
    MoveToEdge,
    MoveResize,
    MoveResizeToCorner,
    None,
}

impl FromStr for KeyAction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        let action = match s {
            "Spawn" => KeyAction::Spawn,
            "KillClient" => KeyAction::KillClient,
            "FocusStack" => KeyAction::FocusStack,
            "PushUp" => KeyAction::PushUp,
            "PushDown" => KeyAction::PushDown,
            "MoveStack" => KeyAction::MoveStack,
            "Zoom" => KeyAction::Zoom,
            "Quit" => KeyAction::Quit,
            "ViewTag" => KeyAction::ViewTag,
            "ViewPrevious" => KeyAction::ViewPrevious,
            "ViewAll" => KeyAction::ViewAll,
            "ToggleView" => KeyAction::ToggleView,
            "MoveToTag" => KeyAction::MoveToTag,
            "TagAll" => KeyAction::TagAll,
            "ToggleTag" => KeyAction::ToggleTag,
            "ViewTagAllMonitors" => KeyAction::ViewTagAllMonitors,
            "ToggleViewAllMonitors" => KeyAction::ToggleViewAllMonitors,
            "ResetView" => KeyAction::ResetView,
            "ToggleFloating" => KeyAction::ToggleFloating,
            "ToggleFullScreen" => KeyAction::ToggleFullScreen,
            "ChangeLayout" => KeyAction::ChangeLayout,
            "ToggleLayout" => KeyAction::ToggleLayout,
            "SetMasterFactor" => KeyAction::SetMasterFactor,
            "IncNumMaster" => KeyAction::IncNumMaster,
            "ToggleBar" => KeyAction::ToggleBar,
            "FocusMonitor" => KeyAction::FocusMonitor,
            "TagMonitor" => KeyAction::TagMonitor,
            "SendToMonitor" => KeyAction::SendToMonitor,
            "SendToMonitorAndFocus" => KeyAction::SendToMonitorAndFocus,
            "MoveMouse" => KeyAction::MoveMouse,
            "ResizeMouse" => KeyAction::ResizeMouse,
            "MoveToEdge" => KeyAction::MoveToEdge,
            "MoveResize" => KeyAction::MoveResize,
            "MoveResizeToCorner" => KeyAction::MoveResizeToCorner,
            _ => return Err(ConfigError::UnknownAction(s.to_string())),
        };
        Ok(action)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    None,
    Int(i32),
    Float(f32),
    Str(String),
    Array(Vec<String>),
}

impl Arg {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Arg::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Arg::Float(value) => Some(*value),
            Arg::Int(value) => Some(*value as f32),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct KeyBinding {
    pub(crate) modifiers: Vec<KeyButMask>,
    pub(crate) keysym: Keysym,
    pub(crate) func: KeyAction,
    pub(crate) arg: Arg,
}

impl std::fmt::Debug for KeyBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyBinding")
            .field("modifiers", &self.modifiers)
            .field("keysym", &format_keysym(self.keysym))
            .field("func", &self.func)
            .field("arg", &self.arg)
            .finish()
    }
}

impl KeyBinding {
    pub fn new(modifiers: Vec<KeyButMask>, keysym: Keysym, func: KeyAction, arg: Arg) -> Self {
        Self {
            modifiers,
            keysym,
            func,
            arg,
        }
    }
}

/// Region of the screen a button press landed on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Click {
    TagBar,
    LayoutSymbol,
    MonitorMark,
    StatusText,
    WindowTitle,
    ClientWindow,
    RootWindow,
}

impl FromStr for Click {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s {
            "tag_bar" => Ok(Click::TagBar),
            "layout_symbol" => Ok(Click::LayoutSymbol),
            "monitor_mark" => Ok(Click::MonitorMark),
            "status_text" => Ok(Click::StatusText),
            "window_title" => Ok(Click::WindowTitle),
            "client_window" => Ok(Click::ClientWindow),
            "root_window" => Ok(Click::RootWindow),
            _ => Err(ConfigError::UnknownClick(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ButtonBinding {
    pub(crate) click: Click,
    pub(crate) modifiers: Vec<KeyButMask>,
    pub(crate) button: u8,
    pub(crate) func: KeyAction,
    pub(crate) arg: Arg,
}

impl ButtonBinding {
    pub fn new(
        click: Click,
        modifiers: Vec<KeyButMask>,
        button: u8,
        func: KeyAction,
        arg: Arg,
    ) -> Self {
        Self {
            click,
            modifiers,
            button,
            func,
            arg,
        }
    }
}

pub fn modifiers_to_mask(modifiers: &[KeyButMask]) -> u16 {
    modifiers
        .iter()
        .fold(0u16, |acc, &modifier| acc | u16::from(modifier))
}

/// Strips Caps Lock, Num Lock and anything that is not a modifier key.
pub fn clean_mask(state: u16, numlock_mask: u16) -> u16 {
    let relevant = KeyButMask::SHIFT
        | KeyButMask::CONTROL
        | KeyButMask::MOD1
        | KeyButMask::MOD2
        | KeyButMask::MOD3
        | KeyButMask::MOD4
        | KeyButMask::MOD5;
    state & !(numlock_mask | u16::from(KeyButMask::LOCK)) & u16::from(relevant)
}

/// Lock combinations grabbed alongside every binding so Caps Lock and Num
/// Lock do not disable it.
pub fn ignored_modifiers(numlock_mask: u16) -> [u16; 4] {
    let lock = u16::from(KeyButMask::LOCK);
    [0, lock, numlock_mask, numlock_mask | lock]
}

/// The modifier bit Num_Lock is mapped to, or 0 when it is not mapped.
/// `modifier_keycodes` holds eight rows of `per_modifier` keycodes, one per
/// modifier from Shift to Mod5.
pub fn numlock_mask(
    modifier_keycodes: &[Keycode],
    per_modifier: usize,
    mapping: &KeyboardMapping,
) -> u16 {
    if per_modifier == 0 {
        return 0;
    }
    modifier_keycodes
        .chunks(per_modifier)
        .take(8)
        .position(|row| {
            row.iter()
                .any(|&keycode| keycode != 0 && mapping.keycode_to_keysym(keycode) == XK_NUM_LOCK)
        })
        .map_or(0, |modifier| 1 << modifier)
}

pub struct KeyboardMapping {
    pub syms: Vec<Keysym>,
    pub keysyms_per_keycode: u8,
    pub min_keycode: Keycode,
    pub numlock_mask: u16,
}

impl KeyboardMapping {
    pub fn keycode_to_keysym(&self, keycode: Keycode) -> Keysym {
        if keycode < self.min_keycode {
            return 0;
        }
        let index = (keycode - self.min_keycode) as usize * self.keysyms_per_keycode as usize;
        self.syms.get(index).copied().unwrap_or(0)
    }
}

pub fn get_keyboard_mapping(
    connection: &impl Connection,
) -> std::result::Result<KeyboardMapping, X11Error> {
    let setup = connection.setup();
    let min_keycode = setup.min_keycode;
    let max_keycode = setup.max_keycode;

    let reply = connection
        .get_keyboard_mapping(min_keycode, max_keycode - min_keycode + 1)?
        .reply()?;
    let mut mapping = KeyboardMapping {
        syms: reply.keysyms,
        keysyms_per_keycode: reply.keysyms_per_keycode,
        min_keycode,
        numlock_mask: 0,
    };

    let modifiers = connection.get_modifier_mapping()?.reply()?;
    let per_modifier = modifiers.keycodes.len() / 8;
    mapping.numlock_mask = numlock_mask(&modifiers.keycodes, per_modifier, &mapping);
    Ok(mapping)
}

pub fn grab_keys(
    connection: &impl Connection,
    root: Window,
    keybindings: &[KeyBinding],
) -> std::result::Result<KeyboardMapping, X11Error> {
    let setup = connection.setup();
    let min_keycode = setup.min_keycode;
    let max_keycode = setup.max_keycode;

    let mapping = get_keyboard_mapping(connection)?;

    connection.ungrab_key(Grab::ANY, root, ModMask::ANY)?;

    for keycode in min_keycode..=max_keycode {
        let keysym = mapping.keycode_to_keysym(keycode);
        for keybinding in keybindings.iter().filter(|binding| binding.keysym == keysym) {
            let modifier_mask = modifiers_to_mask(&keybinding.modifiers);
            for ignore_mask in ignored_modifiers(mapping.numlock_mask) {
                connection.grab_key(
                    true,
                    root,
                    (modifier_mask | ignore_mask).into(),
                    keycode,
                    GrabMode::ASYNC,
                    GrabMode::ASYNC,
                )?;
            }
        }
    }

    connection.flush()?;
    Ok(mapping)
}

pub fn handle_key_press(
    event: &KeyPressEvent,
    keybindings: &[KeyBinding],
    mapping: &KeyboardMapping,
) -> Option<(KeyAction, Arg)> {
    let keysym = mapping.keycode_to_keysym(event.detail);
    let numlock = mapping.numlock_mask;
    let state = clean_mask(u16::from(event.state), numlock);

    keybindings
        .iter()
        .find(|binding| {
            binding.keysym == keysym
                && clean_mask(modifiers_to_mask(&binding.modifiers), numlock) == state
        })
        .map(|binding| (binding.func, binding.arg.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_and_numlock_are_ignored() {
        let numlock = u16::from(KeyButMask::MOD2);
        let state = u16::from(KeyButMask::MOD4 | KeyButMask::LOCK | KeyButMask::MOD2);
        assert_eq!(clean_mask(state, numlock), u16::from(KeyButMask::MOD4));
    }

    #[test]
    fn numlock_on_another_modifier_is_ignored_instead() {
        let numlock = u16::from(KeyButMask::MOD3);
        let state = u16::from(KeyButMask::MOD4 | KeyButMask::MOD3 | KeyButMask::MOD2);
        assert_eq!(
            clean_mask(state, numlock),
            u16::from(KeyButMask::MOD4 | KeyButMask::MOD2)
        );
        assert_eq!(ignored_modifiers(numlock), [0, 2, 32, 34]);
    }

    #[test]
    fn numlock_mask_comes_from_the_modifier_map() {
        // Keycode 9 is Num_Lock, keycode 8 is Shift_L.
        let mapping = KeyboardMapping {
            syms: vec![0xffe1, XK_NUM_LOCK],
            keysyms_per_keycode: 1,
            min_keycode: 8,
            numlock_mask: 0,
        };
        // Two keycodes per modifier: Shift, Lock, Control, Mod1, Mod2, ...
        let mut rows = vec![0; 16];
        rows[0] = 8;
        rows[9] = 9;
        assert_eq!(numlock_mask(&rows, 2, &mapping), u16::from(KeyButMask::MOD2));

        rows[9] = 0;
        rows[11] = 9;
        assert_eq!(numlock_mask(&rows, 2, &mapping), u16::from(KeyButMask::MOD3));

        rows[11] = 0;
        assert_eq!(numlock_mask(&rows, 2, &mapping), 0);
        assert_eq!(numlock_mask(&[], 0, &mapping), 0);
    }

    #[test]
    fn keysym_lookup_uses_first_column() {
        let mapping = KeyboardMapping {
            syms: vec![0x61, 0x41, 0x62, 0x42],
            keysyms_per_keycode: 2,
            min_keycode: 8,
            numlock_mask: 0,
        };
        assert_eq!(mapping.keycode_to_keysym(9), 0x62);
        assert_eq!(mapping.keycode_to_keysym(7), 0);
        assert_eq!(mapping.keycode_to_keysym(200), 0);
    }

    #[test]
    fn actions_parse_from_names() {
        assert_eq!("PushDown".parse::<KeyAction>().ok(), Some(KeyAction::PushDown));
        assert!("Teleport".parse::<KeyAction>().is_err());
        assert_eq!("tag_bar".parse::<Click>().ok(), Some(Click::TagBar));
    }
}
