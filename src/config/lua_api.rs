use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

use mlua::{Lua, LuaSerdeExt, Table, Value};
use serde::Deserialize;
use x11rb::protocol::xproto::KeyButMask;

use crate::errors::ConfigError;
use crate::keyboard::handlers::{Arg, ButtonBinding, Click, KeyAction, KeyBinding};
use crate::keyboard::keysyms::{self, Keysym};
use crate::layout::LayoutType;
use crate::{ColorScheme, Config, WindowRule};

type SharedConfig = Rc<RefCell<Config>>;

/// Installs the `pwm` global. Bindings and rules start empty so the script
/// fully describes them; every other setting keeps its default until set.
pub fn register_api(lua: &Lua) -> Result<SharedConfig, ConfigError> {
    let config = Config {
        keybindings: Vec::new(),
        buttons: Vec::new(),
        window_rules: Vec::new(),
        ..Config::default()
    };
    let shared = Rc::new(RefCell::new(config));

    let pwm = lua.create_table()?;

    register_spawn(lua, &pwm, shared.clone())?;
    register_key_module(lua, &pwm, shared.clone())?;
    register_button_module(lua, &pwm, shared.clone())?;
    register_border_module(lua, &pwm, shared.clone())?;
    register_client_module(lua, &pwm)?;
    register_layout_module(lua, &pwm, shared.clone())?;
    register_tag_module(lua, &pwm, shared.clone())?;
    register_monitor_module(lua, &pwm)?;
    register_mouse_module(lua, &pwm)?;
    register_rule_module(lua, &pwm, shared.clone())?;
    register_bar_module(lua, &pwm, shared.clone())?;
    register_misc(lua, &pwm, shared.clone())?;

    lua.globals().set("pwm", pwm)?;

    Ok(shared)
}

fn register_spawn(lua: &Lua, parent: &Table, config: SharedConfig) -> Result<(), ConfigError> {
    let spawn = lua.create_function(|lua, cmd: Value| create_action_table(lua, "Spawn", cmd))?;
    let spawn_terminal = lua.create_function(move |lua, ()| {
        let terminal = config.borrow().terminal.clone();
        create_action_table(lua, "Spawn", Value::String(lua.create_string(&terminal)?))
    })?;
    parent.set("spawn", spawn)?;
    parent.set("spawn_terminal", spawn_terminal)?;
    Ok(())
}

fn register_key_module(lua: &Lua, parent: &Table, config: SharedConfig) -> Result<(), ConfigError> {
    let key_table = lua.create_table()?;

    let bind = lua.create_function(move |_, (mods, key, action): (Value, String, Value)| {
        let modkey = config.borrow().modkey;
        let modifiers = parse_modifiers_value(mods, modkey)?;
        let keysym = parse_keysym(&key)?;
        let (func, arg) = parse_action_value(action)?;

        config
            .borrow_mut()
            .keybindings
            .push(KeyBinding::new(modifiers, keysym, func, arg));
        Ok(())
    })?;

    key_table.set("bind", bind)?;
    parent.set("key", key_table)?;
    Ok(())
}

fn register_button_module(
    lua: &Lua,
    parent: &Table,
    config: SharedConfig,
) -> Result<(), ConfigError> {
    let button_table = lua.create_table()?;

    let bind = lua.create_function(
        move |_, (click, mods, button, action): (String, Value, u8, Value)| {
            let click = Click::from_str(&click).map_err(mlua::Error::external)?;
            let modkey = config.borrow().modkey;
            let modifiers = parse_modifiers_value(mods, modkey)?;
            let (func, arg) = parse_action_value(action)?;

            config
                .borrow_mut()
                .buttons
                .push(ButtonBinding::new(click, modifiers, button, func, arg));
            Ok(())
        },
    )?;

    button_table.set("bind", bind)?;
    parent.set("button", button_table)?;
    Ok(())
}

fn register_border_module(
    lua: &Lua,
    parent: &Table,
    config: SharedConfig,
) -> Result<(), ConfigError> {
    let border_table = lua.create_table()?;

    let config_clone = config.clone();
    let set_width = lua.create_function(move |_, width: u32| {
        config_clone.borrow_mut().border_width = width;
        Ok(())
    })?;

    let config_clone = config.clone();
    let set_focused_color = lua.create_function(move |_, color: Value| {
        config_clone.borrow_mut().border_focused = parse_color_value(color)?;
        Ok(())
    })?;

    let set_unfocused_color = lua.create_function(move |_, color: Value| {
        config.borrow_mut().border_unfocused = parse_color_value(color)?;
        Ok(())
    })?;

    border_table.set("set_width", set_width)?;
    border_table.set("set_focused_color", set_focused_color)?;
    border_table.set("set_unfocused_color", set_unfocused_color)?;
    parent.set("border", border_table)?;
    Ok(())
}

fn register_client_module(lua: &Lua, parent: &Table) -> Result<(), ConfigError> {
    let client_table = lua.create_table()?;

    for (name, action) in [
        ("kill", "KillClient"),
        ("toggle_fullscreen", "ToggleFullScreen"),
        ("toggle_floating", "ToggleFloating"),
        ("push_up", "PushUp"),
        ("push_down", "PushDown"),
        ("zoom", "Zoom"),
    ] {
        client_table.set(name, nullary_action(lua, action)?)?;
    }

    let focus_stack = lua.create_function(|lua, dir: i32| {
        create_action_table(lua, "FocusStack", Value::Integer(dir.into()))
    })?;
    let move_stack = lua.create_function(|lua, dir: i32| {
        create_action_table(lua, "MoveStack", Value::Integer(dir.into()))
    })?;

    client_table.set("focus_stack", focus_stack)?;
    client_table.set("move_stack", move_stack)?;

    // Integers as a string ("1 -1") or a list; malformed ones are ignored when run.
    for (name, action) in [
        ("move_to_edge", "MoveToEdge"),
        ("move_resize", "MoveResize"),
        ("move_resize_to_corner", "MoveResizeToCorner"),
    ] {
        let function =
            lua.create_function(move |lua, value: Value| create_action_table(lua, action, value))?;
        client_table.set(name, function)?;
    }
    parent.set("client", client_table)?;
    Ok(())
}

fn register_layout_module(
    lua: &Lua,
    parent: &Table,
    config: SharedConfig,
) -> Result<(), ConfigError> {
    let layout_table = lua.create_table()?;

    let set = lua.create_function(|lua, name: String| {
        LayoutType::from_str(&name).map_err(mlua::Error::external)?;
        create_action_table(lua, "ChangeLayout", Value::String(lua.create_string(&name)?))
    })?;
    let toggle = nullary_action(lua, "ToggleLayout")?;
    let adjust_mfact = lua.create_function(|lua, delta: f64| {
        create_action_table(lua, "SetMasterFactor", Value::Number(delta))
    })?;
    let inc_nmaster = lua.create_function(|lua, delta: i32| {
        create_action_table(lua, "IncNumMaster", Value::Integer(delta.into()))
    })?;

    let config_clone = config.clone();
    let set_layouts = lua.create_function(move |_, names: Vec<String>| {
        let layouts = names
            .iter()
            .map(|name| LayoutType::from_str(name))
            .collect::<Result<Vec<_>, _>>()
            .map_err(mlua::Error::external)?;
        if layouts.is_empty() {
            return Err(mlua::Error::RuntimeError(
                "pwm.layout.set_layouts: at least one layout is required".into(),
            ));
        }
        config_clone.borrow_mut().layouts = layouts;
        Ok(())
    })?;

    let config_clone = config.clone();
    let set_mfact = lua.create_function(move |_, factor: f32| {
        if !(0.05..=0.95).contains(&factor) {
            return Err(mlua::Error::RuntimeError(format!(
                "pwm.layout.set_mfact: {factor} is outside 0.05..0.95"
            )));
        }
        config_clone.borrow_mut().master_factor = factor;
        Ok(())
    })?;

    let config_clone = config.clone();
    let set_nmaster = lua.create_function(move |_, count: usize| {
        config_clone.borrow_mut().num_master = count;
        Ok(())
    })?;

    let config_clone = config.clone();
    let set_resize_hints = lua.create_function(move |_, enabled: bool| {
        config_clone.borrow_mut().resize_hints = enabled;
        Ok(())
    })?;

    let config_clone = config.clone();
    let set_lock_fullscreen = lua.create_function(move |_, enabled: bool| {
        config_clone.borrow_mut().lock_fullscreen = enabled;
        Ok(())
    })?;

    let set_snap = lua.create_function(move |_, pixels: u32| {
        config.borrow_mut().snap = pixels;
        Ok(())
    })?;

    layout_table.set("set", set)?;
    layout_table.set("toggle", toggle)?;
    layout_table.set("adjust_mfact", adjust_mfact)?;
    layout_table.set("inc_nmaster", inc_nmaster)?;
    layout_table.set("set_layouts", set_layouts)?;
    layout_table.set("set_mfact", set_mfact)?;
    layout_table.set("set_nmaster", set_nmaster)?;
    layout_table.set("set_resize_hints", set_resize_hints)?;
    layout_table.set("set_lock_fullscreen", set_lock_fullscreen)?;
    layout_table.set("set_snap", set_snap)?;
    parent.set("layout", layout_table)?;
    Ok(())
}

/// Tag functions take 1-based tag numbers, matching the bar labels. Without
/// one, a tag bar binding acts on the tag under the pointer.
fn register_tag_module(lua: &Lua, parent: &Table, config: SharedConfig) -> Result<(), ConfigError> {
    let tag_table = lua.create_table()?;

    for (name, action) in [
        ("view", "ViewTag"),
        ("toggleview", "ToggleView"),
        ("move_to", "MoveToTag"),
        ("toggletag", "ToggleTag"),
        ("view_all_monitors", "ViewTagAllMonitors"),
        ("toggleview_all_monitors", "ToggleViewAllMonitors"),
    ] {
        let function = lua.create_function(move |lua, number: Option<i32>| {
            let arg = number.map_or(Value::Nil, |n| Value::Integer((n - 1).into()));
            create_action_table(lua, action, arg)
        })?;
        tag_table.set(name, function)?;
    }

    tag_table.set("view_previous", nullary_action(lua, "ViewPrevious")?)?;
    tag_table.set("view_all", nullary_action(lua, "ViewAll")?)?;
    tag_table.set("tag_all", nullary_action(lua, "TagAll")?)?;
    tag_table.set("reset", nullary_action(lua, "ResetView")?)?;

    let set_reset = lua.create_function(move |_, numbers: Vec<u32>| {
        config.borrow_mut().reset_tags = tag_numbers_to_mask(&numbers)?;
        Ok(())
    })?;
    tag_table.set("set_reset", set_reset)?;

    parent.set("tag", tag_table)?;
    Ok(())
}

fn register_monitor_module(lua: &Lua, parent: &Table) -> Result<(), ConfigError> {
    let monitor_table = lua.create_table()?;

    for (name, action) in [
        ("focus", "FocusMonitor"),
        ("tag", "TagMonitor"),
        ("send", "SendToMonitor"),
        ("send_and_focus", "SendToMonitorAndFocus"),
    ] {
        let function = lua.create_function(move |lua, value: i32| {
            create_action_table(lua, action, Value::Integer(value.into()))
        })?;
        monitor_table.set(name, function)?;
    }

    parent.set("monitor", monitor_table)?;
    Ok(())
}

fn register_mouse_module(lua: &Lua, parent: &Table) -> Result<(), ConfigError> {
    let mouse_table = lua.create_table()?;
    mouse_table.set("move", nullary_action(lua, "MoveMouse")?)?;
    mouse_table.set("resize", nullary_action(lua, "ResizeMouse")?)?;
    parent.set("mouse", mouse_table)?;
    Ok(())
}

/// Fields accepted by `pwm.rule.add`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFields {
    class: Option<String>,
    instance: Option<String>,
    title: Option<String>,
    /// 1-based tag numbers.
    tags: Option<Vec<u32>>,
    floating: Option<bool>,
    monitor: Option<usize>,
}

fn register_rule_module(lua: &Lua, parent: &Table, config: SharedConfig) -> Result<(), ConfigError> {
    let rule_table = lua.create_table()?;

    let add = lua.create_function(move |lua, fields: Value| {
        let fields: RuleFields = lua.from_value(fields)?;
        let tags = fields
            .tags
            .as_deref()
            .map(tag_numbers_to_mask)
            .transpose()?;
        let rule = WindowRule {
            class: fields.class,
            instance: fields.instance,
            title: fields.title,
            tags,
            is_floating: fields.floating,
            monitor: fields.monitor,
        };
        config.borrow_mut().window_rules.push(rule);
        Ok(())
    })?;

    rule_table.set("add", add)?;
    parent.set("rule", rule_table)?;
    Ok(())
}

fn register_bar_module(lua: &Lua, parent: &Table, config: SharedConfig) -> Result<(), ConfigError> {
    let bar_table = lua.create_table()?;

    let config_clone = config.clone();
    let set_font = lua.create_function(move |_, font: String| {
        config_clone.borrow_mut().font = font;
        Ok(())
    })?;

    let config_clone = config.clone();
    let set_show = lua.create_function(move |_, show: bool| {
        config_clone.borrow_mut().show_bar = show;
        Ok(())
    })?;

    let config_clone = config.clone();
    let set_top = lua.create_function(move |_, top: bool| {
        config_clone.borrow_mut().top_bar = top;
        Ok(())
    })?;

    let config_clone = config.clone();
    let set_scheme_normal = lua.create_function(move |_, (fg, bg): (Value, Value)| {
        config_clone.borrow_mut().scheme_normal = parse_scheme(fg, bg)?;
        Ok(())
    })?;

    let set_scheme_selected = lua.create_function(move |_, (fg, bg): (Value, Value)| {
        config.borrow_mut().scheme_selected = parse_scheme(fg, bg)?;
        Ok(())
    })?;

    bar_table.set("set_font", set_font)?;
    bar_table.set("set_show", set_show)?;
    bar_table.set("set_top", set_top)?;
    bar_table.set("set_scheme_normal", set_scheme_normal)?;
    bar_table.set("set_scheme_selected", set_scheme_selected)?;
    bar_table.set("toggle", nullary_action(lua, "ToggleBar")?)?;
    parent.set("bar", bar_table)?;
    Ok(())
}

fn register_misc(lua: &Lua, parent: &Table, config: SharedConfig) -> Result<(), ConfigError> {
    let config_clone = config.clone();
    let set_terminal = lua.create_function(move |_, term: String| {
        config_clone.borrow_mut().terminal = term;
        Ok(())
    })?;

    let config_clone = config.clone();
    let set_modkey = lua.create_function(move |_, modkey: String| {
        config_clone.borrow_mut().modkey =
            parse_modkey_string(&modkey).map_err(mlua::Error::external)?;
        Ok(())
    })?;

    let config_clone = config.clone();
    let set_tags = lua.create_function(move |_, tags: Vec<String>| {
        if tags.is_empty() || tags.len() > 31 {
            return Err(mlua::Error::RuntimeError(
                "pwm.set_tags: between 1 and 31 tags are required".into(),
            ));
        }
        config_clone.borrow_mut().tags = tags;
        Ok(())
    })?;

    let autostart = lua.create_function(move |_, cmd: String| {
        config.borrow_mut().autostart.push(cmd);
        Ok(())
    })?;

    parent.set("set_terminal", set_terminal)?;
    parent.set("set_modkey", set_modkey)?;
    parent.set("set_tags", set_tags)?;
    parent.set("autostart", autostart)?;
    parent.set("quit", nullary_action(lua, "Quit")?)?;
    Ok(())
}

fn nullary_action(lua: &Lua, action: &'static str) -> mlua::Result<mlua::Function> {
    lua.create_function(move |lua, ()| create_action_table(lua, action, Value::Nil))
}

fn create_action_table(lua: &Lua, action_name: &str, arg: Value) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    table.set("__action", action_name)?;
    table.set("__arg", arg)?;
    Ok(table)
}

/// `"Mod"` stands for whatever `pwm.set_modkey` chose.
fn parse_modifiers_value(value: Value, modkey: KeyButMask) -> mlua::Result<Vec<KeyButMask>> {
    let parse = |name: &str| match name {
        "Mod" => Ok(modkey),
        _ => parse_modkey_string(name).map_err(mlua::Error::external),
    };
    match value {
        Value::Table(table) => table
            .sequence_values::<String>()
            .map(|name| parse(&name?))
            .collect(),
        Value::String(name) => Ok(vec![parse(&name.to_str()?)?]),
        Value::Nil => Ok(Vec::new()),
        _ => Err(mlua::Error::RuntimeError(
            "modifiers must be a table like {\"Mod\", \"Shift\"}".into(),
        )),
    }
}

pub(crate) fn parse_modkey_string(s: &str) -> Result<KeyButMask, ConfigError> {
    match s {
        "Mod1" | "Alt" => Ok(KeyButMask::MOD1),
        "Mod2" => Ok(KeyButMask::MOD2),
        "Mod3" => Ok(KeyButMask::MOD3),
        "Mod4" | "Super" => Ok(KeyButMask::MOD4),
        "Mod5" => Ok(KeyButMask::MOD5),
        "Shift" => Ok(KeyButMask::SHIFT),
        "Control" => Ok(KeyButMask::CONTROL),
        _ => Err(ConfigError::InvalidModkey(s.to_string())),
    }
}

fn parse_keysym(key: &str) -> mlua::Result<Keysym> {
    keysyms::keysym_from_str(key)
        .ok_or_else(|| mlua::Error::external(ConfigError::UnknownKey(key.to_string())))
}

fn parse_action_value(value: Value) -> mlua::Result<(KeyAction, Arg)> {
    match value {
        Value::Function(_) => Err(mlua::Error::RuntimeError(
            "action must be a function call, not a function reference. example: pwm.spawn('st') not pwm.spawn".into(),
        )),
        Value::Table(table) => {
            let name: String = table.get("__action").map_err(|_| {
                mlua::Error::RuntimeError(
                    "action must be a table returned by pwm functions like pwm.spawn() or pwm.client.kill()".into(),
                )
            })?;
            let action = KeyAction::from_str(&name).map_err(mlua::Error::external)?;
            let arg = value_to_arg(table.get("__arg")?)?;
            Ok((action, arg))
        }
        _ => Err(mlua::Error::RuntimeError(
            "action must be a table returned by pwm functions like pwm.spawn() or pwm.client.kill()".into(),
        )),
    }
}

fn value_to_arg(value: Value) -> mlua::Result<Arg> {
    match value {
        Value::Nil => Ok(Arg::None),
        Value::String(s) => Ok(Arg::Str(s.to_str()?.to_string())),
        Value::Integer(i) => Ok(Arg::Int(i as i32)),
        Value::Number(n) => Ok(Arg::Float(n as f32)),
        Value::Table(table) => Ok(Arg::Array(
            table.sequence_values::<String>().collect::<mlua::Result<_>>()?,
        )),
        _ => Ok(Arg::None),
    }
}

fn tag_numbers_to_mask(numbers: &[u32]) -> mlua::Result<u32> {
    numbers.iter().try_fold(0, |mask, &number| {
        if !(1..=31).contains(&number) {
            return Err(mlua::Error::RuntimeError(format!(
                "tag {number} is out of range"
            )));
        }
        Ok(mask | 1 << (number - 1))
    })
}

fn parse_scheme(foreground: Value, background: Value) -> mlua::Result<ColorScheme> {
    Ok(ColorScheme {
        foreground: parse_color_value(foreground)?,
        background: parse_color_value(background)?,
    })
}

fn parse_color_value(value: Value) -> mlua::Result<u32> {
    match value {
        Value::Integer(i) => Ok(i as u32),
        Value::Number(n) => Ok(n as u32),
        Value::String(s) => {
            let s = s.to_str()?;
            let parsed = match s.strip_prefix('#').or_else(|| s.strip_prefix("0x")) {
                Some(hex) => u32::from_str_radix(hex, 16),
                None => s.parse::<u32>(),
            };
            parsed.map_err(|e| {
                mlua::Error::RuntimeError(format!(
                    "invalid color '{}': {}. use a hex format like #ff0000 or 0xff0000",
                    &*s, e
                ))
            })
        }
        _ => Err(mlua::Error::RuntimeError(
            "color must be a number or a string like '#ff0000'".into(),
        )),
    }
}
