//! Lua configuration. The script runs once at startup against a `pwm`
//! global; whatever it leaves in the builder becomes the [`Config`].

mod lua_api;

use std::path::Path;

use mlua::{Lua, Table};

use crate::Config;
use crate::errors::ConfigError;

pub fn parse_lua_config(input: &str, config_dir: Option<&Path>) -> Result<Config, ConfigError> {
    let lua = Lua::new();

    if let Some(dir) = config_dir {
        let package: Table = lua.globals().get("package")?;
        let path: String = package.get("path")?;
        package.set("path", format!("{}/?.lua;{}", dir.display(), path))?;
    }

    let builder = lua_api::register_api(&lua)?;
    lua.load(input).set_name("config.lua").exec()?;

    let config = builder.borrow().clone();
    tracing::debug!(
        keys = config.keybindings.len(),
        buttons = config.buttons.len(),
        rules = config.window_rules.len(),
        "parsed config"
    );
    Ok(config)
}
