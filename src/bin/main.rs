use pwm::errors::MainError;
use pwm::window_manager::WindowManager;
use pwm::x11::X11Backend;
use std::path::Path;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG_FILE: &str = "config.lua";
const TEMPLATE: &str = include_str!("../../templates/config.lua");

enum Args {
    Exit,
    Arguments(Vec<String>),
    Error(MainError),
}

fn main() -> Result<(), MainError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "pwm=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let arguments = match process_args() {
        Args::Exit => return Ok(()),
        Args::Arguments(v) => v,
        Args::Error(e) => return Err(e),
    };

    let config = load_config(arguments.get(2))?;

    let backend = match X11Backend::connect(&config) {
        Ok(backend) => backend,
        Err(e) => return Err(MainError::CouldNotStartWm(e)),
    };

    let mut window_manager = match WindowManager::new(config, backend) {
        Ok(wm) => wm,
        Err(e) => return Err(MainError::CouldNotStartWm(e)),
    };

    if let Err(e) = pwm::x11::events::run(&mut window_manager) {
        tracing::error!(error = %e, "window manager stopped");
        return Err(MainError::WmError(e));
    }

    Ok(())
}

fn load_config(config_path: Option<&String>) -> Result<pwm::Config, MainError> {
    let path = match config_path {
        None => {
            let config_path = get_config_path()?.join(CONFIG_FILE);
            ensure_config(&config_path)?;
            config_path
        }
        Some(p) => PathBuf::from(p),
    };

    let config_string = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => return Err(MainError::FailedReadConfig(e)),
    };

    let config = match pwm::config::parse_lua_config(&config_string, path.parent()) {
        Ok(config) => config,
        Err(warning) => {
            tracing::warn!(%warning, path = %path.display(), "config failed to load, using defaults");
            match pwm::config::parse_lua_config(TEMPLATE, None) {
                Ok(c) => c,
                Err(e) => return Err(MainError::FailedReadConfigTemplate(e)),
            }
        }
    };
    Ok(config)
}

fn init_config() -> Result<PathBuf, MainError> {
    let config_directory = get_config_path()?;
    if let Err(e) = std::fs::create_dir_all(&config_directory) {
        return Err(MainError::CouldNotCreateConfigDir(e));
    }

    let config_path = config_directory.join(CONFIG_FILE);
    if let Err(e) = std::fs::write(&config_path, TEMPLATE) {
        return Err(MainError::CouldNotWriteConfig(e));
    }

    Ok(config_path)
}

fn get_config_path() -> Result<PathBuf, MainError> {
    match dirs::config_dir() {
        Some(p) => Ok(p.join("pwm")),
        None => Err(MainError::NoConfigDir),
    }
}

fn print_help() {
    println!("pwm - a dynamic tiling window manager\n");
    println!("USAGE:");
    println!("    pwm [OPTIONS]\n");
    println!("OPTIONS:");
    println!("    --init              Create default config in ~/.config/pwm/config.lua");
    println!("    --config <PATH>     Use custom config file");
    println!("    --version           Print version information");
    println!("    --help              Print this help message\n");
    println!("LOGGING:");
    println!("    Set RUST_LOG (default: pwm=info), output goes to stderr\n");
}

fn process_args() -> Args {
    let mut args = std::env::args();
    let name = match args.next() {
        Some(n) => n,
        None => return Args::Error(MainError::NoProgramName),
    };
    let switch = args.next();
    let path = args.next();

    let switch = match switch {
        Some(s) => s,
        None => return Args::Arguments(vec![name]),
    };

    match switch.as_str() {
        "--version" => {
            println!("{name} {}", env!("CARGO_PKG_VERSION"));
            Args::Exit
        }
        "--help" => {
            print_help();
            Args::Exit
        }
        "--init" => match init_config() {
            Ok(path) => {
                println!("Config created at {}", path.display());
                Args::Exit
            }
            Err(e) => Args::Error(e),
        },
        "--config" => match check_custom_config(path) {
            Ok(p) => Args::Arguments(vec![name, switch, p]),
            Err(e) => Args::Error(e),
        },
        _ => Args::Error(MainError::InvalidArguments),
    }
}

fn check_custom_config(path: Option<String>) -> Result<String, MainError> {
    let Some(path) = path else {
        return Err(MainError::NoConfigPath);
    };

    match std::fs::exists(&path) {
        Ok(true) => Ok(path),
        Ok(false) => Err(MainError::BadConfigPath),
        Err(e) => Err(MainError::FailedCheckExist(e)),
    }
}

/// Writes the default config on first run.
fn ensure_config(path: &Path) -> Result<(), MainError> {
    if !path.exists() {
        let created = init_config()?;
        tracing::info!(path = %created.display(), "created default config");
    }
    Ok(())
}
