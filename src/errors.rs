use thiserror::Error;

#[derive(Debug, Error)]
pub enum WmError {
    #[error(transparent)]
    X11(#[from] X11Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("another window manager is already running")]
    OtherWmRunning,
}

#[derive(Debug, Error)]
pub enum X11Error {
    #[error("failed to connect to the X server: {0}")]
    ConnectError(#[from] x11rb::errors::ConnectError),
    #[error("connection error: {0}")]
    ConnectionError(#[from] x11rb::errors::ConnectionError),
    #[error("reply error: {0}")]
    ReplyError(#[from] x11rb::errors::ReplyError),
    #[error("reply or id error: {0}")]
    ReplyOrIdError(#[from] x11rb::errors::ReplyOrIdError),
    #[error("failed to load font '{0}'")]
    FontLoadFailed(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("lua error: {0}")]
    LuaError(String),
    #[error("invalid modifier: {0}")]
    InvalidModkey(String),
    #[error("unknown key '{0}'")]
    UnknownKey(String),
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("unknown layout '{0}'")]
    UnknownLayout(String),
    #[error("invalid bar click region '{0}'")]
    UnknownClick(String),
}

impl From<mlua::Error> for ConfigError {
    fn from(error: mlua::Error) -> Self {
        ConfigError::LuaError(error.to_string())
    }
}

macro_rules! x11_into_wm {
    ($($source:ty),*) => {
        $(
            impl From<$source> for WmError {
                fn from(error: $source) -> Self {
                    WmError::X11(X11Error::from(error))
                }
            }
        )*
    };
}

x11_into_wm!(
    x11rb::errors::ConnectError,
    x11rb::errors::ConnectionError,
    x11rb::errors::ReplyError,
    x11rb::errors::ReplyOrIdError
);

#[derive(Debug, Error)]
pub enum MainError {
    #[error("could not determine the config directory")]
    NoConfigDir,
    #[error("failed to read config: {0}")]
    FailedReadConfig(std::io::Error),
    #[error("failed to parse the built-in config template: {0}")]
    FailedReadConfigTemplate(ConfigError),
    #[error("could not create config directory: {0}")]
    CouldNotCreateConfigDir(std::io::Error),
    #[error("could not write config: {0}")]
    CouldNotWriteConfig(std::io::Error),
    #[error("missing program name")]
    NoProgramName,
    #[error("invalid arguments, see --help")]
    InvalidArguments,
    #[error("--config requires a path")]
    NoConfigPath,
    #[error("config path does not exist")]
    BadConfigPath,
    #[error("failed to check config path: {0}")]
    FailedCheckExist(std::io::Error),
    #[error("could not start window manager: {0}")]
    CouldNotStartWm(WmError),
    #[error("window manager error: {0}")]
    WmError(WmError),
}
