use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("invalid URL {input}: {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unable to find launcher for URL {0}")]
    NoUrlLauncher(String),

    #[error("unable to find launcher for path {0}")]
    NoExtensionLauncher(String),

    #[error("unable to handle filename or URL {input}: ({by_url}, {by_extension})")]
    NotFound {
        input: String,
        by_url: Box<ResolveError>,
        by_extension: Box<ResolveError>,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Java folder {0} does not exist or is not a directory")]
    InvalidJavaDir(PathBuf),

    #[error("Failed to read settings file {path}: {source}")]
    ReadSettings {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed settings file {path}: {source}")]
    MalformedSettings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid command line for handler '{name}': {reason}")]
    InvalidCommand { name: String, reason: String },
}

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Launcher '{0}' has not been configured")]
    NotConfigured(String),

    #[error("Launcher '{0}' is already configured")]
    AlreadyConfigured(String),

    #[error("Launcher '{launcher}' does not support OS={os} Architecture={arch}")]
    UnsupportedPlatform {
        launcher: String,
        os: String,
        arch: String,
    },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Launcher '{0}' has no running application")]
    NotRunning(String),

    #[error("Launcher '{0}' does not support uninstalling applications")]
    UninstallUnsupported(String),

    #[error("Uninstall of {target} failed with {status}")]
    UninstallFailed { target: String, status: String },

    #[error("Lost track of the application process: {0}")]
    Wait(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to read native message: {0}")]
    Read(#[source] io::Error),

    #[error("Native message of {0} bytes exceeds the size limit")]
    TooLarge(u32),

    #[error("Malformed native message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Failed to write native message: {0}")]
    Write(#[source] io::Error),
}

#[derive(Error, Debug)]
pub enum WeblaunchError {
    #[error("{0}")]
    Usage(String),

    #[error("Failed to prepare product directories: {0}")]
    Bootstrap(#[from] io::Error),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, WeblaunchError>;
