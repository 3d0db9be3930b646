use crate::error::ConfigError;
use crate::filesystem::FileSystem;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PROXY_VARIABLES: &[&str] = &[
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "NO_PROXY",
    "http_proxy",
    "https_proxy",
    "no_proxy",
];

/// User settings read from `settings.json` in the product configuration directory.
///
/// Every field is optional in the file; a missing file yields the defaults.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub java_dir: Option<PathBuf>,
    pub use_http_proxy_environment_variable: bool,
    pub verbose: bool,
    pub json_log: bool,
    pub handlers: Vec<HandlerConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            java_dir: None,
            use_http_proxy_environment_variable: true,
            verbose: false,
            json_log: false,
            handlers: Vec::new(),
        }
    }
}

/// An external program registered as a launcher for some schemes and extensions.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HandlerConfig {
    pub name: String,
    /// Program and leading arguments, split with shell quoting rules
    pub command: String,
    #[serde(default)]
    pub schemes: Vec<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub uninstall_args: Option<Vec<String>>,
    #[serde(default)]
    pub gui_args: Vec<String>,
    /// Operating systems (as in `std::env::consts::OS`); empty means any
    #[serde(default)]
    pub platforms: Vec<String>,
    /// Resolve the program under `<java dir>/bin` when a Java directory is known
    #[serde(default)]
    pub use_java_dir: bool,
}

impl HandlerConfig {
    /// The Java Web Start handler used when no handlers are configured.
    pub fn javaws() -> Self {
        HandlerConfig {
            name: "javaws".to_string(),
            command: "javaws".to_string(),
            schemes: vec!["jnlp".to_string(), "jnlps".to_string()],
            extensions: vec!["jnlp".to_string()],
            uninstall_args: Some(vec!["-uninstall".to_string()]),
            gui_args: vec!["-viewer".to_string()],
            platforms: Vec::new(),
            use_java_dir: true,
        }
    }
}

impl Settings {
    pub fn load<F: FileSystem>(fs: &F, path: &Path) -> Result<Self, ConfigError> {
        if !fs.exists(path) {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Settings::default());
        }
        let content = fs
            .read_to_string(path)
            .map_err(|source| ConfigError::ReadSettings {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::MalformedSettings {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Handlers to register, falling back to the built-in Java Web Start handler.
    pub fn effective_handlers(&self) -> Vec<HandlerConfig> {
        if self.handlers.is_empty() {
            vec![HandlerConfig::javaws()]
        } else {
            self.handlers.clone()
        }
    }

    /// Validate a Java directory override given on the command line.
    pub fn use_java_dir<F: FileSystem>(&self, dir: &Path, fs: &F) -> Result<PathBuf, ConfigError> {
        if dir.as_os_str().is_empty() || !fs.is_dir(dir) {
            return Err(ConfigError::InvalidJavaDir(dir.to_path_buf()));
        }
        info!(java_dir = %dir.display(), "Using Java directory override");
        Ok(dir.to_path_buf())
    }

    /// Clear the proxy environment when the settings say not to honour it.
    pub fn apply_proxy_policy(&self) {
        if self.use_http_proxy_environment_variable {
            return;
        }
        for name in PROXY_VARIABLES {
            env::remove_var(name);
        }
        info!("Proxy environment variables cleared");
    }
}

/// Snapshot of the proxy environment for the startup log line.
pub fn proxy_environment() -> String {
    PROXY_VARIABLES[..3]
        .iter()
        .map(|name| format!("{}={}", name, env::var(name).unwrap_or_default()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::MockFileSystem;
    use std::io;

    #[test]
    fn test_missing_file_yields_defaults() {
        let mut mock_fs = MockFileSystem::new();
        mock_fs.expect_exists().return_const(false);
        mock_fs.expect_read_to_string().never();

        let settings = Settings::load(&mock_fs, Path::new("/cfg/settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.use_http_proxy_environment_variable);
        assert_eq!(settings.effective_handlers(), vec![HandlerConfig::javaws()]);
    }

    #[test]
    fn test_load_handlers() {
        let mut mock_fs = MockFileSystem::new();
        mock_fs.expect_exists().return_const(true);
        mock_fs.expect_read_to_string().returning(|_| {
            Ok(r#"{
                "javaDir": "/opt/java",
                "useHttpProxyEnvironmentVariable": false,
                "handlers": [
                    {"name": "viewer", "command": "viewer --quiet", "extensions": ["pdf"]}
                ]
            }"#
            .to_string())
        });

        let settings = Settings::load(&mock_fs, Path::new("/cfg/settings.json")).unwrap();
        assert_eq!(settings.java_dir, Some(PathBuf::from("/opt/java")));
        assert!(!settings.use_http_proxy_environment_variable);
        let handlers = settings.effective_handlers();
        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].name, "viewer");
        assert_eq!(handlers[0].extensions, vec!["pdf".to_string()]);
        assert!(handlers[0].schemes.is_empty());
        assert!(handlers[0].uninstall_args.is_none());
    }

    #[test]
    fn test_malformed_settings() {
        let mut mock_fs = MockFileSystem::new();
        mock_fs.expect_exists().return_const(true);
        mock_fs
            .expect_read_to_string()
            .returning(|_| Ok("{not json".to_string()));

        let err = Settings::load(&mock_fs, Path::new("/cfg/settings.json")).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedSettings { .. }));
    }

    #[test]
    fn test_unreadable_settings() {
        let mut mock_fs = MockFileSystem::new();
        mock_fs.expect_exists().return_const(true);
        mock_fs
            .expect_read_to_string()
            .returning(|_| Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")));

        let err = Settings::load(&mock_fs, Path::new("/cfg/settings.json")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadSettings { .. }));
    }

    #[test]
    fn test_use_java_dir() {
        let mut mock_fs = MockFileSystem::new();
        mock_fs
            .expect_is_dir()
            .returning(|path| path == Path::new("/opt/java"));

        let settings = Settings::default();
        assert_eq!(
            settings.use_java_dir(Path::new("/opt/java"), &mock_fs).unwrap(),
            PathBuf::from("/opt/java")
        );
        assert!(matches!(
            settings.use_java_dir(Path::new("/missing"), &mock_fs),
            Err(ConfigError::InvalidJavaDir(_))
        ));
        assert!(settings.use_java_dir(Path::new(""), &mock_fs).is_err());
    }
}
