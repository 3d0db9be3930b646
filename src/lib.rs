pub mod bootstrap;
pub mod bridge;
pub mod dispatch;
pub mod error;
pub mod filesystem;
pub mod launcher;
pub mod logging;
pub mod registry;
pub mod settings;

pub use bootstrap::{Product, Workspace};
pub use bridge::{BridgeOutcome, NativeMessagingBridge};
pub use dispatch::{DispatchOutcome, Dispatcher, Invocation, Mode};
pub use error::{BridgeError, ConfigError, LaunchError, ResolveError, Result, WeblaunchError};
pub use launcher::{
    CommandLauncher, ExecutionContext, LaunchTarget, Launcher, Options, OutputHandler,
};
pub use registry::{LauncherRegistry, Resolved};
pub use settings::{HandlerConfig, Settings};

use std::sync::Arc;

/// Build the registry from the configured handlers. Runs once, before any dispatch.
pub fn register_launchers(settings: &Settings) -> std::result::Result<LauncherRegistry, ConfigError> {
    let mut registry = LauncherRegistry::new();
    for handler in settings.effective_handlers() {
        let launcher: Arc<dyn Launcher> =
            Arc::new(CommandLauncher::from_config(&handler, settings.java_dir.clone())?);
        for scheme in &handler.schemes {
            registry.register_protocol(scheme, Arc::clone(&launcher));
        }
        for extension in &handler.extensions {
            registry.register_extension(extension, Arc::clone(&launcher));
        }
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registration_handles_jnlp() {
        let registry = register_launchers(&Settings::default()).unwrap();
        assert_eq!(
            registry.resolve("jnlps://example.test/app").unwrap().launcher.name(),
            "javaws"
        );
        assert_eq!(
            registry
                .resolve("https://example.test/app.jnlp")
                .unwrap()
                .launcher
                .name(),
            "javaws"
        );
        assert!(registry.resolve("https://example.test/app.pdf").is_err());
    }

    #[test]
    fn test_configured_handlers_replace_default() {
        let settings = Settings {
            handlers: vec![HandlerConfig {
                name: "viewer".to_string(),
                command: "viewer".to_string(),
                schemes: vec!["view".to_string()],
                extensions: vec!["pdf".to_string()],
                uninstall_args: None,
                gui_args: Vec::new(),
                platforms: Vec::new(),
                use_java_dir: false,
            }],
            ..Settings::default()
        };
        let registry = register_launchers(&settings).unwrap();
        assert_eq!(registry.resolve("/tmp/doc.pdf").unwrap().launcher.name(), "viewer");
        assert_eq!(registry.resolve("view:doc").unwrap().launcher.name(), "viewer");
        assert!(registry.resolve("/tmp/app.jnlp").is_err());
    }
}
