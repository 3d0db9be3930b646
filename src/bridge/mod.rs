//! One-shot native messaging exchange with a browser extension.
//!
//! Exactly one response is written per request. Failures to resolve or run the target are
//! reported inside that response; only a broken channel is an error for the caller.

use crate::error::{BridgeError, WeblaunchError};
use crate::launcher::ExecutionContext;
use crate::registry::LauncherRegistry;
use std::io::{Read, Write};
use tracing::{error, info};

pub mod message;

pub use message::{read_message, write_message, Request, Response};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeOutcome {
    /// The browser closed the channel without sending anything
    Closed,
    /// Answered an installation probe
    Installed,
    Launched,
    /// Launch failed; the text was sent back as the status
    Failed(String),
}

#[derive(Debug)]
pub struct NativeMessagingBridge<'a> {
    registry: &'a LauncherRegistry,
    context: ExecutionContext,
}

impl<'a> NativeMessagingBridge<'a> {
    pub fn new(registry: &'a LauncherRegistry, context: ExecutionContext) -> Self {
        NativeMessagingBridge { registry, context }
    }

    pub fn serve<R: Read, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> Result<BridgeOutcome, BridgeError> {
        let Some(request) = read_message(input)? else {
            info!("Exit because stdin has been closed");
            return Ok(BridgeOutcome::Closed);
        };

        if request.is_probe() {
            info!(status = request.status.as_deref().unwrap_or_default(), "Installation probe");
            write_message(output, &Response::installed())?;
            return Ok(BridgeOutcome::Installed);
        }

        let url = request.url.unwrap_or_default();
        match self.launch(&url) {
            Ok(()) => {
                write_message(output, &Response::ok())?;
                Ok(BridgeOutcome::Launched)
            }
            Err(err) => {
                let text = err.to_string();
                let response = Response::error(text.clone());
                error!(url = %url, response = ?response, "Launch from browser failed");
                write_message(output, &response)?;
                Ok(BridgeOutcome::Failed(text))
            }
        }
    }

    fn launch(&self, url: &str) -> Result<(), WeblaunchError> {
        let resolved = self.registry.resolve_url(url)?;
        info!(url = %url, launcher = %resolved.launcher.name(), "Launching from browser");
        let launcher = &resolved.launcher;
        launcher.configure(self.context.clone())?;
        launcher.check_platform()?;
        launcher.run(&resolved.target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::message::frame;
    use crate::launcher::testing::{Call, RecordingLauncher};
    use crate::launcher::Options;
    use std::io::{self, Cursor};

    fn context() -> ExecutionContext {
        ExecutionContext::new("/work", "/work/test.log", "Weblaunch").with_options(Options::from_browser())
    }

    fn decode(output: &[u8]) -> serde_json::Value {
        assert!(output.len() >= 4, "no response written");
        let length = u32::from_ne_bytes(output[..4].try_into().unwrap()) as usize;
        assert_eq!(length, output.len() - 4, "exactly one response expected");
        serde_json::from_slice(&output[4..]).unwrap()
    }

    #[test]
    fn test_probe_answers_installed_without_launching() {
        let launcher = RecordingLauncher::new("jnlp");
        let mut registry = LauncherRegistry::new();
        registry.register_extension("jnlp", launcher.clone());
        let bridge = NativeMessagingBridge::new(&registry, context());

        let mut output = Vec::new();
        let outcome = bridge
            .serve(&mut Cursor::new(frame(r#"{"status":"probe"}"#)), &mut output)
            .unwrap();

        assert_eq!(outcome, BridgeOutcome::Installed);
        assert_eq!(decode(&output), serde_json::json!({"status": "installed"}));
        assert!(launcher.calls().is_empty());
    }

    #[test]
    fn test_successful_launch_answers_ok() {
        let launcher = RecordingLauncher::new("jnlp");
        let mut registry = LauncherRegistry::new();
        registry.register_extension("jnlp", launcher.clone());
        let bridge = NativeMessagingBridge::new(&registry, context());

        let mut output = Vec::new();
        let outcome = bridge
            .serve(
                &mut Cursor::new(frame(r#"{"URL":"https://example.test/app.jnlp"}"#)),
                &mut output,
            )
            .unwrap();

        assert_eq!(outcome, BridgeOutcome::Launched);
        assert_eq!(decode(&output), serde_json::json!({"status": "ok"}));
        assert_eq!(
            launcher.calls(),
            vec![
                Call::Configure {
                    window_title: "Weblaunch".to_string()
                },
                Call::CheckPlatform,
                Call::RunByUrl("https://example.test/app.jnlp".to_string()),
            ]
        );
        assert!(launcher.context().unwrap().options.is_running_from_browser);
    }

    #[test]
    fn test_unresolvable_url_is_reported_in_status() {
        let registry = LauncherRegistry::new();
        let bridge = NativeMessagingBridge::new(&registry, context());

        let mut output = Vec::new();
        let outcome = bridge
            .serve(&mut Cursor::new(frame(r#"{"URL":"bad://nowhere"}"#)), &mut output)
            .unwrap();

        let expected = "unable to find launcher for URL bad://nowhere";
        assert_eq!(outcome, BridgeOutcome::Failed(expected.to_string()));
        assert_eq!(decode(&output), serde_json::json!({ "status": expected }));
    }

    #[test]
    fn test_file_paths_are_not_resolved() {
        let launcher = RecordingLauncher::new("jnlp");
        let mut registry = LauncherRegistry::new();
        registry.register_extension("jnlp", launcher.clone());
        let bridge = NativeMessagingBridge::new(&registry, context());

        let mut output = Vec::new();
        let outcome = bridge
            .serve(&mut Cursor::new(frame(r#"{"URL":"/tmp/app.jnlp"}"#)), &mut output)
            .unwrap();

        assert!(matches!(outcome, BridgeOutcome::Failed(_)));
        assert!(launcher.calls().is_empty());
    }

    #[test]
    fn test_run_failure_is_reported_in_status() {
        let launcher = RecordingLauncher::failing("jnlp", "java not found");
        let mut registry = LauncherRegistry::new();
        registry.register_protocol("jnlp", launcher.clone());
        let bridge = NativeMessagingBridge::new(&registry, context());

        let mut output = Vec::new();
        let outcome = bridge
            .serve(&mut Cursor::new(frame(r#"{"URL":"jnlp://example.test/app"}"#)), &mut output)
            .unwrap();

        let BridgeOutcome::Failed(text) = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert!(text.contains("java not found"));
        assert_eq!(decode(&output)["status"], serde_json::Value::String(text));
    }

    #[test]
    fn test_platform_mismatch_skips_run() {
        let launcher = RecordingLauncher::wrong_platform("jnlp");
        let mut registry = LauncherRegistry::new();
        registry.register_protocol("jnlp", launcher.clone());
        let bridge = NativeMessagingBridge::new(&registry, context());

        let mut output = Vec::new();
        let outcome = bridge
            .serve(&mut Cursor::new(frame(r#"{"URL":"jnlp://example.test/app"}"#)), &mut output)
            .unwrap();

        assert!(matches!(outcome, BridgeOutcome::Failed(_)));
        assert!(!launcher
            .calls()
            .iter()
            .any(|call| matches!(call, Call::RunByUrl(_))));
    }

    #[test]
    fn test_closed_channel_writes_nothing() {
        let registry = LauncherRegistry::new();
        let bridge = NativeMessagingBridge::new(&registry, context());

        let mut output = Vec::new();
        let outcome = bridge.serve(&mut Cursor::new(Vec::new()), &mut output).unwrap();

        assert_eq!(outcome, BridgeOutcome::Closed);
        assert!(output.is_empty());
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_an_error() {
        let registry = LauncherRegistry::new();
        let bridge = NativeMessagingBridge::new(&registry, context());

        let result = bridge.serve(&mut Cursor::new(frame(r#"{"status":"probe"}"#)), &mut BrokenPipe);
        assert!(matches!(result, Err(BridgeError::Write(_))));
    }
}
