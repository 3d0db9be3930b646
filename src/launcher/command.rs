use super::{ExecutionContext, LaunchTarget, Launcher, Supervisor};
use crate::error::{ConfigError, LaunchError};
use crate::filesystem::{FileSystem, RealFileSystem};
use crate::settings::HandlerConfig;
use std::env::consts;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, info, warn};
use url::Url;

/// Launcher that hands the target to an external program, e.g. `javaws <url>`.
#[derive(Debug)]
pub struct CommandLauncher {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    uninstall_args: Option<Vec<String>>,
    gui_args: Vec<String>,
    platforms: Vec<String>,
    use_java_dir: bool,
    /// Java directory from settings, used when the options carry none
    default_java_dir: Option<PathBuf>,
    context: OnceLock<ExecutionContext>,
    process: Mutex<Option<Arc<Supervisor>>>,
}

impl CommandLauncher {
    pub fn from_config(
        config: &HandlerConfig,
        default_java_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidCommand {
            name: config.name.clone(),
            reason,
        };
        let mut words = shell_words::split(&config.command)
            .map_err(|err| invalid(err.to_string()))?
            .into_iter();
        let program = words
            .next()
            .ok_or_else(|| invalid("empty command".to_string()))?;

        Ok(CommandLauncher {
            name: config.name.clone(),
            program: PathBuf::from(program),
            args: words.collect(),
            uninstall_args: config.uninstall_args.clone(),
            gui_args: config.gui_args.clone(),
            platforms: config.platforms.clone(),
            use_java_dir: config.use_java_dir,
            default_java_dir,
            context: OnceLock::new(),
            process: Mutex::new(None),
        })
    }

    fn context(&self) -> Result<&ExecutionContext, LaunchError> {
        self.context
            .get()
            .ok_or_else(|| LaunchError::NotConfigured(self.name.clone()))
    }

    /// The program to execute, looked up under `<java dir>/bin` when applicable.
    pub fn resolve_program<F: FileSystem>(&self, java_dir: Option<&Path>, fs: &F) -> PathBuf {
        if !self.use_java_dir || self.program.components().count() != 1 {
            return self.program.clone();
        }
        let Some(java_dir) = java_dir.or(self.default_java_dir.as_deref()) else {
            return self.program.clone();
        };
        let bin = java_dir.join("bin");
        let candidates = [
            bin.join(&self.program),
            bin.join(format!("{}.exe", self.program.display())),
        ];
        match candidates.into_iter().find(|candidate| fs.exists(candidate)) {
            Some(found) => found,
            None => {
                warn!(
                    launcher = %self.name,
                    java_dir = %java_dir.display(),
                    "Program not found in Java directory, using PATH"
                );
                self.program.clone()
            }
        }
    }

    fn command(&self, context: &ExecutionContext, args: &[String], target: &LaunchTarget) -> Command {
        let program = self.resolve_program(context.options.java_dir.as_deref(), &RealFileSystem);
        let mut command = Command::new(program);
        command.args(args);
        command.arg(target_arg(target));
        if context.work_dir.is_dir() {
            command.current_dir(&context.work_dir);
        }
        command
    }

    /// Where output without a handler goes: the terminal when a console was requested
    /// outside the browser bridge, the log file otherwise.
    fn output_sink(context: &ExecutionContext) -> Box<dyn FnMut() -> Stdio + '_> {
        if context.options.show_console && !context.options.is_running_from_browser {
            return Box::new(Stdio::inherit);
        }
        Box::new(move || match RealFileSystem.open_append(&context.log_file) {
            Ok(file) => Stdio::from(file),
            Err(err) => {
                warn!(log_file = %context.log_file.display(), error = %err, "Discarding application output");
                Stdio::null()
            }
        })
    }

    fn start(&self, target: &LaunchTarget) -> Result<(), LaunchError> {
        let context = self.context()?;
        let mut args = self.args.clone();
        let command = self.command(context, &args, target);
        args.push(target.to_string());
        info!(
            launcher = %self.name,
            program = %command.get_program().to_string_lossy(),
            args = ?args,
            from_browser = context.options.is_running_from_browser,
            show_console = context.options.show_console,
            disable_verification = context.options.disable_verification,
            disable_verification_same_origin = context.options.disable_verification_same_origin,
            "Launching application"
        );

        let supervisor = Supervisor::spawn(command, &context.options, Self::output_sink(context))
            .map_err(|source| LaunchError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;
        *self.process.lock().unwrap_or_else(|p| p.into_inner()) = Some(Arc::new(supervisor));
        Ok(())
    }

    fn remove(&self, target: &LaunchTarget, show_gui: bool) -> Result<(), LaunchError> {
        let context = self.context()?;
        let Some(uninstall_args) = &self.uninstall_args else {
            return Err(LaunchError::UninstallUnsupported(self.name.clone()));
        };
        let mut args = self.args.clone();
        args.extend(uninstall_args.iter().cloned());
        if show_gui {
            args.extend(self.gui_args.iter().cloned());
        }
        let command = self.command(context, &args, target);
        info!(launcher = %self.name, target = %target, show_gui, "Uninstalling application");

        let supervisor = Supervisor::spawn(command, &context.options, Self::output_sink(context))
            .map_err(|source| LaunchError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;
        let status = supervisor.wait()?;
        supervisor.join_output();
        if !status.success() {
            return Err(LaunchError::UninstallFailed {
                target: target.to_string(),
                status: status.to_string(),
            });
        }
        Ok(())
    }

    fn supervisor(&self) -> Option<Arc<Supervisor>> {
        self.process
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

fn target_arg(target: &LaunchTarget) -> OsString {
    match target {
        LaunchTarget::Url(url) => OsString::from(url.as_str()),
        LaunchTarget::Path(path) => path.clone().into_os_string(),
    }
}

impl Launcher for CommandLauncher {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&self, context: ExecutionContext) -> Result<(), LaunchError> {
        debug!(launcher = %self.name, work_dir = %context.work_dir.display(), "Configuring launcher");
        self.context
            .set(context)
            .map_err(|_| LaunchError::AlreadyConfigured(self.name.clone()))
    }

    fn check_platform(&self) -> Result<(), LaunchError> {
        if self.platforms.is_empty() || self.platforms.iter().any(|os| os == consts::OS) {
            return Ok(());
        }
        Err(LaunchError::UnsupportedPlatform {
            launcher: self.name.clone(),
            os: consts::OS.to_string(),
            arch: consts::ARCH.to_string(),
        })
    }

    fn run_by_filename(&self, filename: &Path) -> Result<(), LaunchError> {
        self.start(&LaunchTarget::Path(filename.to_path_buf()))
    }

    fn run_by_url(&self, url: &Url) -> Result<(), LaunchError> {
        self.start(&LaunchTarget::Url(url.clone()))
    }

    fn uninstall_by_filename(&self, filename: &Path, show_gui: bool) -> Result<(), LaunchError> {
        self.remove(&LaunchTarget::Path(filename.to_path_buf()), show_gui)
    }

    fn uninstall_by_url(&self, url: &Url, show_gui: bool) -> Result<(), LaunchError> {
        self.remove(&LaunchTarget::Url(url.clone()), show_gui)
    }

    fn terminate(&self) {
        if let Some(supervisor) = self.supervisor() {
            supervisor.terminate();
        }
    }

    fn wait(&self) -> Result<ExitStatus, LaunchError> {
        let supervisor = self
            .supervisor()
            .ok_or_else(|| LaunchError::NotRunning(self.name.clone()))?;
        Ok(supervisor.wait()?)
    }
}
