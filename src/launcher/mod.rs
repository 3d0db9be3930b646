use crate::error::LaunchError;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use url::Url;

pub mod command;
pub mod output;
pub mod process;

pub use command::CommandLauncher;
pub use output::OutputStreams;
pub use process::Supervisor;

/// Receives the read end of a pipe carrying stdout or stderr of the launched process.
///
/// Every handler runs on its own thread, so it may block for as long as it likes. End of
/// stream is reached once the process closes its side of the pipe.
pub type OutputHandler = Arc<dyn Fn(Box<dyn Read + Send>) + Send + Sync>;

/// Launch configuration recognised on the command line or implied by the browser bridge.
#[derive(Clone, Default)]
pub struct Options {
    pub is_running_from_browser: bool,
    pub java_dir: Option<PathBuf>,
    pub show_console: bool,
    pub disable_verification: bool,
    pub disable_verification_same_origin: bool,
    pub stdout_handler: Option<OutputHandler>,
    pub stderr_handler: Option<OutputHandler>,
}

impl Options {
    pub fn from_browser() -> Self {
        Options {
            is_running_from_browser: true,
            ..Options::default()
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("is_running_from_browser", &self.is_running_from_browser)
            .field("java_dir", &self.java_dir)
            .field("show_console", &self.show_console)
            .field("disable_verification", &self.disable_verification)
            .field(
                "disable_verification_same_origin",
                &self.disable_verification_same_origin,
            )
            .field("stdout_handler", &self.stdout_handler.is_some())
            .field("stderr_handler", &self.stderr_handler.is_some())
            .finish()
    }
}

/// Per-invocation state handed to a launcher once, before it runs or uninstalls anything.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub work_dir: PathBuf,
    pub log_file: PathBuf,
    pub window_title: String,
    pub options: Options,
}

impl ExecutionContext {
    pub fn new(
        work_dir: impl Into<PathBuf>,
        log_file: impl Into<PathBuf>,
        window_title: impl Into<String>,
    ) -> Self {
        ExecutionContext {
            work_dir: work_dir.into(),
            log_file: log_file.into(),
            window_title: window_title.into(),
            options: Options::default(),
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }
}

/// What a launch request points at once classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchTarget {
    Url(Url),
    Path(PathBuf),
}

impl fmt::Display for LaunchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchTarget::Url(url) => write!(f, "{}", url),
            LaunchTarget::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Runs, supervises and uninstalls one kind of application.
///
/// Launchers are shared through the registry, so every method takes `&self`; implementations
/// keep their per-invocation state behind interior mutability.
pub trait Launcher: Send + Sync {
    fn name(&self) -> &str;

    /// Store the execution context. Called once, before any run or uninstall.
    fn configure(&self, context: ExecutionContext) -> Result<(), LaunchError>;

    fn check_platform(&self) -> Result<(), LaunchError>;

    /// Start the application described by a local file. Returns once it is running.
    fn run_by_filename(&self, filename: &Path) -> Result<(), LaunchError>;

    /// Start the application described by a URL. Returns once it is running.
    fn run_by_url(&self, url: &Url) -> Result<(), LaunchError>;

    fn uninstall_by_filename(&self, filename: &Path, show_gui: bool) -> Result<(), LaunchError>;

    fn uninstall_by_url(&self, url: &Url, show_gui: bool) -> Result<(), LaunchError>;

    /// Best-effort stop of the supervised process. Safe after exit and alongside `wait`.
    fn terminate(&self);

    /// Block until the supervised process exits.
    fn wait(&self) -> Result<ExitStatus, LaunchError>;

    fn run(&self, target: &LaunchTarget) -> Result<(), LaunchError> {
        match target {
            LaunchTarget::Url(url) => self.run_by_url(url),
            LaunchTarget::Path(path) => self.run_by_filename(path),
        }
    }

    fn uninstall(&self, target: &LaunchTarget, show_gui: bool) -> Result<(), LaunchError> {
        match target {
            LaunchTarget::Url(url) => self.uninstall_by_url(url, show_gui),
            LaunchTarget::Path(path) => self.uninstall_by_filename(path, show_gui),
        }
    }
}
