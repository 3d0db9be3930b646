use crate::bridge::{BridgeOutcome, NativeMessagingBridge};
use crate::error::{ConfigError, LaunchError, Result, WeblaunchError};
use crate::filesystem::FileSystem;
use crate::launcher::{ExecutionContext, Options};
use crate::registry::{LauncherRegistry, Resolved};
use crate::settings::Settings;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitStatus;
use tracing::{debug, info};

/// Browsers start native messaging hosts with the extension origin as the argument.
pub const EXTENSION_ORIGIN_PREFIX: &str = "chrome-extension://";

pub const HELP_TOKENS: &[&str] = &["-help", "--help", "/help", "-?", "/?"];

/// Flags that consume the following argument when given without `=value`.
const VALUE_FLAGS: &[&str] = &["javaDir", "javadir"];

/// Recognised command line flags. `None` means the flag was not given at all.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(
    name = "weblaunch",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true,
    args_override_self = true
)]
pub struct Flags {
    /// Java folder that should be used for starting the application
    #[arg(long = "javaDir", visible_alias = "javadir", value_name = "JAVA_DIR")]
    pub java_dir: Option<PathBuf>,

    /// Show the Java console
    #[arg(
        long = "showConsole",
        visible_alias = "showconsole",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub show_console: Option<bool>,

    /// Don't verify jar signatures
    #[arg(
        long = "disableVerification",
        visible_alias = "disableverification",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub disable_verification: Option<bool>,

    /// Don't verify all jars have the same signature
    #[arg(
        long = "disableVerificationSameOrigin",
        visible_alias = "disableverificationsameorigin",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub disable_verification_same_origin: Option<bool>,

    /// Uninstall the application
    #[arg(
        long = "uninstall",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub uninstall: Option<bool>,

    /// Show GUI, uninstall only
    #[arg(
        long = "gui",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub gui: Option<bool>,

    /// Filename or URL, plus anything the browser appends
    #[arg(num_args = 0..)]
    pub args: Vec<String>,
}

impl Flags {
    /// Number of flags explicitly present, whatever their value.
    pub fn count(&self) -> usize {
        [
            self.java_dir.is_some(),
            self.show_console.is_some(),
            self.disable_verification.is_some(),
            self.disable_verification_same_origin.is_some(),
            self.uninstall.is_some(),
            self.gui.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}

/// The four mutually exclusive ways the program can be invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Direct { target: String },
    Configured { target: String, flags: Flags },
    Uninstall { target: String, show_gui: bool },
    Bridge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub flags: Flags,
}

impl Invocation {
    /// Parse the arguments after the program name.
    ///
    /// Flags use a single dash (`-showConsole`, `-javaDir=/opt/java`) and stop at the first
    /// positional argument; everything from there on is positional.
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let flags = Flags::try_parse_from(normalize(&args))
            .map_err(|err| WeblaunchError::Usage(err.to_string()))?;
        Ok(Invocation { flags })
    }

    pub fn positional(&self) -> &[String] {
        &self.flags.args
    }

    pub fn flag_count(&self) -> usize {
        self.flags.count()
    }

    pub fn mode(&self) -> Mode {
        let flags = &self.flags;
        let [target] = self.positional() else {
            return Mode::Bridge;
        };
        if target.starts_with(EXTENSION_ORIGIN_PREFIX) {
            return Mode::Bridge;
        }
        if flags.count() == 0 {
            return Mode::Direct {
                target: target.clone(),
            };
        }
        if flags.uninstall == Some(true) {
            return Mode::Uninstall {
                target: target.clone(),
                show_gui: flags.gui == Some(true),
            };
        }
        Mode::Configured {
            target: target.clone(),
            flags: flags.clone(),
        }
    }
}

pub fn is_help_token(arg: &str) -> bool {
    HELP_TOKENS.contains(&arg)
}

/// Rewrite single-dash long flags for clap and fence off the positional arguments with `--`.
fn normalize(args: &[String]) -> Vec<String> {
    let mut normalized = Vec::with_capacity(args.len() + 1);
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }
        if !arg.starts_with('-') || arg.len() == 1 {
            positional.push(arg.clone());
            break;
        }
        let name = arg.trim_start_matches('-');
        match iter.as_slice().first() {
            Some(value) if VALUE_FLAGS.contains(&name) => {
                normalized.push(format!("--{}={}", name, value));
                iter.next();
            }
            _ => normalized.push(format!("--{}", name)),
        }
    }
    positional.extend(iter.cloned());
    if !positional.is_empty() {
        normalized.push("--".to_string());
        normalized.extend(positional);
    }
    normalized
}

/// Options reflecting only the flags that were given. A present boolean flag switches its
/// option on regardless of the value it was given.
pub fn build_options<F: FileSystem>(
    flags: &Flags,
    settings: &Settings,
    fs: &F,
) -> std::result::Result<Options, ConfigError> {
    let mut options = Options::default();
    if let Some(java_dir) = &flags.java_dir {
        options.java_dir = Some(settings.use_java_dir(java_dir, fs)?);
    }
    options.show_console = flags.show_console.is_some();
    options.disable_verification = flags.disable_verification.is_some();
    options.disable_verification_same_origin = flags.disable_verification_same_origin.is_some();
    Ok(options)
}

#[derive(Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Launched(Option<ExitStatus>),
    Uninstalled,
    Bridge(BridgeOutcome),
}

/// Carries out a classified invocation against the registry.
pub struct Dispatcher<'a, F: FileSystem> {
    registry: &'a LauncherRegistry,
    settings: &'a Settings,
    fs: &'a F,
    context: ExecutionContext,
}

impl<'a, F: FileSystem> Dispatcher<'a, F> {
    pub fn new(
        registry: &'a LauncherRegistry,
        settings: &'a Settings,
        fs: &'a F,
        context: ExecutionContext,
    ) -> Self {
        Dispatcher {
            registry,
            settings,
            fs,
            context,
        }
    }

    pub fn dispatch<R: Read, W: Write>(
        &self,
        mode: Mode,
        input: &mut R,
        output: &mut W,
    ) -> Result<DispatchOutcome> {
        debug!(mode = ?mode, "Dispatching");
        match mode {
            Mode::Direct { target } => self.launch(&target, Options::default()),
            Mode::Configured { target, flags } => {
                let options = build_options(&flags, self.settings, self.fs)?;
                self.launch(&target, options)
            }
            Mode::Uninstall { target, show_gui } => self.uninstall(&target, show_gui),
            Mode::Bridge => {
                info!("Running from browser: true");
                let context = self.context.clone().with_options(Options::from_browser());
                let bridge = NativeMessagingBridge::new(self.registry, context);
                Ok(DispatchOutcome::Bridge(bridge.serve(input, output)?))
            }
        }
    }

    fn prepare(&self, target: &str, options: Options) -> Result<Resolved> {
        let resolved = self.registry.resolve(target)?;
        info!(target = %resolved.target, launcher = %resolved.launcher.name(), "Resolved launcher");
        resolved
            .launcher
            .configure(self.context.clone().with_options(options))?;
        resolved.launcher.check_platform()?;
        Ok(resolved)
    }

    fn launch(&self, target: &str, options: Options) -> Result<DispatchOutcome> {
        let resolved = self.prepare(target, options)?;
        resolved.launcher.run(&resolved.target)?;
        match resolved.launcher.wait() {
            Ok(status) => {
                info!(status = %status, "Application finished");
                Ok(DispatchOutcome::Launched(Some(status)))
            }
            Err(LaunchError::NotRunning(_)) => {
                debug!("Launcher does not supervise a process");
                Ok(DispatchOutcome::Launched(None))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn uninstall(&self, target: &str, show_gui: bool) -> Result<DispatchOutcome> {
        let resolved = self.prepare(target, Options::default())?;
        resolved.launcher.uninstall(&resolved.target, show_gui)?;
        info!(target = %resolved.target, "Application uninstalled");
        Ok(DispatchOutcome::Uninstalled)
    }
}
