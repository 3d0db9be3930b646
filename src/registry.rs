//! Launcher lookup by URL scheme or file extension.
//!
//! Registrations happen once at startup; afterwards the registry is only read, through a
//! shared reference handed to the dispatcher.

use crate::error::ResolveError;
use crate::launcher::{LaunchTarget, Launcher};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// A launcher together with the classified target it was resolved for.
#[derive(Clone)]
pub struct Resolved {
    pub launcher: Arc<dyn Launcher>,
    pub target: LaunchTarget,
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolved")
            .field("launcher", &self.launcher.name())
            .field("target", &self.target)
            .finish()
    }
}

#[derive(Default)]
pub struct LauncherRegistry {
    protocols: BTreeMap<String, Arc<dyn Launcher>>,
    extensions: BTreeMap<String, Arc<dyn Launcher>>,
}

impl fmt::Debug for LauncherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LauncherRegistry")
            .field("protocols", &self.protocols.keys().collect::<Vec<_>>())
            .field("extensions", &self.extensions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl LauncherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_protocol(&mut self, scheme: &str, launcher: Arc<dyn Launcher>) {
        let scheme = scheme.trim().to_ascii_lowercase();
        debug!(scheme = %scheme, launcher = %launcher.name(), "Registering protocol");
        self.protocols.insert(scheme, launcher);
    }

    pub fn register_extension(&mut self, extension: &str, launcher: Arc<dyn Launcher>) {
        let extension = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        debug!(extension = %extension, launcher = %launcher.name(), "Registering extension");
        self.extensions.insert(extension, launcher);
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty() && self.extensions.is_empty()
    }

    /// Resolve strictly as an absolute URL: scheme registration first, then, for http(s),
    /// the registered extension the URL ends with.
    pub fn resolve_url(&self, input: &str) -> Result<Resolved, ResolveError> {
        let url = Url::parse(input).map_err(|source| ResolveError::InvalidUrl {
            input: input.to_string(),
            source,
        })?;

        if let Some(launcher) = self.protocols.get(url.scheme()) {
            debug!(scheme = url.scheme(), launcher = %launcher.name(), "Resolved by scheme");
            return Ok(self.resolved(launcher, LaunchTarget::Url(url)));
        }

        if matches!(url.scheme(), "http" | "https") {
            if let Some((extension, launcher)) = longest_suffix_match(&self.extensions, input) {
                debug!(extension, launcher = %launcher.name(), "Resolved URL by extension");
                return Ok(self.resolved(launcher, LaunchTarget::Url(url)));
            }
        }

        Err(ResolveError::NoUrlLauncher(input.to_string()))
    }

    /// Resolve a local file by its extension, compared case-insensitively.
    pub fn resolve_path(&self, input: &str) -> Result<Resolved, ResolveError> {
        let file_name = Path::new(input)
            .file_name()
            .map(|name| name.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match longest_suffix_match(&self.extensions, &file_name) {
            Some((extension, launcher)) => {
                debug!(extension, launcher = %launcher.name(), "Resolved path by extension");
                Ok(self.resolved(launcher, LaunchTarget::Path(PathBuf::from(input))))
            }
            None => Err(ResolveError::NoExtensionLauncher(input.to_string())),
        }
    }

    /// Try `input` as a URL first and as a file path second.
    ///
    /// When neither works the error carries both failures, which tells a malformed URL apart
    /// from an unsupported file type.
    pub fn resolve(&self, input: &str) -> Result<Resolved, ResolveError> {
        let by_url = match self.resolve_url(input) {
            Ok(resolved) => return Ok(resolved),
            Err(err) => err,
        };
        self.resolve_path(input)
            .map_err(|by_extension| ResolveError::NotFound {
                input: input.to_string(),
                by_url: Box::new(by_url),
                by_extension: Box::new(by_extension),
            })
    }

    fn resolved(&self, launcher: &Arc<dyn Launcher>, target: LaunchTarget) -> Resolved {
        Resolved {
            launcher: Arc::clone(launcher),
            target,
        }
    }
}

/// The registered extension `input` ends with (as `.ext`); the longest one wins when
/// several match, e.g. `tar.gz` over `gz`.
fn longest_suffix_match<'a>(
    extensions: &'a BTreeMap<String, Arc<dyn Launcher>>,
    input: &str,
) -> Option<(&'a str, &'a Arc<dyn Launcher>)> {
    extensions
        .iter()
        .filter(|(extension, _)| {
            input.len() > extension.len()
                && input.ends_with(extension.as_str())
                && input[..input.len() - extension.len()].ends_with('.')
        })
        .max_by_key(|(extension, _)| extension.len())
        .map(|(extension, launcher)| (extension.as_str(), launcher))
}
