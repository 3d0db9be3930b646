use crate::filesystem::FileSystem;
use std::env;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable that relocates the configuration root (used by tests and portable installs).
pub const HOME_ENV: &str = "WEBLAUNCH_HOME";

const VENDOR_DIR: &str = "Weblaunch";
const CACHE_DIR: &str = "cache";
const LOG_DIR: &str = "log";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub name: String,
    pub title: String,
    pub version: String,
    pub vendor: String,
}

impl Product {
    pub fn current() -> Self {
        Product {
            name: env!("CARGO_PKG_NAME").to_string(),
            title: "Weblaunch".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            vendor: VENDOR_DIR.to_string(),
        }
    }

    pub fn banner(&self) -> String {
        format!("{} {}", self.title, self.version)
    }
}

/// Directories and files a launch works with, all created on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub config_dir: PathBuf,
    pub work_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_file: PathBuf,
}

impl Workspace {
    pub fn layout(root: &Path, product: &Product) -> Self {
        let config_dir = root.join(&product.vendor).join(&product.title);
        let work_dir = config_dir.join(CACHE_DIR);
        let log_dir = config_dir.join(LOG_DIR);
        let log_file = log_dir.join(format!("{}.log", product.name));
        Workspace {
            config_dir,
            work_dir,
            log_dir,
            log_file,
        }
    }

    /// Create the product directories if absent and open (or create) the log file.
    pub fn prepare<F: FileSystem>(
        fs: &F,
        root: &Path,
        product: &Product,
    ) -> io::Result<(Self, File)> {
        let workspace = Self::layout(root, product);
        for dir in [&workspace.config_dir, &workspace.work_dir, &workspace.log_dir] {
            create_product_dir(fs, dir)?;
        }
        let log = fs.open_append(&workspace.log_file)?;
        Ok((workspace, log))
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }
}

fn create_product_dir<F: FileSystem>(fs: &F, dir: &Path) -> io::Result<()> {
    if fs.is_dir(dir) {
        return Ok(());
    }
    debug!(dir = %dir.display(), "Creating product directory");
    fs.create_dir_all(dir)
}

/// The directory the vendor folder lives under.
pub fn config_root() -> io::Result<PathBuf> {
    if let Some(home) = env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    dirs_next::config_dir().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "unable to determine the user configuration directory",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::{MockFileSystem, RealFileSystem};
    use tempfile::TempDir;

    fn product() -> Product {
        Product {
            name: "weblaunch".to_string(),
            title: "Weblaunch".to_string(),
            version: "1.2.3".to_string(),
            vendor: "Vendor".to_string(),
        }
    }

    #[test]
    fn test_layout() {
        let workspace = Workspace::layout(Path::new("/cfg"), &product());
        assert_eq!(workspace.config_dir, PathBuf::from("/cfg/Vendor/Weblaunch"));
        assert_eq!(workspace.work_dir, PathBuf::from("/cfg/Vendor/Weblaunch/cache"));
        assert_eq!(
            workspace.log_file,
            PathBuf::from("/cfg/Vendor/Weblaunch/log/weblaunch.log")
        );
        assert_eq!(
            workspace.settings_file(),
            PathBuf::from("/cfg/Vendor/Weblaunch/settings.json")
        );
    }

    #[test]
    fn test_prepare_creates_directories_and_log() {
        let temp = TempDir::new().unwrap();
        let (workspace, _log) = Workspace::prepare(&RealFileSystem, temp.path(), &product()).unwrap();

        assert!(workspace.work_dir.is_dir());
        assert!(workspace.log_dir.is_dir());
        assert!(workspace.log_file.is_file());
    }

    #[test]
    fn test_prepare_skips_existing_directories() {
        let temp = TempDir::new().unwrap();
        let log_target = temp.path().join("mock.log");
        let mut mock_fs = MockFileSystem::new();

        mock_fs.expect_is_dir().returning(|_| true);
        mock_fs.expect_create_dir_all().never();
        mock_fs
            .expect_open_append()
            .withf(|path| path == Path::new("/cfg/Vendor/Weblaunch/log/weblaunch.log"))
            .times(1)
            .returning(move |_| RealFileSystem.open_append(&log_target));

        assert!(Workspace::prepare(&mock_fs, Path::new("/cfg"), &product()).is_ok());
    }

    #[test]
    fn test_prepare_propagates_directory_failure() {
        let mut mock_fs = MockFileSystem::new();
        mock_fs.expect_is_dir().returning(|_| false);
        mock_fs.expect_create_dir_all().returning(|_| {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        });
        mock_fs.expect_open_append().never();

        let err = Workspace::prepare(&mock_fs, Path::new("/cfg"), &product()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }
}
