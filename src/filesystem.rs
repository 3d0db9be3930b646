use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

/// Abstraction over the file system operations used while bootstrapping a launch.
///
/// Directory creation, settings lookup and log file handling all go through this trait so
/// tests can inject a mock instead of touching the user's configuration directory.
#[cfg_attr(test, mockall::automock)]
pub trait FileSystem {
    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if a path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Create a directory and all parent directories as needed
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Read the entire contents of a file into a string
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Open a file for appending, creating it if it does not exist
    fn open_append(&self, path: &Path) -> io::Result<File>;
}

/// Real file system implementation that delegates to std::fs
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn open_append(&self, path: &Path) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path)
    }
}
