use std::fs::File;
use std::io;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// Events go to the product log file when one is open, otherwise to stderr. Standard output
/// is never used because it carries native messaging frames in bridge mode.
pub fn setup_logging(log_file: Option<File>, verbose: bool, json_format: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let writer = match log_file {
        Some(file) => BoxMakeWriter::new(Mutex::new(file)),
        None => BoxMakeWriter::new(io::stderr),
    };

    if json_format {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_ansi(false).with_writer(writer))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(writer))
            .with(env_filter)
            .init();
    }
}
