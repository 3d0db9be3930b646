use super::{OutputHandler, Options};
use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn name(self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

/// Threads forwarding a child's output to the handlers from `Options`.
///
/// Dropping this detaches the threads; `join` waits for every handler to see end of stream.
#[derive(Debug, Default)]
pub struct OutputStreams {
    handles: Vec<(Stream, JoinHandle<()>)>,
}

impl OutputStreams {
    /// Point the command's stdout/stderr at pipes for each configured handler, and at
    /// `fallback` (usually the log file) otherwise.
    pub fn configure(
        command: &mut Command,
        options: &Options,
        mut fallback: impl FnMut() -> Stdio,
    ) {
        if options.stdout_handler.is_some() {
            command.stdout(Stdio::piped());
        } else {
            command.stdout(fallback());
        }
        if options.stderr_handler.is_some() {
            command.stderr(Stdio::piped());
        } else {
            command.stderr(fallback());
        }
    }

    /// Hand each piped stream to its handler on a dedicated thread.
    ///
    /// Never calls a handler on the current thread, so a handler that blocks cannot hold up
    /// the caller supervising the child.
    pub fn spawn(child: &mut Child, options: &Options) -> io::Result<Self> {
        let mut streams = OutputStreams::default();
        if let (Some(handler), Some(pipe)) = (&options.stdout_handler, child.stdout.take()) {
            streams.start(Stream::Stdout, handler.clone(), Box::new(pipe))?;
        }
        if let (Some(handler), Some(pipe)) = (&options.stderr_handler, child.stderr.take()) {
            streams.start(Stream::Stderr, handler.clone(), Box::new(pipe))?;
        }
        Ok(streams)
    }

    fn start(
        &mut self,
        stream: Stream,
        handler: OutputHandler,
        pipe: Box<dyn Read + Send>,
    ) -> io::Result<()> {
        let handle = thread::Builder::new()
            .name(format!("output-{}", stream.name()))
            .spawn(move || {
                debug!(stream = stream.name(), "Output handler started");
                handler(pipe);
                debug!(stream = stream.name(), "Output handler finished");
            })?;
        self.handles.push((stream, handle));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every handler to return.
    pub fn join(self) {
        for (stream, handle) in self.handles {
            if handle.join().is_err() {
                warn!(stream = stream.name(), "Output handler panicked");
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::BufRead;
    use std::io::BufReader;
    use std::sync::mpsc;
    use std::sync::Arc;

    fn collecting_handler(tx: mpsc::Sender<String>) -> OutputHandler {
        let tx = std::sync::Mutex::new(tx);
        Arc::new(move |pipe: Box<dyn Read + Send>| {
            let lines: Vec<String> = BufReader::new(pipe).lines().map_while(Result::ok).collect();
            let _ = tx.lock().unwrap().send(lines.join("\n"));
        })
    }

    #[test]
    fn test_handlers_receive_their_own_stream() {
        let (out_tx, out_rx) = mpsc::channel();
        let (err_tx, err_rx) = mpsc::channel();
        let options = Options {
            stdout_handler: Some(collecting_handler(out_tx)),
            stderr_handler: Some(collecting_handler(err_tx)),
            ..Options::default()
        };

        let mut command = Command::new("sh");
        command.args(["-c", "echo out; echo err 1>&2"]);
        OutputStreams::configure(&mut command, &options, Stdio::null);
        let mut child = command.spawn().unwrap();
        let streams = OutputStreams::spawn(&mut child, &options).unwrap();
        assert_eq!(streams.len(), 2);

        child.wait().unwrap();
        streams.join();
        assert_eq!(out_rx.recv().unwrap(), "out");
        assert_eq!(err_rx.recv().unwrap(), "err");
    }

    #[test]
    fn test_no_handlers_no_threads() {
        let options = Options::default();
        let mut command = Command::new("sh");
        command.args(["-c", "echo ignored"]);
        OutputStreams::configure(&mut command, &options, Stdio::null);
        let mut child = command.spawn().unwrap();

        let streams = OutputStreams::spawn(&mut child, &options).unwrap();
        assert!(streams.is_empty());
        assert!(child.stdout.is_none());
        child.wait().unwrap();
    }
}
