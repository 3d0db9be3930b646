use super::{Options, OutputStreams};
use std::io;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Owns a spawned application process.
///
/// `wait` polls instead of blocking inside `Child::wait`, so the child lock is only ever held
/// briefly and `terminate` can always get in, whether the process is still running or not.
#[derive(Debug)]
pub struct Supervisor {
    program: String,
    pid: u32,
    child: Mutex<Child>,
    status: Mutex<Option<ExitStatus>>,
    output: Mutex<Option<OutputStreams>>,
}

impl Supervisor {
    /// Spawn `command` with output routed per `options`, falling back to `fallback` for
    /// streams without a handler.
    pub fn spawn(
        mut command: Command,
        options: &Options,
        fallback: impl FnMut() -> Stdio,
    ) -> io::Result<Self> {
        let program = command.get_program().to_string_lossy().to_string();
        command.stdin(Stdio::null());
        OutputStreams::configure(&mut command, options, fallback);

        let mut child = command.spawn()?;
        let pid = child.id();
        let output = match OutputStreams::spawn(&mut child, options) {
            Ok(output) => output,
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(err);
            }
        };
        info!(program = %program, pid, handlers = output.len(), "Application started");

        Ok(Supervisor {
            program,
            pid,
            child: Mutex::new(child),
            status: Mutex::new(None),
            output: Mutex::new(Some(output)),
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Non-blocking exit check; caches the status once observed.
    pub fn try_status(&self) -> io::Result<Option<ExitStatus>> {
        let mut status = lock(&self.status);
        if let Some(code) = *status {
            return Ok(Some(code));
        }
        let observed = lock(&self.child).try_wait()?;
        if let Some(code) = observed {
            info!(program = %self.program, pid = self.pid, status = %code, "Application exited");
            *status = Some(code);
        }
        Ok(observed)
    }

    /// Block until the process exits. Output handlers are not waited for.
    pub fn wait(&self) -> io::Result<ExitStatus> {
        loop {
            if let Some(status) = self.try_status()? {
                return Ok(status);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    pub fn terminate(&self) {
        match self.try_status() {
            Ok(Some(_)) => {
                debug!(pid = self.pid, "Terminate requested after exit");
                return;
            }
            Ok(None) => {}
            Err(err) => warn!(pid = self.pid, error = %err, "Unable to query process state"),
        }
        if let Err(err) = lock(&self.child).kill() {
            // Raced with a natural exit
            debug!(pid = self.pid, error = %err, "Kill failed");
        } else {
            info!(program = %self.program, pid = self.pid, "Application terminated");
        }
    }

    /// Wait for the output handlers to drain. Returns immediately on a second call.
    pub fn join_output(&self) {
        let output = lock(&self.output).take();
        if let Some(output) = output {
            output.join();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
