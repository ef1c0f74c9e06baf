//! Build tool invocation
//!
//! Runs `<program> -s <settings> <args...>` with inherited stdio and reports
//! the child's exit status unchanged. A termination signal received while the
//! child runs is forwarded to it; the run then resolves to `128 + signal` so
//! the caller still gets to clean up the settings file.
//!
//! Listeners are held in [`TerminationSignals`], which the caller installs
//! before the settings file is written. From then on SIGINT and SIGTERM no
//! longer terminate the process outright.

use miette::Diagnostic;
use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};

/// Default build tool
pub const DEFAULT_PROGRAM: &str = "mvn";

/// Flag the build tool uses for an alternate settings file
pub const SETTINGS_FLAG: &str = "-s";

/// How long a signalled child gets to exit before it is killed
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Errors raised while running the build tool
#[derive(Error, Debug, Diagnostic)]
pub enum RunError {
    /// The subprocess could not be started
    #[error("Failed to launch '{program}': {source}")]
    #[diagnostic(
        code(mvnsecrets::run::launch),
        help("Check that the build tool is installed and on PATH, or set `tool.program`")
    )]
    Launch {
        /// Program that failed to start
        program: String,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the subprocess failed
    #[error("Failed to wait for '{program}': {source}")]
    #[diagnostic(code(mvnsecrets::run::wait))]
    Wait {
        /// Program being awaited
        program: String,
        /// Underlying wait error
        #[source]
        source: std::io::Error,
    },
}

enum Finished {
    Exited(std::io::Result<ExitStatus>),
    Signalled(i32),
}

/// Spawns the build tool against a rendered settings file
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
    grace_period: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl ProcessRunner {
    /// Create a runner for the given program
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Override how long a signalled child may take to exit
    #[must_use]
    pub const fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// The program this runner launches
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the program: `-s <settings> <args...>`
    #[must_use]
    pub fn arguments(&self, settings: &Path, args: &[String]) -> Vec<OsString> {
        let mut argv = Vec::with_capacity(args.len() + 2);
        argv.push(OsString::from(SETTINGS_FLAG));
        argv.push(settings.as_os_str().to_os_string());
        argv.extend(args.iter().map(OsString::from));
        argv
    }

    /// Run the program to completion and return its exit code.
    ///
    /// A signal already pending on `signals` resolves to `128 + signal`
    /// without starting the program.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Launch`] if the program cannot be started and
    /// [`RunError::Wait`] if its status cannot be collected.
    #[tracing::instrument(name = "run_build_tool", skip_all, fields(program = %self.program))]
    pub async fn run(
        &self,
        settings: &Path,
        args: &[String],
        signals: &mut TerminationSignals,
    ) -> Result<i32, RunError> {
        if let Some(signal) = signals.pending().await {
            tracing::warn!(signal, "Termination signal received before launch");
            return Ok(128 + signal);
        }

        tracing::info!(program = %self.program, args = ?args, "Starting build tool");

        let mut child = Command::new(&self.program)
            .args(self.arguments(settings, args))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunError::Launch {
                program: self.program.clone(),
                source,
            })?;

        let finished = tokio::select! {
            status = child.wait() => Finished::Exited(status),
            signal = signals.recv() => Finished::Signalled(signal),
        };

        match finished {
            Finished::Exited(status) => {
                let status = status.map_err(|source| RunError::Wait {
                    program: self.program.clone(),
                    source,
                })?;
                let code = exit_code(status);
                tracing::info!(code, "Build tool exited");
                Ok(code)
            }
            Finished::Signalled(signal) => {
                tracing::warn!(signal, "Termination signal received, stopping build tool");
                self.terminate(&mut child, signal).await;
                Ok(128 + signal)
            }
        }
    }

    /// Forward `signal` to the child, then kill it if it outlives the grace period
    async fn terminate(&self, child: &mut Child, signal: i32) {
        forward_signal(child, signal);

        match tokio::time::timeout(self.grace_period, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(code = exit_code(status), "Build tool stopped");
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Failed to wait for signalled build tool");
            }
            Err(_) => {
                tracing::warn!(
                    grace_ms = self.grace_period.as_millis(),
                    "Build tool did not stop in time, killing it"
                );
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "Failed to kill build tool");
                }
            }
        }
    }
}

/// Exit code of a finished process; signal deaths map to `128 + signal`
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

#[cfg(unix)]
fn forward_signal(child: &Child, signal: i32) {
    let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    // SAFETY: pid belongs to a child we spawned and have not yet reaped.
    #[expect(unsafe_code, reason = "Required for POSIX signal forwarding")]
    unsafe {
        libc::kill(pid, signal);
    }
}

#[cfg(not(unix))]
fn forward_signal(_child: &Child, _signal: i32) {}

/// SIGINT and SIGTERM listeners for one run
///
/// Installing them replaces the default disposition of both signals for the
/// rest of the process lifetime.
#[derive(Debug)]
pub struct TerminationSignals {
    #[cfg(unix)]
    listeners: Option<(tokio::signal::unix::Signal, tokio::signal::unix::Signal)>,
}

impl TerminationSignals {
    /// Start listening. Must be called from within a tokio runtime.
    #[cfg(unix)]
    #[must_use]
    pub fn install() -> Self {
        use tokio::signal::unix::{SignalKind, signal};

        let listeners = match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) {
            (Ok(sigint), Ok(sigterm)) => Some((sigint, sigterm)),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Could not install signal handlers; signals will not be forwarded");
                None
            }
        };
        Self { listeners }
    }

    /// Start listening. Must be called from within a tokio runtime.
    #[cfg(not(unix))]
    #[must_use]
    pub fn install() -> Self {
        Self {}
    }

    /// Resolves with the signal number once SIGINT or SIGTERM arrives
    #[cfg(unix)]
    pub async fn recv(&mut self) -> i32 {
        let Some((sigint, sigterm)) = self.listeners.as_mut() else {
            return std::future::pending().await;
        };

        tokio::select! {
            _ = sigint.recv() => libc::SIGINT,
            _ = sigterm.recv() => libc::SIGTERM,
        }
    }

    /// Resolves with `2` once Ctrl-C arrives
    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> i32 {
        if tokio::signal::ctrl_c().await.is_err() {
            return std::future::pending().await;
        }
        2
    }

    /// A signal received since the last call, if any
    async fn pending(&mut self) -> Option<i32> {
        tokio::select! {
            biased;
            signal = self.recv() => Some(signal),
            () = std::future::ready(()) => None,
        }
    }
}
