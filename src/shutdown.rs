//! Coordinated teardown of both supervised processes.
use std::{
    thread,
    time::{Duration, Instant},
};

use nix::{
    errno::Errno,
    sys::signal::{self, Signal},
    unistd::{self, Pid},
};
use strum_macros::Display;
use tracing::{debug, error, info, warn};

use crate::{
    config::Settings,
    constants::GRACE_POLL_INTERVAL,
    state::{Role, SupervisorState},
};

/// Why the supervisor is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ShutdownCause {
    /// SIGINT; a clean, user requested stop.
    UserInterrupt,
    /// SIGTERM from whoever manages the supervisor.
    UserTerminate,
    /// One of the children exited on its own.
    ChildExited(Role),
    /// A child could not be launched after the other one was already running.
    LaunchFailed(Role),
}

impl ShutdownCause {
    /// Process exit code: only an interrupt counts as success.
    pub fn exit_code(&self) -> u8 {
        match self {
            ShutdownCause::UserInterrupt => 0,
            _ => 1,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.exit_code() != 0
    }

    fn message(&self) -> &'static str {
        match self {
            ShutdownCause::UserInterrupt => "Closed by user.",
            ShutdownCause::UserTerminate => "Killed by user.",
            ShutdownCause::ChildExited(_) => "Killed by child process.",
            ShutdownCause::LaunchFailed(_) => "Aborted after failed launch.",
        }
    }
}

/// A process the coordinator sent a signal to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalledProcess {
    pub role: Role,
    pub name: String,
    pub pid: u32,
}

/// What a shutdown did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub cause: ShutdownCause,
    /// Processes sent SIGTERM.
    pub terminated: Vec<SignalledProcess>,
    /// Processes that outlived the grace period and were sent SIGKILL.
    pub killed: Vec<SignalledProcess>,
}

/// Terminates every tracked child exactly once.
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    grace_period: Option<Duration>,
}

impl ShutdownCoordinator {
    /// `grace_period` of `None` sends SIGTERM and returns without waiting.
    pub fn new(grace_period: Option<Duration>) -> Self {
        Self { grace_period }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.grace_period)
    }

    /// Signals all tracked children.
    ///
    /// Returns `None` when a shutdown already ran, in which case nothing is
    /// signalled again.
    pub fn shutdown(
        &self,
        state: &mut SupervisorState,
        cause: ShutdownCause,
    ) -> Option<ShutdownReport> {
        if !state.begin_shutdown() {
            debug!("Shutdown already in progress; ignoring {cause}");
            return None;
        }

        if cause.is_failure() {
            warn!("{}", cause.message());
        } else {
            info!("{}", cause.message());
        }

        let mut terminated = Vec::new();
        for process in state.tracked_mut() {
            match process.try_reap() {
                Ok(Some(status)) => {
                    debug!("{} already exited ({status}); not signalling", process.name());
                    continue;
                }
                Ok(None) => {}
                Err(err) => error!("Failed to check status of {}: {err}", process.name()),
            }

            debug!("Sending SIGTERM to {} (PID {})", process.name(), process.pid());
            send_signal(process.pid(), Signal::SIGTERM, process.name());
            terminated.push(SignalledProcess {
                role: process.role(),
                name: process.name().to_string(),
                pid: process.pid(),
            });
        }

        let killed = match self.grace_period {
            Some(grace) if !terminated.is_empty() => Self::enforce_grace(state, grace),
            _ => Vec::new(),
        };

        Some(ShutdownReport {
            cause,
            terminated,
            killed,
        })
    }

    /// Waits up to `grace` for children to exit, then SIGKILLs the rest.
    fn enforce_grace(state: &mut SupervisorState, grace: Duration) -> Vec<SignalledProcess> {
        let deadline = Instant::now() + grace;

        loop {
            let all_exited = state
                .tracked_mut()
                .all(|process| matches!(process.try_reap(), Ok(Some(_))));
            if all_exited {
                return Vec::new();
            }
            if Instant::now() >= deadline {
                break;
            }
            thread::sleep(GRACE_POLL_INTERVAL);
        }

        let mut killed = Vec::new();
        for process in state.tracked_mut() {
            if matches!(process.try_reap(), Ok(Some(_))) {
                continue;
            }

            warn!(
                "{} did not exit within {grace:?} after SIGTERM; sending SIGKILL",
                process.name()
            );
            send_signal(process.pid(), Signal::SIGKILL, process.name());
            killed.push(SignalledProcess {
                role: process.role(),
                name: process.name().to_string(),
                pid: process.pid(),
            });
        }
        killed
    }
}

/// Signals the child's process group, falling back to the PID alone.
fn send_signal(pid: u32, sig: Signal, name: &str) {
    let pid = Pid::from_raw(pid as i32);

    let own_group = unistd::getpgrp();
    if let Ok(pgid) = unistd::getpgid(Some(pid))
        && pgid == pid
        && pgid != own_group
    {
        match signal::killpg(pgid, sig) {
            Ok(()) | Err(Errno::ESRCH) => return,
            Err(err) => {
                warn!("Failed to signal process group {pgid} of {name}: {err}. Falling back to direct signal")
            }
        }
    }

    match signal::kill(pid, sig) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(err) => error!("Failed to send {sig} to {name} (PID {pid}): {err}"),
    }
}
