//! Liveness monitoring of the two children.
use std::{
    process::ExitStatus,
    sync::mpsc::{Receiver, RecvTimeoutError},
    thread,
    time::Duration,
};

use tracing::{debug, error, warn};

use crate::{
    config::Settings,
    shutdown::{ShutdownCause, ShutdownCoordinator},
    state::{Role, SupervisorState},
};

/// States of the monitor loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Both children alive; polling.
    Running,
    /// The first child seen dead. The other one is not waited for.
    ChildExited { role: Role, status: ExitStatus },
    /// Shutdown requested; the coordinator runs and the loop stops.
    Terminal(ShutdownCause),
}

/// Polls both children at a fixed interval. Never restarts anything.
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    interval: Duration,
}

impl LivenessMonitor {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.monitor_interval)
    }

    /// One non-blocking pass over the tracked children.
    pub fn poll(&self, state: &mut SupervisorState) -> MonitorState {
        for process in state.tracked_mut() {
            match process.try_reap() {
                Ok(Some(status)) => {
                    return MonitorState::ChildExited {
                        role: process.role(),
                        status,
                    };
                }
                Ok(None) => debug!("{} is still running.", process.name()),
                Err(e) => error!("Failed to check status of {}: {e}", process.name()),
            }
        }
        MonitorState::Running
    }

    /// Computes the next state. Only `Running` waits, and only for up to one
    /// interval on the signal channel.
    pub fn step(
        &self,
        current: MonitorState,
        state: &mut SupervisorState,
        events: &Receiver<ShutdownCause>,
    ) -> MonitorState {
        match current {
            MonitorState::Running => {
                let observed = self.poll(state);
                if observed != MonitorState::Running {
                    return observed;
                }

                match events.recv_timeout(self.interval) {
                    Ok(cause) => MonitorState::Terminal(cause),
                    Err(RecvTimeoutError::Timeout) => MonitorState::Running,
                    Err(RecvTimeoutError::Disconnected) => {
                        thread::sleep(self.interval);
                        MonitorState::Running
                    }
                }
            }
            MonitorState::ChildExited { role, status } => {
                let name = state
                    .process(role)
                    .map(|process| process.name().to_string())
                    .unwrap_or_else(|| role.to_string());
                warn!("{name} crashed ({status}).");
                MonitorState::Terminal(ShutdownCause::ChildExited(role))
            }
            MonitorState::Terminal(cause) => MonitorState::Terminal(cause),
        }
    }

    /// Runs until a child exits or a signal arrives, then hands over to the
    /// coordinator. Returns the cause that ended supervision.
    pub fn watch(
        &self,
        state: &mut SupervisorState,
        events: &Receiver<ShutdownCause>,
        coordinator: &ShutdownCoordinator,
    ) -> ShutdownCause {
        let mut current = MonitorState::Running;
        loop {
            current = self.step(current, state, events);
            if let MonitorState::Terminal(cause) = current {
                coordinator.shutdown(state, cause);
                return cause;
            }
        }
    }
}
