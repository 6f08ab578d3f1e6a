//! Drives the full lifecycle: configure, launch in order, monitor, tear down.
use std::{
    ops::ControlFlow,
    sync::mpsc::{Receiver, RecvTimeoutError},
    thread,
    time::Duration,
};

use tracing::{debug, info};

use crate::{
    config::Settings,
    error::SupervisorError,
    launcher,
    monitor::{LivenessMonitor, MonitorState},
    probe::Prober,
    shutdown::{ShutdownCause, ShutdownCoordinator},
    state::{Role, SupervisorState},
    template,
};

/// Owns the supervisor state for the lifetime of the process.
pub struct Supervisor {
    settings: Settings,
    state: SupervisorState,
    prober: Prober,
    monitor: LivenessMonitor,
    coordinator: ShutdownCoordinator,
}

impl Supervisor {
    pub fn new(settings: Settings) -> Self {
        Self {
            state: SupervisorState::new(&settings.endpoint),
            prober: Prober::from_settings(&settings),
            monitor: LivenessMonitor::from_settings(&settings),
            coordinator: ShutdownCoordinator::from_settings(&settings),
            settings,
        }
    }

    pub fn state(&self) -> &SupervisorState {
        &self.state
    }

    /// Runs until a signal arrives on `events` or a child dies.
    ///
    /// Returns the cause, whose exit code the caller should exit with. Errors
    /// are fatal; any child already running has been signalled by then.
    pub fn run(
        &mut self,
        events: &Receiver<ShutdownCause>,
    ) -> Result<ShutdownCause, SupervisorError> {
        template::configure_all(&self.settings)?;

        if let Ok(cause) = events.try_recv() {
            return Ok(self.finish(cause));
        }

        launcher::launch(&mut self.state, &self.settings.independent)?;

        let monitor = &self.monitor;
        let launched = launcher::await_dependency_then_launch(
            &mut self.state,
            &self.prober,
            &self.settings.dependent,
            |state, interval| Self::pause_while_probing(monitor, state, events, interval),
        );

        match launched {
            Ok(ControlFlow::Continue(pid)) => {
                debug!("Both processes running; dependent PID {pid}");
            }
            Ok(ControlFlow::Break(cause)) => return Ok(self.finish(cause)),
            Err(err) => {
                self.finish(ShutdownCause::LaunchFailed(Role::Dependent));
                return Err(err);
            }
        }

        info!(
            "Supervising {} and {}",
            self.settings.independent.name, self.settings.dependent.name
        );
        Ok(self.monitor.watch(&mut self.state, events, &self.coordinator))
    }

    /// Between probe attempts: stop on a signal or if the independent process
    /// died before it ever became reachable.
    fn pause_while_probing(
        monitor: &LivenessMonitor,
        state: &mut SupervisorState,
        events: &Receiver<ShutdownCause>,
        interval: Duration,
    ) -> ControlFlow<ShutdownCause> {
        let observed = monitor.poll(state);
        if matches!(observed, MonitorState::ChildExited { .. })
            && let MonitorState::Terminal(cause) = monitor.step(observed, state, events)
        {
            return ControlFlow::Break(cause);
        }

        match events.recv_timeout(interval) {
            Ok(cause) => ControlFlow::Break(cause),
            Err(RecvTimeoutError::Timeout) => ControlFlow::Continue(()),
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(interval);
                ControlFlow::Continue(())
            }
        }
    }

    fn finish(&mut self, cause: ShutdownCause) -> ShutdownCause {
        self.coordinator.shutdown(&mut self.state, cause);
        cause
    }
}
