//! Starts the supervised processes.
use std::{
    ops::ControlFlow,
    os::unix::process::CommandExt,
    process::{Command, Stdio},
    time::Duration,
};

use tracing::{debug, error, info};

use crate::{
    config::ProcessSpec,
    error::SupervisorError,
    probe::Prober,
    state::{Role, SupervisedProcess, SupervisorState},
};

/// Spawns `spec` and records it in `state` before returning its PID.
///
/// The child gets its own process group so the supervisor can signal it (and
/// anything it forks) without touching its own group. On Linux the child is
/// also sent `SIGTERM` should the supervisor die without cleaning up.
pub fn launch(state: &mut SupervisorState, spec: &ProcessSpec) -> Result<u32, SupervisorError> {
    info!("Starting {}...", spec.name);
    debug!(
        "Launching {} process '{}': {:?} {:?}",
        spec.role, spec.name, spec.command, spec.args
    );

    let mut cmd = Command::new(&spec.command);
    cmd.args(&spec.args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    unsafe {
        cmd.pre_exec(|| {
            if libc::setpgid(0, 0) < 0 {
                return Err(std::io::Error::last_os_error());
            }

            #[cfg(target_os = "linux")]
            {
                use libc::{PR_SET_PDEATHSIG, SIGTERM, prctl};
                if prctl(PR_SET_PDEATHSIG, SIGTERM, 0, 0, 0) < 0 {
                    return Err(std::io::Error::last_os_error());
                }
            }

            Ok(())
        });
    }

    match cmd.spawn() {
        Ok(child) => {
            let mut process = SupervisedProcess::new(spec.role, &spec.name, child);
            if spec.role == Role::Independent {
                process = process.with_endpoint(state.endpoint());
            }

            let pid = state.record(process);
            debug!("{} started with PID: {pid}", spec.name);
            Ok(pid)
        }
        Err(source) => {
            error!("Failed to start {}: {source}", spec.name);
            Err(SupervisorError::Spawn {
                role: spec.role,
                name: spec.name.clone(),
                source,
            })
        }
    }
}

/// Waits for the independent process's endpoint, then launches `spec`.
///
/// `pause` runs between probe attempts with access to the state, so it can
/// keep an eye on the already running children. Returns `Break` without
/// spawning anything if `pause` stops the probe.
pub fn await_dependency_then_launch<B, F>(
    state: &mut SupervisorState,
    prober: &Prober,
    spec: &ProcessSpec,
    mut pause: F,
) -> Result<ControlFlow<B, u32>, SupervisorError>
where
    F: FnMut(&mut SupervisorState, Duration) -> ControlFlow<B>,
{
    let probed = prober.wait_until_reachable_with(|interval| pause(state, interval))?;
    match probed {
        ControlFlow::Continue(_) => launch(state, spec).map(ControlFlow::Continue),
        ControlFlow::Break(reason) => {
            debug!("Probe interrupted; {} will not be started", spec.name);
            Ok(ControlFlow::Break(reason))
        }
    }
}
