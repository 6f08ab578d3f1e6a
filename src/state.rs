//! Bookkeeping for the two supervised children.
use std::{
    path::{Path, PathBuf},
    process::{Child, ExitStatus},
    sync::atomic::{AtomicBool, Ordering},
};

use strum_macros::{AsRefStr, Display, EnumString};

/// Which side of the single dependency edge a process sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    /// Started first; owns the readiness endpoint.
    Independent,
    /// Started once the independent process is reachable.
    Dependent,
}

/// A child process owned by the supervisor.
#[derive(Debug)]
pub struct SupervisedProcess {
    role: Role,
    name: String,
    child: Child,
    endpoint: Option<PathBuf>,
    exit: Option<ExitStatus>,
}

impl SupervisedProcess {
    pub fn new(role: Role, name: impl Into<String>, child: Child) -> Self {
        Self {
            role,
            name: name.into(),
            child,
            endpoint: None,
            exit: None,
        }
    }

    /// Attaches the endpoint the process advertises once it is ready.
    pub fn with_endpoint(mut self, endpoint: impl Into<PathBuf>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn endpoint(&self) -> Option<&Path> {
        self.endpoint.as_deref()
    }

    /// Exit status, once the process has been reaped.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit
    }

    /// Non-blocking exit check. Reaps the child and remembers its status on exit.
    pub fn try_reap(&mut self) -> std::io::Result<Option<ExitStatus>> {
        if let Some(status) = self.exit {
            return Ok(Some(status));
        }

        let status = self.child.try_wait()?;
        if status.is_some() {
            self.exit = status;
        }
        Ok(status)
    }
}

/// Process-wide supervisor state.
///
/// Handles are written once at launch and only read or reaped afterwards by
/// the monitor and the shutdown coordinator.
#[derive(Debug)]
pub struct SupervisorState {
    endpoint: PathBuf,
    independent: Option<SupervisedProcess>,
    dependent: Option<SupervisedProcess>,
    shutdown_initiated: AtomicBool,
}

impl SupervisorState {
    pub fn new(endpoint: impl Into<PathBuf>) -> Self {
        Self {
            endpoint: endpoint.into(),
            independent: None,
            dependent: None,
            shutdown_initiated: AtomicBool::new(false),
        }
    }

    /// The resolved readiness endpoint.
    pub fn endpoint(&self) -> &Path {
        &self.endpoint
    }

    /// Records a freshly launched process under its role and returns its PID.
    pub fn record(&mut self, process: SupervisedProcess) -> u32 {
        let pid = process.pid();
        let slot = match process.role() {
            Role::Independent => &mut self.independent,
            Role::Dependent => &mut self.dependent,
        };
        *slot = Some(process);
        pid
    }

    pub fn process(&self, role: Role) -> Option<&SupervisedProcess> {
        match role {
            Role::Independent => self.independent.as_ref(),
            Role::Dependent => self.dependent.as_ref(),
        }
    }

    /// Tracked processes in launch order.
    pub fn tracked_mut(&mut self) -> impl Iterator<Item = &mut SupervisedProcess> {
        self.independent
            .iter_mut()
            .chain(self.dependent.iter_mut())
    }

    /// Marks shutdown as started. Returns `false` if it already was.
    pub fn begin_shutdown(&self) -> bool {
        !self.shutdown_initiated.swap(true, Ordering::SeqCst)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }
}
