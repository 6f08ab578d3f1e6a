//! Readiness probing of the independent process's local socket.
use std::{
    convert::Infallible,
    io,
    ops::ControlFlow,
    os::unix::net::UnixStream,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use tracing::{debug, info, warn};

use crate::{config::Settings, error::SupervisorError};

/// Connects to a unix socket until it accepts a connection.
#[derive(Debug, Clone)]
pub struct Prober {
    endpoint: PathBuf,
    interval: Duration,
    max_attempts: Option<u32>,
}

impl Prober {
    /// A prober that retries forever.
    pub fn new(endpoint: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            interval,
            max_attempts: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.endpoint, settings.probe_interval)
            .with_max_attempts(settings.probe_max_attempts)
    }

    /// Bounds the number of attempts; exhausting them is a `ProbeTimeout`.
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn endpoint(&self) -> &Path {
        &self.endpoint
    }

    /// Makes one connection attempt and closes the connection straight away.
    ///
    /// `Ok(false)` means the endpoint is not accepting connections yet.
    pub fn try_connect(&self) -> Result<bool, SupervisorError> {
        match UnixStream::connect(&self.endpoint) {
            Ok(stream) => {
                drop(stream);
                Ok(true)
            }
            Err(err) if is_fatal(&err) => Err(SupervisorError::ProbeSocket {
                endpoint: self.endpoint.clone(),
                source: err,
            }),
            Err(err) => {
                debug!("Probe of {:?} failed: {err}", self.endpoint);
                Ok(false)
            }
        }
    }

    /// Blocks until the endpoint is reachable, sleeping between attempts.
    ///
    /// Without `max_attempts` this never gives up. Returns the number of
    /// attempts it took.
    pub fn wait_until_reachable(&self) -> Result<u32, SupervisorError> {
        let outcome = self.wait_until_reachable_with(|interval| {
            thread::sleep(interval);
            ControlFlow::<Infallible>::Continue(())
        })?;

        match outcome {
            ControlFlow::Continue(attempts) => Ok(attempts),
            ControlFlow::Break(never) => match never {},
        }
    }

    /// Like [`Prober::wait_until_reachable`] with a caller supplied pause.
    ///
    /// The pause runs between attempts and may stop probing by returning
    /// `Break`, which is passed back to the caller untouched.
    pub fn wait_until_reachable_with<B, F>(
        &self,
        mut pause: F,
    ) -> Result<ControlFlow<B, u32>, SupervisorError>
    where
        F: FnMut(Duration) -> ControlFlow<B>,
    {
        info!("Connecting to {:?}...", self.endpoint);
        let mut attempts = 0u32;

        loop {
            attempts = attempts.saturating_add(1);
            if self.try_connect()? {
                info!(
                    "{:?} is ready for incoming requests ({attempts} attempt(s))",
                    self.endpoint
                );
                return Ok(ControlFlow::Continue(attempts));
            }

            if let Some(max) = self.max_attempts
                && attempts >= max
            {
                return Err(SupervisorError::ProbeTimeout {
                    endpoint: self.endpoint.clone(),
                    attempts,
                    interval: self.interval,
                });
            }

            if attempts == 1 {
                warn!("Connection to {:?} failed; retrying...", self.endpoint);
            }

            if let ControlFlow::Break(reason) = pause(self.interval) {
                return Ok(ControlFlow::Break(reason));
            }
        }
    }
}

/// Errors meaning a socket could not even be created, as opposed to "nobody
/// is listening yet".
fn is_fatal(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::InvalidInput {
        return true;
    }

    matches!(
        err.raw_os_error(),
        Some(
            libc::EMFILE
                | libc::ENFILE
                | libc::ENOBUFS
                | libc::ENOMEM
                | libc::EAFNOSUPPORT
                | libc::EPROTONOSUPPORT
        )
    )
}
