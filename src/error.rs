//! Error handling for tandem.
use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::state::Role;

/// Defines all fatal conditions the supervisor can run into.
///
/// Transient probe failures never show up here: they are retried by the
/// readiness prober and only ever observed as continued blocking.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Error reading or accessing the configuration file.
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        /// Path of the configuration file.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: io::Error,
    },

    /// Error parsing YAML configuration.
    #[error("Invalid YAML format: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// The configuration parsed but holds an unusable value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration references an environment variable that is not set.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// A template could not be opened or read in full.
    #[error("Failed to read template {path}: {source}")]
    TemplateRead {
        /// Path of the template file.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: io::Error,
    },

    /// A rendered configuration could not be written.
    #[error("Failed to write rendered config {path}: {source}")]
    TemplateWrite {
        /// Destination path of the rendered configuration.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: io::Error,
    },

    /// The log directory could not be created.
    #[error("Failed to ensure log directory {path}: {source}")]
    LogDir {
        /// Directory that should exist.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: io::Error,
    },

    /// The OS could not create the child process.
    #[error("Failed to start {role} process '{name}': {source}")]
    Spawn {
        /// Role of the process that failed to start.
        role: Role,
        /// Configured process name.
        name: String,
        /// The underlying error that occurred.
        #[source]
        source: io::Error,
    },

    /// The probe connection could not even be constructed.
    #[error("Failed to create probe socket for {endpoint}: {source}")]
    ProbeSocket {
        /// Readiness endpoint being probed.
        endpoint: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: io::Error,
    },

    /// Bounded probing gave up before the endpoint became reachable.
    #[error("{endpoint} not reachable after {attempts} attempts ({interval:?} apart)")]
    ProbeTimeout {
        /// Readiness endpoint being probed.
        endpoint: PathBuf,
        /// Number of connection attempts made.
        attempts: u32,
        /// Pause between attempts.
        interval: Duration,
    },

    /// Installing the signal handlers failed.
    #[error("Failed to install signal handlers: {0}")]
    SignalInstall(#[source] io::Error),
}
