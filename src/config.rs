//! Configuration management for tandem.
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::Duration,
};

use regex::Regex;
use serde::Deserialize;

use crate::{constants::*, error::SupervisorError, state::Role};

/// Represents the structure of the configuration file.
///
/// Every field is optional; anything left out falls back to the defaults in
/// [`crate::constants`].
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Socket path of the independent process. Also the value substituted for the token.
    pub endpoint: Option<String>,
    /// Placeholder token replaced inside both templates.
    pub token: Option<String>,
    /// Directory that must exist before the dependent process starts.
    pub log_dir: Option<String>,
    /// Readiness probe tuning.
    pub probe: ProbeConfig,
    /// Liveness monitor tuning.
    pub monitor: MonitorConfig,
    /// Shutdown tuning.
    pub shutdown: ShutdownConfig,
    /// The process that has to be reachable first.
    pub independent: ProcessConfig,
    /// The process launched once the independent one is reachable.
    pub dependent: ProcessConfig,
    /// Root directory from which relative template paths are resolved.
    #[serde(skip)]
    pub project_dir: Option<PathBuf>,
}

/// Readiness probe section.
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    /// Pause between attempts (e.g. "250ms").
    pub interval: Option<String>,
    /// Give up after this many attempts. Unset means retry forever.
    pub max_attempts: Option<u32>,
}

/// Liveness monitor section.
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Poll interval (e.g. "500ms").
    pub interval: Option<String>,
}

/// Shutdown section.
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct ShutdownConfig {
    /// How long children get to exit after SIGTERM before SIGKILL. Unset means
    /// the supervisor exits right after signalling.
    pub grace_period: Option<String>,
}

/// Configuration for one of the two supervised processes.
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessConfig {
    /// Human readable name used in log lines.
    pub name: Option<String>,
    /// Absolute path of the executable.
    pub command: Option<String>,
    /// Fixed argument vector.
    pub args: Option<Vec<String>>,
    /// Template read before launch.
    pub template: Option<String>,
    /// Destination of the rendered configuration.
    pub config: Option<String>,
}

/// Fully resolved settings the supervisor runs with.
#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: PathBuf,
    pub token: String,
    pub log_dir: Option<PathBuf>,
    pub probe_interval: Duration,
    pub probe_max_attempts: Option<u32>,
    pub monitor_interval: Duration,
    pub grace_period: Option<Duration>,
    pub independent: ProcessSpec,
    pub dependent: ProcessSpec,
}

/// Fixed command line and config files of one supervised process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub role: Role,
    pub name: String,
    pub command: PathBuf,
    pub args: Vec<String>,
    pub template: PathBuf,
    pub config: PathBuf,
}

impl Settings {
    /// Returns the spec for the given role.
    pub fn spec(&self, role: Role) -> &ProcessSpec {
        match role {
            Role::Independent => &self.independent,
            Role::Dependent => &self.dependent,
        }
    }
}

impl Config {
    /// Validates the configuration and fills in defaults.
    pub fn settings(&self) -> Result<Settings, SupervisorError> {
        let base = self
            .project_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));

        let token = self.token.as_deref().unwrap_or(DEFAULT_TOKEN).to_string();
        if token.is_empty() {
            return Err(config_error("token cannot be empty"));
        }

        let endpoint = PathBuf::from(self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT));
        if endpoint.as_os_str().is_empty() {
            return Err(config_error("endpoint cannot be empty"));
        }

        let probe_interval = optional_duration(self.probe.interval.as_deref())?
            .unwrap_or(DEFAULT_PROBE_INTERVAL);
        let monitor_interval = optional_duration(self.monitor.interval.as_deref())?
            .unwrap_or(DEFAULT_MONITOR_INTERVAL);
        if probe_interval.is_zero() || monitor_interval.is_zero() {
            return Err(config_error("probe and monitor intervals must be non-zero"));
        }

        if self.probe.max_attempts == Some(0) {
            return Err(config_error("probe.max_attempts must be at least 1"));
        }

        Ok(Settings {
            endpoint,
            token,
            log_dir: self.log_dir.as_deref().map(PathBuf::from),
            probe_interval,
            probe_max_attempts: self.probe.max_attempts,
            monitor_interval,
            grace_period: optional_duration(self.shutdown.grace_period.as_deref())?,
            independent: self.independent.resolve(Role::Independent, &base)?,
            dependent: self.dependent.resolve(Role::Dependent, &base)?,
        })
    }
}

impl ProcessConfig {
    fn resolve(&self, role: Role, base: &Path) -> Result<ProcessSpec, SupervisorError> {
        let (name, command, args, template, config) = match role {
            Role::Independent => (
                DEFAULT_INDEPENDENT_NAME,
                DEFAULT_INDEPENDENT_COMMAND,
                default_independent_args as fn() -> Vec<String>,
                DEFAULT_INDEPENDENT_TEMPLATE,
                DEFAULT_INDEPENDENT_CONFIG,
            ),
            Role::Dependent => (
                DEFAULT_DEPENDENT_NAME,
                DEFAULT_DEPENDENT_COMMAND,
                default_dependent_args as fn() -> Vec<String>,
                DEFAULT_DEPENDENT_TEMPLATE,
                DEFAULT_DEPENDENT_CONFIG,
            ),
        };

        let command = self.command.as_deref().unwrap_or(command);
        if command.trim().is_empty() {
            return Err(config_error(format!("{role}.command cannot be empty")));
        }

        let template = Path::new(self.template.as_deref().unwrap_or(template));
        let template = if template.is_absolute() {
            template.to_path_buf()
        } else {
            base.join(template)
        };

        Ok(ProcessSpec {
            role,
            name: self.name.as_deref().unwrap_or(name).to_string(),
            command: PathBuf::from(command),
            args: self.args.clone().unwrap_or_else(args),
            template,
            config: PathBuf::from(self.config.as_deref().unwrap_or(config)),
        })
    }
}

fn config_error(message: impl Into<String>) -> SupervisorError {
    SupervisorError::InvalidConfig(message.into())
}

fn optional_duration(raw: Option<&str>) -> Result<Option<Duration>, SupervisorError> {
    raw.map(parse_duration).transpose()
}

/// Parses a user-facing duration string in the format `<number>[ms|s|m|h]`.
pub fn parse_duration(raw: &str) -> Result<Duration, SupervisorError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(config_error("Duration value cannot be empty"));
    }

    let invalid = || config_error(format!("Invalid duration value: '{raw}'"));

    if let Some(stripped) = value.strip_suffix("ms") {
        let amount: u64 = stripped.trim().parse().map_err(|_| invalid())?;
        return Ok(Duration::from_millis(amount));
    }

    let (amount_str, multiplier) = if let Some(stripped) = value.strip_suffix('s') {
        (stripped.trim(), 1)
    } else if let Some(stripped) = value.strip_suffix('m') {
        (stripped.trim(), 60)
    } else if let Some(stripped) = value.strip_suffix('h') {
        (stripped.trim(), 3600)
    } else {
        (value, 1)
    };

    let amount: u64 = amount_str.parse().map_err(|_| invalid())?;
    Ok(Duration::from_secs(amount.saturating_mul(multiplier)))
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?").expect("env var pattern is valid")
    })
}

/// Expands environment variables within a string.
fn expand_env_vars(input: &str) -> Result<String, SupervisorError> {
    let mut missing = None;
    let result = env_var_pattern().replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        env::var(var_name).unwrap_or_else(|_| {
            missing.get_or_insert_with(|| var_name.to_string());
            String::new()
        })
    });

    match missing {
        Some(name) => Err(SupervisorError::MissingEnvVar(name)),
        None => Ok(result.into_owned()),
    }
}

/// Loads and parses the configuration file, expanding environment variables.
///
/// Without an explicit path, `tandem.yaml` in the working directory is used if
/// present and the built-in defaults otherwise.
pub fn load_config(config_path: Option<&str>) -> Result<Config, SupervisorError> {
    let config_path = match config_path {
        Some(path) => Path::new(path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => Path::new(DEFAULT_CONFIG_FILE),
        None => {
            return Ok(Config {
                project_dir: Some(PathBuf::from(".")),
                ..Config::default()
            });
        }
    };

    let content =
        fs::read_to_string(config_path).map_err(|source| SupervisorError::ConfigRead {
            path: config_path.to_path_buf(),
            source,
        })?;

    let expanded_content = expand_env_vars(&content)?;

    // An empty document deserializes as unit, not as an empty map.
    let mut config: Config = if expanded_content.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(&expanded_content)?
    };

    let base_path = config_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    config.project_dir = Some(base_path);
    Ok(config)
}
