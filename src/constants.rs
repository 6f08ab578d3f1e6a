//! Default values for the supervised pair.
//!
//! The defaults describe the classic PHP-FPM behind nginx deployment. Every
//! value can be overridden from the configuration file.

use std::time::Duration;

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "tandem.yaml";

/// Placeholder replaced with the endpoint path inside both templates.
pub const DEFAULT_TOKEN: &str = "{{php-fpm.sock}}";

/// Socket the independent process listens on once it is ready.
pub const DEFAULT_ENDPOINT: &str = "/tmp/php-fpm.sock";

/// Pause between two readiness probe attempts.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(250);

/// Cadence of the liveness monitor.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_millis(500);

/// How often the coordinator re-checks children during a grace period.
pub const GRACE_POLL_INTERVAL: Duration = Duration::from_millis(50);

// ============================================================================
// Independent process (PHP-FPM)
// ============================================================================

pub const DEFAULT_INDEPENDENT_NAME: &str = "php-fpm";
pub const DEFAULT_INDEPENDENT_COMMAND: &str = "/usr/sbin/php-fpm";
pub const DEFAULT_INDEPENDENT_TEMPLATE: &str = "php-fpm.conf";
pub const DEFAULT_INDEPENDENT_CONFIG: &str = "/tmp/php-fpm.conf";

/// Arguments passed to the independent process; `-y` takes the rendered config.
pub fn default_independent_args() -> Vec<String> {
    ["-F", "-y", DEFAULT_INDEPENDENT_CONFIG, "-R"]
        .iter()
        .map(|arg| arg.to_string())
        .collect()
}

// ============================================================================
// Dependent process (nginx)
// ============================================================================

pub const DEFAULT_DEPENDENT_NAME: &str = "nginx";
pub const DEFAULT_DEPENDENT_COMMAND: &str = "/usr/sbin/nginx";
pub const DEFAULT_DEPENDENT_TEMPLATE: &str = "nginx.conf";
pub const DEFAULT_DEPENDENT_CONFIG: &str = "/tmp/nginx.conf";

/// Arguments passed to the dependent process; `-c` takes the rendered config.
pub fn default_dependent_args() -> Vec<String> {
    ["-c", DEFAULT_DEPENDENT_CONFIG]
        .iter()
        .map(|arg| arg.to_string())
        .collect()
}
