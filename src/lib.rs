//! Tandem supervises a backend process and the front-end proxy that depends on
//! it. Both configs are rendered from templates, the backend is started first,
//! the proxy follows once the backend's socket accepts connections, and the
//! death of either one (or an interrupt/terminate signal) tears both down.

/// CLI interface.
pub mod cli;

/// Configuration management.
pub mod config;

/// Default values.
pub mod constants;

/// Error handling.
pub mod error;

/// Process launching in dependency order.
pub mod launcher;

/// Liveness monitoring.
pub mod monitor;

/// Readiness probing.
pub mod probe;

/// Coordinated shutdown.
pub mod shutdown;

/// Signal handoff to the control thread.
pub mod signals;

/// Supervisor state bookkeeping.
pub mod state;

/// Top-level supervisor loop.
pub mod supervisor;

/// Config templating.
pub mod template;
