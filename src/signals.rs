//! Hands inbound termination signals over to the control thread.
//!
//! The handler thread never touches process handles. It only turns the signal
//! into a [`ShutdownCause`] and drops it into a single-slot channel the
//! control thread drains between polls.
use std::{
    sync::mpsc::{self, Receiver, SyncSender, TrySendError},
    thread::{self, JoinHandle},
};

use signal_hook::{
    consts::signal::{SIGINT, SIGTERM},
    iterator::{Handle, Signals},
};
use tracing::{debug, info};

use crate::{error::SupervisorError, shutdown::ShutdownCause};

/// Creates the single-slot notification channel.
pub fn channel() -> (SyncSender<ShutdownCause>, Receiver<ShutdownCause>) {
    mpsc::sync_channel(1)
}

/// Maps an inbound signal to the shutdown it requests.
pub fn cause_for(signal: i32) -> Option<ShutdownCause> {
    match signal {
        SIGINT => Some(ShutdownCause::UserInterrupt),
        SIGTERM => Some(ShutdownCause::UserTerminate),
        _ => None,
    }
}

/// Posts `cause` without blocking. A full slot means a shutdown is already
/// pending, so the newer request is dropped.
pub fn notify(sender: &SyncSender<ShutdownCause>, cause: ShutdownCause) {
    match sender.try_send(cause) {
        Ok(()) => {}
        Err(TrySendError::Full(cause)) => {
            debug!("Shutdown already pending; ignoring {cause}");
        }
        Err(TrySendError::Disconnected(_)) => {}
    }
}

/// Background thread listening for SIGINT and SIGTERM.
pub struct SignalListener {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
    events: Receiver<ShutdownCause>,
}

impl SignalListener {
    /// Installs the handlers and starts forwarding signals.
    pub fn install() -> Result<Self, SupervisorError> {
        let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(SupervisorError::SignalInstall)?;
        let handle = signals.handle();
        let (sender, events) = channel();

        let thread = thread::Builder::new()
            .name("tandem-signals".into())
            .spawn(move || {
                for signal in signals.forever() {
                    if let Some(cause) = cause_for(signal) {
                        info!("Received signal {signal}");
                        notify(&sender, cause);
                    }
                }
            })
            .map_err(SupervisorError::SignalInstall)?;

        Ok(Self {
            handle,
            thread: Some(thread),
            events,
        })
    }

    /// Receiving end of the notification channel.
    pub fn events(&self) -> &Receiver<ShutdownCause> {
        &self.events
    }
}

impl Drop for SignalListener {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn signals_map_to_causes() {
        assert_eq!(cause_for(SIGINT), Some(ShutdownCause::UserInterrupt));
        assert_eq!(cause_for(SIGTERM), Some(ShutdownCause::UserTerminate));
        assert_eq!(cause_for(signal_hook::consts::signal::SIGHUP), None);
    }

    #[test]
    fn slot_keeps_only_the_first_request() {
        let (sender, events) = channel();
        notify(&sender, ShutdownCause::UserInterrupt);
        notify(&sender, ShutdownCause::UserTerminate);

        assert_eq!(events.try_recv().unwrap(), ShutdownCause::UserInterrupt);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn raised_signal_reaches_the_channel() {
        let listener = SignalListener::install().unwrap();
        nix::sys::signal::raise(nix::sys::signal::SIGTERM).unwrap();

        let cause = listener
            .events()
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        assert_eq!(cause, ShutdownCause::UserTerminate);
    }
}
