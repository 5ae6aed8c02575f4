//! Termination Signal Handling
//!
//! Listens for SIGINT and SIGTERM so a running pipeline can stop waiting
//! on its steps.
//!
//! tokio keeps its process-wide handler installed for good once a signal
//! has been registered, which would leave the process ignoring SIGINT and
//! SIGTERM after a run. Installing a listener therefore records the host's
//! dispositions, and dropping the last live listener puts them back. A later
//! listener reinstates tokio's handler.

use std::fmt;
use std::io;

use log::debug;

/// Identity of a termination signal received from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// SIGINT (Ctrl-C)
    Interrupt,
    /// SIGTERM
    Terminate,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => write!(f, "interrupt"),
            Self::Terminate => write!(f, "terminated"),
        }
    }
}

/// Registered listener for SIGINT and SIGTERM.
///
/// Host signal handling is restored when the last listener is dropped.
#[cfg(unix)]
pub struct TerminationSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    /// Registers the process for SIGINT and SIGTERM delivery.
    ///
    /// Must be called from within a tokio runtime.
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let listener = disposition::acquire(|| {
            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        })?;
        debug!("Listening for SIGINT and SIGTERM");

        Ok(listener)
    }

    /// Waits for the next termination signal.
    pub async fn recv(&mut self) -> Signal {
        tokio::select! {
            _ = self.interrupt.recv() => Signal::Interrupt,
            _ = self.terminate.recv() => Signal::Terminate,
        }
    }
}

#[cfg(unix)]
impl Drop for TerminationSignals {
    fn drop(&mut self) {
        disposition::release();
    }
}

/// Process-wide bookkeeping of SIGINT/SIGTERM dispositions.
#[cfg(unix)]
pub(crate) mod disposition {
    use std::io;
    use std::mem::MaybeUninit;
    use std::ptr;
    use std::sync::{Mutex, PoisonError};

    use log::{debug, warn};

    const SIGNALS: [libc::c_int; 2] = [libc::SIGINT, libc::SIGTERM];

    type Actions = [libc::sigaction; 2];

    struct State {
        listeners: usize,
        /// Dispositions in place before the first live listener
        host: Option<Actions>,
        /// tokio's handlers, captured the first time they were installed
        runtime: Option<Actions>,
    }

    static STATE: Mutex<State> = Mutex::new(State {
        listeners: 0,
        host: None,
        runtime: None,
    });

    fn query(signum: libc::c_int) -> io::Result<libc::sigaction> {
        let mut action = MaybeUninit::<libc::sigaction>::uninit();
        // Safety: a null new action only reads the current disposition.
        let ret = unsafe { libc::sigaction(signum, ptr::null(), action.as_mut_ptr()) };
        if ret == 0 {
            Ok(unsafe { action.assume_init() })
        } else {
            Err(io::Error::last_os_error())
        }
    }

    fn query_all() -> io::Result<Actions> {
        Ok([query(SIGNALS[0])?, query(SIGNALS[1])?])
    }

    fn apply_all(actions: &Actions) -> io::Result<()> {
        for (signum, action) in SIGNALS.iter().zip(actions) {
            // Safety: `action` was read back from sigaction for this signal.
            let ret = unsafe { libc::sigaction(*signum, action, ptr::null_mut()) };
            if ret != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }

    /// Runs `register` as one more live listener.
    pub(crate) fn acquire<T>(register: impl FnOnce() -> io::Result<T>) -> io::Result<T> {
        let mut state = STATE.lock().unwrap_or_else(PoisonError::into_inner);
        let first = state.listeners == 0;

        if first {
            state.host = Some(query_all()?);
        }

        let registered = register()?;
        state.listeners += 1;

        if first {
            let runtime = state.runtime;
            let reinstated = match runtime {
                Some(runtime) => apply_all(&runtime),
                None => query_all().map(|runtime| state.runtime = Some(runtime)),
            };
            if let Err(e) = reinstated {
                // Dropping the listener releases it, which needs the lock.
                drop(state);
                drop(registered);
                return Err(e);
            }
        }

        Ok(registered)
    }

    /// Drops one live listener, restoring the host dispositions after the last.
    pub(crate) fn release() {
        let mut state = STATE.lock().unwrap_or_else(PoisonError::into_inner);
        state.listeners = state.listeners.saturating_sub(1);
        if state.listeners > 0 {
            return;
        }

        if let Some(host) = state.host.take() {
            match apply_all(&host) {
                Ok(()) => debug!("Restored host handling of SIGINT and SIGTERM"),
                Err(e) => warn!("Failed to restore SIGINT/SIGTERM handling: {}", e),
            }
        }
    }

    /// Current handler address of `signum`.
    #[cfg(test)]
    pub(crate) fn handler(signum: libc::c_int) -> libc::sighandler_t {
        query(signum).map_or(libc::SIG_ERR, |action| action.sa_sigaction)
    }

    /// Serializes tests that install listeners or send signals to this process.
    #[cfg(test)]
    pub(crate) fn serial() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: Mutex<()> = Mutex::new(());
        LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(not(unix))]
pub struct TerminationSignals;

#[cfg(not(unix))]
impl TerminationSignals {
    pub fn install() -> io::Result<Self> {
        debug!("Listening for Ctrl-C");
        Ok(Self)
    }

    pub async fn recv(&mut self) -> Signal {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Signal::Interrupt,
            Err(_) => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_display() {
        assert_eq!(Signal::Interrupt.to_string(), "interrupt");
        assert_eq!(Signal::Terminate.to_string(), "terminated");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_install_listener() {
        let _serial = disposition::serial();
        assert!(TerminationSignals::install().is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_drop_restores_host_disposition() {
        let _serial = disposition::serial();
        let host = disposition::handler(libc::SIGTERM);

        let listener = TerminationSignals::install().unwrap();
        assert_ne!(disposition::handler(libc::SIGTERM), host);

        drop(listener);
        assert_eq!(disposition::handler(libc::SIGTERM), host);
        assert_eq!(disposition::handler(libc::SIGINT), libc::SIG_DFL);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reinstall_after_release() {
        let _serial = disposition::serial();

        drop(TerminationSignals::install().unwrap());
        assert_eq!(disposition::handler(libc::SIGTERM), libc::SIG_DFL);

        let listener = TerminationSignals::install().unwrap();
        assert_ne!(disposition::handler(libc::SIGTERM), libc::SIG_DFL);
        assert_ne!(disposition::handler(libc::SIGINT), libc::SIG_DFL);
        drop(listener);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_last_listener_restores() {
        let _serial = disposition::serial();

        let first = TerminationSignals::install().unwrap();
        let second = TerminationSignals::install().unwrap();

        drop(first);
        assert_ne!(disposition::handler(libc::SIGTERM), libc::SIG_DFL);

        drop(second);
        assert_eq!(disposition::handler(libc::SIGTERM), libc::SIG_DFL);
    }
}
