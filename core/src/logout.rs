//! Logout-suppression gate.
//!
//! A shared flag raised while the user is intentionally ending their session.
//! While it is up, every unauthorized error is swallowed rather than shown,
//! including 401s from unrelated requests that happen to be in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable handle to one logout flag. All clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct LogoutGate {
    flag: Arc<AtomicBool>,
}

impl LogoutGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_logging_out(&self, value: bool) {
        self.flag.store(value, Ordering::SeqCst);
    }

    pub fn is_logging_out(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Raise the flag until the returned guard is dropped.
    pub fn begin(&self) -> LogoutGuard {
        self.set_logging_out(true);
        LogoutGuard { gate: self.clone() }
    }
}

/// Clears the logout flag when dropped, whether the logout succeeded or not.
#[derive(Debug)]
pub struct LogoutGuard {
    gate: LogoutGate,
}

impl Drop for LogoutGuard {
    fn drop(&mut self) {
        self.gate.set_logging_out(false);
    }
}
