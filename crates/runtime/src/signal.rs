//! SIGINT cancellation flag.
//!
//! Provides a safe, flag-based approach: the signal handler does nothing
//! but set an atomic flag (async-signal-safe), and the REPL polls it at
//! line boundaries -- never mid-evaluation, since a flag flipped inside a
//! partially-mutated environment would leave no sound place to resume.

#[cfg(unix)]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(unix)]
use std::sync::Arc;

#[cfg(unix)]
static GOT_SIGINT: std::sync::OnceLock<Arc<AtomicBool>> = std::sync::OnceLock::new();

/// Install the SIGINT handler once per process. Later calls are no-ops.
#[cfg(unix)]
pub fn install() {
    GOT_SIGINT.get_or_init(|| {
        let flag = Arc::new(AtomicBool::new(false));
        if let Err(err) = signal_hook::flag::register(signal_hook::consts::SIGINT, flag.clone()) {
            tracing::warn!(%err, "failed to install SIGINT handler");
        }
        flag
    });
}

/// Check whether a SIGINT arrived since the last check, clearing the flag.
#[cfg(unix)]
pub fn take_sigint() -> bool {
    match GOT_SIGINT.get() {
        Some(flag) => flag.swap(false, Ordering::SeqCst),
        None => false,
    }
}

#[cfg(not(unix))]
pub fn install() {}

#[cfg(not(unix))]
pub fn take_sigint() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_pending_signal_by_default() {
        install();
        assert!(!take_sigint());
    }
}
