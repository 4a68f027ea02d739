use std::process;
use std::sync::{Mutex, MutexGuard};

/// Unrecoverable engine failure: report on stderr and terminate.
///
/// The surrounding process model reclaims resources on exit; no partial
/// teardown is attempted.
pub(crate) fn fatal(msg: &str) -> ! {
    eprintln!("system error: {msg}");
    process::exit(1);
}

/// Locks a mutex, treating poisoning as a primitive failure.
pub(crate) fn lock_or_die<'a, T>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => fatal(&format!("failed to lock {what} mutex")),
    }
}
