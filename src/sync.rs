#[cfg(feature = "loom")]
mod imp {
    pub(crate) use loom::{
        sync::{Condvar, Mutex, MutexGuard},
        thread::JoinHandle,
    };
    use core::time::Duration;

    /// Loom threads are anonymous; the name only feeds the std builder.
    pub(crate) fn spawn_worker<F>(_name: String, f: F) -> std::io::Result<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        Ok(loom::thread::spawn(f))
    }

    /// Loom cannot model wall-clock time, so every pause becomes a yield point.
    pub(crate) fn pause(_: Duration) {
        loom::thread::yield_now();
    }
}

#[cfg(not(feature = "loom"))]
mod imp {
    use core::time::Duration;
    pub(crate) use std::{
        sync::{Condvar, Mutex, MutexGuard},
        thread::JoinHandle,
    };

    pub(crate) fn spawn_worker<F>(name: String, f: F) -> std::io::Result<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        std::thread::Builder::new().name(name).spawn(f)
    }

    pub(crate) fn pause(duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

pub(crate) use imp::*;
use std::sync::PoisonError;

/// Locks `mutex`, recovering the guard if another thread panicked while
/// holding it. Every critical section in this crate leaves its state
/// consistent before any call that may panic.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Blocks on `condvar`, with the same poison recovery as [`lock`].
pub(crate) fn wait<'a, T>(condvar: &Condvar, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
    condvar.wait(guard).unwrap_or_else(PoisonError::into_inner)
}
