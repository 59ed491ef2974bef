//! RAII guards for mutating environment variables in tests.
//!
//! Every mutation takes a global re-entrant mutex for the duration of the
//! set or remove operation and returns a guard that restores the prior
//! state on drop. Guards for the same key stack and restore in LIFO order.
//! Tests that need exclusive access across several operations should hold
//! [`lock`] for their duration.
//!
//! # Examples
//!
//! ```
//! use test_helpers::env;
//!
//! let _guard = env::set_var("KEY", "VALUE");
//! // `KEY` is set to `VALUE` until the guard drops.
//! ```

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::env;
use std::ffi::{OsStr, OsString};
use std::sync::LazyLock;

static ENV_MUTEX: LazyLock<ReentrantMutex<()>> = LazyLock::new(ReentrantMutex::default);

/// RAII guard restoring an environment variable to its prior value on drop.
#[must_use = "dropping restores the prior value"]
pub struct EnvVarGuard {
    key: String,
    original: Option<OsString>,
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        let _lock = ENV_MUTEX.lock();
        match self.original.take() {
            // SAFETY: the global mutex serialises all environment mutation
            // performed through this module.
            Some(value) => unsafe { env::set_var(&self.key, value) },
            None => unsafe { env::remove_var(&self.key) },
        }
    }
}

fn mutate<F>(key: String, mutator: F) -> EnvVarGuard
where
    F: FnOnce(&str),
{
    let _lock = ENV_MUTEX.lock();
    let original = env::var_os(&key);
    mutator(&key);
    EnvVarGuard { key, original }
}

/// Sets an environment variable and returns a guard restoring its prior
/// value.
pub fn set_var<K, V>(key: K, value: V) -> EnvVarGuard
where
    K: Into<String>,
    V: AsRef<OsStr>,
{
    // SAFETY: serialised by the global mutex held inside `mutate`.
    mutate(key.into(), |k| unsafe { env::set_var(k, value.as_ref()) })
}

/// Removes an environment variable and returns a guard restoring its prior
/// value.
pub fn remove_var<K>(key: K) -> EnvVarGuard
where
    K: Into<String>,
{
    // SAFETY: serialised by the global mutex held inside `mutate`.
    mutate(key.into(), |k| unsafe { env::remove_var(k) })
}

/// Holds the global environment mutex for the guard's lifetime.
///
/// Use when a test performs several reads and writes that must not
/// interleave with other tests' environment mutations.
#[must_use = "dropping releases the environment lock"]
pub fn lock() -> ReentrantMutexGuard<'static, ()> {
    ENV_MUTEX.lock()
}
