//! Helpers for tests that touch process environment.

/// Restores an environment variable to its prior value on drop.
pub struct EnvGuard {
    key: &'static str,
    prev: Option<String>,
}

impl EnvGuard {
    /// Sets `key` until the guard drops. Use only from `#[serial(env)]` tests.
    #[must_use]
    pub fn set(key: &'static str, val: &str) -> Self {
        let prev = std::env::var(key).ok();
        // SAFETY: callers serialize env mutation with `#[serial(env)]`
        unsafe { std::env::set_var(key, val) };
        Self { key, prev }
    }

    /// Unsets `key` until the guard drops. Use only from `#[serial(env)]` tests.
    #[must_use]
    pub fn remove(key: &'static str) -> Self {
        let prev = std::env::var(key).ok();
        // SAFETY: callers serialize env mutation with `#[serial(env)]`
        unsafe { std::env::remove_var(key) };
        Self { key, prev }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: the guard lives inside a `#[serial(env)]` test
        match self.prev.take() {
            Some(v) => unsafe { std::env::set_var(self.key, v) },
            None => unsafe { std::env::remove_var(self.key) },
        }
    }
}
