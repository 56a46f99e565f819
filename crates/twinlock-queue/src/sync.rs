//! Lock, condition variable and atomic primitives used by the queue.
//!
//! Regular builds use `parking_lot`. With the `loom` feature the same surface
//! is backed by `loom::sync` so the wake-up handshake can be model-checked.

#[cfg(not(feature = "loom"))]
pub(crate) use parking_lot::{Condvar, Mutex};
#[cfg(not(feature = "loom"))]
pub(crate) use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[cfg(feature = "loom")]
pub(crate) use self::loom_shim::{Condvar, Mutex};
#[cfg(feature = "loom")]
pub(crate) use loom::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[cfg(feature = "loom")]
mod loom_shim {
    use std::ops::{Deref, DerefMut};
    use std::sync::PoisonError;

    /// `parking_lot`-shaped wrapper: `lock()` returns the guard directly.
    pub(crate) struct Mutex<T>(loom::sync::Mutex<T>);

    impl<T> Mutex<T> {
        pub(crate) fn new(value: T) -> Self {
            Self(loom::sync::Mutex::new(value))
        }

        pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
            MutexGuard(Some(
                self.0.lock().unwrap_or_else(PoisonError::into_inner),
            ))
        }
    }

    // The inner guard is only vacated for the duration of `Condvar::wait`.
    pub(crate) struct MutexGuard<'a, T>(Option<loom::sync::MutexGuard<'a, T>>);

    impl<T> Deref for MutexGuard<'_, T> {
        type Target = T;

        fn deref(&self) -> &T {
            match self.0.as_deref() {
                Some(value) => value,
                None => unreachable!("mutex guard observed mid-wait"),
            }
        }
    }

    impl<T> DerefMut for MutexGuard<'_, T> {
        fn deref_mut(&mut self) -> &mut T {
            match self.0.as_deref_mut() {
                Some(value) => value,
                None => unreachable!("mutex guard observed mid-wait"),
            }
        }
    }

    pub(crate) struct Condvar(loom::sync::Condvar);

    impl Condvar {
        pub(crate) fn new() -> Self {
            Self(loom::sync::Condvar::new())
        }

        pub(crate) fn wait<T>(&self, guard: &mut MutexGuard<'_, T>) {
            if let Some(inner) = guard.0.take() {
                guard.0 = Some(self.0.wait(inner).unwrap_or_else(PoisonError::into_inner));
            }
        }

        pub(crate) fn notify_one(&self) {
            self.0.notify_one();
        }
    }
}
