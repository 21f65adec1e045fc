/// Panics in debug builds, logs an error in release builds.
///
/// Used for structural invariant violations that should never happen in correct operation,
/// but must not take down a release build's render thread.
#[macro_export]
macro_rules! debug_panic {
    ($($arg:tt)*) => {
        if cfg!(debug_assertions) {
            panic!($($arg)*);
        } else {
            $crate::tracing::error!($($arg)*);
        }
    };
}
