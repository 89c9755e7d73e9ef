/// Helper macro for locking items, propagating poisoning as [`crate::Error::LockError`]
///
/// ```rust, ignore
///  let mut collector = lock!(shared)?;
///  collector.jump("br")?;
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock.lock().map_err(|_| crate::Error::LockError)
    };
}

/// Helper macro for running a closure on a locked item
///
/// ```rust, ignore
///  let state = with_lock!(shared, |collector| collector.symbolic_state())?;
/// ```
macro_rules! with_lock {
    ($lock:expr, $closure:expr) => {{
        // The guard must drop before the block's value leaves it.
        let result = match $lock.lock() {
            Ok(mut guard) => Ok($closure(&mut *guard)),
            Err(_) => Err(crate::Error::LockError),
        };
        result
    }};
}
