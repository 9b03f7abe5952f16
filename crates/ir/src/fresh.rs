//! Fresh names and identifiers
//!
//! A process-wide counter backing register renaming and push
//! identifiers. The backend is single-threaded; the counter is atomic
//! only so it can live in a `static`. Each pass resets it on entry so
//! generated programs are deterministic, which also means passes are not
//! reentrant.

use crate::ir::Register;
use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Reset the counter. Called on entry to each pass.
pub fn reset() {
    COUNTER.store(0, Ordering::Relaxed);
}

/// The next fresh identifier.
pub fn next_id() -> usize {
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A register name derived from `base`, distinct from every name the
/// current pass has produced. Upstream emission never uses the `_<n>`
/// suffix form, so the result is also distinct from source registers.
pub fn register(base: &str) -> Register {
    format!("{}_{}", base, next_id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_reset_restarts_numbering() {
        reset();
        let a = register("r");
        reset();
        let b = register("r");
        assert_eq!(a, b);
        assert_eq!(a, "r_0");
    }

    #[test]
    #[serial]
    fn test_ids_are_distinct_between_resets() {
        reset();
        let ids: Vec<usize> = (0..4).map(|_| next_id()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }
}
