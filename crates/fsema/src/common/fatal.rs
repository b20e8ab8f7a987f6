//! Internal consistency failures
//!
//! These are not user errors: they fire when a query is asked something the
//! earlier passes guaranteed would never happen.

use std::fmt::Display;

/// Abort the current compilation with an internal error.
#[track_caller]
pub fn die(message: impl Display) -> ! {
    tracing::error!(%message, "internal error");
    panic!("internal error: {message}");
}

/// Unwrap a value that must be present, dying with `what` otherwise.
#[track_caller]
pub fn deref<T>(value: Option<T>, what: &str) -> T {
    match value {
        Some(value) => value,
        None => die(format_args!("missing {what}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deref_present() {
        assert_eq!(deref(Some(3), "value"), 3);
    }

    #[test]
    #[should_panic(expected = "internal error: missing module scope")]
    fn test_deref_absent_dies() {
        let _: u32 = deref(None, "module scope");
    }
}
