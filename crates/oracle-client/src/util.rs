//! Small helpers shared across the client layer

use std::sync::{Mutex, MutexGuard};

/// Quote an identifier for use in Oracle SQL.
///
/// Oracle folds unquoted identifiers to upper case; quoting preserves the
/// exact spelling we read from the data dictionary.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{name}\"")
}

/// Upper-case an identifier the way Oracle stores unquoted ones.
pub fn to_upper(s: &str) -> String {
    s.to_uppercase()
}

/// Lock a mutex, recovering the guard if a previous holder panicked.
///
/// The guarded structures in this crate (pool free list, caches) stay
/// consistent across panics, so poisoning never invalidates them.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("X"), "\"X\"");
        assert_eq!(quote_identifier("EMP_ID"), "\"EMP_ID\"");
        // Qualified names are built by quoting each part separately.
        let qualified = format!("{}.{}", quote_identifier("HR"), quote_identifier("EMPLOYEES"));
        assert_eq!(qualified, "\"HR\".\"EMPLOYEES\"");
    }

    #[test]
    fn test_to_upper_is_idempotent() {
        assert_eq!(to_upper("hr"), "HR");
        assert_eq!(to_upper(&to_upper("hr")), "HR");
        assert_eq!(to_upper("EMPLOYEES"), "EMPLOYEES");
    }
}
