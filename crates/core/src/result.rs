//! Result type definition and extension traits for Railway-Oriented Programming.
//!
//! Per-item failures (one unreadable log file, one unresolvable bucket) are
//! turned into logged `None`s so a run always finishes with a report.

use crate::error::Error;

/// The standard Result type for bucket-audit operations.
///
/// # Examples
///
/// ```ignore
/// fn load() -> Result<AuditConfig> {
///     let config = AuditConfig::load(Some(path), std::env::vars())?;
///     config.validate()?;
///     Ok(config)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait providing skip-and-continue combinators for Results.
pub trait ResultExt<T> {
    /// Convert a Result to an Option, logging the error as a warning.
    ///
    /// `item` names the file or bucket the operation was scoped to.
    fn into_option_logged(self, item: &str) -> Option<T>;

    /// Inspect the error without consuming the Result.
    #[must_use]
    fn inspect_error<F: FnOnce(&Error)>(self, f: F) -> Self;
}

impl<T> ResultExt<T> for Result<T> {
    fn into_option_logged(self, item: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(item, error = %e, "Skipping after failure");
                None
            }
        }
    }

    fn inspect_error<F: FnOnce(&Error)>(self, f: F) -> Self {
        if let Err(ref e) = self {
            f(e);
        }
        self
    }
}
