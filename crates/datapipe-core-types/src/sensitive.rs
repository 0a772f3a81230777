//! Redacting wrapper for secrets carried through plugin contexts
//!
//! Publisher and subscriber contexts hold the API token used to talk to the
//! pipeline. Wrapping it in `Sensitive` keeps it out of `{:?}` dumps of the
//! context, which end up in tracing fields more often than anyone intends.

use std::fmt;

const REDACTED: &str = "***REDACTED***";

/// A value whose `Debug` and `Display` output is always redacted
///
/// # Example
///
/// ```
/// use datapipe_core_types::Sensitive;
///
/// let token = Sensitive::new("bearer-abc123".to_string());
/// assert_eq!(format!("{:?}", token), "***REDACTED***");
/// assert_eq!(token.expose(), "bearer-abc123");
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the secret. Call sites should be rare and obvious.
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Sensitive<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}
