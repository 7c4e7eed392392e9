use thiserror::Error;

/// Failure taxonomy shared by every registry operation.
///
/// Only `NotFound` is ever downgraded to a non-error result, and only
/// by the operations documented as best-effort (existence checks,
/// idempotent deletes). Everything else propagates unchanged; this
/// layer never logs-and-swallows and never retries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegError {
    /// The first segment of a raw path is not a known root alias.
    #[error("unrecognized registry root '{0}'")]
    UnrecognizedRoot(String),

    /// The native store reported that the key or value does not exist.
    #[error("registry key or value not found: {0}")]
    NotFound(String),

    /// Any other native failure, carrying the raw OS code for
    /// diagnostics (permission denied, key has subkeys, resource
    /// limits, ...).
    #[error("registry operation on {context} failed with os error {code}")]
    StoreFailure { code: i32, context: String },

    /// A payload with no type-inference rule was written without an
    /// explicit type, or an explicit type does not fit the payload.
    #[error("no registry value type fits this payload")]
    UnsupportedValueType,
}

impl RegError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
