use thiserror::Error;

/// Structured error taxonomy for the restoration core.
///
/// Every fallible public operation returns `Result<T, RestorationError>`.
/// Numeric degeneracies that still have a sensible fallback value (zero
/// correlation, unit gain, ...) are not represented here — they are
/// handled inline and surfaced through a result's `Diagnostics` instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RestorationError {
    /// Shape/size/ordering/uniformity violation, or an out-of-range
    /// parameter (negative wavelength, non-positive step, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A curve element (or list of elements) fails the invariants of the
    /// curve-geometry data model.
    #[error("invalid curve geometry: {0}")]
    GeometryError(String),

    /// A computation hit a degenerate numeric state it could not recover
    /// a meaningful answer from even with the documented fallbacks (e.g.
    /// an empty search region).
    #[error("numeric degeneracy: {0}")]
    NumericDegenerate(String),
}

pub type Result<T> = std::result::Result<T, RestorationError>;
