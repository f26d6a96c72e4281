//! Error types for puzzle generation.

/// Errors raised before a puzzle is generated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PuzzleError {
    /// The requested piece count is outside the configured range.
    #[error("target piece count {target} outside allowed range {min}..={max}")]
    PieceCountOutOfRange { target: u32, min: u32, max: u32 },

    /// The image has no area, so there is nothing to cut.
    #[error("image has zero size ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}
