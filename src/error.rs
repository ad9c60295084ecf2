use thiserror::Error;

/// Failure modes of zero-copy tree construction. Key lookup misses and
/// duplicate inserts are ordinary return values, never errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("buffer of {actual} bytes is too small, need at least {expected}")]
    BufferTooSmall { actual: usize, expected: usize },
    #[error("buffer is misaligned for the tree layout")]
    BufferMisaligned,
}
