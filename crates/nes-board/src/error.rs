//! Crate error type.

use thiserror::Error;

use crate::state::Tag;

/// Errors reported by board construction and save-state loading.
///
/// Everything else in the crate is deliberately non-fatal: oversized images
/// are truncated, invalid writes are dropped, and unknown state chunks are
/// skipped, all with a diagnostic through `log`.
#[derive(Debug, Error)]
pub enum Error {
    /// The cartridge names a mapper the descriptor table has no entry (or no
    /// constructor) for. Fatal to the load, not to the process.
    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u16),

    /// A state stream ended in the middle of a chunk header or payload.
    #[error("state stream truncated at offset {0}")]
    Truncated(usize),

    /// A recognized chunk carried a payload the loader could not accept.
    #[error("malformed `{0}` chunk: {1}")]
    BadChunk(Tag, &'static str),

    /// A run-compressed payload did not decode to its declared length.
    #[error("compressed payload decoded to {actual} bytes, expected {expected}")]
    BadRunData { expected: usize, actual: usize },
}
