use thiserror::Error;

/// Errors that abort a conversion outright.
///
/// Localised input defects (bad signatures, oversized records, zlib failures)
/// are not represented here; the converter recovers from those in place and
/// counts them in [`Stats`](crate::Stats).
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The input is not a big-endian TES4-family master file.
    #[error("not an Xbox 360 master file: {reason}")]
    FormatMismatch { reason: String },

    /// A header extends past the end of the input buffer.
    #[error("truncated file: need {needed} bytes at offset {offset:#x}, only {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Resync exhausted the input before a single group could be written:
    /// no GRUP signature exists past the corruption, and the output holds
    /// nothing beyond the file header.
    #[error("no GRUP signature found after offset {offset:#x} and no group written; conversion abandoned")]
    UnrecoverableCorruption { offset: usize },
}

pub type Result<T> = std::result::Result<T, ConvertError>;
