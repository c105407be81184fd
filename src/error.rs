use thiserror::Error;

/// Errors produced while building, training, or persisting an LDA model.
#[derive(Error, Debug)]
pub enum LdaError {
    /// An invalid model configuration, rejected at construction.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A shape invariant was violated (e.g. mismatched lengths).
    #[error("shape mismatch for {what}: got {got}, expected {expected}")]
    ShapeMismatch {
        /// Which array or dimension disagreed (e.g. "alpha", "word_top rows").
        what: &'static str,
        got: usize,
        expected: usize,
    },

    /// The corpus does not define the requested context type.
    #[error("unknown context type: {0}")]
    UnknownContextType(String),

    /// An archive could not be read or written.
    #[error("archive io error: {0}")]
    ArchiveIo(#[from] std::io::Error),

    /// An archive decoded, but its contents are not a valid model state.
    #[error("archive format error: {0}")]
    ArchiveFormat(String),

    /// The sampling conditional degenerated (non-finite or empty mass).
    #[error("numerical error: {0}")]
    Numerical(String),
}

pub type Result<T> = std::result::Result<T, LdaError>;

impl From<serde_cbor::Error> for LdaError {
    fn from(e: serde_cbor::Error) -> Self {
        LdaError::ArchiveFormat(e.to_string())
    }
}
