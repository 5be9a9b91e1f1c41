use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TdmError>;

/// Every failure the pipeline can surface.
/// None of them is recovered locally; the whole run is expected to be redone.
#[derive(Debug, Error)]
pub enum TdmError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// corpus line with fewer than three space separated fields
    #[error("malformed corpus line {line_no}: expected `<bill_id> <field> <text...>`, got {content:?}")]
    MalformedLine { line_no: usize, content: String },

    #[error("malformed token record at line {line_no}: {reason}")]
    MalformedRecord { line_no: usize, reason: String },

    #[error("pruning removed every term ({before} before, no_below={no_below}, no_above={no_above})")]
    VocabularyExhausted {
        before: usize,
        no_below: u64,
        no_above: f64,
    },

    #[error("corpus stream yielded {found} documents but {declared} were declared")]
    CountMismatch { declared: usize, found: usize },

    #[error("column {column} holds {found:?} but the label list expects {expected:?}")]
    LabelMismatch {
        column: usize,
        expected: String,
        found: String,
    },

    #[error("dictionary is frozen; no more documents can be observed")]
    DictionaryFrozen,

    #[error("dictionary must be pruned before it is used for vectors")]
    DictionaryNotFrozen,

    #[error("dictionary was already pruned")]
    AlreadyPruned,

    #[error("term id {id} is outside the declared term count {num_terms}")]
    TermOutOfRange { id: usize, num_terms: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to encode artifact: {0}")]
    Encode(#[source] serde_cbor::Error),

    #[error("failed to decode artifact {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_cbor::Error,
    },

    #[error("failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid sparse matrix structure: {0}")]
    Matrix(String),
}

impl TdmError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TdmError::Io {
            path: path.into(),
            source,
        }
    }
}
