/// This crate turns a corpus of bill texts into a bigram term-document matrix.
pub mod config;
pub mod error;
pub mod pipeline;
pub mod tokenizer;
pub mod vectorizer;

/// Error type of the crate
/// Every variant is fatal for a run; the pipeline is meant to be rerun from
/// scratch after any failure.
pub use error::{Result, TdmError};

/// Pipeline configuration
/// Deserializable from TOML; every field has a default.
/// - `tokenizer`: n-gram order, lemmatization, stopword source
/// - `prune`: `no_below`, `no_above`, optional `keep_n`
/// - `weighting`: TF-IDF toggle and L2 normalization
pub use config::PipelineConfig;

/// Two-pass pipeline
/// Pass 1 tokenizes the corpus, spills n-grams to the intermediate token file
/// and accumulates the dictionary. After pruning, pass 2 replays the token
/// file and assembles the matrix. Artifacts are written at the end.
pub use pipeline::{ArtifactPaths, Pipeline, PipelineReport};

/// Tokenizer
/// Cleans raw text, analyzes it into surface or lemma forms, removes
/// stopwords, optionally stems, and emits n-grams lazily.
/// The analyzer and stemmer are pluggable capabilities.
pub use tokenizer::{Analyzer, NGrams, StopWords, Stemmer, Tokenizer};

/// Dictionary (vocabulary builder)
/// Maps n-grams to dense ids and tracks document frequencies.
/// Accumulates during pass 1, is pruned exactly once, then is read-only.
pub use vectorizer::dictionary::Dictionary;

/// Token Frequency structure
/// Occurrence counts of the n-grams of one document, in first-seen order.
pub use vectorizer::token::TokenFrequency;

/// Corpus Stream
/// Restartable lazy sequence of document vectors read back from the
/// intermediate token file; every pass opens its own handle.
pub use vectorizer::corpus::{CorpusStream, DocVector};

/// TF IDF Calculation Engine Trait
/// Plug a different weighting scheme into `TfidfModel<N, E>`.
/// `DefaultTFIDFEngine` uses `tf = count` and `idf = log2(N / df)`.
pub use vectorizer::tfidf::{DefaultTFIDFEngine, TFIDFEngine, TfidfModel, Weighting};

/// Matrix Assembler
/// Builds a compressed-sparse-column matrix (terms x documents) from a
/// corpus stream and checks the declared shape.
pub use vectorizer::matrix::{MatrixAssembler, TermDocumentMatrix};
