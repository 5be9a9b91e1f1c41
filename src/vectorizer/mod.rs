pub mod corpus;
pub mod dictionary;
pub mod matrix;
pub mod serde;
pub mod tfidf;
pub mod token;

pub use corpus::{CorpusStream, DocVector};
pub use dictionary::{Dictionary, PruneSummary, TermStat};
pub use matrix::{MatrixAssembler, TermDocumentMatrix};
pub use tfidf::{DefaultTFIDFEngine, TFIDFEngine, TfidfModel, Weighting};
pub use token::TokenFrequency;
