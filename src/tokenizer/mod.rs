//! Raw text to n-gram conversion.
//!
//! Processing order is fixed:
//! 1. strip everything outside `[A-Za-z0-9 ]`, collapse whitespace runs
//! 2. analyze into surface or lemma forms (lowercased)
//! 3. drop stopwords
//! 4. stem, when a stemmer is configured
//! 5. slide an n-token window and join each window with a space

pub mod analyzer;
pub mod ngram;
pub mod stem;
pub mod stopwords;

use regex::Regex;

use crate::{
    config::{StopWordSource, TokenizerConfig},
    error::{Result, TdmError},
};

pub use analyzer::{AnalyzedToken, Analyzer, LexiconLemmatizer, SimpleAnalyzer};
pub use ngram::NGrams;
pub use stem::Stemmer;
pub use stopwords::StopWords;

/// Character-level cleanup applied before analysis
#[derive(Debug, Clone)]
pub struct TextCleaner {
    non_alnum: Regex,
    excess_space: Regex,
}

impl TextCleaner {
    pub fn new() -> Self {
        Self {
            non_alnum: Regex::new(r"[^A-Za-z0-9 ]").expect("literal pattern"),
            excess_space: Regex::new(r"\s+").expect("literal pattern"),
        }
    }

    pub fn clean(&self, text: &str) -> String {
        let stripped = self.non_alnum.replace_all(text, "");
        self.excess_space
            .replace_all(&stripped, " ")
            .trim()
            .to_string()
    }
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::new()
    }
}

/// Tokenizer facade.
///
/// Built once and passed explicitly to each pass; it holds no mutable state,
/// so the same instance can serve documents from several threads.
pub struct Tokenizer {
    cleaner: TextCleaner,
    analyzer: Box<dyn Analyzer>,
    stopwords: StopWords,
    stemmer: Option<Box<dyn Stemmer>>,
    lemmatize: bool,
    n: usize,
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer")
            .field("n", &self.n)
            .field("lemmatize", &self.lemmatize)
            .field("stopwords", &self.stopwords.len())
            .field("stemmer", &self.stemmer.is_some())
            .finish()
    }
}

impl Tokenizer {
    /// # Arguments
    /// * `analyzer` - tokenize + lemmatize capability
    /// * `stopwords` - tokens removed before n-gram formation
    /// * `n` - n-gram order, at least 1
    /// * `lemmatize` - use lemma forms instead of surface forms
    pub fn new(
        analyzer: Box<dyn Analyzer>,
        stopwords: StopWords,
        n: usize,
        lemmatize: bool,
    ) -> Result<Self> {
        if n == 0 {
            return Err(TdmError::InvalidConfig("ngram must be at least 1".into()));
        }
        Ok(Self {
            cleaner: TextCleaner::new(),
            analyzer,
            stopwords,
            stemmer: None,
            lemmatize,
            n,
        })
    }

    /// Build from config: `SimpleAnalyzer`, optionally backed by a lemma table.
    pub fn from_config(config: &TokenizerConfig) -> Result<Self> {
        let lemmatizer = match &config.lemma_table {
            Some(path) => LexiconLemmatizer::from_file(path)?,
            None => LexiconLemmatizer::new(),
        };
        let stopwords = match &config.stopwords {
            StopWordSource::English => StopWords::english(),
            StopWordSource::None => StopWords::none(),
            StopWordSource::File(path) => StopWords::from_file(path)?,
        };
        Self::new(
            Box::new(SimpleAnalyzer::with_lemmatizer(lemmatizer)),
            stopwords,
            config.ngram,
            config.lemmatize,
        )
    }

    pub fn with_stemmer(mut self, stemmer: Box<dyn Stemmer>) -> Self {
        self.stemmer = Some(stemmer);
        self
    }

    pub fn ngram_order(&self) -> usize {
        self.n
    }

    /// Cleaned, filtered, optionally stemmed base tokens.
    ///
    /// Every returned token is a single non-empty word: multi-word lemmas
    /// and stems are split on whitespace and empty stems are dropped, so the
    /// token file can always be regrouped into the same n-grams.
    pub fn tokens(&self, raw_text: &str) -> Vec<String> {
        let cleaned = self.cleaner.clean(raw_text);
        let mut tokens = Vec::new();
        for analyzed in self.analyzer.analyze(&cleaned) {
            let form = analyzed.form(self.lemmatize);
            if form.is_empty() || self.stopwords.contains(form) {
                continue;
            }
            let stemmed = match &self.stemmer {
                Some(stemmer) => stemmer.stem(form),
                None => form.to_string(),
            };
            tokens.extend(stemmed.split_whitespace().map(str::to_string));
        }
        tokens
    }

    /// Lazy n-gram sequence for one document
    pub fn ngrams(&self, raw_text: &str) -> NGrams {
        NGrams::new(self.tokens(raw_text), self.n)
    }
}
