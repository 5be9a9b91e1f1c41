use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TdmError};

/// Where the stopword set comes from
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopWordSource {
    /// built-in English list
    #[default]
    English,
    /// no stopword removal
    None,
    /// one stopword per line
    File(PathBuf),
}

impl std::str::FromStr for StopWordSource {
    type Err = TdmError;

    /// `english`, `none`, or anything else as a file path
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" => Err(TdmError::InvalidConfig("empty stopword source".into())),
            "english" => Ok(StopWordSource::English),
            "none" => Ok(StopWordSource::None),
            path => Ok(StopWordSource::File(PathBuf::from(path))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// n-gram order
    pub ngram: usize,
    pub lemmatize: bool,
    pub stopwords: StopWordSource,
    /// `surface<TAB>lemma` lexicon used when lemmatizing
    pub lemma_table: Option<PathBuf>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            ngram: 2,
            lemmatize: true,
            stopwords: StopWordSource::English,
            lemma_table: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruneConfig {
    /// minimum document frequency (absolute)
    pub no_below: u64,
    /// maximum document frequency as a fraction of all documents
    pub no_above: f64,
    /// keep only the most frequent terms after thresholding
    pub keep_n: Option<usize>,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            no_below: 2,
            no_above: 0.9,
            keep_n: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightingConfig {
    pub tfidf: bool,
    /// L2 normalize every document vector
    pub normalize: bool,
}

impl Default for WeightingConfig {
    fn default() -> Self {
        Self {
            tfidf: true,
            normalize: true,
        }
    }
}

/// What to do with a corpus line that lacks the three leading fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    #[default]
    Fail,
    Skip,
}

/// Full pipeline configuration.
/// Every field has a default, so an empty TOML file is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tokenizer: TokenizerConfig,
    pub prune: PruneConfig,
    pub weighting: WeightingConfig,
    /// emit a progress event while streaming
    pub status: bool,
    pub progress_every: usize,
    /// documents tokenized together in pass 1
    pub batch_size: usize,
    pub on_malformed: MalformedPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tokenizer: TokenizerConfig::default(),
            prune: PruneConfig::default(),
            weighting: WeightingConfig::default(),
            status: true,
            progress_every: 1000,
            batch_size: 1000,
            on_malformed: MalformedPolicy::Fail,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).map_err(|e| TdmError::io(path, e))?;
        Self::from_toml_str(&s)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tokenizer.ngram == 0 {
            return Err(TdmError::InvalidConfig("ngram must be at least 1".into()));
        }
        let no_above = self.prune.no_above;
        if !(no_above > 0.0 && no_above <= 1.0) {
            return Err(TdmError::InvalidConfig(format!(
                "no_above must be in (0, 1], got {no_above}"
            )));
        }
        if self.prune.keep_n == Some(0) {
            return Err(TdmError::InvalidConfig("keep_n must be positive".into()));
        }
        if self.batch_size == 0 {
            return Err(TdmError::InvalidConfig("batch_size must be positive".into()));
        }
        if self.progress_every == 0 {
            return Err(TdmError::InvalidConfig("progress_every must be positive".into()));
        }
        Ok(())
    }
}
