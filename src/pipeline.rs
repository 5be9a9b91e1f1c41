//! Two-pass corpus to term-document matrix pipeline.
//!
//! Pass 1 tokenizes every document once, spills its n-grams to the
//! intermediate token file and feeds the dictionary. The dictionary is then
//! pruned and frozen. Pass 2 replays the token file through the frozen
//! dictionary and assembles the matrix column by column.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::{
    config::PipelineConfig,
    error::{Result, TdmError},
    tokenizer::Tokenizer,
    vectorizer::{
        corpus::{CorpusReader, CorpusStream, RawDocument, TokenRecord, TokenWriter},
        dictionary::{Dictionary, PruneSummary},
        matrix::{MatrixAssembler, TermDocumentMatrix},
        serde::{save_labels, save_matrix, save_vocabulary, save_vocabulary_text},
        tfidf::Weighting,
    },
};

/// File locations of everything a run produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// intermediate token file
    pub tokens: PathBuf,
    pub labels: PathBuf,
    pub vocabulary: PathBuf,
    pub vocabulary_text: PathBuf,
    pub matrix: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            tokens: dir.join("tokens.txt"),
            labels: dir.join("labels.txt"),
            vocabulary: dir.join("vocabulary.cbor"),
            vocabulary_text: dir.join("vocabulary.txt"),
            matrix: dir.join("tdm.cbor"),
        }
    }
}

/// Result of pass 1
#[derive(Debug)]
pub struct FirstPass {
    /// still accumulating; prune before use
    pub dictionary: Dictionary,
    /// bill ids in corpus order
    pub labels: Vec<String>,
    pub skipped: usize,
}

/// Summary of a complete run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub documents: usize,
    pub skipped_lines: usize,
    pub prune: PruneSummary,
    /// `(terms, documents)`
    pub shape: (usize, usize),
    pub nnz: usize,
    pub paths: ArtifactPaths,
}

pub struct Pipeline {
    config: PipelineConfig,
    tokenizer: Tokenizer,
}

impl Pipeline {
    /// Validate the config and build its tokenizer
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let tokenizer = Tokenizer::from_config(&config.tokenizer)?;
        Ok(Self { config, tokenizer })
    }

    /// Use a custom tokenizer; its n-gram order overrides the config's
    pub fn with_tokenizer(mut config: PipelineConfig, tokenizer: Tokenizer) -> Result<Self> {
        config.tokenizer.ngram = tokenizer.ngram_order();
        config.validate()?;
        Ok(Self { config, tokenizer })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run both passes over `input` and write every artifact into `out_dir`
    pub fn run(&self, input: &Path, out_dir: &Path) -> Result<PipelineReport> {
        std::fs::create_dir_all(out_dir).map_err(|e| TdmError::io(out_dir, e))?;
        let file = File::open(input).map_err(|e| TdmError::io(input, e))?;
        self.run_reader(BufReader::new(file), input, &ArtifactPaths::in_dir(out_dir))
    }

    /// Same as `run` for an arbitrary corpus source; `source` names it in errors
    pub fn run_reader<R: BufRead>(
        &self,
        input: R,
        source: &Path,
        paths: &ArtifactPaths,
    ) -> Result<PipelineReport> {
        let FirstPass {
            mut dictionary,
            labels,
            skipped,
        } = self.first_pass(input, source, &paths.tokens)?;

        let prune = &self.config.prune;
        info!(terms = dictionary.len(), "reducing dictionary");
        let summary = dictionary.prune(prune.no_below, prune.no_above, prune.keep_n)?;

        let tdm = self.second_pass(&dictionary, &paths.tokens)?;
        check_alignment(&labels, &tdm.labels)?;

        save_vocabulary(&paths.vocabulary, &dictionary)?;
        save_vocabulary_text(&paths.vocabulary_text, &dictionary)?;
        save_labels(&paths.labels, &labels)?;
        save_matrix(&paths.matrix, &tdm.matrix)?;
        info!(
            shape = ?tdm.shape(),
            out = %paths.matrix.display(),
            "wrote artifacts"
        );

        Ok(PipelineReport {
            documents: labels.len(),
            skipped_lines: skipped,
            prune: summary,
            shape: tdm.shape(),
            nnz: tdm.nnz(),
            paths: paths.clone(),
        })
    }

    /// Tokenize the corpus, write the token file and accumulate the dictionary.
    ///
    /// Documents are tokenized in parallel batches of `batch_size`; the batch
    /// results come back in input order and are observed and written one by
    /// one, so memory holds at most one batch of documents.
    pub fn first_pass<R: BufRead>(
        &self,
        input: R,
        source: &Path,
        token_path: &Path,
    ) -> Result<FirstPass> {
        let mut reader = CorpusReader::new(input, source, self.config.on_malformed);
        let mut writer = TokenWriter::create(token_path)?;
        let mut dictionary = Dictionary::new();
        let mut labels = Vec::new();
        let batch_size = self.config.batch_size;
        let mut batch: Vec<RawDocument> = Vec::with_capacity(batch_size);

        loop {
            batch.clear();
            for doc in reader.by_ref().take(batch_size) {
                batch.push(doc?);
            }
            if batch.is_empty() {
                break;
            }
            let ngrams: Vec<Vec<String>> = batch
                .par_iter()
                .map(|doc| self.tokenizer.ngrams(&doc.raw_text).collect())
                .collect();
            debug!(size = batch.len(), "tokenized batch");

            for (doc, ngrams) in batch.drain(..).zip(ngrams) {
                dictionary.observe(&ngrams)?;
                writer.write(&TokenRecord::new(doc.bill_id.clone(), ngrams))?;
                labels.push(doc.bill_id);
                if self.config.status && labels.len() % self.config.progress_every == 0 {
                    info!(documents = labels.len(), "tokenized documents");
                }
            }
        }

        let written = writer.finish()?;
        info!(
            documents = written,
            terms = dictionary.len(),
            skipped = reader.skipped(),
            "first pass complete"
        );
        Ok(FirstPass {
            dictionary,
            labels,
            skipped: reader.skipped(),
        })
    }

    /// Replay the token file through the frozen dictionary into a matrix
    pub fn second_pass(&self, dictionary: &Dictionary, token_path: &Path) -> Result<TermDocumentMatrix<f64>> {
        let weighting: Weighting<f64> = Weighting::from_dictionary(
            dictionary,
            self.config.weighting.tfidf,
            self.config.weighting.normalize,
        )?;
        let stream = CorpusStream::new(dictionary, token_path, self.tokenizer.ngram_order(), weighting)?
            .with_progress(self.config.status.then_some(self.config.progress_every));
        let docs = stream.iter()?;
        let tdm = MatrixAssembler::new(dictionary.len(), dictionary.num_docs() as usize).assemble(docs)?;
        Ok(tdm)
    }
}

/// Column order must match the pass 1 label list entry for entry
fn check_alignment(expected: &[String], found: &[String]) -> Result<()> {
    if expected.len() != found.len() {
        return Err(TdmError::CountMismatch {
            declared: expected.len(),
            found: found.len(),
        });
    }
    match expected.iter().zip(found).position(|(e, f)| e != f) {
        Some(column) => Err(TdmError::LabelMismatch {
            column,
            expected: expected[column].clone(),
            found: found[column].clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{MalformedPolicy, StopWordSource},
        vectorizer::serde::{load_labels, load_matrix, load_vocabulary},
    };
    use sprs::CsMat;

    fn plain_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.tokenizer.stopwords = StopWordSource::None;
        config.tokenizer.lemmatize = false;
        config.prune.no_below = 1;
        config.prune.no_above = 1.0;
        config.batch_size = 2;
        config
    }

    #[test]
    fn end_to_end_two_bills() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        let mut config = plain_config();
        config.weighting.tfidf = false;
        let pipeline = Pipeline::new(config).unwrap();
        let input = "B1 x The quick quick fox\nB2 x The fox jumped\n";
        let report = pipeline
            .run_reader(input.as_bytes(), Path::new("mem"), &paths)
            .unwrap();
        assert_eq!(report.shape, (5, 2));
        assert_eq!(report.documents, 2);
        assert_eq!(report.prune.after, 5);

        let vocab = load_vocabulary(&paths.vocabulary).unwrap();
        let matrix: CsMat<f64> = load_matrix(&paths.matrix).unwrap();
        let id = |t: &str| vocab.token_id(t).unwrap().unwrap();
        for t in ["the quick", "quick quick", "quick fox"] {
            assert_eq!(matrix.get(id(t), 0), Some(&1.0));
            assert_eq!(matrix.get(id(t), 1), None);
        }
        for t in ["the fox", "fox jumped"] {
            assert_eq!(matrix.get(id(t), 1), Some(&1.0));
            assert_eq!(matrix.get(id(t), 0), None);
        }
        assert_eq!(load_labels(&paths.labels).unwrap(), vec!["B1", "B2"]);
        let tokens = std::fs::read_to_string(&paths.tokens).unwrap();
        assert_eq!(
            tokens,
            "B1 the quick quick quick quick fox\nB2 the fox fox jumped\n"
        );
    }

    #[test]
    fn empty_document_keeps_its_column() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        let pipeline = Pipeline::new(plain_config()).unwrap();
        let input = "A x alpha beta gamma\nB x ???\nC x alpha beta\n";
        let report = pipeline
            .run_reader(input.as_bytes(), Path::new("mem"), &paths)
            .unwrap();
        assert_eq!(report.shape.1, 3);
        let matrix: CsMat<f64> = load_matrix(&paths.matrix).unwrap();
        assert_eq!(matrix.outer_view(1).unwrap().nnz(), 0);
        assert_eq!(load_labels(&paths.labels).unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn malformed_line_fails_by_default_and_skips_on_request() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        let input = "A x alpha beta\nbroken\nC x alpha beta\n";

        let pipeline = Pipeline::new(plain_config()).unwrap();
        let err = pipeline
            .run_reader(input.as_bytes(), Path::new("mem"), &paths)
            .unwrap_err();
        assert!(matches!(err, TdmError::MalformedLine { line_no: 2, .. }));

        let mut config = plain_config();
        config.on_malformed = MalformedPolicy::Skip;
        let report = Pipeline::new(config)
            .unwrap()
            .run_reader(input.as_bytes(), Path::new("mem"), &paths)
            .unwrap();
        assert_eq!(report.skipped_lines, 1);
        assert_eq!(report.shape, (1, 2));
        assert_eq!(load_labels(&paths.labels).unwrap(), vec!["A", "C"]);
    }

    #[test]
    fn exhausted_vocabulary_aborts_before_assembly() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        let mut config = plain_config();
        config.prune.no_below = 2;
        let pipeline = Pipeline::new(config).unwrap();
        let input = "A x one two\nB x three four\n";
        let err = pipeline
            .run_reader(input.as_bytes(), Path::new("mem"), &paths)
            .unwrap_err();
        assert!(matches!(err, TdmError::VocabularyExhausted { before: 2, .. }));
        assert!(!paths.matrix.exists());
    }

    #[test]
    fn alignment_check_reports_first_difference() {
        let a = vec!["x".to_string(), "y".to_string()];
        let b = vec!["x".to_string(), "z".to_string()];
        assert!(check_alignment(&a, &a).is_ok());
        assert!(matches!(
            check_alignment(&a, &b),
            Err(TdmError::LabelMismatch { column: 1, .. })
        ));
        assert!(matches!(
            check_alignment(&a, &b[..1]),
            Err(TdmError::CountMismatch { declared: 2, found: 1 })
        ));
    }
}
