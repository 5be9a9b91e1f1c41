pub mod record;
pub mod source;

use std::{
    fs::File,
    io::{BufRead, BufReader, Lines},
    path::{Path, PathBuf},
};

use num::Float;
use sprs::CsVec;
use tracing::info;

use crate::{
    error::{Result, TdmError},
    vectorizer::{
        dictionary::Dictionary,
        tfidf::{DefaultTFIDFEngine, TFIDFEngine, Weighting},
    },
};

pub use record::{TokenRecord, TokenWriter};
pub use source::{parse_corpus_line, CorpusReader, RawDocument};

/// Sparse vector of one document, indexed by vocabulary id
#[derive(Debug, Clone, PartialEq)]
pub struct DocVector<N> {
    pub bill_id: String,
    pub vector: CsVec<N>,
}

/// Restartable stream of document vectors.
///
/// Holds a frozen dictionary and the path of the intermediate token file.
/// Every call to `iter` opens its own read handle and replays the file from
/// the start, so repeated passes yield identical sequences without any
/// vector being cached in memory. The handle is released when the iterator
/// is dropped.
#[derive(Debug)]
pub struct CorpusStream<'d, N = f64, E = DefaultTFIDFEngine>
where
    N: Float,
    E: TFIDFEngine<N>,
{
    dictionary: &'d Dictionary,
    path: PathBuf,
    n: usize,
    weighting: Weighting<N, E>,
    progress_every: Option<usize>,
}

impl<'d, N, E> CorpusStream<'d, N, E>
where
    N: Float,
    E: TFIDFEngine<N>,
{
    /// # Arguments
    /// * `dictionary` - frozen vocabulary
    /// * `path` - intermediate token file
    /// * `n` - n-gram order the file was written with
    /// * `weighting` - bag-of-words or TF-IDF
    pub fn new(
        dictionary: &'d Dictionary,
        path: &Path,
        n: usize,
        weighting: Weighting<N, E>,
    ) -> Result<Self> {
        if !dictionary.is_frozen() {
            return Err(TdmError::DictionaryNotFrozen);
        }
        if n == 0 {
            return Err(TdmError::InvalidConfig("ngram must be at least 1".into()));
        }
        Ok(Self {
            dictionary,
            path: path.to_path_buf(),
            n,
            weighting,
            progress_every: None,
        })
    }

    /// Log progress every `every` documents; `None` or 0 disables it
    pub fn with_progress(mut self, every: Option<usize>) -> Self {
        self.progress_every = every.filter(|&e| e > 0);
        self
    }

    pub fn num_terms(&self) -> usize {
        self.dictionary.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start a fresh pass over the token file
    pub fn iter(&self) -> Result<CorpusIter<'_, 'd, N, E>> {
        let file = File::open(&self.path).map_err(|e| TdmError::io(&self.path, e))?;
        Ok(CorpusIter {
            stream: self,
            lines: BufReader::new(file).lines(),
            line_no: 0,
            failed: false,
        })
    }

    fn vectorize(&self, record: TokenRecord) -> Result<DocVector<N>> {
        let bow = self.dictionary.doc2bow(&record.ngrams)?;
        let (indices, values) = self.weighting.apply(&bow);
        Ok(DocVector {
            bill_id: record.bill_id,
            // doc2bow sorts by id and weighting only filters
            vector: CsVec::new(self.dictionary.len(), indices, values),
        })
    }
}

/// One pass over a `CorpusStream`; stops after the first error
pub struct CorpusIter<'s, 'd, N, E>
where
    N: Float,
    E: TFIDFEngine<N>,
{
    stream: &'s CorpusStream<'d, N, E>,
    lines: Lines<BufReader<File>>,
    line_no: usize,
    failed: bool,
}

impl<'s, 'd, N, E> CorpusIter<'s, 'd, N, E>
where
    N: Float,
    E: TFIDFEngine<N>,
{
    fn fail(&mut self, err: TdmError) -> Option<Result<DocVector<N>>> {
        self.failed = true;
        Some(Err(err))
    }
}

impl<'s, 'd, N, E> Iterator for CorpusIter<'s, 'd, N, E>
where
    N: Float,
    E: TFIDFEngine<N>,
{
    type Item = Result<DocVector<N>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let line = match self.lines.next()? {
            Ok(line) => line,
            Err(e) => return self.fail(TdmError::io(&self.stream.path, e)),
        };
        self.line_no += 1;
        let record = match TokenRecord::parse(&line, self.line_no, self.stream.n) {
            Ok(record) => record,
            Err(e) => return self.fail(e),
        };
        let doc = match self.stream.vectorize(record) {
            Ok(doc) => doc,
            Err(e) => return self.fail(e),
        };
        if let Some(every) = self.stream.progress_every {
            if self.line_no % every == 0 {
                info!(documents = self.line_no, "streamed documents");
            }
        }
        Some(Ok(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn token_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn frozen_dictionary(file: &Path, n: usize) -> Dictionary {
        let s = std::fs::read_to_string(file).unwrap();
        let mut dict = Dictionary::new();
        for (i, line) in s.lines().enumerate() {
            let record = TokenRecord::parse(line, i + 1, n).unwrap();
            dict.observe(&record.ngrams).unwrap();
        }
        dict.freeze();
        dict
    }

    #[test]
    fn bag_of_words_vectors_in_file_order() {
        let file = token_file(&[
            "B1 the quick quick quick quick fox",
            "B2 the fox fox jumped",
            "B3 ",
        ]);
        let dict = frozen_dictionary(file.path(), 2);
        let stream: CorpusStream<f64> =
            CorpusStream::new(&dict, file.path(), 2, Weighting::BagOfWords).unwrap();
        let docs: Vec<DocVector<f64>> = stream.iter().unwrap().map(|d| d.unwrap()).collect();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].bill_id, "B1");
        assert_eq!(docs[0].vector.indices(), &[0, 1, 2]);
        assert_eq!(docs[0].vector.data(), &[1.0, 1.0, 1.0]);
        assert_eq!(docs[1].vector.indices(), &[3, 4]);
        // empty document still yields a (zero) vector
        assert_eq!(docs[2].bill_id, "B3");
        assert_eq!(docs[2].vector.nnz(), 0);
        assert_eq!(docs[2].vector.dim(), 5);
    }

    #[test]
    fn passes_are_repeatable() {
        let file = token_file(&["A x y y z", "B y z z w", "C x y w v"]);
        let dict = frozen_dictionary(file.path(), 2);
        let weighting = Weighting::from_dictionary(&dict, true, true).unwrap();
        let stream: CorpusStream<f64> = CorpusStream::new(&dict, file.path(), 2, weighting)
            .unwrap()
            .with_progress(Some(1));
        let first: Vec<DocVector<f64>> = stream.iter().unwrap().map(|d| d.unwrap()).collect();
        let second: Vec<DocVector<f64>> = stream.iter().unwrap().map(|d| d.unwrap()).collect();
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn pruned_terms_are_silently_dropped() {
        let file = token_file(&["A p q r s", "B p q", "C r s t u"]);
        let s = std::fs::read_to_string(file.path()).unwrap();
        let mut dict = Dictionary::new();
        for (i, line) in s.lines().enumerate() {
            dict.observe(&TokenRecord::parse(line, i + 1, 2).unwrap().ngrams).unwrap();
        }
        // only "p q" and "r s" appear in two documents
        dict.prune(2, 1.0, None).unwrap();
        let stream: CorpusStream<f64> =
            CorpusStream::new(&dict, file.path(), 2, Weighting::BagOfWords).unwrap();
        let docs: Vec<DocVector<f64>> = stream.iter().unwrap().map(|d| d.unwrap()).collect();
        assert_eq!(docs[0].vector.indices(), &[0, 1]);
        assert_eq!(docs[1].vector.indices(), &[0]);
        assert_eq!(docs[2].vector.indices(), &[1]);
    }

    #[test]
    fn malformed_record_stops_the_pass() {
        let file = token_file(&["A p q", "B odd", "C p q"]);
        let mut dict = Dictionary::new();
        dict.observe(&["p q"]).unwrap();
        dict.freeze();
        let stream: CorpusStream<f64> =
            CorpusStream::new(&dict, file.path(), 2, Weighting::BagOfWords).unwrap();
        let results: Vec<Result<DocVector<f64>>> = stream.iter().unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(TdmError::MalformedRecord { line_no: 2, .. })));
    }

    #[test]
    fn accumulating_dictionary_rejected_until_pruned() {
        let file = token_file(&["A p q", "B p q"]);
        let mut dict = Dictionary::new();
        dict.observe(&["p q"]).unwrap();
        dict.observe(&["p q"]).unwrap();
        let res = CorpusStream::<f64>::new(&dict, file.path(), 2, Weighting::BagOfWords);
        assert!(matches!(res, Err(TdmError::DictionaryNotFrozen)));

        dict.prune(2, 1.0, None).unwrap();
        let stream: CorpusStream<f64> =
            CorpusStream::new(&dict, file.path(), 2, Weighting::BagOfWords).unwrap();
        assert_eq!(stream.iter().unwrap().count(), 2);
    }

    #[test]
    fn requires_frozen_dictionary_and_existing_file() {
        let dict = Dictionary::new();
        let res = CorpusStream::<f64>::new(&dict, Path::new("nowhere"), 2, Weighting::BagOfWords);
        assert!(matches!(res, Err(TdmError::DictionaryNotFrozen)));

        let mut dict = Dictionary::new();
        dict.freeze();
        let stream: CorpusStream<f64> =
            CorpusStream::new(&dict, Path::new("/definitely/not/here.txt"), 2, Weighting::BagOfWords)
                .unwrap();
        assert!(matches!(stream.iter(), Err(TdmError::Io { .. })));
    }
}
