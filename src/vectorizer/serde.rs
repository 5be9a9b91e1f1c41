//! Persistence sink.
//!
//! Three independent artifacts, each written once at the end of a run:
//! the pruned vocabulary, the ordered label list and the matrix.
//! Writes are not atomic; a crash mid-write leaves a corrupt file and the
//! run has to be repeated.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use indexmap::IndexMap;
use num::Float;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sprs::CsMat;

use crate::{
    error::{Result, TdmError},
    vectorizer::dictionary::{Dictionary, Phase, TermStat},
};

/// Serializable vocabulary.
/// Term ids are implicit: a term's id is its position in `terms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryData {
    pub num_docs: u64,
    pub num_pos: u64,
    pub num_nnz: u64,
    pub terms: Vec<(String, TermStat)>,
}

impl From<&Dictionary> for DictionaryData {
    fn from(dict: &Dictionary) -> Self {
        Self {
            num_docs: dict.num_docs,
            num_pos: dict.num_pos,
            num_nnz: dict.num_nnz,
            terms: dict
                .terms
                .iter()
                .map(|(t, s)| (t.to_string(), *s))
                .collect(),
        }
    }
}

impl DictionaryData {
    /// Rebuild a frozen dictionary.
    /// Fails on duplicate terms, which would shift every later id.
    pub fn into_dictionary(self) -> Result<Dictionary> {
        let mut terms = IndexMap::with_capacity(self.terms.len());
        for (token, stat) in self.terms {
            if terms.insert(token.clone().into_boxed_str(), stat).is_some() {
                return Err(TdmError::InvalidConfig(format!(
                    "vocabulary artifact lists {token:?} twice"
                )));
            }
        }
        Ok(Dictionary {
            terms,
            num_docs: self.num_docs,
            num_pos: self.num_pos,
            num_nnz: self.num_nnz,
            phase: Phase::Frozen,
        })
    }
}

/// Raw compressed-sparse-column arrays: the on-disk matrix layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CscData<N> {
    pub rows: usize,
    pub cols: usize,
    /// `cols + 1` offsets into `indices` / `data`
    pub indptr: Vec<usize>,
    /// row index of each stored value, strictly increasing within a column
    pub indices: Vec<usize>,
    pub data: Vec<N>,
}

impl<N> CscData<N>
where
    N: Float,
{
    /// Copy the arrays out of a CSC matrix
    pub fn from_csmat(matrix: &CsMat<N>) -> Result<Self> {
        if !matrix.is_csc() {
            return Err(TdmError::Matrix("expected column-major storage".into()));
        }
        let mut indptr = Vec::with_capacity(matrix.cols() + 1);
        let mut indices = Vec::with_capacity(matrix.nnz());
        let mut data = Vec::with_capacity(matrix.nnz());
        indptr.push(0);
        for col in matrix.outer_iterator() {
            indices.extend_from_slice(col.indices());
            data.extend_from_slice(col.data());
            indptr.push(indices.len());
        }
        Ok(Self {
            rows: matrix.rows(),
            cols: matrix.cols(),
            indptr,
            indices,
            data,
        })
    }

    /// Structural checks, so building the `CsMat` cannot panic
    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| Err(TdmError::Matrix(msg));
        if self.indptr.len() != self.cols + 1 {
            return bad(format!(
                "indptr has {} entries for {} columns",
                self.indptr.len(),
                self.cols
            ));
        }
        if self.indices.len() != self.data.len() {
            return bad(format!(
                "{} indices but {} values",
                self.indices.len(),
                self.data.len()
            ));
        }
        if self.indptr.first() != Some(&0) || self.indptr.last() != Some(&self.indices.len()) {
            return bad("indptr must start at 0 and end at nnz".into());
        }
        for (col, w) in self.indptr.windows(2).enumerate() {
            if w[0] > w[1] {
                return bad(format!("indptr decreases at column {col}"));
            }
            let rows = &self.indices[w[0]..w[1]];
            if rows.iter().any(|&r| r >= self.rows) {
                return bad(format!("row index out of bounds in column {col}"));
            }
            if rows.windows(2).any(|p| p[0] >= p[1]) {
                return bad(format!("row indices not strictly increasing in column {col}"));
            }
        }
        Ok(())
    }

    pub fn into_csmat(self) -> Result<CsMat<N>> {
        self.validate()?;
        Ok(CsMat::new_csc(
            (self.rows, self.cols),
            self.indptr,
            self.indices,
            self.data,
        ))
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| TdmError::io(path, e))?;
    Ok(BufWriter::new(file))
}

fn write_cbor<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut w = create(path)?;
    serde_cbor::to_writer(&mut w, value).map_err(TdmError::Encode)?;
    w.flush().map_err(|e| TdmError::io(path, e))
}

fn read_cbor<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| TdmError::io(path, e))?;
    serde_cbor::from_reader(BufReader::new(file)).map_err(|source| TdmError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Reloadable binary vocabulary (CBOR)
pub fn save_vocabulary(path: &Path, dictionary: &Dictionary) -> Result<()> {
    write_cbor(path, &DictionaryData::from(dictionary))
}

pub fn load_vocabulary(path: &Path) -> Result<Dictionary> {
    read_cbor::<DictionaryData>(path)?.into_dictionary()
}

/// Human-readable vocabulary: `num_docs` on the first line,
/// then `id<TAB>token<TAB>doc_freq` per term
pub fn save_vocabulary_text(path: &Path, dictionary: &Dictionary) -> Result<()> {
    let mut w = create(path)?;
    let io = |e| TdmError::io(path, e);
    writeln!(w, "{}", dictionary.num_docs()).map_err(io)?;
    for (id, token, stat) in dictionary.iter() {
        writeln!(w, "{id}\t{token}\t{}", stat.doc_freq).map_err(io)?;
    }
    w.flush().map_err(io)
}

/// One bill id per line, in column order
pub fn save_labels<S: AsRef<str>>(path: &Path, labels: &[S]) -> Result<()> {
    let mut w = create(path)?;
    let io = |e| TdmError::io(path, e);
    for label in labels {
        writeln!(w, "{}", label.as_ref()).map_err(io)?;
    }
    w.flush().map_err(io)
}

pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| TdmError::io(path, e))?;
    BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<String>>>()
        .map_err(|e| TdmError::io(path, e))
}

/// Sparse-native binary matrix (CBOR encoded CSC arrays)
pub fn save_matrix<N>(path: &Path, matrix: &CsMat<N>) -> Result<()>
where
    N: Float + Serialize,
{
    write_cbor(path, &CscData::from_csmat(matrix)?)
}

pub fn load_matrix<N>(path: &Path) -> Result<CsMat<N>>
where
    N: Float + DeserializeOwned,
{
    read_cbor::<CscData<N>>(path)?.into_csmat()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dictionary() -> Dictionary {
        let mut dict = Dictionary::new();
        dict.observe(&["the quick", "quick fox", "the quick"]).unwrap();
        dict.observe(&["the fox", "quick fox"]).unwrap();
        dict.freeze();
        dict
    }

    #[test]
    fn vocabulary_reloads_frozen_with_same_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.cbor");
        let dict = dictionary();
        save_vocabulary(&path, &dict).unwrap();
        let loaded = load_vocabulary(&path).unwrap();
        assert!(loaded.is_frozen());
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.num_docs(), 2);
        assert_eq!(loaded.num_pos(), 5);
        for (id, token, stat) in dict.iter() {
            assert_eq!(loaded.token_id(token).unwrap(), Some(id));
            assert_eq!(loaded.stat(id), Some(stat));
        }
    }

    #[test]
    fn vocabulary_text_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.txt");
        save_vocabulary_text(&path, &dictionary()).unwrap();
        let s = std::fs::read_to_string(&path).unwrap();
        assert_eq!(s, "2\n0\tthe quick\t1\n1\tquick fox\t2\n2\tthe fox\t1\n");
    }

    #[test]
    fn duplicate_terms_rejected() {
        let data = DictionaryData {
            num_docs: 1,
            num_pos: 2,
            num_nnz: 2,
            terms: vec![("a b".into(), TermStat::default()), ("a b".into(), TermStat::default())],
        };
        assert!(data.into_dictionary().is_err());
    }

    #[test]
    fn labels_keep_order_and_empty_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        save_labels(&path, &["B2", "B1", "B3"]).unwrap();
        assert_eq!(load_labels(&path).unwrap(), vec!["B2", "B1", "B3"]);
    }

    #[test]
    fn matrix_reloads_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tdm.cbor");
        let matrix: CsMat<f64> = CscData {
            rows: 3,
            cols: 3,
            indptr: vec![0, 2, 2, 3],
            indices: vec![0, 2, 1],
            data: vec![0.5, 1.5, 2.0],
        }
        .into_csmat()
        .unwrap();
        save_matrix(&path, &matrix).unwrap();
        let loaded: CsMat<f64> = load_matrix(&path).unwrap();
        assert_eq!(loaded.shape(), (3, 3));
        assert!(loaded.is_csc());
        assert_eq!(loaded.get(2, 0), Some(&1.5));
        assert_eq!(loaded.get(1, 2), Some(&2.0));
        assert_eq!(loaded.get(0, 1), None);
        assert_eq!(
            CscData::from_csmat(&loaded).unwrap(),
            CscData::from_csmat(&matrix).unwrap()
        );
    }

    #[test]
    fn invalid_structure_rejected() {
        let unsorted = CscData {
            rows: 3,
            cols: 1,
            indptr: vec![0, 2],
            indices: vec![2, 0],
            data: vec![1.0f64, 1.0],
        };
        assert!(matches!(unsorted.into_csmat(), Err(TdmError::Matrix(_))));
        let out_of_bounds = CscData {
            rows: 1,
            cols: 1,
            indptr: vec![0, 1],
            indices: vec![4],
            data: vec![1.0f64],
        };
        assert!(matches!(out_of_bounds.into_csmat(), Err(TdmError::Matrix(_))));
        let short_indptr = CscData {
            rows: 1,
            cols: 2,
            indptr: vec![0, 0],
            indices: vec![],
            data: Vec::<f64>::new(),
        };
        assert!(matches!(short_indptr.into_csmat(), Err(TdmError::Matrix(_))));
    }

    #[test]
    fn garbage_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tdm.cbor");
        std::fs::write(&path, b"not cbor at all").unwrap();
        assert!(matches!(load_matrix::<f64>(&path), Err(TdmError::Decode { .. })));
    }
}
