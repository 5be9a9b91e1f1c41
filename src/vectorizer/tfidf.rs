use std::marker::PhantomData;

use num::Float;

use crate::{
    error::{Result, TdmError},
    vectorizer::dictionary::Dictionary,
};

/// Weights below this magnitude are treated as zero and left out of the vector
const WEIGHT_EPS: f64 = 1e-12;

/// TF-IDF weighting scheme.
///
/// Both parts are computed in `f64` and narrowed to `N` at the end.
pub trait TFIDFEngine<N>
where
    N: Float,
{
    /// IDF per term id, computed from the frozen dictionary
    fn idf_vec(dictionary: &Dictionary) -> Vec<N>;
    /// local weight of a raw in-document count
    fn tf(count: u32) -> N;
}

/// Classic scheme: `tf = count`, `idf = log2(num_docs / df)`.
/// A term present in every document gets an idf of 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTFIDFEngine;

impl<N> TFIDFEngine<N> for DefaultTFIDFEngine
where
    N: Float,
{
    fn idf_vec(dictionary: &Dictionary) -> Vec<N> {
        let num_docs = dictionary.num_docs() as f64;
        dictionary
            .iter()
            .map(|(_, _, stat)| {
                // pruned vocabularies never hold df = 0
                let df = stat.doc_freq.max(1) as f64;
                num::cast((num_docs / df).log2()).unwrap_or_else(N::zero)
            })
            .collect()
    }

    #[inline]
    fn tf(count: u32) -> N {
        num::cast(count).unwrap_or_else(N::zero)
    }
}

/// IDF cache plus the weighting rule applied to each bag-of-words
#[derive(Debug, Clone)]
pub struct TfidfModel<N = f64, E = DefaultTFIDFEngine>
where
    N: Float,
    E: TFIDFEngine<N>,
{
    idf: Vec<N>,
    normalize: bool,
    _marker: PhantomData<E>,
}

impl<N, E> TfidfModel<N, E>
where
    N: Float,
    E: TFIDFEngine<N>,
{
    /// # Errors
    /// `DictionaryNotFrozen` while the dictionary is still accumulating
    pub fn new(dictionary: &Dictionary, normalize: bool) -> Result<Self> {
        if !dictionary.is_frozen() {
            return Err(TdmError::DictionaryNotFrozen);
        }
        Ok(Self {
            idf: E::idf_vec(dictionary),
            normalize,
            _marker: PhantomData,
        })
    }

    pub fn idf(&self, id: usize) -> Option<N> {
        self.idf.get(id).copied()
    }

    /// Weight a sorted bag-of-words.
    /// Zero weights are dropped so absent and universal terms both read as 0.
    pub fn weigh(&self, bow: &[(usize, u32)]) -> (Vec<usize>, Vec<N>) {
        let eps: N = num::cast(WEIGHT_EPS).unwrap_or_else(N::zero);
        let mut indices = Vec::with_capacity(bow.len());
        let mut values = Vec::with_capacity(bow.len());
        for &(id, count) in bow {
            let Some(idf) = self.idf(id) else {
                continue;
            };
            let w = E::tf(count) * idf;
            if w.abs() > eps {
                indices.push(id);
                values.push(w);
            }
        }
        if self.normalize {
            let norm = values.iter().fold(N::zero(), |acc, &v| acc + v * v).sqrt();
            if norm > N::zero() {
                for v in values.iter_mut() {
                    *v = *v / norm;
                }
            }
        }
        (indices, values)
    }
}

/// How a document's counts become vector values
#[derive(Debug, Clone)]
pub enum Weighting<N = f64, E = DefaultTFIDFEngine>
where
    N: Float,
    E: TFIDFEngine<N>,
{
    /// raw counts
    BagOfWords,
    TfIdf(TfidfModel<N, E>),
}

impl<N, E> Weighting<N, E>
where
    N: Float,
    E: TFIDFEngine<N>,
{
    pub fn from_dictionary(dictionary: &Dictionary, tfidf: bool, normalize: bool) -> Result<Self> {
        if tfidf {
            Ok(Weighting::TfIdf(TfidfModel::new(dictionary, normalize)?))
        } else {
            Ok(Weighting::BagOfWords)
        }
    }

    pub fn apply(&self, bow: &[(usize, u32)]) -> (Vec<usize>, Vec<N>) {
        match self {
            Weighting::BagOfWords => bow
                .iter()
                .map(|&(id, count)| (id, num::cast(count).unwrap_or_else(N::zero)))
                .unzip(),
            Weighting::TfIdf(model) => model.weigh(bow),
        }
    }
}
