use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{Result, TdmError},
    vectorizer::token::TokenFrequency,
};

/// Per-term corpus statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermStat {
    /// number of documents containing the term
    pub doc_freq: u64,
    /// total occurrences over all documents
    pub coll_freq: u64,
}

/// Write phase vs read phase of a dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Accumulating,
    Frozen,
}

/// Outcome of `Dictionary::prune`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruneSummary {
    pub before: usize,
    pub after: usize,
}

/// Vocabulary builder.
///
/// Maps each n-gram to a dense id (its insertion position) together with its
/// document frequency. A dictionary accumulates during the first pass, is
/// pruned exactly once, and from then on is read-only:
/// - `observe` is only allowed while accumulating
/// - `token_id` / `doc2bow` are only allowed once frozen
///
/// Pruning compacts ids to `0..len` and keeps relative first-seen order.
#[derive(Debug, Clone)]
pub struct Dictionary {
    pub(crate) terms: IndexMap<Box<str>, TermStat>,
    /// documents observed
    pub(crate) num_docs: u64,
    /// tokens observed, repeats included
    pub(crate) num_pos: u64,
    /// sum over documents of distinct tokens
    pub(crate) num_nnz: u64,
    pub(crate) phase: Phase,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl Dictionary {
    pub fn new() -> Self {
        Self {
            terms: IndexMap::new(),
            num_docs: 0,
            num_pos: 0,
            num_nnz: 0,
            phase: Phase::Accumulating,
        }
    }

    /// Add one document.
    ///
    /// The sequence is treated as a bag: every distinct n-gram gains one
    /// document and, if unseen, the next free id.
    /// An empty sequence still counts as a document.
    ///
    /// # Errors
    /// `DictionaryFrozen` once the dictionary has been pruned or frozen.
    pub fn observe<T>(&mut self, ngrams: &[T]) -> Result<()>
    where
        T: AsRef<str>,
    {
        let freq: TokenFrequency = ngrams.iter().collect();
        self.observe_freq(&freq)
    }

    /// Same as `observe`, for counts already collected
    pub fn observe_freq(&mut self, freq: &TokenFrequency) -> Result<()> {
        if self.phase == Phase::Frozen {
            return Err(TdmError::DictionaryFrozen);
        }
        for (token, count) in freq.iter() {
            let stat = self.terms.entry(token.into()).or_default();
            stat.doc_freq += 1;
            stat.coll_freq += count as u64;
        }
        self.num_docs += 1;
        self.num_pos += freq.token_total_count();
        self.num_nnz += freq.token_num() as u64;
        Ok(())
    }

    /// Drop extreme terms and freeze.
    ///
    /// # Arguments
    /// * `no_below` - remove terms in fewer than this many documents
    /// * `no_above` - remove terms whose `doc_freq / num_docs` exceeds this fraction
    /// * `keep_n` - afterwards keep only this many terms, highest `doc_freq` first
    ///
    /// # Errors
    /// * `AlreadyPruned` on a second call
    /// * `VocabularyExhausted` when nothing would survive; the dictionary is left untouched
    pub fn prune(&mut self, no_below: u64, no_above: f64, keep_n: Option<usize>) -> Result<PruneSummary> {
        if self.phase == Phase::Frozen {
            return Err(TdmError::AlreadyPruned);
        }
        let before = self.terms.len();
        let num_docs = self.num_docs as f64;

        let mut keep: Vec<bool> = self
            .terms
            .values()
            .map(|stat| {
                stat.doc_freq >= no_below
                    && num_docs > 0.0
                    && stat.doc_freq as f64 / num_docs <= no_above
            })
            .collect();

        if let Some(keep_n) = keep_n {
            let mut ranked: Vec<(usize, u64)> = keep
                .iter()
                .enumerate()
                .filter(|(_, &k)| k)
                .map(|(i, _)| (i, self.terms[i].doc_freq))
                .collect();
            if ranked.len() > keep_n {
                // highest df first, earlier id wins ties
                ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
                for &(i, _) in &ranked[keep_n..] {
                    keep[i] = false;
                }
            }
        }

        let after = keep.iter().filter(|&&k| k).count();
        if after == 0 {
            return Err(TdmError::VocabularyExhausted {
                before,
                no_below,
                no_above,
            });
        }

        let mut idx = 0;
        self.terms.retain(|_, _| {
            let k = keep[idx];
            idx += 1;
            k
        });
        self.phase = Phase::Frozen;
        info!(before, after, no_below, no_above, "pruned dictionary");
        Ok(PruneSummary { before, after })
    }

    /// Freeze without pruning; unit tests only, `prune` is the public transition
    #[cfg(test)]
    pub(crate) fn freeze(&mut self) {
        self.phase = Phase::Frozen;
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.phase == Phase::Frozen
    }

    #[inline]
    fn ensure_frozen(&self) -> Result<()> {
        match self.phase {
            Phase::Frozen => Ok(()),
            Phase::Accumulating => Err(TdmError::DictionaryNotFrozen),
        }
    }

    /// Id of `token`, `None` when it is not in the vocabulary
    pub fn token_id(&self, token: &str) -> Result<Option<usize>> {
        self.ensure_frozen()?;
        Ok(self.terms.get_index_of(token))
    }

    /// Bag-of-words for an n-gram sequence: `(id, count)` sorted by id.
    /// N-grams outside the vocabulary are dropped.
    pub fn doc2bow<T>(&self, ngrams: &[T]) -> Result<Vec<(usize, u32)>>
    where
        T: AsRef<str>,
    {
        self.ensure_frozen()?;
        let mut bow: Vec<(usize, u32)> = Vec::new();
        for ngram in ngrams {
            if let Some(id) = self.terms.get_index_of(ngram.as_ref()) {
                bow.push((id, 1));
            }
        }
        bow.sort_unstable_by_key(|&(id, _)| id);
        bow.dedup_by(|next, kept| {
            if next.0 == kept.0 {
                kept.1 += next.1;
                true
            } else {
                false
            }
        });
        Ok(bow)
    }

    pub fn token(&self, id: usize) -> Option<&str> {
        self.terms.get_index(id).map(|(t, _)| t.as_ref())
    }

    pub fn stat(&self, id: usize) -> Option<TermStat> {
        self.terms.get_index(id).map(|(_, s)| *s)
    }

    pub fn doc_freq(&self, id: usize) -> Option<u64> {
        self.stat(id).map(|s| s.doc_freq)
    }

    /// `(id, token, stat)` in id order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str, TermStat)> {
        self.terms
            .iter()
            .enumerate()
            .map(|(id, (t, s))| (id, t.as_ref(), *s))
    }

    /// Current term count
    #[inline]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    pub fn num_pos(&self) -> u64 {
        self.num_pos
    }

    pub fn num_nnz(&self) -> u64 {
        self.num_nnz
    }
}
