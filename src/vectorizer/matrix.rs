use num::Float;
use sprs::{CsMat, CsVecView};
use tracing::info;

use crate::{
    error::{Result, TdmError},
    vectorizer::{corpus::DocVector, serde::CscData},
};

/// Term-document matrix together with its column labels.
/// Column `i` belongs to `labels[i]`.
#[derive(Debug, Clone)]
pub struct TermDocumentMatrix<N = f64> {
    /// terms x documents, compressed sparse column
    pub matrix: CsMat<N>,
    pub labels: Vec<String>,
}

impl<N> TermDocumentMatrix<N>
where
    N: Float,
{
    /// `(num_terms, num_docs)`
    pub fn shape(&self) -> (usize, usize) {
        self.matrix.shape()
    }

    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    /// Column of one document
    pub fn column(&self, doc: usize) -> Option<CsVecView<'_, N>> {
        self.matrix.outer_view(doc)
    }

    /// Weight of `term` in `doc`, 0 when absent
    pub fn weight(&self, term: usize, doc: usize) -> N {
        self.matrix.get(term, doc).copied().unwrap_or_else(N::zero)
    }

    pub fn column_of(&self, bill_id: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == bill_id)
    }
}

/// Builds a CSC matrix from a document stream, one column per document.
///
/// The shape is declared up front and enforced: the stream must yield exactly
/// `num_docs` documents (empty ones included) and every id must be below
/// `num_terms`. Any deviation fails instead of truncating or padding.
#[derive(Debug, Clone, Copy)]
pub struct MatrixAssembler {
    num_terms: usize,
    num_docs: usize,
}

impl MatrixAssembler {
    pub fn new(num_terms: usize, num_docs: usize) -> Self {
        Self { num_terms, num_docs }
    }

    /// Consume the stream completely and build the matrix.
    ///
    /// # Errors
    /// * any error the stream yields
    /// * `CountMismatch` when the document count differs from the declared one
    /// * `TermOutOfRange` when a vector addresses a row beyond `num_terms`
    pub fn assemble<N, I>(&self, stream: I) -> Result<TermDocumentMatrix<N>>
    where
        N: Float,
        I: IntoIterator<Item = Result<DocVector<N>>>,
    {
        let mut indptr = Vec::with_capacity(self.num_docs + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        let mut labels = Vec::with_capacity(self.num_docs);
        indptr.push(0);

        for doc in stream {
            let doc = doc?;
            if labels.len() == self.num_docs {
                return Err(TdmError::CountMismatch {
                    declared: self.num_docs,
                    found: self.num_docs + 1,
                });
            }
            for (&id, &w) in doc.vector.indices().iter().zip(doc.vector.data()) {
                if id >= self.num_terms {
                    return Err(TdmError::TermOutOfRange {
                        id,
                        num_terms: self.num_terms,
                    });
                }
                indices.push(id);
                data.push(w);
            }
            indptr.push(indices.len());
            labels.push(doc.bill_id);
        }

        if labels.len() != self.num_docs {
            return Err(TdmError::CountMismatch {
                declared: self.num_docs,
                found: labels.len(),
            });
        }

        let matrix = CscData {
            rows: self.num_terms,
            cols: self.num_docs,
            indptr,
            indices,
            data,
        }
        .into_csmat()?;
        info!(
            terms = self.num_terms,
            documents = self.num_docs,
            nnz = matrix.nnz(),
            "assembled term-document matrix"
        );
        Ok(TermDocumentMatrix { matrix, labels })
    }
}
