use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::error::{Result, TdmError};

/// One line of the intermediate token file: `<bill_id> <space-joined n-grams>`.
///
/// N-grams of order `n` are written as their `n` words, so a line is read back
/// by grouping the words after the id into consecutive runs of `n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub bill_id: String,
    pub ngrams: Vec<String>,
}

impl TokenRecord {
    pub fn new(bill_id: impl Into<String>, ngrams: Vec<String>) -> Self {
        Self {
            bill_id: bill_id.into(),
            ngrams,
        }
    }

    /// Write the record followed by a newline.
    /// The separating space is always present, even for an empty document.
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write!(w, "{} {}", self.bill_id, self.ngrams.join(" "))?;
        writeln!(w)
    }

    /// # Arguments
    /// * `line` - one line without its terminator
    /// * `line_no` - 1-based, for error reporting
    /// * `n` - n-gram order the file was written with
    pub fn parse(line: &str, line_no: usize, n: usize) -> Result<Self> {
        let malformed = |reason: &str| TdmError::MalformedRecord {
            line_no,
            reason: reason.to_string(),
        };
        let (bill_id, rest) = line
            .split_once(' ')
            .ok_or_else(|| malformed("missing separator after bill id"))?;
        if bill_id.is_empty() {
            return Err(malformed("empty bill id"));
        }
        let words: Vec<&str> = rest.split_whitespace().collect();
        if n == 0 || words.len() % n != 0 {
            return Err(malformed(&format!(
                "{} words cannot form {}-grams",
                words.len(),
                n
            )));
        }
        Ok(Self {
            bill_id: bill_id.to_string(),
            ngrams: words.chunks(n).map(|w| w.join(" ")).collect(),
        })
    }
}

/// Buffered writer of the intermediate token file
pub struct TokenWriter {
    path: PathBuf,
    inner: BufWriter<File>,
    written: usize,
}

impl TokenWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| TdmError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            inner: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn write(&mut self, record: &TokenRecord) -> Result<()> {
        record
            .write_to(&mut self.inner)
            .map_err(|e| TdmError::io(&self.path, e))?;
        self.written += 1;
        Ok(())
    }

    /// Flush and close; returns the number of records written
    pub fn finish(mut self) -> Result<usize> {
        self.inner.flush().map_err(|e| TdmError::io(&self.path, e))?;
        Ok(self.written)
    }
}
