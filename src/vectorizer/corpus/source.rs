use std::{
    io::BufRead,
    path::{Path, PathBuf},
};

use tracing::warn;

use crate::{
    config::MalformedPolicy,
    error::{Result, TdmError},
};

/// One corpus line, split into its identifier and raw text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// 1-based line number in the source
    pub line_no: usize,
    pub bill_id: String,
    pub raw_text: String,
}

/// Split `<bill_id> <ignored> <raw text...>` on single spaces.
/// Everything after the second space is text, embedded spaces included.
/// Returns `None` when there are fewer than three fields or the id is empty.
pub fn parse_corpus_line(line: &str) -> Option<(&str, &str)> {
    let mut fields = line.splitn(3, ' ');
    let bill_id = fields.next()?;
    let _ignored = fields.next()?;
    let text = fields.next()?;
    if bill_id.is_empty() {
        return None;
    }
    Some((bill_id, text))
}

/// Sequential reader over a corpus source.
///
/// Malformed lines either stop the iteration with `MalformedLine`
/// or are logged and skipped, depending on the policy.
/// After the first error the reader is exhausted.
pub struct CorpusReader<R> {
    lines: std::io::Lines<R>,
    source: PathBuf,
    policy: MalformedPolicy,
    line_no: usize,
    skipped: usize,
    failed: bool,
}

impl<R: BufRead> CorpusReader<R> {
    pub fn new(reader: R, source: &Path, policy: MalformedPolicy) -> Self {
        Self {
            lines: reader.lines(),
            source: source.to_path_buf(),
            policy,
            line_no: 0,
            skipped: 0,
            failed: false,
        }
    }

    /// lines dropped under `MalformedPolicy::Skip`
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: BufRead> Iterator for CorpusReader<R> {
    type Item = Result<RawDocument>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(TdmError::io(&self.source, e)));
                }
            };
            self.line_no += 1;
            let line = line.strip_suffix('\r').unwrap_or(&line);
            match parse_corpus_line(line) {
                Some((bill_id, text)) => {
                    return Some(Ok(RawDocument {
                        line_no: self.line_no,
                        bill_id: bill_id.to_string(),
                        raw_text: text.to_string(),
                    }))
                }
                None => match self.policy {
                    MalformedPolicy::Fail => {
                        self.failed = true;
                        return Some(Err(TdmError::MalformedLine {
                            line_no: self.line_no,
                            content: line.to_string(),
                        }));
                    }
                    MalformedPolicy::Skip => {
                        self.skipped += 1;
                        warn!(line_no = self.line_no, source = %self.source.display(), "skipping malformed corpus line");
                    }
                },
            }
        }
    }
}
