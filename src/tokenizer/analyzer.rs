use std::{collections::HashMap, path::Path};

use crate::error::{Result, TdmError};

/// One token as produced by the linguistic analyzer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedToken {
    /// lowercased surface form
    pub surface: String,
    /// base form, equal to `surface` when the analyzer knows nothing better
    pub lemma: String,
}

impl AnalyzedToken {
    #[inline]
    pub fn form(&self, lemmatize: bool) -> &str {
        if lemmatize {
            &self.lemma
        } else {
            &self.surface
        }
    }
}

/// Tokenize + lemmatize capability.
///
/// Receives text that is already reduced to `[A-Za-z0-9 ]` with single spaces,
/// and returns tokens in text order.
/// Implementations hold no per-document state, so one instance is shared
/// across every document (and every worker thread) of a run.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Vec<AnalyzedToken>;
}

/// Surface form to lemma lookup table
#[derive(Debug, Clone, Default)]
pub struct LexiconLemmatizer {
    table: HashMap<String, String>,
}

impl LexiconLemmatizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, surface: &str, lemma: &str) -> &mut Self {
        self.table.insert(surface.to_lowercase(), lemma.to_lowercase());
        self
    }

    /// Parse a `surface<TAB>lemma` lexicon.
    /// Blank lines and lines starting with `#` are ignored.
    /// Both columns must be single words.
    pub fn from_file(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).map_err(|e| TdmError::io(path, e))?;
        let mut lemmatizer = Self::new();
        for (i, line) in s.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let pair = line
                .split_once('\t')
                .map(|(surface, lemma)| (surface.trim(), lemma.trim()))
                .filter(|(surface, lemma)| is_single_word(surface) && is_single_word(lemma));
            match pair {
                Some((surface, lemma)) => {
                    lemmatizer.insert(surface, lemma);
                }
                None => {
                    return Err(TdmError::InvalidConfig(format!(
                        "lemma table {} line {}: expected `surface<TAB>lemma` with one word each",
                        path.display(),
                        i + 1
                    )))
                }
            }
        }
        Ok(lemmatizer)
    }

    #[inline]
    pub fn lemma<'a>(&'a self, surface: &'a str) -> &'a str {
        self.table.get(surface).map_or(surface, String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

fn is_single_word(s: &str) -> bool {
    !s.is_empty() && !s.contains(char::is_whitespace)
}

/// Whitespace analyzer with lowercase folding and a lexicon lemmatizer.
#[derive(Debug, Clone, Default)]
pub struct SimpleAnalyzer {
    lemmatizer: LexiconLemmatizer,
}

impl SimpleAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lemmatizer(lemmatizer: LexiconLemmatizer) -> Self {
        Self { lemmatizer }
    }
}

impl Analyzer for SimpleAnalyzer {
    fn analyze(&self, text: &str) -> Vec<AnalyzedToken> {
        text.split_whitespace()
            .map(|word| {
                let surface = word.to_lowercase();
                let lemma = self.lemmatizer.lemma(&surface).to_string();
                AnalyzedToken { surface, lemma }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn simple_analyzer_lowercases_in_order() {
        let tokens = SimpleAnalyzer::new().analyze("The Quick fox");
        let surfaces: Vec<&str> = tokens.iter().map(|t| t.form(false)).collect();
        assert_eq!(surfaces, vec!["the", "quick", "fox"]);
        // no lexicon: lemma falls back to surface
        assert_eq!(tokens[1].lemma, "quick");
    }

    #[test]
    fn lexicon_supplies_lemmas() {
        let mut lex = LexiconLemmatizer::new();
        lex.insert("Bills", "bill").insert("amended", "amend");
        let analyzer = SimpleAnalyzer::with_lemmatizer(lex);
        let tokens = analyzer.analyze("bills amended today");
        let lemmas: Vec<&str> = tokens.iter().map(|t| t.form(true)).collect();
        assert_eq!(lemmas, vec!["bill", "amend", "today"]);
        let surfaces: Vec<&str> = tokens.iter().map(|t| t.form(false)).collect();
        assert_eq!(surfaces, vec!["bills", "amended", "today"]);
    }

    #[test]
    fn lexicon_file_parsing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "statutes\tstatute").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "went\tgo").unwrap();
        let lex = LexiconLemmatizer::from_file(file.path()).unwrap();
        assert_eq!(lex.len(), 2);
        assert_eq!(lex.lemma("went"), "go");
        assert_eq!(lex.lemma("unknown"), "unknown");

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "no tab here").unwrap();
        assert!(matches!(
            LexiconLemmatizer::from_file(bad.path()),
            Err(TdmError::InvalidConfig(_))
        ));
    }

    #[test]
    fn lexicon_file_rejects_multi_word_lemmas() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "went\tgo").unwrap();
        writeln!(file, "nyc\tnew york").unwrap();
        assert!(matches!(
            LexiconLemmatizer::from_file(file.path()),
            Err(TdmError::InvalidConfig(msg)) if msg.contains("line 2")
        ));
    }
}
