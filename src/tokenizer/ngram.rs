use std::iter::FusedIterator;

/// Lazy n-gram generator.
///
/// Slides a window of width `n` with stride 1 over the token sequence and
/// yields each window joined by a single space.
/// Produces `max(0, len - n + 1)` items.
#[derive(Debug, Clone)]
pub struct NGrams {
    tokens: Vec<String>,
    n: usize,
    pos: usize,
}

impl NGrams {
    /// `n` must be at least 1; callers validate it up front.
    pub fn new(tokens: Vec<String>, n: usize) -> Self {
        debug_assert!(n > 0, "n-gram order must be positive");
        Self { tokens, n, pos: 0 }
    }

    pub fn order(&self) -> usize {
        self.n
    }
}

impl Iterator for NGrams {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let window = self.tokens.get(self.pos..self.pos + self.n)?;
        self.pos += 1;
        Some(window.join(" "))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.tokens.len() + 1).saturating_sub(self.pos + self.n);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for NGrams {}
impl FusedIterator for NGrams {}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn bigrams_overlap_with_stride_one() {
        let grams: Vec<String> = NGrams::new(toks("the quick quick fox"), 2).collect();
        assert_eq!(grams, vec!["the quick", "quick quick", "quick fox"]);
    }

    #[test]
    fn too_short_sequences_yield_nothing() {
        assert_eq!(NGrams::new(toks("alone"), 2).count(), 0);
        assert_eq!(NGrams::new(Vec::new(), 2).count(), 0);
        assert_eq!(NGrams::new(Vec::new(), 1).len(), 0);
    }

    #[test]
    fn size_hint_is_exact() {
        let mut grams = NGrams::new(toks("a b c d e"), 3);
        assert_eq!(grams.len(), 3);
        grams.next();
        assert_eq!(grams.len(), 2);
        assert_eq!(grams.collect::<Vec<_>>(), vec!["b c d", "c d e"]);
    }

    #[test]
    fn unigrams_pass_tokens_through() {
        let grams: Vec<String> = NGrams::new(toks("x y"), 1).collect();
        assert_eq!(grams, vec!["x", "y"]);
    }
}
