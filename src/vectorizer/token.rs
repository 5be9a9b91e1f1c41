use indexmap::IndexMap;

/// Occurrence counts of the n-grams of one document.
///
/// Keeps first-seen order, which is the order new ids are assigned in
/// when the counts are fed to a `Dictionary`.
///
/// # Examples
/// ```
/// use bill_tdm::TokenFrequency;
/// let mut freq = TokenFrequency::new();
/// freq.add_tokens(&["the quick", "quick fox", "the quick"]);
/// assert_eq!(freq.token_count("the quick"), 2);
/// assert_eq!(freq.token_num(), 2);
/// assert_eq!(freq.token_total_count(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenFrequency {
    token_count: IndexMap<String, u32>,
    total_token_count: u64,
}

impl TokenFrequency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a single token
    #[inline]
    pub fn add_token(&mut self, token: &str) -> &mut Self {
        match self.token_count.get_mut(token) {
            Some(count) => *count += 1,
            None => {
                self.token_count.insert(token.to_string(), 1);
            }
        }
        self.total_token_count += 1;
        self
    }

    /// Count every token of a slice
    #[inline]
    pub fn add_tokens<T>(&mut self, tokens: &[T]) -> &mut Self
    where
        T: AsRef<str>,
    {
        for token in tokens {
            self.add_token(token.as_ref());
        }
        self
    }

    /// Occurrences of `token`, 0 when absent
    #[inline]
    pub fn token_count(&self, token: &str) -> u32 {
        self.token_count.get(token).copied().unwrap_or(0)
    }

    /// Sum of all counts
    #[inline]
    pub fn token_total_count(&self) -> u64 {
        self.total_token_count
    }

    /// Number of distinct tokens
    #[inline]
    pub fn token_num(&self) -> usize {
        self.token_count.len()
    }

    #[inline]
    pub fn contains_token(&self, token: &str) -> bool {
        self.token_count.contains_key(token)
    }

    /// `(token, count)` pairs in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.token_count.iter().map(|(t, &c)| (t.as_str(), c))
    }

    pub fn is_empty(&self) -> bool {
        self.token_count.is_empty()
    }

    pub fn clear(&mut self) {
        self.token_count.clear();
        self.total_token_count = 0;
    }
}

impl<S: AsRef<str>> FromIterator<S> for TokenFrequency {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut freq = TokenFrequency::new();
        for token in iter {
            freq.add_token(token.as_ref());
        }
        freq
    }
}
