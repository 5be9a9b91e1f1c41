/// Optional suffix-stripping capability applied after stopword removal.
/// In practice only one of stemming and lemmatization is active.
pub trait Stemmer: Send + Sync {
    fn stem(&self, token: &str) -> String;
}

/// Any `Fn(&str) -> String` can act as a stemmer.
impl<F> Stemmer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    #[inline]
    fn stem(&self, token: &str) -> String {
        self(token)
    }
}
