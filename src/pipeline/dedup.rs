use std::collections::HashMap;

/// What to do with a symbol whose ticker may already have been fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupDecision {
    /// First time this ticker is seen in the run: fetch it.
    Fetch,
    /// Another code already claimed this ticker; clone its artifact.
    Reuse { source_code: String },
}

/// Remembers, for the duration of one run, which symbol code first claimed
/// each ticker.
///
/// A ticker is claimed before it is fetched, so a failed or empty first fetch
/// still blocks later codes from refetching it.
#[derive(Debug, Default)]
pub struct DedupCache {
    first_code: HashMap<String, String>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `ticker` for `code` if unclaimed, otherwise points at the
    /// code that claimed it first.
    pub fn check(&mut self, ticker: &str, code: &str) -> DedupDecision {
        match self.first_code.get(ticker) {
            Some(source) => DedupDecision::Reuse {
                source_code: source.clone(),
            },
            None => {
                self.first_code.insert(ticker.to_string(), code.to_string());
                DedupDecision::Fetch
            }
        }
    }

    pub fn len(&self) -> usize {
        self.first_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_code.is_empty()
    }
}
