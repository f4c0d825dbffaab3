use crate::error::{IngestError, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Mapping of symbol code to the provider's ticker identifier.
///
/// Several codes may share one ticker (dual listings). Iteration is always in
/// ascending code order, which keeps dedup reuse reproducible across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTickerMap {
    entries: BTreeMap<String, String>,
}

impl SymbolTickerMap {
    /// Loads the map from a JSON object of `code -> ticker` strings.
    ///
    /// # Errors
    /// Returns [`IngestError::Config`] if the file cannot be read, is not valid
    /// JSON, is not an object, or holds a non-string ticker.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_error = |reason: String| IngestError::Config {
            path: path.to_path_buf(),
            reason,
        };

        let text = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        Self::from_json(&text).map_err(config_error)
    }

    fn from_json(text: &str) -> std::result::Result<Self, String> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
        let object = value
            .as_object()
            .ok_or_else(|| "expected a JSON object of code -> ticker".to_string())?;

        let mut entries = BTreeMap::new();
        for (code, ticker) in object {
            let ticker = ticker
                .as_str()
                .ok_or_else(|| format!("ticker for code {} is not a string", code))?;
            entries.insert(code.clone(), ticker.to_string());
        }

        Ok(Self { entries })
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }

    /// Iterates `(code, ticker)` pairs sorted by code.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(code, ticker)| (code.as_str(), ticker.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C, T> FromIterator<(C, T)> for SymbolTickerMap
where
    C: Into<String>,
    T: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (C, T)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(code, ticker)| (code.into(), ticker.into()))
                .collect(),
        }
    }
}
