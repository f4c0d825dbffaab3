use super::artifacts::Index;
use crate::error::{IngestError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

const INDEX_FILE: &str = "index.json";

/// Directory of per-symbol JSON artifacts plus one `index.json`.
///
/// Files are overwritten on every write; there is no merge with a previous run.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Opens a store, creating the directory if it doesn't exist.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| IngestError::io(&dir, e))?;

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact for a symbol code.
    pub fn artifact_path(&self, code: &str) -> PathBuf {
        self.dir.join(format!("{}.json", code))
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// Writes `<code>.json`.
    pub fn write<T: Serialize>(&self, code: &str, artifact: &T) -> Result<PathBuf> {
        let path = self.artifact_path(code);
        write_json(&path, artifact)?;
        Ok(path)
    }

    /// Reads `<code>.json` back. Returns `None` if the file doesn't exist.
    pub fn read<T: DeserializeOwned>(&self, code: &str) -> Result<Option<T>> {
        let path = self.artifact_path(code);

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(IngestError::io(path, e)),
        };

        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    pub fn write_index<E: Serialize>(&self, index: &Index<E>) -> Result<PathBuf> {
        let path = self.index_path();
        write_json(&path, index)?;
        Ok(path)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec(value)?;
    std::fs::write(path, json).map_err(|e| IngestError::io(path, e))
}
