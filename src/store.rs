// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Storage for encoded sample payloads.
//!
//! The store owns the raw encoded bytes for every sample the engine knows
//! about. It does no decoding; it is identity lookup plus byte ownership.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

/// Errors raised by the sample store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An id was registered twice with differing payloads. Registration with
    /// identical bytes is an idempotent no-op; conflicting bytes are refused
    /// rather than overwritten.
    #[error("sample '{0}' already registered with different bytes")]
    DuplicateSample(String),

    /// Lookup referenced an id that was never registered.
    #[error("unknown sample '{0}'")]
    UnknownSample(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Holds the canonical set of sample identifiers and their encoded bytes.
#[derive(Default)]
pub struct SampleStore {
    /// Encoded payloads by sample id. Immutable once registered.
    samples: HashMap<String, Vec<u8>>,
}

impl SampleStore {
    /// Creates an empty sample store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the encoded bytes for a sample id.
    ///
    /// Registering the same id with identical bytes is a no-op. Registering
    /// it with differing bytes fails with `DuplicateSample`.
    pub fn register(&mut self, id: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        if let Some(existing) = self.samples.get(id) {
            if *existing == bytes {
                debug!(sample = id, "Sample already registered");
                return Ok(());
            }
            return Err(StoreError::DuplicateSample(id.to_string()));
        }

        debug!(sample = id, bytes = bytes.len(), "Sample registered");
        self.samples.insert(id.to_string(), bytes);
        Ok(())
    }

    /// Returns the encoded bytes for a sample id.
    pub fn bytes_for(&self, id: &str) -> Result<&[u8], StoreError> {
        self.samples
            .get(id)
            .map(|b| b.as_slice())
            .ok_or_else(|| StoreError::UnknownSample(id.to_string()))
    }

    /// Returns all registered sample ids.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.samples.keys().map(|k| k.as_str())
    }

    /// Returns the number of registered samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if no samples have been registered.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the total size of all encoded payloads in bytes.
    pub fn memory_usage(&self) -> usize {
        self.samples.values().map(|b| b.len()).sum()
    }

    /// Registers samples from files on disk. Relative paths are resolved
    /// against `base_path`.
    pub fn load_files(
        &mut self,
        files: &HashMap<String, String>,
        base_path: &Path,
    ) -> Result<(), StoreError> {
        for (id, file) in files {
            let path = if Path::new(file).is_absolute() {
                Path::new(file).to_path_buf()
            } else {
                base_path.join(file)
            };

            let bytes = std::fs::read(&path).map_err(|e| {
                StoreError::IoError(std::io::Error::new(
                    e.kind(),
                    format!("{}: {}", path.display(), e),
                ))
            })?;
            self.register(id, bytes)?;
        }

        info!(
            samples = self.samples.len(),
            memory_kb = self.memory_usage() / 1024,
            "Sample payloads loaded"
        );
        Ok(())
    }
}

impl std::fmt::Debug for SampleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleStore")
            .field("samples", &self.samples.len())
            .field("memory_kb", &(self.memory_usage() / 1024))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut store = SampleStore::new();
        store.register("kick", vec![1, 2, 3]).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.bytes_for("kick").unwrap(), &[1, 2, 3]);
        assert!(matches!(
            store.bytes_for("snare"),
            Err(StoreError::UnknownSample(_))
        ));
    }

    #[test]
    fn test_register_idempotent_for_identical_bytes() {
        let mut store = SampleStore::new();
        store.register("kick", vec![1, 2, 3]).unwrap();
        store.register("kick", vec![1, 2, 3]).unwrap();

        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_register_conflicting_bytes() {
        let mut store = SampleStore::new();
        store.register("kick", vec![1, 2, 3]).unwrap();

        let result = store.register("kick", vec![4, 5, 6]);
        assert!(matches!(result, Err(StoreError::DuplicateSample(_))));

        // The original payload survives the failed registration.
        assert_eq!(store.bytes_for("kick").unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_memory_usage() {
        let mut store = SampleStore::new();
        store.register("kick", vec![0; 1024]).unwrap();
        store.register("snare", vec![0; 512]).unwrap();

        assert_eq!(store.memory_usage(), 1536);
    }

    #[test]
    fn test_load_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kick.wav");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&[9, 9, 9]).unwrap();

        let files = HashMap::from([("kick".to_string(), "kick.wav".to_string())]);

        let mut store = SampleStore::new();
        store.load_files(&files, dir.path()).unwrap();

        assert_eq!(store.bytes_for("kick").unwrap(), &[9, 9, 9]);
    }

    #[test]
    fn test_load_files_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let files = HashMap::from([("kick".to_string(), "doesnotexist.wav".to_string())]);

        let mut store = SampleStore::new();
        assert!(store.load_files(&files, dir.path()).is_err());
    }
}
