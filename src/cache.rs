use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{TransformError, INJ_ERR_IO};
use crate::options::TransformOptions;
use crate::transform::TransformOutput;

pub const DEFAULT_CACHE_DIR: &str = ".injectable/cache";

#[derive(Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub output: TransformOutput,
}

pub struct IncrementalCache {
    cache_dir: PathBuf,
}

impl IncrementalCache {
    pub fn new() -> Result<Self, TransformError> {
        Self::in_dir(DEFAULT_CACHE_DIR)
    }

    pub fn in_dir(cache_dir: impl AsRef<Path>) -> Result<Self, TransformError> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir).map_err(|e| {
                TransformError::new(
                    INJ_ERR_IO,
                    &format!("Cannot create cache directory: {}", e),
                    &cache_dir.to_string_lossy(),
                )
            })?;
        }
        Ok(Self { cache_dir })
    }

    /// Hash of everything that can change the output for one file.
    pub fn compute_hash(source: &str, options: &TransformOptions) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update([0u8]);
        for target in &options.targets {
            hasher.update(target.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update([options.typescript as u8, options.jsx as u8]);
        format!("{:x}", hasher.finalize())
    }

    fn get_cache_path(&self, file_path: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(file_path.as_bytes());
        self.cache_dir.join(format!("{:x}.json", hasher.finalize()))
    }

    pub fn get(&self, file_path: &str, source: &str, options: &TransformOptions) -> Option<TransformOutput> {
        let cache_path = self.get_cache_path(file_path);
        if !cache_path.exists() {
            return None;
        }

        let data = fs::read_to_string(&cache_path).ok()?;

        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(file = %file_path, error = %e, "cache entry is corrupt, removing");
                fs::remove_file(cache_path).ok();
                return None;
            }
        };

        if entry.hash == Self::compute_hash(source, options) {
            tracing::debug!(file = %file_path, "cache hit");
            Some(entry.output)
        } else {
            None
        }
    }

    pub fn set(&self, file_path: &str, source: &str, options: &TransformOptions, output: &TransformOutput) {
        let cache_path = self.get_cache_path(file_path);
        let entry = CacheEntry {
            hash: Self::compute_hash(source, options),
            output: output.clone(),
        };

        match serde_json::to_string(&entry) {
            Ok(data) => {
                if let Err(e) = fs::write(&cache_path, data) {
                    tracing::warn!(file = %file_path, error = %e, "failed to write cache entry");
                }
            }
            Err(e) => tracing::warn!(file = %file_path, error = %e, "failed to serialize cache entry"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::transform;

    #[test]
    fn test_cache_round_trip_and_invalidation() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IncrementalCache::in_dir(dir.path().join("cache")).unwrap();
        let source = "import { fetch } from './http';\nfetch();\n";
        let options = TransformOptions::new(["fetch"]).with_file_path("src/user.js");
        let output = transform(source, &options).unwrap();

        assert!(cache.get("src/user.js", source, &options).is_none());
        cache.set("src/user.js", source, &options, &output);
        assert_eq!(cache.get("src/user.js", source, &options), Some(output.clone()));

        // Different targets or source invalidate the entry.
        let other = TransformOptions::new(["other"]).with_file_path("src/user.js");
        assert!(cache.get("src/user.js", source, &other).is_none());
        assert!(cache.get("src/user.js", "fetch(1);", &options).is_none());
    }

    #[test]
    fn test_corrupt_entry_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IncrementalCache::in_dir(dir.path()).unwrap();
        let options = TransformOptions::new(["a"]);
        let path = cache.get_cache_path("a.js");
        fs::write(&path, "{ not json").unwrap();

        assert!(cache.get("a.js", "a();", &options).is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_hash_depends_on_flags() {
        let mut options = TransformOptions::new(["a"]);
        let with_jsx = IncrementalCache::compute_hash("a();", &options);
        options.jsx = false;
        assert_ne!(with_jsx, IncrementalCache::compute_hash("a();", &options));
    }
}
