//! Saving fetched payloads into the output directory.
//!
//! Each payload goes to `<name>.part` first and is renamed into place once fully written,
//! so an interrupted run never leaves a truncated file under the final name.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Temporary file suffix used before the rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Where a payload ended up and its SHA-256 (lowercase hex).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPayload {
    pub path: PathBuf,
    pub sha256: String,
}

/// Output directory for payloads.
#[derive(Debug, Clone)]
pub struct PayloadStore {
    dir: PathBuf,
}

impl PayloadStore {
    /// Use `dir`, creating it (and parents) if absent.
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `data` as `name` (already sanitized). An existing file of that name is replaced.
    pub fn save(&self, name: &str, data: &[u8]) -> Result<SavedPayload> {
        let final_path = self.dir.join(name);
        let tp = temp_path(&final_path);

        let mut file = fs::File::create(&tp)
            .with_context(|| format!("failed to create temp file: {}", tp.display()))?;
        file.write_all(data)
            .with_context(|| format!("failed to write {}", tp.display()))?;
        file.sync_all().context("storage sync failed")?;
        drop(file);

        fs::rename(&tp, &final_path).with_context(|| {
            format!("failed to rename {} to {}", tp.display(), final_path.display())
        })?;

        let saved = SavedPayload {
            path: final_path,
            sha256: sha256_hex(data),
        };
        tracing::debug!(path = %saved.path.display(), sha256 = %saved.sha256, bytes = data.len(), "payload saved");
        Ok(saved)
    }
}

/// Path for the temp file: appends `.part` to the final path (e.g. `logo.png` → `logo.png.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("logo.png"));
        assert_eq!(p.to_string_lossy(), "logo.png.part");
    }

    #[test]
    fn create_makes_nested_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("out/nested");
        let store = PayloadStore::create(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(store.dir(), dir.as_path());
    }

    #[test]
    fn save_writes_bytes_and_digest() {
        let root = tempfile::tempdir().unwrap();
        let store = PayloadStore::create(root.path()).unwrap();
        let saved = store.save("hello.txt", b"hello\n").unwrap();
        assert_eq!(saved.path, root.path().join("hello.txt"));
        assert_eq!(fs::read(&saved.path).unwrap(), b"hello\n");
        assert!(!temp_path(&saved.path).exists());
        assert_eq!(
            saved.sha256,
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }

    #[test]
    fn save_replaces_existing() {
        let root = tempfile::tempdir().unwrap();
        let store = PayloadStore::create(root.path()).unwrap();
        store.save("a.bin", b"old").unwrap();
        store.save("a.bin", b"new").unwrap();
        assert_eq!(fs::read(root.path().join("a.bin")).unwrap(), b"new");
    }
}
