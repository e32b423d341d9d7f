//! External file references.
//!
//! A [`FileHandle`] is an opaque scalar carried through the graph like any
//! other leaf value: a filesystem path plus an optional content checksum.
//! The graph core never opens the file; checksum bookkeeping lives here, at
//! the collaborator boundary.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path as FsPath, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::path::ScopedPath;
use crate::value::Value;

#[derive(Error, Debug)]
pub enum ExternalError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reference to an external file: path plus optional stored checksum.
///
/// The checksum is absent on first use and recorded by the caller once
/// computed, so later runs can detect that the referenced data changed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileHandle {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl FileHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileHandle {
            path: path.into(),
            checksum: None,
        }
    }

    pub fn with_checksum(path: impl Into<PathBuf>, checksum: impl Into<String>) -> Self {
        FileHandle {
            path: path.into(),
            checksum: Some(checksum.into()),
        }
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Validation outcome for one file handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
    /// Leaf path carrying the handle.
    pub path: ScopedPath,
    pub handle: FileHandle,
    pub computed: String,
    /// No stored checksum yet (first run).
    pub is_new: bool,
    /// Stored checksum matches the computed one (always true when new).
    pub is_valid: bool,
}

/// Validation outcomes for every file handle found in a leaf-value map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumReport {
    pub entries: Vec<ChecksumEntry>,
}

impl ChecksumReport {
    pub fn has_new(&self) -> bool {
        self.entries.iter().any(|e| e.is_new)
    }

    pub fn has_mismatches(&self) -> bool {
        self.entries.iter().any(|e| !e.is_valid)
    }

    pub fn mismatched(&self) -> impl Iterator<Item = &ChecksumEntry> {
        self.entries.iter().filter(|e| !e.is_valid)
    }
}

/// Computes `sha256:<hex>` for a file, streaming in chunks.
pub fn compute_checksum(path: &FsPath) -> Result<String, ExternalError> {
    let mut file = File::open(path).map_err(|source| ExternalError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file.read(&mut buffer).map_err(|source| ExternalError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("sha256:{:x}", hasher.finalize()))
}

/// Computes and compares checksums for every [`FileHandle`] in `values`.
///
/// Handles without a stored checksum are reported as new rather than
/// invalid; a stored checksum that no longer matches is a mismatch the
/// caller surfaces to the user.
pub fn verify_handles(
    values: &BTreeMap<ScopedPath, Value>,
) -> Result<ChecksumReport, ExternalError> {
    let mut entries = Vec::new();
    for (path, value) in values {
        let Value::File(handle) = value else {
            continue;
        };
        let computed = compute_checksum(&handle.path)?;
        let is_new = handle.checksum.is_none();
        let is_valid = match &handle.checksum {
            None => true,
            Some(stored) => stored == &computed,
        };
        entries.push(ChecksumEntry {
            path: path.clone(),
            handle: handle.clone(),
            computed,
            is_new,
            is_valid,
        });
    }
    Ok(ChecksumReport { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Path;
    use std::io::Write;

    #[test]
    fn test_first_run_is_new_then_valid() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("orbit.dat");
        let mut f = File::create(&file_path).unwrap();
        f.write_all(b"ephemeris").unwrap();

        let leaf = ScopedPath::new("Orbit", Path::model());
        let mut values = BTreeMap::new();
        values.insert(leaf.clone(), Value::File(FileHandle::new(&file_path)));

        let report = verify_handles(&values).unwrap();
        assert_eq!(report.entries.len(), 1);
        assert!(report.entries[0].is_new);
        assert!(report.entries[0].is_valid);
        let computed = report.entries[0].computed.clone();
        assert!(computed.starts_with("sha256:"));

        // Second run with the recorded checksum validates cleanly.
        values.insert(
            leaf,
            Value::File(FileHandle::with_checksum(&file_path, computed)),
        );
        let report = verify_handles(&values).unwrap();
        assert!(!report.has_new());
        assert!(!report.has_mismatches());
    }

    #[test]
    fn test_changed_content_is_a_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("orbit.dat");
        std::fs::write(&file_path, b"v1").unwrap();
        let stored = compute_checksum(&file_path).unwrap();
        std::fs::write(&file_path, b"v2").unwrap();

        let mut values = BTreeMap::new();
        values.insert(
            ScopedPath::new("Orbit", Path::model()),
            Value::File(FileHandle::with_checksum(&file_path, stored)),
        );
        let report = verify_handles(&values).unwrap();
        assert!(report.has_mismatches());
        assert_eq!(report.mismatched().count(), 1);
    }
}
