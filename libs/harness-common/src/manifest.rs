//! Test-case manifest loading.
//!
//! The manifest is decoded in two steps: first as plain JSON, then entry by
//! entry into [`TestCase`]. A file that is not JSON at all is reported
//! differently from a JSON document with a bad entry, and entries before a
//! bad one are still usable.

use crate::types::TestCase;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Decode(#[source] serde_json::Error),

    #[error("manifest must be a JSON array of test cases")]
    NotAnArray,

    #[error("invalid test case at index {index}: {source}")]
    InvalidEntry {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate test case id '{0}'")]
    DuplicateId(String),
}

/// A manifest that parsed as a JSON array; entries are validated lazily
#[derive(Debug, Clone)]
pub struct Manifest {
    entries: Vec<Value>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ManifestError::NotFound(path.to_path_buf()),
            _ => ManifestError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let document: Value = serde_json::from_str(content).map_err(ManifestError::Decode)?;
        match document {
            Value::Array(entries) => Ok(Self { entries }),
            _ => Err(ManifestError::NotAnArray),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Yields test cases in manifest order. The iterator stops after the
    /// first invalid or duplicate entry.
    pub fn test_cases(&self) -> TestCases<'_> {
        TestCases {
            entries: self.entries.iter().enumerate(),
            seen: HashSet::new(),
            failed: false,
        }
    }
}

pub struct TestCases<'a> {
    entries: std::iter::Enumerate<std::slice::Iter<'a, Value>>,
    seen: HashSet<String>,
    failed: bool,
}

impl Iterator for TestCases<'_> {
    type Item = Result<TestCase, ManifestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let (index, entry) = self.entries.next()?;

        let item = TestCase::deserialize(entry)
            .map_err(|source| ManifestError::InvalidEntry { index, source })
            .and_then(|tc| {
                if self.seen.insert(tc.id.clone()) {
                    Ok(tc)
                } else {
                    Err(ManifestError::DuplicateId(tc.id))
                }
            });

        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}
