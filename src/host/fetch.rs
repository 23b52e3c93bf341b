//! Text resource fetching.
//!
//! The runtime asks a [`ResourceFetcher`] for template and stylesheet text by
//! URL path. Two implementations ship with the crate:
//! - [`MemoryFetcher`] - resources registered up front, with a request log
//! - [`DirectoryFetcher`] - resources read from a directory on disk

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::FetchError;

/// Source of text resources.
#[async_trait(?Send)]
pub trait ResourceFetcher {
    /// Fetch the body at `url`. Missing resources are errors.
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

// =============================================================================
// MemoryFetcher
// =============================================================================

/// In-memory resources keyed by URL path.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    resources: RefCell<HashMap<String, String>>,
    requests: RefCell<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.insert(url, body);
        self
    }

    pub fn insert(&self, url: impl Into<String>, body: impl Into<String>) {
        self.resources.borrow_mut().insert(url.into(), body.into());
    }

    pub fn remove(&self, url: &str) {
        self.resources.borrow_mut().remove(url);
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    /// How many times `url` was requested.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests.borrow().iter().filter(|u| *u == url).count()
    }
}

#[async_trait(?Send)]
impl ResourceFetcher for MemoryFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.requests.borrow_mut().push(url.to_string());
        self.resources
            .borrow()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Request {
                url: url.to_string(),
                reason: "Not Found".to_string(),
            })
    }
}

// =============================================================================
// DirectoryFetcher
// =============================================================================

/// Serves URL paths from files under a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File a URL path maps to. Parent-directory segments are rejected.
    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let mut resolved = self.root.clone();
        for segment in path.split('/').filter(|s| !s.is_empty() && *s != ".") {
            if segment == ".." {
                return None;
            }
            resolved.push(segment);
        }
        Some(resolved)
    }
}

#[async_trait(?Send)]
impl ResourceFetcher for DirectoryFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let path = self.resolve(url).ok_or_else(|| FetchError::Request {
            url: url.to_string(),
            reason: "path escapes resource root".to_string(),
        })?;
        std::fs::read_to_string(&path).map_err(|err| FetchError::Request {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }
}
