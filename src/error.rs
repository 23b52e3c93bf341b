//! Error types.
//!
//! Identity and resource errors are returned to the immediate caller so the
//! hosting UI can react. Guard and per-container faults never leave the
//! router; they are logged where they happen.

use std::path::PathBuf;

use thiserror::Error;

/// Error raised by a lifecycle hook or a navigation guard.
pub type HookError = Box<dyn std::error::Error + 'static>;

/// A text or class resource could not be loaded.
///
/// Cloneable so a single in-flight load can be shared between builds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("component category '{0}' not found in paths configuration")]
    UnknownCategory(String),

    #[error("failed to fetch {url}: {reason}")]
    Request { url: String, reason: String },

    #[error("failed to load class module {module}: {reason}")]
    ClassImport { module: String, reason: String },
}

/// Building a component instance failed. Nothing was registered.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("component {0} not found in the component catalog")]
    UnknownComponent(String),

    #[error("component {0} is a Structural component and cannot be built")]
    Structural(String),

    #[error("component {name} is in category '{category}' which has no paths entry")]
    UnconfiguredCategory { name: String, category: String },

    #[error("error loading resources for {name}: {source}")]
    Resources {
        name: String,
        #[source]
        source: FetchError,
    },

    #[error("a component with id '{0}' is already registered")]
    IdConflict(String),

    #[error("init hook failed for {slice_id}: {source}")]
    Init {
        slice_id: String,
        #[source]
        source: HookError,
    },
}

/// A navigation was abandoned. History is left untouched.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("redirect loop detected: {}", chain.join(" -> "))]
    RedirectLoop { chain: Vec<String> },

    #[error("maximum redirect depth {max} exceeded: {}", chain.join(" -> "))]
    RedirectDepth { max: usize, chain: Vec<String> },

    #[error("render target #{0} not found in the document")]
    MissingRenderTarget(String),

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Configuration, catalog or route table could not be read.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A navigation guard misbehaved. Logged by the router, never returned.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("guard returned an error: {0}")]
    Failed(HookError),

    #[error("guard panicked: {0}")]
    Panicked(String),

    #[error("guard never called next")]
    NoDecision,
}

impl GuardError {
    /// Wrap a caught panic payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        GuardError::Panicked(message)
    }
}
