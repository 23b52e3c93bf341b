//! # slice-runtime
//!
//! Runtime core for Slice-style component web apps: a component registry, a
//! resource loader that builds components from class/template/CSS triples,
//! and a client-side router with guards and route containers.
//!
//! ## Architecture
//!
//! Everything is single-threaded and cooperative. Subsystems are reached
//! through one explicit [`RuntimeContext`]:
//!
//! ```text
//! Router → RouteContainers → ResourceLoader → ComponentRegistry → Dom
//!   ↓                              ↓
//! History                  ResourceFetcher / ClassLoader
//! ```
//!
//! The current path is exposed as a [spark-signals](https://github.com/RLabs-Inc/spark-signals)
//! `Signal` for reactive consumers.
//!
//! ## Modules
//!
//! - [`types`] - Shared aliases, component kinds, resource types, tag helpers
//! - [`config`] - `sliceConfig` / component catalog (serde)
//! - [`dom`] - Node arena, mutation observers, template parsing
//! - [`host`] - Fetcher, class loader and history seams
//! - [`component`] - Component trait, classes, instances, registry
//! - [`loader`] - The build pipeline and resource cache
//! - [`router`] - Route table, matching, guards, navigation
//! - [`containers`] - `Route` and `MultiRoute`

pub mod component;
pub mod config;
pub mod containers;
pub mod dom;
pub mod error;
pub mod host;
pub mod loader;
pub mod logging;
pub mod router;
pub mod runtime;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use component::{
    Capabilities, Component, ComponentClass, ComponentHandle, ComponentInstance, ComponentRegistry,
    DestroyTarget, IdPattern, Markup, PropSpec, SimpleClass,
};

pub use config::{CategoryPath, ComponentCatalog, LoggerConfig, PathsConfig, RouterConfig, SliceConfig};

pub use containers::{MultiRoute, MultiRouteEntry, Route, RouteContainer, RouteViewCache};

pub use dom::{Dom, MutationRecord, NodeId, Template, TemplateNode};

pub use error::{BuildError, ConfigError, FetchError, GuardError, HookError, NavigationError};

pub use host::{
    ClassLoader, DirectoryFetcher, History, Host, Location, MemoryFetcher, MemoryHistory, ResourceFetcher,
    StaticClassLoader,
};

pub use loader::ResourceLoader;

pub use logging::init_logging;

pub use router::{
    GuardDecision, NavigationContext, NavigationOutcome, Next, RouteDef, RouteDescriptor, RouteMatch,
    RouteTable, Router,
};

pub use runtime::{start, RuntimeContext};
