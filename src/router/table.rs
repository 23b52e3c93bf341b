//! Route table - Flattened route descriptors keyed by full path.

use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::matcher::PathPattern;
use crate::error::ConfigError;
use crate::types::Metadata;

/// One route as the app declares it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDef {
    pub path: String,
    pub component: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RouteDef>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl RouteDef {
    pub fn new(path: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            component: component.into(),
            children: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<RouteDef>) -> Self {
        self.children = children;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Parse a JSON route list.
pub fn parse_routes(json: &str) -> Result<Vec<RouteDef>, ConfigError> {
    Ok(serde_json::from_str(json)?)
}

/// A flattened route. Immutable once the table is built.
#[derive(Debug)]
pub struct RouteDescriptor {
    pub path: String,
    pub component: String,
    pub full_path: String,
    pub metadata: Metadata,
    pub parent: Option<Rc<RouteDescriptor>>,
    pattern: Option<PathPattern>,
}

impl RouteDescriptor {
    /// A descriptor outside any table, e.g. for a route container's own path.
    pub fn standalone(path: &str, component: &str) -> Self {
        let full_path = normalize_path(path);
        Self {
            path: path.to_string(),
            component: component.to_string(),
            pattern: PathPattern::compile(&full_path),
            full_path,
            metadata: Metadata::new(),
            parent: None,
        }
    }

    /// Compiled pattern when the full path has `${name}` segments.
    pub fn pattern(&self) -> Option<&PathPattern> {
        self.pattern.as_ref()
    }

    pub fn is_dynamic(&self) -> bool {
        self.pattern.is_some()
    }

    /// Component mounted for this route: the parent's for nested routes.
    pub fn rendered_component(&self) -> &str {
        match &self.parent {
            Some(parent) => &parent.component,
            None => &self.component,
        }
    }
}

/// Collapse runs of `/` into one.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for ch in path.chars() {
        if ch == '/' && out.ends_with('/') {
            continue;
        }
        out.push(ch);
    }
    out
}

/// Full path → descriptor, in depth-first declaration order.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: IndexMap<String, Rc<RouteDescriptor>>,
}

impl RouteTable {
    pub fn new(defs: &[RouteDef]) -> Self {
        let mut table = Self::default();
        table.flatten(defs, "", None);
        table
    }

    fn flatten(&mut self, defs: &[RouteDef], base: &str, parent: Option<&Rc<RouteDescriptor>>) {
        for def in defs {
            let full_path = normalize_path(&format!("{base}{}", def.path));
            let descriptor = Rc::new(RouteDescriptor {
                path: def.path.clone(),
                component: def.component.clone(),
                pattern: PathPattern::compile(&full_path),
                full_path: full_path.clone(),
                metadata: def.metadata.clone(),
                parent: parent.cloned(),
            });
            // Later declarations of the same full path replace earlier ones
            self.routes.insert(full_path.clone(), descriptor.clone());
            if !def.children.is_empty() {
                self.flatten(&def.children, &full_path, Some(&descriptor));
            }
        }
    }

    pub fn get(&self, full_path: &str) -> Option<&Rc<RouteDescriptor>> {
        self.routes.get(full_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<RouteDescriptor>> {
        self.routes.values()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
