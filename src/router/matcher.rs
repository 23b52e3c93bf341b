//! Path matching.
//!
//! Lookup order: exact full path, then the first `${name}` pattern in table
//! order, then `/404`, then nothing.

use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;

use super::table::{RouteDescriptor, RouteTable};
use crate::types::Params;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]+)\}").unwrap_or_else(|err| unreachable!("placeholder regex: {err}"))
});

/// A compiled `${name}` route pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    regex: Regex,
    names: Vec<String>,
}

impl PathPattern {
    /// Compile `pattern`, or `None` when it has no placeholders.
    ///
    /// Each `${name}` matches one non-empty segment; everything else matches
    /// literally and the whole path must match.
    pub fn compile(pattern: &str) -> Option<Self> {
        if !PLACEHOLDER.is_match(pattern) {
            return None;
        }
        let mut names = Vec::new();
        let mut source = String::from("^");
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(pattern) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            source.push_str(&regex::escape(&pattern[last..whole.start()]));
            source.push_str("([^/]+)");
            names.push(name.as_str().to_string());
            last = whole.end();
        }
        source.push_str(&regex::escape(&pattern[last..]));
        source.push('$');

        match Regex::new(&source) {
            Ok(regex) => Some(Self { regex, names }),
            Err(err) => {
                tracing::error!(component = "Router", pattern, error = %err, "invalid route pattern");
                None
            }
        }
    }

    /// Parameter names in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Bound parameters when `path` matches.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let caps = self.regex.captures(path)?;
        Some(
            self.names
                .iter()
                .enumerate()
                .filter_map(|(i, name)| caps.get(i + 1).map(|m| (name.clone(), m.as_str().to_string())))
                .collect(),
        )
    }
}

/// Result of [`RouteTable::match_route`].
#[derive(Debug, Clone, Default)]
pub struct RouteMatch {
    /// Route to mount. The parent route when the match is nested.
    pub route: Option<Rc<RouteDescriptor>>,
    /// The nested entry that actually matched.
    pub child_route: Option<Rc<RouteDescriptor>>,
    pub params: Params,
}

impl RouteMatch {
    fn found(matched: &Rc<RouteDescriptor>, params: Params) -> Self {
        match &matched.parent {
            Some(parent) => Self {
                route: Some(parent.clone()),
                child_route: Some(matched.clone()),
                params,
            },
            None => Self {
                route: Some(matched.clone()),
                child_route: None,
                params,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.route.is_none()
    }

    /// The entry that matched: child if nested, otherwise the route.
    pub fn matched(&self) -> Option<&Rc<RouteDescriptor>> {
        self.child_route.as_ref().or(self.route.as_ref())
    }
}

/// Drop any query string or fragment.
pub fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

impl RouteTable {
    pub fn match_route(&self, path: &str) -> RouteMatch {
        let path = strip_query(path);
        if let Some(exact) = self.get(path) {
            return RouteMatch::found(exact, Params::new());
        }
        for route in self.iter() {
            if let Some(params) = route.pattern().and_then(|pattern| pattern.matches(path)) {
                return RouteMatch::found(route, params);
            }
        }
        match self.get("/404") {
            Some(not_found) => RouteMatch::found(not_found, Params::new()),
            None => RouteMatch::default(),
        }
    }
}
