//! Core types for slice-runtime.
//!
//! These are the small value types shared by the registry, the build pipeline
//! and the router: prop maps, route params, component kinds, resource types
//! and the reserved tag names of the DOM contract.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Props & Params
// =============================================================================

/// Props handed to a component at build time or assigned later.
pub type Props = BTreeMap<String, Value>;

/// Values captured from `${name}` placeholders of a dynamic route.
pub type Params = BTreeMap<String, String>;

/// Parsed `?key=value` pairs of a location.
pub type Query = BTreeMap<String, String>;

/// Free-form metadata attached to a route descriptor.
pub type Metadata = BTreeMap<String, Value>;

/// Route params as the `params` prop value: a JSON object of strings.
pub fn params_value(params: Params) -> Value {
    Value::Object(params.into_iter().map(|(key, value)| (key, Value::String(value))).collect())
}

/// Props holding only `params`.
pub fn params_props(params: Params) -> Props {
    let mut props = Props::new();
    props.insert("params".to_string(), params_value(params));
    props
}

// =============================================================================
// Component Kinds
// =============================================================================

/// Category name reserved for framework-internal components.
///
/// Structural components are never buildable and resolve their resources
/// from a fixed location instead of the category path map.
pub const STRUCTURAL_CATEGORY: &str = "Structural";

/// Whether a category carries markup and styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    /// Class + template + CSS, mounted as a DOM element.
    Visual,
    /// Class only, never mounted.
    Service,
}

impl ComponentKind {
    pub fn is_visual(self) -> bool {
        matches!(self, ComponentKind::Visual)
    }
}

// =============================================================================
// Resource Types
// =============================================================================

/// Kind of text resource resolved by the registry's fetch helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// Component template markup (`X.html`).
    Html,
    /// Component stylesheet (`X.css`).
    Css,
    /// Theme stylesheet under the themes path.
    Theme,
    /// Global stylesheet under the styles path.
    Styles,
}

impl ResourceType {
    /// File extension used when building the resource URL.
    pub fn extension(self) -> &'static str {
        match self {
            ResourceType::Html => "html",
            ResourceType::Css | ResourceType::Theme | ResourceType::Styles => "css",
        }
    }

    /// Template and component CSS live next to the component class.
    pub fn is_component_resource(self) -> bool {
        matches!(self, ResourceType::Html | ResourceType::Css)
    }

    pub fn label(self) -> &'static str {
        match self {
            ResourceType::Html => "html",
            ResourceType::Css => "css",
            ResourceType::Theme => "theme",
            ResourceType::Styles => "styles",
        }
    }
}

// =============================================================================
// DOM Contract
// =============================================================================

/// Prefix of every element tag owned by the runtime.
pub const CUSTOM_TAG_PREFIX: &str = "slice-";

/// Tag of the single-route container.
pub const ROUTE_TAG: &str = "slice-route";

/// Tag of the multi-route container.
pub const MULTI_ROUTE_TAG: &str = "slice-multi-route";

/// Attribute carrying a component's identity on its host element.
pub const SLICE_ID_ATTR: &str = "slice-id";

/// Host element tag for a component class: `HomePage` → `slice-home-page`.
pub fn component_tag(class_name: &str) -> String {
    let mut tag = String::from(CUSTOM_TAG_PREFIX);
    for (i, ch) in class_name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                tag.push('-');
            }
            tag.push(ch.to_ascii_lowercase());
        } else {
            tag.push(ch);
        }
    }
    tag
}

/// Whether `tag` names a route container element.
pub fn is_route_container_tag(tag: &str) -> bool {
    tag == ROUTE_TAG || tag == MULTI_ROUTE_TAG
}

/// Auto-assigned identity: lowercase-initial class name plus counter.
pub fn generated_slice_id(class_name: &str, counter: usize) -> String {
    let mut chars = class_name.chars();
    match chars.next() {
        Some(first) => format!("{}{}-{counter}", first.to_lowercase(), chars.as_str()),
        None => format!("component-{counter}"),
    }
}
