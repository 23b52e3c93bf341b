//! Components - Behaviour, classes and the instance registry.
//!
//! A component is split in three:
//! - [`ComponentClass`] - what a dynamic import yields: name, declared props,
//!   and a constructor
//! - [`Component`] - the behaviour object a class constructs; lifecycle hooks
//!   and prop accessors
//! - [`ComponentInstance`] - the runtime's record: identity, host node, props
//!
//! Lifecycle hooks are optional capabilities. A component advertises the hooks
//! it implements through [`Component::capabilities`] and the runtime only
//! dispatches to advertised hooks.
//!
//! ```ignore
//! struct Counter { clicks: Cell<u32> }
//!
//! #[async_trait(?Send)]
//! impl Component for Counter {
//!     fn capabilities(&self) -> Capabilities {
//!         Capabilities::INIT
//!     }
//!
//!     async fn init(&self, cx: &RuntimeContext, this: &ComponentHandle) -> Result<(), HookError> {
//!         let icon = cx.build("Icon", Props::new()).await?;
//!         // ...
//!         Ok(())
//!     }
//! }
//! ```

mod instance;
mod registry;

use std::rc::Rc;

use async_trait::async_trait;
use serde_json::Value;

use crate::containers::RouteContainer;
use crate::error::HookError;
use crate::runtime::RuntimeContext;
use crate::types::Props;

pub use instance::{ComponentHandle, ComponentInstance};
pub use registry::{ComponentRegistry, DestroyTarget, IdPattern};

// =============================================================================
// Capabilities
// =============================================================================

bitflags::bitflags! {
    /// Optional hooks a component implements.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Capabilities: u8 {
        const INIT = 1 << 0;
        const UPDATE = 1 << 1;
        const BEFORE_DESTROY = 1 << 2;
        const ROUTE_CONTAINER = 1 << 3;
    }
}

// =============================================================================
// Component Behaviour
// =============================================================================

/// Behaviour object of a component instance.
///
/// Every method has a no-op default. Hooks only run when the matching
/// [`Capabilities`] flag is returned from [`Component::capabilities`].
#[async_trait(?Send)]
pub trait Component {
    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    /// Accessor side effects for one prop assignment.
    fn set_prop(&self, _name: &str, _value: &Value) {}

    /// Runs once after construction, before registration.
    async fn init(&self, _cx: &RuntimeContext, _this: &ComponentHandle) -> Result<(), HookError> {
        Ok(())
    }

    /// Runs when a cached instance is shown again.
    async fn update(&self, _cx: &RuntimeContext, _this: &ComponentHandle) -> Result<(), HookError> {
        Ok(())
    }

    /// Runs before the registry forgets the instance.
    fn before_destroy(&self, _this: &ComponentInstance) -> Result<(), HookError> {
        Ok(())
    }

    /// Route containers expose their render entry point here.
    fn as_route_container(&self) -> Option<&dyn RouteContainer> {
        None
    }
}

// =============================================================================
// Prop Declarations
// =============================================================================

/// One declared prop of a component class.
#[derive(Debug, Clone, PartialEq)]
pub struct PropSpec {
    pub name: String,
    pub default: Option<Value>,
    pub required: bool,
}

impl PropSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            required: false,
        }
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

// =============================================================================
// Component Classes
// =============================================================================

/// What a class module import yields.
pub trait ComponentClass {
    /// Class name; also the key of the resource cache.
    fn name(&self) -> &str;

    /// Declared props. Empty means "accept anything, validate nothing".
    fn props(&self) -> &[PropSpec] {
        &[]
    }

    /// Construct the behaviour object. `props` excludes `id` and `sliceId`.
    fn construct(&self, props: &Props) -> Rc<dyn Component>;
}

type Constructor = Box<dyn Fn(&Props) -> Rc<dyn Component>>;

/// A [`ComponentClass`] made from a name and a constructor closure.
pub struct SimpleClass {
    name: String,
    props: Vec<PropSpec>,
    constructor: Constructor,
}

impl SimpleClass {
    pub fn new<F, C>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&Props) -> C + 'static,
        C: Component + 'static,
    {
        Self {
            name: name.into(),
            props: Vec::new(),
            constructor: Box::new(move |props| Rc::new(constructor(props)) as Rc<dyn Component>),
        }
    }

    pub fn with_props(mut self, props: Vec<PropSpec>) -> Self {
        self.props = props;
        self
    }
}

impl ComponentClass for SimpleClass {
    fn name(&self) -> &str {
        &self.name
    }

    fn props(&self) -> &[PropSpec] {
        &self.props
    }

    fn construct(&self, props: &Props) -> Rc<dyn Component> {
        (self.constructor)(props)
    }
}

/// Behaviour for components that only carry markup.
#[derive(Debug, Default, Clone, Copy)]
pub struct Markup;

impl Component for Markup {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prop_spec_builder() {
        let spec = PropSpec::new("label").default_value("OK").required();
        assert_eq!(spec.name, "label");
        assert_eq!(spec.default, Some(json!("OK")));
        assert!(spec.required);
    }

    #[test]
    fn test_simple_class() {
        let class = SimpleClass::new("Badge", |_| Markup).with_props(vec![PropSpec::new("text")]);
        assert_eq!(class.name(), "Badge");
        assert_eq!(class.props().len(), 1);

        let behaviour = class.construct(&Props::new());
        assert_eq!(behaviour.capabilities(), Capabilities::empty());
        assert!(behaviour.as_route_container().is_none());
    }
}
