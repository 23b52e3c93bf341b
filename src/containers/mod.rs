//! Route containers - `slice-route` and `slice-multi-route`.
//!
//! Containers are ordinary visual components placed in page markup. After
//! every navigation the router finds them in the document and asks each one
//! to render through [`RouteContainer::render_if_current_route`].

mod multi_route;
mod route;

use std::cell::RefCell;
use std::collections::HashMap;

use async_trait::async_trait;

use crate::component::ComponentHandle;
use crate::error::BuildError;
use crate::router::RouteDef;
use crate::runtime::RuntimeContext;

pub use multi_route::{MultiRoute, MultiRouteEntry, multi_route_class};
pub use route::{Route, route_class};

/// A component that renders a view when the current location matches.
#[async_trait(?Send)]
pub trait RouteContainer {
    /// Render if this container's route is current.
    ///
    /// Returns whether it matched. `host` is the container's own instance.
    async fn render_if_current_route(&self, cx: &RuntimeContext, host: &ComponentHandle) -> Result<bool, BuildError>;

    /// The path and component this container renders for `pathname`.
    fn claimed_route(&self, pathname: &str) -> Option<RouteDef>;
}

/// Views rendered by `Route` containers, shared runtime-wide by component name.
#[derive(Default)]
pub struct RouteViewCache {
    views: RefCell<HashMap<String, ComponentHandle>>,
}

impl RouteViewCache {
    pub fn get(&self, component: &str) -> Option<ComponentHandle> {
        self.views.borrow().get(component).cloned()
    }

    pub fn insert(&self, component: &str, view: ComponentHandle) {
        self.views.borrow_mut().insert(component.to_string(), view);
    }

    pub fn remove(&self, component: &str) -> Option<ComponentHandle> {
        self.views.borrow_mut().remove(component)
    }

    pub fn len(&self) -> usize {
        self.views.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.borrow().is_empty()
    }
}

/// Swap the children of `host`'s element for `view`'s element.
fn mount_view(cx: &RuntimeContext, host: &ComponentHandle, view: &ComponentHandle) {
    let (Some(container), Some(node)) = (host.node(), view.node()) else {
        return;
    };
    let dom = cx.dom();
    if dom.children(container) == [node] {
        return;
    }
    dom.clear_children(container);
    dom.append_child(container, node);
}

/// Non-blank string value of a prop.
fn string_prop(value: &serde_json::Value) -> Option<String> {
    value.as_str().map(str::to_string).filter(|s| !s.trim().is_empty())
}
