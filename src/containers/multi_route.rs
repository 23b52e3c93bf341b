//! `slice-multi-route`: one container, several path → component entries.

use std::cell::RefCell;
use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{mount_view, RouteContainer};
use crate::component::{Capabilities, Component, ComponentHandle, PropSpec, SimpleClass};
use crate::error::{BuildError, HookError};
use crate::router::RouteDef;
use crate::runtime::RuntimeContext;
use crate::types::Props;

/// Class of the built-in `MultiRoute` container.
pub fn multi_route_class() -> SimpleClass {
    SimpleClass::new("MultiRoute", MultiRoute::from_props).with_props(vec![PropSpec::new("routes").required()])
}

/// One entry of the `routes` prop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiRouteEntry {
    pub path: String,
    pub component: String,
}

/// Multi-route container. Rendered views are cached per container.
#[derive(Default)]
pub struct MultiRoute {
    routes: RefCell<Vec<MultiRouteEntry>>,
    rendered: RefCell<HashMap<String, ComponentHandle>>,
}

impl MultiRoute {
    pub fn from_props(props: &Props) -> Self {
        let multi = Self::default();
        if let Some(routes) = props.get("routes") {
            multi.set_prop("routes", routes);
        }
        multi
    }

    pub fn routes(&self) -> Vec<MultiRouteEntry> {
        self.routes.borrow().clone()
    }

    fn entry_for(&self, path: &str) -> Option<MultiRouteEntry> {
        self.routes.borrow().iter().find(|entry| entry.path == path).cloned()
    }

    /// Drop the cached view for the current path and empty the container.
    pub fn remove_component(&self, cx: &RuntimeContext, host: &ComponentHandle) {
        if let Some(entry) = self.entry_for(&cx.current_pathname()) {
            self.rendered.borrow_mut().remove(&entry.component);
            if let Some(node) = host.node() {
                cx.dom().clear_children(node);
            }
        }
    }

    async fn render(&self, cx: &RuntimeContext, host: &ComponentHandle, entry: &MultiRouteEntry) -> Result<(), BuildError> {
        let cached = self.rendered.borrow().get(&entry.component).cloned();
        if cached.as_ref().is_some_and(|view| !view.is_registered()) {
            // Destroyed since it was cached
            self.rendered.borrow_mut().remove(&entry.component);
        }
        if let Some(view) = cached.filter(|view| view.is_registered()) {
            if view.has(Capabilities::UPDATE) {
                let behavior = view.behavior().clone();
                if let Err(err) = behavior.update(cx, &view).await {
                    tracing::error!(component = "MultiRoute", slice_id = %view.slice_id(), error = %err, "error in update");
                }
            }
            mount_view(cx, host, &view);
        } else {
            if cx.registry().category_of(&entry.component).is_none() {
                tracing::error!(
                    component = "MultiRoute",
                    slice_id = %host.slice_id(),
                    view = %entry.component,
                    "component not found"
                );
                return Ok(());
            }
            let mut props = Props::new();
            props.insert("sliceId".to_string(), json!(entry.component));
            let view = cx.build(&entry.component, props).await?;
            mount_view(cx, host, &view);
            self.rendered.borrow_mut().insert(entry.component.clone(), view);
        }
        tracing::debug!(component = "MultiRoute", view = %entry.component, path = %entry.path, "route rendered");
        Ok(())
    }
}

#[async_trait(?Send)]
impl Component for MultiRoute {
    fn capabilities(&self) -> Capabilities {
        Capabilities::INIT | Capabilities::ROUTE_CONTAINER
    }

    fn set_prop(&self, name: &str, value: &Value) {
        if name != "routes" {
            return;
        }
        match serde_json::from_value::<Vec<MultiRouteEntry>>(value.clone()) {
            Ok(routes) => *self.routes.borrow_mut() = routes,
            Err(err) => tracing::warn!(component = "MultiRoute", error = %err, "ignoring malformed routes prop"),
        }
    }

    async fn init(&self, _cx: &RuntimeContext, this: &ComponentHandle) -> Result<(), HookError> {
        if self.routes.borrow().is_empty() {
            tracing::error!(component = "MultiRoute", slice_id = %this.slice_id(), "no valid routes array provided in props");
        }
        Ok(())
    }

    fn as_route_container(&self) -> Option<&dyn RouteContainer> {
        Some(self)
    }
}

#[async_trait(?Send)]
impl RouteContainer for MultiRoute {
    async fn render_if_current_route(&self, cx: &RuntimeContext, host: &ComponentHandle) -> Result<bool, BuildError> {
        match self.entry_for(&cx.current_pathname()) {
            Some(entry) => {
                self.render(cx, host, &entry).await?;
                Ok(true)
            }
            None => {
                if let Some(node) = host.node() {
                    cx.dom().clear_children(node);
                }
                Ok(false)
            }
        }
    }

    fn claimed_route(&self, pathname: &str) -> Option<RouteDef> {
        self.entry_for(pathname)
            .map(|entry| RouteDef::new(entry.path, entry.component))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_prop() {
        let mut props = Props::new();
        props.insert(
            "routes".to_string(),
            json!([
                { "path": "/", "component": "HomePage" },
                { "path": "/about", "component": "AboutPage" }
            ]),
        );
        let multi = MultiRoute::from_props(&props);
        assert_eq!(multi.routes().len(), 2);
        assert_eq!(multi.entry_for("/about").unwrap().component, "AboutPage");
        assert!(multi.entry_for("/missing").is_none());

        // Malformed input keeps the previous routes
        multi.set_prop("routes", &json!("nope"));
        assert_eq!(multi.routes().len(), 2);
    }
}
