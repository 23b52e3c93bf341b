//! `slice-route`: renders one component when its path is current.
//!
//! The path may hold `${name}` segments; the values they capture reach the
//! rendered view as its `params` prop.

use std::cell::RefCell;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{mount_view, string_prop, RouteContainer};
use crate::component::{Capabilities, Component, ComponentHandle, PropSpec, SimpleClass};
use crate::error::{BuildError, HookError};
use crate::router::{PathPattern, RouteDef};
use crate::runtime::RuntimeContext;
use crate::types::{params_props, params_value, Params, Props};

/// Class of the built-in `Route` container.
pub fn route_class() -> SimpleClass {
    SimpleClass::new("Route", Route::from_props)
        .with_props(vec![PropSpec::new("path"), PropSpec::new("component")])
}

/// Single-route container.
///
/// Views are shared by component name through the runtime's
/// [`RouteViewCache`](super::RouteViewCache), so two `Route`s naming the same
/// component show the same instance.
#[derive(Debug, Default)]
pub struct Route {
    path: RefCell<Option<String>>,
    pattern: RefCell<Option<PathPattern>>,
    component: RefCell<Option<String>>,
}

impl Route {
    pub fn from_props(props: &Props) -> Self {
        let route = Self {
            component: RefCell::new(props.get("component").and_then(string_prop)),
            ..Self::default()
        };
        route.set_path(props.get("path").and_then(string_prop));
        route
    }

    fn set_path(&self, path: Option<String>) {
        *self.pattern.borrow_mut() = path.as_deref().and_then(PathPattern::compile);
        *self.path.borrow_mut() = path;
    }

    pub fn path(&self) -> Option<String> {
        self.path.borrow().clone()
    }

    /// Params bound when `pathname` matches this container's path.
    ///
    /// Paths without placeholders must equal `pathname`.
    pub fn match_path(&self, pathname: &str) -> Option<Params> {
        if let Some(pattern) = self.pattern.borrow().as_ref() {
            return pattern.matches(pathname);
        }
        let path = self.path.borrow();
        (path.as_deref()? == pathname).then(Params::new)
    }

    pub fn component(&self) -> Option<String> {
        self.component.borrow().clone()
    }

    /// Forget the shared view and empty the container.
    pub fn remove_component(&self, cx: &RuntimeContext, host: &ComponentHandle) {
        if let Some(component) = self.component() {
            cx.route_views().remove(&component);
        }
        if let Some(node) = host.node() {
            cx.dom().clear_children(node);
        }
    }

    async fn render(
        &self,
        cx: &RuntimeContext,
        host: &ComponentHandle,
        component: &str,
        params: Params,
    ) -> Result<(), BuildError> {
        let cached = cx.route_views().get(component);
        if let Some(view) = cached.filter(|view| view.is_registered()) {
            cx.registry().assign_props(&view, params_props(params));
            if view.has(Capabilities::UPDATE) {
                let behavior = view.behavior().clone();
                if let Err(err) = behavior.update(cx, &view).await {
                    tracing::error!(component = "Route", slice_id = %view.slice_id(), error = %err, "error in update");
                }
            }
            mount_view(cx, host, &view);
            return Ok(());
        }
        // Destroyed since it was cached
        if cx.route_views().remove(component).is_some() {
            tracing::debug!(component = "Route", view = component, "dropping destroyed view");
        }

        if cx.registry().category_of(component).is_none() {
            tracing::error!(component = "Route", slice_id = %host.slice_id(), view = component, "component not found");
            return Ok(());
        }

        let mut props = Props::new();
        props.insert("sliceId".to_string(), json!(component));
        props.insert("params".to_string(), params_value(params));
        let view = cx.build(component, props).await?;
        mount_view(cx, host, &view);
        cx.route_views().insert(component, view);
        Ok(())
    }
}

#[async_trait(?Send)]
impl Component for Route {
    fn capabilities(&self) -> Capabilities {
        Capabilities::INIT | Capabilities::ROUTE_CONTAINER
    }

    fn set_prop(&self, name: &str, value: &Value) {
        match name {
            "path" => self.set_path(string_prop(value)),
            "component" => *self.component.borrow_mut() = string_prop(value),
            _ => {}
        }
    }

    async fn init(&self, cx: &RuntimeContext, this: &ComponentHandle) -> Result<(), HookError> {
        if self.component().is_some() {
            return Ok(());
        }
        let resolved = self
            .path()
            .and_then(|path| cx.route_table()?.get(&path).map(|route| route.component.clone()));
        match resolved {
            Some(component) => *self.component.borrow_mut() = Some(component),
            None => tracing::error!(
                component = "Route",
                slice_id = %this.slice_id(),
                path = ?self.path(),
                "no component given and none found in the route table"
            ),
        }
        Ok(())
    }

    fn as_route_container(&self) -> Option<&dyn RouteContainer> {
        Some(self)
    }
}

#[async_trait(?Send)]
impl RouteContainer for Route {
    async fn render_if_current_route(&self, cx: &RuntimeContext, host: &ComponentHandle) -> Result<bool, BuildError> {
        let Some(component) = self.component() else {
            return Ok(false);
        };
        let Some(params) = self.match_path(&cx.current_pathname()) else {
            return Ok(false);
        };
        self.render(cx, host, &component, params).await?;
        Ok(true)
    }

    fn claimed_route(&self, pathname: &str) -> Option<RouteDef> {
        self.match_path(pathname)?;
        Some(RouteDef::new(self.path()?, self.component()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_props() {
        let mut props = Props::new();
        props.insert("path".to_string(), json!("/docs"));
        props.insert("component".to_string(), json!("  "));
        let route = Route::from_props(&props);
        assert_eq!(route.path().as_deref(), Some("/docs"));
        assert_eq!(route.component(), None);

        route.set_prop("component", &json!("DocsPage"));
        assert_eq!(route.component().as_deref(), Some("DocsPage"));
        assert!(route.capabilities().contains(Capabilities::ROUTE_CONTAINER));
        assert!(route.as_route_container().is_some());
    }

    #[test]
    fn test_match_path() {
        let mut props = Props::new();
        props.insert("path".to_string(), json!("/deck/${id}"));
        props.insert("component".to_string(), json!("DeckDetail"));
        let route = Route::from_props(&props);

        let params = route.match_path("/deck/5").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("5"));
        assert!(route.match_path("/deck").is_none());
        assert!(route.match_path("/deck/5/edit").is_none());
        assert_eq!(route.claimed_route("/deck/5"), Some(RouteDef::new("/deck/${id}", "DeckDetail")));
        assert_eq!(route.claimed_route("/home"), None);

        // Plain paths compare as strings
        route.set_prop("path", &json!("/about"));
        assert_eq!(route.match_path("/about"), Some(Params::new()));
        assert!(route.match_path("/deck/5").is_none());
    }
}
