//! Router - Guarded navigation, debounced rendering and route mounting.
//!
//! Every entry point (`navigate`, `replace`, `on_route_change`, `init`) goes
//! through the same chain:
//!
//! 1. Guard evaluation; redirects recurse with the visited chain
//! 2. History update (push / replace / none for popstate)
//! 3. Debounce: only the latest pending render runs
//! 4. Render: route containers in the page first, else mount the matched
//!    route into the render target
//!
//! Guard faults fail open. Redirect loops and over-deep chains abandon the
//! navigation without touching history.

use std::cell::{Cell, RefCell};
use std::panic::AssertUnwindSafe;
use std::rc::Rc;
use std::time::Duration;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use futures_timer::Delay;
use serde_json::Value;
use spark_signals::{signal, Signal};

use super::container_cache::RouteContainerCache;
use super::guard::{AfterEachGuard, AfterFn, BeforeEachGuard, BeforeFn, GuardDecision, NavigationContext, Next};
use super::matcher::RouteMatch;
use super::table::{RouteDef, RouteDescriptor, RouteTable};
use crate::component::{Capabilities, ComponentInstance};
use crate::dom::NodeId;
use crate::error::{GuardError, HookError, NavigationError};
use crate::host::Location;
use crate::runtime::RuntimeContext;
use crate::types::{params_props, Params};

/// How a navigation touches history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Push,
    Replace,
    /// History already moved (popstate, initial load).
    Pop,
}

/// How a navigation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The target was rendered.
    Rendered,
    /// A guard cancelled it.
    Cancelled,
    /// A newer navigation took over during the debounce window.
    Superseded,
    /// Nothing matched and no `/404` route exists.
    NotFound,
}

pub struct Router {
    cx: Rc<RuntimeContext>,
    table: Rc<RouteTable>,
    containers: Rc<RouteContainerCache>,
    before_each: RefCell<Option<Rc<dyn BeforeEachGuard>>>,
    after_each: RefCell<Option<Rc<dyn AfterEachGuard>>>,
    active_route: RefCell<Option<Rc<RouteDescriptor>>>,
    current: RefCell<Option<NavigationContext>>,
    render_generation: Cell<u64>,
    current_path: Signal<String>,
    debounce: Duration,
    max_redirect_depth: usize,
}

impl Router {
    pub fn new(cx: Rc<RuntimeContext>, routes: &[RouteDef]) -> Rc<Self> {
        let table = Rc::new(RouteTable::new(routes));
        cx.set_route_table(table.clone());

        let router_config = &cx.config().router;
        let containers = RouteContainerCache::new(router_config.container_cache_ttl());
        containers.attach(cx.dom());

        tracing::debug!(component = "Router", routes = table.len(), "route table built");
        Rc::new(Self {
            table,
            containers,
            before_each: RefCell::new(None),
            after_each: RefCell::new(None),
            active_route: RefCell::new(None),
            current: RefCell::new(None),
            render_generation: Cell::new(0),
            current_path: signal(cx.current_pathname()),
            debounce: router_config.debounce(),
            max_redirect_depth: router_config.max_redirect_depth,
            cx,
        })
    }

    // -------------------------------------------------------------------------
    // Guards
    // -------------------------------------------------------------------------

    /// Install the `beforeEach` guard, replacing any previous one.
    pub fn before_each<F>(&self, guard: F)
    where
        F: Fn(&NavigationContext, Option<&NavigationContext>, Next) -> Result<(), HookError> + 'static,
    {
        self.before_each_async(BeforeFn(guard));
    }

    pub fn before_each_async(&self, guard: impl BeforeEachGuard + 'static) {
        *self.before_each.borrow_mut() = Some(Rc::new(guard));
    }

    /// Install the `afterEach` guard, replacing any previous one.
    pub fn after_each<F>(&self, guard: F)
    where
        F: Fn(&NavigationContext, Option<&NavigationContext>) -> Result<(), HookError> + 'static,
    {
        self.after_each_async(AfterFn(guard));
    }

    pub fn after_each_async(&self, guard: impl AfterEachGuard + 'static) {
        *self.after_each.borrow_mut() = Some(Rc::new(guard));
    }

    // -------------------------------------------------------------------------
    // Entry Points
    // -------------------------------------------------------------------------

    /// Render the location history currently points at.
    pub async fn init(&self) -> Result<NavigationOutcome, NavigationError> {
        let href = self.cx.history().location().href();
        self.navigate_chain(href, Mode::Pop, Vec::new()).await
    }

    /// Navigate to `path`, pushing a history entry.
    pub async fn navigate(&self, path: &str) -> Result<NavigationOutcome, NavigationError> {
        self.navigate_chain(path.to_string(), Mode::Push, Vec::new()).await
    }

    /// Navigate to `path`, replacing the current history entry.
    pub async fn replace(&self, path: &str) -> Result<NavigationOutcome, NavigationError> {
        self.navigate_chain(path.to_string(), Mode::Replace, Vec::new()).await
    }

    /// Popstate entry point: history already moved.
    pub async fn on_route_change(&self) -> Result<NavigationOutcome, NavigationError> {
        let href = self.cx.history().location().href();
        self.navigate_chain(href, Mode::Pop, Vec::new()).await
    }

    fn navigate_chain(
        &self,
        path: String,
        mode: Mode,
        mut chain: Vec<String>,
    ) -> LocalBoxFuture<'_, Result<NavigationOutcome, NavigationError>> {
        async move {
            if chain.contains(&path) {
                chain.push(path);
                tracing::error!(component = "Router", chain = %chain.join(" -> "), "redirect loop detected");
                return Err(NavigationError::RedirectLoop { chain });
            }
            chain.push(path.clone());
            if chain.len() - 1 > self.max_redirect_depth {
                tracing::error!(
                    component = "Router",
                    max = self.max_redirect_depth,
                    chain = %chain.join(" -> "),
                    "maximum redirect depth exceeded"
                );
                return Err(NavigationError::RedirectDepth {
                    max: self.max_redirect_depth,
                    chain,
                });
            }

            let to = self.context_for(&path);
            let from = self.current.borrow().clone();
            match self.run_before_each(&to, from.as_ref()).await {
                GuardDecision::Continue => {}
                GuardDecision::Cancel => {
                    tracing::info!(component = "Router", path = %path, "navigation cancelled by guard");
                    return Ok(NavigationOutcome::Cancelled);
                }
                GuardDecision::Redirect { path: target, replace } => {
                    tracing::info!(component = "Router", from = %path, to = %target, "guard redirect");
                    let mode = if replace { Mode::Replace } else { Mode::Push };
                    return self.navigate_chain(target, mode, chain).await;
                }
            }

            let history = self.cx.history();
            match mode {
                Mode::Push => history.push_state(&path),
                Mode::Replace => history.replace_state(&path),
                Mode::Pop => {}
            }
            self.schedule_render().await
        }
        .boxed_local()
    }

    /// Evaluate the `beforeEach` guard. Faults are logged and continue.
    async fn run_before_each(&self, to: &NavigationContext, from: Option<&NavigationContext>) -> GuardDecision {
        let Some(guard) = self.before_each.borrow().clone() else {
            return GuardDecision::Continue;
        };
        let next = Next::new();
        let result = match AssertUnwindSafe(guard.check(to, from, next.clone())).catch_unwind().await {
            Ok(Ok(())) => next.decision().ok_or(GuardError::NoDecision),
            Ok(Err(err)) => Err(GuardError::Failed(err)),
            Err(payload) => Err(GuardError::from_panic(payload)),
        };
        result.unwrap_or_else(|err| {
            match err {
                GuardError::NoDecision => {
                    tracing::warn!(component = "Router", path = %to.path, "beforeEach guard never called next; continuing")
                }
                err => tracing::error!(component = "Router", path = %to.path, error = %err, "beforeEach guard failed; continuing"),
            }
            GuardDecision::Continue
        })
    }

    async fn run_after_each(&self, to: &NavigationContext, from: Option<&NavigationContext>) {
        let Some(guard) = self.after_each.borrow().clone() else {
            return;
        };
        let fault = match AssertUnwindSafe(guard.after(to, from)).catch_unwind().await {
            Ok(Ok(())) => return,
            Ok(Err(err)) => GuardError::Failed(err),
            Err(payload) => GuardError::from_panic(payload),
        };
        tracing::error!(component = "Router", path = %to.path, error = %fault, "afterEach guard failed");
    }

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------

    /// Wait out the debounce window; only the newest ticket renders.
    async fn schedule_render(&self) -> Result<NavigationOutcome, NavigationError> {
        let ticket = self.render_generation.get().wrapping_add(1);
        self.render_generation.set(ticket);
        Delay::new(self.debounce).await;
        if self.render_generation.get() != ticket {
            tracing::debug!(component = "Router", ticket, "render superseded");
            return Ok(NavigationOutcome::Superseded);
        }
        self.render_current_location().await
    }

    async fn render_current_location(&self) -> Result<NavigationOutcome, NavigationError> {
        let location = self.cx.history().location();
        self.current_path.set(location.pathname.clone());

        let to = self.context_for(&location.href());
        let from = self.current.borrow().clone();
        let matched = self.table.match_route(&location.pathname);

        if let Some(claimed) = self.render_containers(None).await {
            // The container's own route, not the table's fallback
            let route = self
                .table
                .get(&claimed.path)
                .cloned()
                .unwrap_or_else(|| Rc::new(RouteDescriptor::standalone(&claimed.path, &claimed.component)));
            *self.active_route.borrow_mut() = Some(route);
        } else {
            let Some(route) = matched.route.clone() else {
                tracing::warn!(component = "Router", path = %location.pathname, "no route matched and no /404 route");
                return Ok(NavigationOutcome::NotFound);
            };
            self.handle_route(&route, matched.params.clone()).await?;
        }

        *self.current.borrow_mut() = Some(to.clone());
        self.run_after_each(&to, from.as_ref()).await;
        Ok(NavigationOutcome::Rendered)
    }

    /// Mount `route`'s component into the render target.
    ///
    /// The instance is keyed `route-<Component>`; an existing one receives
    /// the new params and an `update`. A failed build leaves the target as it
    /// was.
    pub async fn handle_route(&self, route: &Rc<RouteDescriptor>, params: Params) -> Result<(), NavigationError> {
        let component = route.component.clone();
        let slice_id = format!("route-{component}");
        let app_root_id = &self.cx.config().router.app_root_id;
        let target = self
            .cx
            .app_root()
            .ok_or_else(|| NavigationError::MissingRenderTarget(app_root_id.clone()))?;

        let view = match self.cx.registry().get_component(&slice_id) {
            Some(existing) => {
                self.cx.registry().assign_props(&existing, params_props(params));
                if existing.has(Capabilities::UPDATE) {
                    let behavior = existing.behavior().clone();
                    if let Err(err) = behavior.update(&self.cx, &existing).await {
                        tracing::error!(component = "Router", slice_id = %slice_id, error = %err, "error in update");
                    }
                }
                existing
            }
            None => {
                let mut props = params_props(params);
                props.insert("sliceId".to_string(), Value::String(slice_id.clone()));
                self.cx.build(&component, props).await?
            }
        };

        let dom = self.cx.dom();
        dom.clear_children(target);
        if let Some(node) = view.node() {
            dom.append_child(target, node);
        }
        self.render_routes_in_component(&view).await;
        self.containers.invalidate();

        tracing::info!(component = "Router", path = %route.full_path, view = %slice_id, "route mounted");
        *self.active_route.borrow_mut() = Some(route.clone());
        Ok(())
    }

    /// Ask every route container under `root` (default: the document) to
    /// render. Returns whether any of them matched.
    pub async fn render_routes_components_in_page(&self, root: Option<NodeId>) -> bool {
        self.render_containers(root).await.is_some()
    }

    /// Render every container under `root`; the first one that matched
    /// reports its route.
    async fn render_containers(&self, root: Option<NodeId>) -> Option<RouteDef> {
        let dom = self.cx.dom();
        let root = root.unwrap_or_else(|| dom.document());
        let containers = self.containers.get(dom, root);

        let mut claimed = None;
        for node in containers.iter().copied() {
            if !dom.is_connected(node) {
                self.containers.invalidate();
                continue;
            }
            let Some(host) = self.cx.registry().component_for_node(node) else {
                tracing::debug!(component = "Router", ?node, "route container element has no component");
                continue;
            };
            let behavior = host.behavior().clone();
            let Some(container) = behavior.as_route_container() else {
                continue;
            };
            match container.render_if_current_route(&self.cx, &host).await {
                Ok(true) if claimed.is_none() => claimed = container.claimed_route(&self.cx.current_pathname()),
                Ok(_) => {}
                Err(err) => tracing::error!(
                    component = "Router",
                    slice_id = %host.slice_id(),
                    error = %err,
                    "error rendering route container"
                ),
            }
        }
        claimed
    }

    /// Render route containers nested in `component`'s subtree.
    pub async fn render_routes_in_component(&self, component: &ComponentInstance) -> bool {
        let Some(node) = component.node() else {
            tracing::warn!(component = "Router", slice_id = %component.slice_id(), "no element to render routes in");
            return false;
        };
        self.render_routes_components_in_page(Some(node)).await
    }

    // -------------------------------------------------------------------------
    // State
    // -------------------------------------------------------------------------

    pub fn context(&self) -> &Rc<RuntimeContext> {
        &self.cx
    }

    pub fn match_route(&self, path: &str) -> RouteMatch {
        self.table.match_route(path)
    }

    fn context_for(&self, href: &str) -> NavigationContext {
        let location = Location::parse(href);
        let matched = self.table.match_route(&location.pathname);
        NavigationContext {
            component: matched.route.as_ref().map(|route| route.component.clone()),
            metadata: matched.matched().map(|entry| entry.metadata.clone()).unwrap_or_default(),
            query: location.query(),
            params: matched.params,
            path: location.pathname,
        }
    }

    pub fn active_route(&self) -> Option<Rc<RouteDescriptor>> {
        self.active_route.borrow().clone()
    }

    /// Context of the last rendered navigation.
    pub fn current(&self) -> Option<NavigationContext> {
        self.current.borrow().clone()
    }

    pub fn current_path(&self) -> String {
        self.current_path.get()
    }

    /// Reactive current path, set at the start of every render.
    pub fn current_path_signal(&self) -> Signal<String> {
        self.current_path.clone()
    }

    pub fn route_table(&self) -> &Rc<RouteTable> {
        &self.table
    }

    pub fn invalidate_cache(&self) {
        self.containers.invalidate();
    }

    pub fn get_cached_route_containers(&self, root: Option<NodeId>) -> Rc<[NodeId]> {
        let dom = self.cx.dom();
        self.containers.get(dom, root.unwrap_or_else(|| dom.document()))
    }
}
