//! Runtime context - The explicit handle every subsystem is reached through.
//!
//! Holds the configuration, host services, document, registry and loader.
//! Lifecycle hooks and route containers receive it by reference; the router
//! keeps an `Rc` to it.

use std::cell::RefCell;
use std::rc::Rc;

use crate::component::{ComponentHandle, ComponentRegistry};
use crate::config::{ComponentCatalog, SliceConfig};
use crate::containers::{multi_route_class, route_class, RouteViewCache};
use crate::dom::{Dom, NodeId};
use crate::error::{BuildError, NavigationError};
use crate::host::{History, Host};
use crate::loader::ResourceLoader;
use crate::logging::init_logging;
use crate::router::{RouteDef, RouteTable, Router};
use crate::types::{ComponentKind, Props};

pub struct RuntimeContext {
    config: Rc<SliceConfig>,
    catalog: Rc<ComponentCatalog>,
    host: Host,
    dom: Rc<Dom>,
    registry: Rc<ComponentRegistry>,
    loader: ResourceLoader,
    route_table: RefCell<Option<Rc<RouteTable>>>,
    route_views: RouteViewCache,
}

impl RuntimeContext {
    /// Create the document with its render target and register the built-in
    /// route containers.
    ///
    /// `Route` and `MultiRoute` are added to the catalog under the first
    /// visual category when the catalog does not list them.
    pub fn new(config: SliceConfig, mut catalog: ComponentCatalog, host: Host) -> Rc<Self> {
        let visual_category = config
            .paths
            .components
            .iter()
            .find(|(_, entry)| entry.kind == ComponentKind::Visual)
            .map(|(name, _)| name.clone());
        if let Some(category) = &visual_category {
            for builtin in ["Route", "MultiRoute"] {
                if !catalog.contains(builtin) {
                    catalog.insert(builtin, category.clone());
                }
            }
        }

        let config = Rc::new(config);
        let catalog = Rc::new(catalog);
        let dom = Rc::new(Dom::new());
        let app_root = dom.create_element("div");
        dom.set_attribute(app_root, "id", &config.router.app_root_id);
        dom.append_child(dom.body(), app_root);

        let registry = Rc::new(ComponentRegistry::new(
            config.clone(),
            catalog.clone(),
            dom.clone(),
            host.fetcher.clone(),
        ));
        let loader = ResourceLoader::new(
            config.clone(),
            catalog.clone(),
            dom.clone(),
            registry.clone(),
            host.classes.clone(),
        );
        loader.preload(Rc::new(route_class()), Some(""), Some(""));
        loader.preload(Rc::new(multi_route_class()), Some(""), Some(""));

        Rc::new(Self {
            config,
            catalog,
            host,
            dom,
            registry,
            loader,
            route_table: RefCell::new(None),
            route_views: RouteViewCache::default(),
        })
    }

    pub fn config(&self) -> &SliceConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ComponentCatalog {
        &self.catalog
    }

    pub fn is_production(&self) -> bool {
        self.config.production
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn history(&self) -> &Rc<dyn History> {
        &self.host.history
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn loader(&self) -> &ResourceLoader {
        &self.loader
    }

    /// Build and register a component instance.
    pub async fn build(&self, name: &str, props: Props) -> Result<ComponentHandle, BuildError> {
        self.loader.build(self, name, props).await
    }

    pub fn get_component(&self, slice_id: &str) -> Option<ComponentHandle> {
        self.registry.get_component(slice_id)
    }

    pub fn current_pathname(&self) -> String {
        self.host.history.location().pathname
    }

    /// The page render target (`#app` by default).
    pub fn app_root(&self) -> Option<NodeId> {
        self.dom.get_element_by_id(&self.config.router.app_root_id)
    }

    pub fn route_table(&self) -> Option<Rc<RouteTable>> {
        self.route_table.borrow().clone()
    }

    pub fn set_route_table(&self, table: Rc<RouteTable>) {
        *self.route_table.borrow_mut() = Some(table);
    }

    /// Views shared by `Route` containers.
    pub fn route_views(&self) -> &RouteViewCache {
        &self.route_views
    }
}

/// Set up logging, create the runtime and router, and render the initial
/// location.
pub async fn start(
    config: SliceConfig,
    catalog: ComponentCatalog,
    routes: &[RouteDef],
    host: Host,
) -> Result<Rc<Router>, NavigationError> {
    init_logging(&config.logger);
    let cx = RuntimeContext::new(config, catalog, host);
    let router = Router::new(cx, routes);
    let outcome = router.init().await?;
    tracing::info!(component = "Runtime", ?outcome, path = %router.current_path(), "runtime started");
    Ok(router)
}
