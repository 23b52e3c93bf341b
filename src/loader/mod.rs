//! Resource Loader - The component build pipeline.
//!
//! `build(name, props)` turns a component name into a registered instance:
//!
//! 1. Resolve the category and decide visual vs service
//! 2. Load class, template and CSS concurrently (only what is not cached)
//! 3. Construct, apply ids and verify them against the registry
//! 4. Create the host element, attach the template, apply props
//! 5. Run the `init` hook, then register (recursively for visual components)
//!
//! Any failure aborts the build and nothing is registered.

mod cache;

use std::cell::RefCell;
use std::rc::Rc;

use futures::FutureExt;
use serde_json::Value;

use crate::component::{Capabilities, ComponentClass, ComponentHandle, ComponentInstance, ComponentRegistry};
use crate::config::{ComponentCatalog, SliceConfig};
use crate::dom::{Dom, Template};
use crate::error::{BuildError, FetchError};
use crate::host::ClassLoader;
use crate::runtime::RuntimeContext;
use crate::types::{component_tag, Props, ResourceType, STRUCTURAL_CATEGORY};

use cache::{Loaded, ResourceCache, ResourceSlot, SharedLoad};

/// Loads component resources once per name and builds instances.
pub struct ResourceLoader {
    config: Rc<SliceConfig>,
    catalog: Rc<ComponentCatalog>,
    dom: Rc<Dom>,
    registry: Rc<ComponentRegistry>,
    classes: Rc<dyn ClassLoader>,
    cache: RefCell<ResourceCache>,
}

impl ResourceLoader {
    pub fn new(
        config: Rc<SliceConfig>,
        catalog: Rc<ComponentCatalog>,
        dom: Rc<Dom>,
        registry: Rc<ComponentRegistry>,
        classes: Rc<dyn ClassLoader>,
    ) -> Self {
        Self {
            config,
            catalog,
            dom,
            registry,
            classes,
            cache: RefCell::new(ResourceCache::default()),
        }
    }

    // -------------------------------------------------------------------------
    // Build
    // -------------------------------------------------------------------------

    /// Build and register an instance of `name`.
    pub async fn build(
        &self,
        cx: &RuntimeContext,
        name: &str,
        mut props: Props,
    ) -> Result<ComponentHandle, BuildError> {
        let result = self.build_inner(cx, name, &mut props).await;
        if let Err(err) = &result {
            tracing::error!(component = "Loader", name, error = %err, "error building component");
        }
        result
    }

    async fn build_inner(
        &self,
        cx: &RuntimeContext,
        name: &str,
        props: &mut Props,
    ) -> Result<ComponentHandle, BuildError> {
        let category = self
            .catalog
            .category_of(name)
            .ok_or_else(|| BuildError::UnknownComponent(name.to_string()))?
            .to_string();
        if category == STRUCTURAL_CATEGORY {
            return Err(BuildError::Structural(name.to_string()));
        }
        let entry = self
            .config
            .category(&category)
            .ok_or_else(|| BuildError::UnconfiguredCategory {
                name: name.to_string(),
                category: category.clone(),
            })?;
        let kind = entry.kind;
        let module_path = format!("{}/{name}/{name}.js", entry.path);

        self.load_resources(name, &category, &module_path, kind.is_visual())
            .await
            .map_err(|source| BuildError::Resources {
                name: name.to_string(),
                source,
            })?;

        let class = self.cache.borrow().class(name).ok_or_else(|| BuildError::Resources {
            name: name.to_string(),
            source: FetchError::ClassImport {
                module: module_path.clone(),
                reason: "class missing after load".to_string(),
            },
        })?;

        // Create instance
        let dom_id = take_string(props, "id");
        let slice_id = take_string(props, "sliceId");
        let behavior = class.construct(props);
        let node = kind.is_visual().then(|| self.dom.create_element(&component_tag(name)));
        let handle = Rc::new(ComponentInstance::new(class, category, kind, node, behavior));

        if let (Some(id), Some(node)) = (&dom_id, node) {
            handle.set_dom_id(Some(id.clone()));
            self.dom.set_attribute(node, "id", id);
        }
        if let Some(slice_id) = slice_id {
            handle.set_slice_id(slice_id);
        }
        if !self.registry.verify_component_ids(&handle) {
            return Err(BuildError::IdConflict(conflicting_id(&handle)));
        }

        if handle.is_visual() {
            self.attach_template(&handle);
        }
        self.registry.set_component_props(&handle, std::mem::take(props));

        if handle.has(Capabilities::INIT) {
            let behavior = handle.behavior().clone();
            behavior.init(cx, &handle).await.map_err(|source| BuildError::Init {
                slice_id: handle.slice_id(),
                source,
            })?;
        }

        // init may have registered the same id in the meantime
        if !self.registry.register_component(&handle, None) {
            return Err(BuildError::IdConflict(handle.slice_id()));
        }
        if handle.is_visual() {
            self.registry.register_components_recursively(&handle, None);
        }

        tracing::info!(component = "Loader", slice_id = %handle.slice_id(), "instance created");
        Ok(handle)
    }

    // -------------------------------------------------------------------------
    // Resources
    // -------------------------------------------------------------------------

    /// Load whatever of class, template and CSS is not cached yet.
    ///
    /// The three loads run concurrently and are all awaited before anything
    /// is written to the cache.
    async fn load_resources(
        &self,
        name: &str,
        category: &str,
        module_path: &str,
        is_visual: bool,
    ) -> Result<(), FetchError> {
        let class_load = self.start_load(name, ResourceSlot::Class, || {
            let classes = self.classes.clone();
            let module_path = module_path.to_string();
            async move {
                classes.import_class(&module_path).await.map(Loaded::Class).inspect_err(|err| {
                    tracing::error!(component = "Loader", module = %module_path, error = %err, "error loading class");
                })
            }
            .boxed_local()
            .shared()
        });
        let html_load = is_visual
            .then(|| self.start_text_load(name, category, ResourceType::Html))
            .flatten();
        let css_load = is_visual
            .then(|| self.start_text_load(name, category, ResourceType::Css))
            .flatten();

        let (class, html, css) = futures::join!(await_load(class_load), await_load(html_load), await_load(css_load));

        let mut cache = self.cache.borrow_mut();
        for slot in [ResourceSlot::Class, ResourceSlot::Template, ResourceSlot::Css] {
            cache.finish(name, slot);
        }

        let mut first_error = None;
        for (slot, outcome) in [
            (ResourceSlot::Class, class),
            (ResourceSlot::Template, html),
            (ResourceSlot::Css, css),
        ] {
            match outcome {
                None => {}
                Some(Err(err)) => {
                    first_error.get_or_insert(err);
                }
                Some(Ok(Loaded::Class(class))) => {
                    cache.store_class(name, class);
                    tracing::debug!(component = "Loader", name, "class loaded");
                }
                Some(Ok(Loaded::Text(text))) if slot == ResourceSlot::Template => {
                    cache.store_template(name, &text);
                    tracing::debug!(component = "Loader", name, "template loaded");
                }
                Some(Ok(Loaded::Text(text))) => {
                    cache.store_css(name, &text);
                    tracing::debug!(component = "Loader", name, "css loaded");
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn start_load(&self, name: &str, slot: ResourceSlot, start: impl FnOnce() -> SharedLoad) -> Option<SharedLoad> {
        let mut cache = self.cache.borrow_mut();
        if cache.has(name, slot) {
            return None;
        }
        Some(cache.inflight(name, slot, start))
    }

    fn start_text_load(&self, name: &str, category: &str, resource: ResourceType) -> Option<SharedLoad> {
        let slot = match resource {
            ResourceType::Html => ResourceSlot::Template,
            _ => ResourceSlot::Css,
        };
        self.start_load(name, slot, || {
            let registry = self.registry.clone();
            let name = name.to_string();
            let category = category.to_string();
            async move {
                registry
                    .fetch_text(&name, resource, Some(&category), None)
                    .await
                    .map(|text| Loaded::Text(Rc::from(text)))
            }
            .boxed_local()
            .shared()
        })
    }

    /// Seed the cache for a class that never goes through the class loader.
    pub fn preload(&self, class: Rc<dyn ComponentClass>, template: Option<&str>, css: Option<&str>) {
        let name = class.name().to_string();
        let mut cache = self.cache.borrow_mut();
        cache.store_class(&name, class);
        if let Some(markup) = template {
            cache.store_template(&name, markup);
        }
        if let Some(css) = css {
            cache.store_css(&name, css);
        }
    }

    /// Instantiate the cached template into the instance's host element.
    ///
    /// Returns false when there is no host element or no cached template.
    pub fn attach_template(&self, handle: &ComponentInstance) -> bool {
        let Some(node) = handle.node() else {
            return false;
        };
        let Some(template) = self.template(handle.class_name()) else {
            tracing::error!(component = "Loader", class = handle.class_name(), "template not found");
            return false;
        };
        self.dom.instantiate(&template, node);
        true
    }

    pub fn template(&self, name: &str) -> Option<Rc<Template>> {
        self.cache.borrow().template(name)
    }

    pub fn class(&self, name: &str) -> Option<Rc<dyn ComponentClass>> {
        self.cache.borrow().class(name)
    }

    /// Registered CSS for one component.
    pub fn styles(&self, name: &str) -> Option<String> {
        self.cache.borrow().styles(name).map(str::to_string)
    }

    /// All registered component CSS in load order.
    pub fn component_styles(&self) -> String {
        self.cache.borrow().component_styles()
    }
}

async fn await_load(load: Option<SharedLoad>) -> Option<Result<Loaded, FetchError>> {
    match load {
        Some(load) => Some(load.await),
        None => None,
    }
}

fn take_string(props: &mut Props, key: &str) -> Option<String> {
    match props.remove(key)? {
        Value::String(value) => Some(value),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn conflicting_id(handle: &ComponentInstance) -> String {
    let slice_id = handle.slice_id();
    if slice_id.is_empty() {
        handle.dom_id().unwrap_or_default()
    } else {
        slice_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_take_string() {
        let mut props = Props::new();
        props.insert("id".to_string(), json!("main"));
        props.insert("sliceId".to_string(), json!(7));
        props.insert("text".to_string(), json!("hi"));

        assert_eq!(take_string(&mut props, "id").as_deref(), Some("main"));
        assert_eq!(take_string(&mut props, "sliceId").as_deref(), Some("7"));
        assert_eq!(take_string(&mut props, "missing"), None);
        assert_eq!(props.len(), 1);
    }
}
