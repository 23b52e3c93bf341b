//! Component Registry - Identity map and parent/child arena.
//!
//! Manages the lifecycle of component instances:
//! - sliceId → slot mapping, kept in registration order
//! - Free slot pool for O(1) reuse
//! - Parent/children links stored as slot indices
//! - Resource URL resolution for the build pipeline
//!
//! Only the registry mutates the identity map. Hooks never run while the
//! registry state is borrowed, so a hook may call back into the registry.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use regex::Regex;

use super::{Capabilities, ComponentHandle, ComponentInstance};
use crate::config::{ComponentCatalog, SliceConfig};
use crate::dom::{Dom, NodeId};
use crate::error::FetchError;
use crate::host::ResourceFetcher;
use crate::types::{
    generated_slice_id, Props, ResourceType, CUSTOM_TAG_PREFIX, SLICE_ID_ATTR, STRUCTURAL_CATEGORY,
};

// =============================================================================
// Registry State
// =============================================================================

struct Slot {
    handle: ComponentHandle,
    parent: Option<usize>,
    children: Vec<usize>,
}

#[derive(Default)]
struct RegistryState {
    /// Active components, sliceId → slot.
    id_to_index: IndexMap<String, usize>,
    slots: Vec<Option<Slot>>,
    /// Pool of freed slots for reuse.
    free_indices: Vec<usize>,
    /// Counter for generated sliceIds. Never reset.
    id_counter: usize,
}

impl RegistryState {
    fn allocate(&mut self, slot: Slot) -> usize {
        match self.free_indices.pop() {
            Some(index) => {
                self.slots[index] = Some(slot);
                index
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        }
    }

    fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, index: usize) -> Option<&mut Slot> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Link `child` under `parent` unless it already has a parent.
    fn link(&mut self, child: usize, parent: usize) -> bool {
        if child == parent || self.slot(parent).is_none() {
            return false;
        }
        match self.slot_mut(child) {
            Some(slot) if slot.parent.is_none() => slot.parent = Some(parent),
            _ => return false,
        }
        if let Some(slot) = self.slot_mut(parent) {
            slot.children.push(child);
        }
        true
    }

    fn release(&mut self, index: usize) {
        let Some(slot) = self.slots.get_mut(index).and_then(Option::take) else {
            return;
        };
        self.id_to_index.retain(|_, i| *i != index);

        // Orphan children
        for child in &slot.children {
            if let Some(child) = self.slot_mut(*child) {
                child.parent = None;
            }
        }
        if let Some(parent) = slot.parent.and_then(|p| self.slot_mut(p)) {
            parent.children.retain(|c| *c != index);
        }
        self.free_indices.push(index);

        // All components gone: drop the arena
        if self.id_to_index.is_empty() {
            self.slots.clear();
            self.free_indices.clear();
        }
    }
}

// =============================================================================
// Destroy Targets
// =============================================================================

/// Something [`ComponentRegistry::destroy_component`] can destroy.
#[derive(Debug, Clone)]
pub enum DestroyTarget {
    Id(String),
    Instance(ComponentHandle),
}

impl From<&str> for DestroyTarget {
    fn from(id: &str) -> Self {
        DestroyTarget::Id(id.to_string())
    }
}

impl From<String> for DestroyTarget {
    fn from(id: String) -> Self {
        DestroyTarget::Id(id)
    }
}

impl From<&String> for DestroyTarget {
    fn from(id: &String) -> Self {
        DestroyTarget::Id(id.clone())
    }
}

impl From<ComponentHandle> for DestroyTarget {
    fn from(handle: ComponentHandle) -> Self {
        DestroyTarget::Instance(handle)
    }
}

impl From<&ComponentHandle> for DestroyTarget {
    fn from(handle: &ComponentHandle) -> Self {
        DestroyTarget::Instance(handle.clone())
    }
}

/// A sliceId pattern: compiled, or source text compiled on use.
#[derive(Debug, Clone)]
pub enum IdPattern {
    Regex(Regex),
    Source(String),
}

impl From<Regex> for IdPattern {
    fn from(regex: Regex) -> Self {
        IdPattern::Regex(regex)
    }
}

impl From<&str> for IdPattern {
    fn from(source: &str) -> Self {
        IdPattern::Source(source.to_string())
    }
}

impl From<String> for IdPattern {
    fn from(source: String) -> Self {
        IdPattern::Source(source)
    }
}

// =============================================================================
// Component Registry
// =============================================================================

/// Registry of active component instances.
pub struct ComponentRegistry {
    config: Rc<SliceConfig>,
    catalog: Rc<ComponentCatalog>,
    dom: Rc<Dom>,
    fetcher: Rc<dyn ResourceFetcher>,
    state: RefCell<RegistryState>,
}

impl ComponentRegistry {
    pub fn new(
        config: Rc<SliceConfig>,
        catalog: Rc<ComponentCatalog>,
        dom: Rc<Dom>,
        fetcher: Rc<dyn ResourceFetcher>,
    ) -> Self {
        Self {
            config,
            catalog,
            dom,
            fetcher,
            state: RefCell::new(RegistryState::default()),
        }
    }

    // -------------------------------------------------------------------------
    // Identity
    // -------------------------------------------------------------------------

    /// Check the instance's ids against the active map.
    ///
    /// A DOM id or sliceId already in use rejects the instance. An instance
    /// without a sliceId gets a generated one.
    pub fn verify_component_ids(&self, instance: &ComponentInstance) -> bool {
        let mut state = self.state.borrow_mut();

        if let Some(dom_id) = instance.dom_id().filter(|id| !id.trim().is_empty()) {
            if state.id_to_index.contains_key(&dom_id) {
                tracing::error!(
                    component = "Registry",
                    id = %dom_id,
                    "a component with the same html id attribute is already registered"
                );
                return false;
            }
        }

        let slice_id = instance.slice_id();
        if slice_id.trim().is_empty() {
            let generated = generated_slice_id(instance.class_name(), state.id_counter);
            state.id_counter += 1;
            instance.set_slice_id(generated);
        } else if state.id_to_index.contains_key(&slice_id) {
            tracing::error!(
                component = "Registry",
                slice_id = %slice_id,
                "a component with the same slice id is already registered"
            );
            return false;
        }
        true
    }

    /// Store the instance under its sliceId and link it to `parent`.
    ///
    /// Returns false when the sliceId is empty or already registered.
    pub fn register_component(&self, handle: &ComponentHandle, parent: Option<&ComponentHandle>) -> bool {
        let slice_id = handle.slice_id();
        if slice_id.is_empty() {
            tracing::warn!(component = "Registry", class = handle.class_name(), "refusing to register a component without a slice id");
            return false;
        }
        {
            let mut state = self.state.borrow_mut();
            if state.id_to_index.contains_key(&slice_id) || handle.is_registered() {
                tracing::error!(component = "Registry", slice_id = %slice_id, "component already registered");
                return false;
            }

            let index = state.allocate(Slot {
                handle: handle.clone(),
                parent: None,
                children: Vec::new(),
            });
            state.id_to_index.insert(slice_id.clone(), index);
            handle.set_slot(Some(index));

            if let Some(parent_index) = parent.and_then(|p| p.slot()) {
                state.link(index, parent_index);
            }
        }

        if let Some(node) = handle.node() {
            self.dom.set_attribute(node, SLICE_ID_ATTR, &slice_id);
        }
        tracing::debug!(component = "Registry", slice_id = %slice_id, "component registered");
        true
    }

    /// Link nested components found under the instance's host node.
    ///
    /// Each registered `slice-*` descendant without a parent is linked to its
    /// nearest registered ancestor component.
    pub fn register_components_recursively(&self, handle: &ComponentHandle, parent: Option<&ComponentHandle>) {
        let Some(index) = handle.slot() else {
            return;
        };
        if let Some(parent_index) = parent.and_then(|p| p.slot()) {
            self.state.borrow_mut().link(index, parent_index);
        }
        let Some(root) = handle.node() else {
            return;
        };

        let nested = self
            .dom
            .find_elements(root, |tag| tag.starts_with(CUSTOM_TAG_PREFIX));
        for node in nested {
            let Some(child) = self.component_for_node(node) else {
                continue;
            };
            let Some(child_index) = child.slot() else {
                continue;
            };
            let owner = self.nearest_component(node, root).unwrap_or_else(|| handle.clone());
            if let Some(owner_index) = owner.slot() {
                self.state.borrow_mut().link(child_index, owner_index);
            }
        }
    }

    fn nearest_component(&self, node: NodeId, root: NodeId) -> Option<ComponentHandle> {
        let mut current = self.dom.parent(node);
        while let Some(ancestor) = current {
            if ancestor == root {
                return None;
            }
            if let Some(component) = self.component_for_node(ancestor) {
                return Some(component);
            }
            current = self.dom.parent(ancestor);
        }
        None
    }

    // -------------------------------------------------------------------------
    // Props
    // -------------------------------------------------------------------------

    /// Apply declared defaults, validate, then assign every provided prop.
    pub fn set_component_props(&self, handle: &ComponentInstance, props: Props) {
        let class = handle.class().clone();
        let specs = class.props();

        for spec in specs {
            if props.contains_key(&spec.name) {
                continue;
            }
            if let Some(default) = &spec.default {
                handle.assign_prop(&spec.name, default.clone());
            }
        }

        if !self.config.production && !specs.is_empty() {
            let unknown: Vec<&str> = props
                .keys()
                .filter(|key| !specs.iter().any(|spec| &spec.name == *key))
                .map(String::as_str)
                .collect();
            if !unknown.is_empty() {
                let available: Vec<&str> = specs.iter().map(|spec| spec.name.as_str()).collect();
                tracing::warn!(
                    component = "PropsValidator",
                    class = class.name(),
                    unknown = ?unknown,
                    available = ?available,
                    "unknown props"
                );
            }

            let missing: Vec<&str> = specs
                .iter()
                .filter(|spec| spec.required && !props.contains_key(&spec.name))
                .map(|spec| spec.name.as_str())
                .collect();
            if !missing.is_empty() {
                tracing::error!(
                    component = "PropsValidator",
                    class = class.name(),
                    missing = ?missing,
                    "missing required props"
                );
            }
        }

        self.assign_props(handle, props);
    }

    /// Assign props without defaults or validation.
    pub fn assign_props(&self, handle: &ComponentInstance, props: Props) {
        for (name, value) in props {
            handle.assign_prop(&name, value);
        }
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    pub fn get_component(&self, slice_id: &str) -> Option<ComponentHandle> {
        let state = self.state.borrow();
        let index = *state.id_to_index.get(slice_id)?;
        state.slot(index).map(|slot| slot.handle.clone())
    }

    pub fn contains(&self, slice_id: &str) -> bool {
        self.state.borrow().id_to_index.contains_key(slice_id)
    }

    /// Active sliceIds in registration order.
    pub fn active_ids(&self) -> Vec<String> {
        self.state.borrow().id_to_index.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().id_to_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Catalog category of a component class.
    pub fn category_of(&self, name: &str) -> Option<String> {
        self.catalog.category_of(name).map(str::to_string)
    }

    pub fn parent_of(&self, handle: &ComponentInstance) -> Option<ComponentHandle> {
        let state = self.state.borrow();
        let parent = state.slot(handle.slot()?)?.parent?;
        state.slot(parent).map(|slot| slot.handle.clone())
    }

    pub fn children_of(&self, handle: &ComponentInstance) -> Vec<ComponentHandle> {
        let state = self.state.borrow();
        let Some(slot) = handle.slot().and_then(|index| state.slot(index)) else {
            return Vec::new();
        };
        slot.children
            .iter()
            .filter_map(|child| state.slot(*child))
            .map(|child| child.handle.clone())
            .collect()
    }

    /// Active components grouped under their root ancestor.
    ///
    /// Keys are root sliceIds in registration order; each list holds the
    /// root's descendants, also in registration order.
    pub fn top_parents(&self) -> IndexMap<String, Vec<ComponentHandle>> {
        let state = self.state.borrow();
        let mut groups: IndexMap<String, Vec<ComponentHandle>> = IndexMap::new();

        for index in state.id_to_index.values().copied() {
            let mut root = index;
            while let Some(parent) = state.slot(root).and_then(|slot| slot.parent) {
                root = parent;
            }
            let (Some(root_slot), Some(slot)) = (state.slot(root), state.slot(index)) else {
                continue;
            };
            let group = groups.entry(root_slot.handle.slice_id()).or_default();
            if root != index {
                group.push(slot.handle.clone());
            }
        }
        groups
    }

    /// Component whose host element is `node`.
    pub fn component_for_node(&self, node: NodeId) -> Option<ComponentHandle> {
        let slice_id = self.dom.get_attribute(node, SLICE_ID_ATTR)?;
        self.get_component(&slice_id)
            .filter(|handle| handle.node() == Some(node))
    }

    // -------------------------------------------------------------------------
    // Destruction
    // -------------------------------------------------------------------------

    /// Destroy one component by id or instance. Returns 1 or 0.
    pub fn destroy_component(&self, target: impl Into<DestroyTarget>) -> usize {
        self.destroy_components([target])
    }

    /// Destroy every listed component. Unknown entries are skipped.
    pub fn destroy_components<I>(&self, targets: I) -> usize
    where
        I: IntoIterator,
        I::Item: Into<DestroyTarget>,
    {
        let mut destroyed = 0;
        for target in targets {
            let handle = match target.into() {
                DestroyTarget::Id(id) => match self.get_component(&id) {
                    Some(handle) => handle,
                    None => {
                        tracing::warn!(component = "Registry", slice_id = %id, "component not found");
                        continue;
                    }
                },
                DestroyTarget::Instance(handle) => handle,
            };
            let Some(index) = handle.slot() else {
                tracing::warn!(component = "Registry", slice_id = %handle.slice_id(), "component is not registered");
                continue;
            };

            if handle.has(Capabilities::BEFORE_DESTROY) {
                if let Err(err) = handle.behavior().before_destroy(&handle) {
                    tracing::error!(
                        component = "Registry",
                        slice_id = %handle.slice_id(),
                        error = %err,
                        "error in beforeDestroy"
                    );
                }
            }

            self.state.borrow_mut().release(index);
            handle.set_slot(None);

            // Host elements of still-registered components are detached, not freed
            if let Some(node) = handle.node() {
                if self.dom.is_connected(node) {
                    self.dom.remove(node);
                }
                self.dom
                    .release_subtree(node, |inner| self.component_for_node(inner).is_some());
            }
            destroyed += 1;
        }

        if destroyed > 0 {
            tracing::info!(component = "Registry", count = destroyed, "destroyed component(s)");
        }
        destroyed
    }

    /// Destroy every active component whose host element sits under `container`.
    pub fn destroy_by_container(&self, container: Option<NodeId>) -> usize {
        let Some(container) = container else {
            tracing::warn!(component = "Registry", "no container provided to destroy_by_container");
            return 0;
        };
        let ids: Vec<String> = self
            .dom
            .descendants(container)
            .into_iter()
            .filter_map(|node| self.dom.get_attribute(node, SLICE_ID_ATTR))
            .filter(|id| self.contains(id))
            .collect();
        self.destroy_components(ids)
    }

    /// Destroy every active component whose sliceId matches `pattern`.
    ///
    /// An invalid pattern is logged and destroys nothing.
    pub fn destroy_by_pattern(&self, pattern: impl Into<IdPattern>) -> usize {
        let regex = match pattern.into() {
            IdPattern::Regex(regex) => regex,
            IdPattern::Source(source) => match Regex::new(&source) {
                Ok(regex) => regex,
                Err(err) => {
                    tracing::error!(component = "Registry", pattern = %source, error = %err, "invalid destroy pattern");
                    return 0;
                }
            },
        };
        let matching: Vec<ComponentHandle> = {
            let state = self.state.borrow();
            state
                .id_to_index
                .iter()
                .filter(|(id, _)| regex.is_match(id))
                .filter_map(|(_, index)| state.slot(*index))
                .map(|slot| slot.handle.clone())
                .collect()
        };
        let count = self.destroy_components(matching);
        if count > 0 {
            tracing::info!(component = "Registry", pattern = %regex, count, "destroyed components matching pattern");
        }
        count
    }

    // -------------------------------------------------------------------------
    // Resources
    // -------------------------------------------------------------------------

    /// URL of a text resource.
    ///
    /// `category` defaults to the catalog entry for `name`. Component
    /// resources of Structural components come from the fixed structural
    /// path; any other unconfigured category is an error.
    pub fn resource_url(
        &self,
        name: &str,
        resource: ResourceType,
        category: Option<&str>,
    ) -> Result<String, FetchError> {
        let paths = &self.config.paths;
        match resource {
            ResourceType::Theme => Ok(format!("{}/{name}.css", paths.themes)),
            ResourceType::Styles => Ok(format!("{}/{name}.css", paths.styles)),
            ResourceType::Html | ResourceType::Css => {
                let category = category
                    .map(str::to_string)
                    .or_else(|| self.category_of(name))
                    .unwrap_or_default();
                let base = match self.config.category(&category) {
                    Some(entry) => entry.path.clone(),
                    None if category == STRUCTURAL_CATEGORY => paths.structural.clone(),
                    None => return Err(FetchError::UnknownCategory(category)),
                };
                Ok(format!("{base}/{name}/{name}.{}", resource.extension()))
            }
        }
    }

    /// Fetch a text resource. Failures are logged and returned.
    pub async fn fetch_text(
        &self,
        name: &str,
        resource: ResourceType,
        category: Option<&str>,
        custom_path: Option<&str>,
    ) -> Result<String, FetchError> {
        let result = self.fetch_resource(name, resource, category, custom_path).await;
        if let Err(err) = &result {
            tracing::error!(
                component = "Registry",
                name,
                resource = resource.label(),
                error = %err,
                "error fetching resource"
            );
        }
        result
    }

    async fn fetch_resource(
        &self,
        name: &str,
        resource: ResourceType,
        category: Option<&str>,
        custom_path: Option<&str>,
    ) -> Result<String, FetchError> {
        let url = match custom_path {
            Some(path) => path.to_string(),
            None => self.resource_url(name, resource, category)?,
        };
        tracing::debug!(component = "Registry", resource = resource.label(), url = %url, "fetching");
        let text = self.fetcher.fetch_text(&url).await?;
        tracing::debug!(component = "Registry", resource = resource.label(), name, "fetched");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, Markup, PropSpec, SimpleClass};
    use crate::host::MemoryFetcher;
    use crate::types::ComponentKind;
    use futures::executor::block_on;
    use serde_json::{json, Value};
    use std::cell::Cell;

    struct Fixture {
        dom: Rc<Dom>,
        fetcher: Rc<MemoryFetcher>,
        registry: ComponentRegistry,
    }

    fn fixture(production: bool) -> Fixture {
        let config = SliceConfig {
            production,
            ..SliceConfig::default()
        };
        let catalog = ComponentCatalog::new()
            .with("Card", "Visual")
            .with("Store", "Service")
            .with("Router", STRUCTURAL_CATEGORY);
        let dom = Rc::new(Dom::new());
        let fetcher = Rc::new(MemoryFetcher::new());
        let registry = ComponentRegistry::new(Rc::new(config), Rc::new(catalog), dom.clone(), fetcher.clone());
        Fixture { dom, fetcher, registry }
    }

    fn visual(dom: &Dom, class: &str) -> ComponentHandle {
        let node = dom.create_element(&crate::types::component_tag(class));
        Rc::new(ComponentInstance::new(
            Rc::new(SimpleClass::new(class, |_| Markup)),
            "Visual",
            ComponentKind::Visual,
            Some(node),
            Rc::new(Markup),
        ))
    }

    #[test]
    fn test_generated_ids_and_conflicts() {
        let f = fixture(false);
        let a = visual(&f.dom, "Card");
        assert!(f.registry.verify_component_ids(&a));
        assert_eq!(a.slice_id(), "card-0");
        assert!(f.registry.register_component(&a, None));

        let b = visual(&f.dom, "Card");
        b.set_slice_id("card-0");
        assert!(!f.registry.verify_component_ids(&b));

        let c = visual(&f.dom, "Card");
        c.set_dom_id(Some("card-0".to_string()));
        assert!(!f.registry.verify_component_ids(&c));

        assert_eq!(f.registry.len(), 1);
        assert!(Rc::ptr_eq(&f.registry.get_component("card-0").unwrap(), &a));
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let f = fixture(false);
        let a = visual(&f.dom, "Card");
        a.set_slice_id("main");
        assert!(f.registry.register_component(&a, None));
        assert_eq!(f.dom.get_attribute(a.node().unwrap(), SLICE_ID_ATTR).as_deref(), Some("main"));

        let b = visual(&f.dom, "Card");
        b.set_slice_id("main");
        assert!(!f.registry.register_component(&b, None));
        assert!(!b.is_registered());
    }

    #[test]
    fn test_recursive_registration_links_nearest_ancestor() {
        let f = fixture(false);
        let outer = visual(&f.dom, "Card");
        let middle = visual(&f.dom, "Card");
        let inner = visual(&f.dom, "Card");
        for (handle, id) in [(&outer, "outer"), (&middle, "middle"), (&inner, "inner")] {
            handle.set_slice_id(id);
        }
        let wrapper = f.dom.create_element("div");
        f.dom.append_child(outer.node().unwrap(), wrapper);
        f.dom.append_child(wrapper, middle.node().unwrap());
        f.dom.append_child(middle.node().unwrap(), inner.node().unwrap());

        f.registry.register_component(&inner, None);
        f.registry.register_component(&middle, None);
        f.registry.register_component(&outer, None);
        f.registry.register_components_recursively(&outer, None);

        assert_eq!(f.registry.parent_of(&inner).unwrap().slice_id(), "middle");
        assert_eq!(f.registry.parent_of(&middle).unwrap().slice_id(), "outer");
        assert!(f.registry.parent_of(&outer).is_none());

        let tops = f.registry.top_parents();
        assert_eq!(tops.len(), 1);
        assert_eq!(tops["outer"].len(), 2);
    }

    #[test]
    fn test_props_defaults_and_assignment() {
        struct Label {
            sets: Cell<u32>,
        }
        impl Component for Label {
            fn set_prop(&self, _name: &str, _value: &Value) {
                self.sets.set(self.sets.get() + 1);
            }
        }

        let f = fixture(false);
        let behaviour = Rc::new(Label { sets: Cell::new(0) });
        let class = SimpleClass::new("Card", |_| Markup).with_props(vec![
            PropSpec::new("text").default_value("hello"),
            PropSpec::new("size").default_value(2),
            PropSpec::new("title").required(),
        ]);
        let handle = ComponentInstance::new(Rc::new(class), "Visual", ComponentKind::Visual, None, behaviour.clone());

        let mut props = Props::new();
        props.insert("size".to_string(), json!(5));
        props.insert("colour".to_string(), json!("red"));
        f.registry.set_component_props(&handle, props);

        assert_eq!(handle.prop("text"), Some(json!("hello")));
        assert_eq!(handle.prop("size"), Some(json!(5)));
        assert_eq!(handle.prop("colour"), Some(json!("red")));
        assert_eq!(handle.prop("title"), None);
        assert_eq!(behaviour.sets.get(), 3);
    }

    #[test]
    fn test_destroy_runs_hook_and_orphans_children() {
        struct Tracked(Rc<Cell<u32>>);
        impl Component for Tracked {
            fn capabilities(&self) -> Capabilities {
                Capabilities::BEFORE_DESTROY
            }
            fn before_destroy(&self, _this: &ComponentInstance) -> Result<(), crate::error::HookError> {
                self.0.set(self.0.get() + 1);
                Err("boom".into())
            }
        }

        let f = fixture(false);
        let calls = Rc::new(Cell::new(0));
        let parent = Rc::new(ComponentInstance::new(
            Rc::new(SimpleClass::new("Card", |_| Markup)),
            "Visual",
            ComponentKind::Visual,
            Some(f.dom.create_element("slice-card")),
            Rc::new(Tracked(calls.clone())),
        ));
        parent.set_slice_id("parent");
        let child = visual(&f.dom, "Card");
        child.set_slice_id("child");
        f.dom.append_child(f.dom.body(), parent.node().unwrap());

        f.registry.register_component(&parent, None);
        f.registry.register_component(&child, Some(&parent));
        assert_eq!(f.registry.children_of(&parent).len(), 1);

        assert_eq!(f.registry.destroy_component("parent"), 1);
        assert_eq!(calls.get(), 1);
        assert!(!f.dom.is_connected(parent.node().unwrap()));
        assert!(f.registry.parent_of(&child).is_none());
        assert_eq!(f.registry.active_ids(), vec!["child"]);

        // Already gone, and unknown ids
        assert_eq!(f.registry.destroy_components(vec![DestroyTarget::from(&parent), "nope".into()]), 0);
    }

    #[test]
    fn test_destroy_releases_nodes_but_keeps_live_children() {
        let f = fixture(false);
        let page = visual(&f.dom, "Card");
        page.set_slice_id("page");
        let page_node = page.node().unwrap();
        f.dom.append_child(f.dom.body(), page_node);
        f.dom.instantiate(&crate::dom::Template::parse("<h1>Deck</h1>"), page_node);
        let card = visual(&f.dom, "Card");
        card.set_slice_id("card");
        let card_node = card.node().unwrap();
        f.dom.append_child(page_node, card_node);
        f.registry.register_component(&page, None);
        f.registry.register_component(&card, Some(&page));
        let before = f.dom.node_count();

        assert_eq!(f.registry.destroy_component("page"), 1);
        // Host, heading and its text are freed; the card is only detached
        assert_eq!(f.dom.node_count(), before - 3);
        assert_eq!(f.dom.parent(card_node), None);
        assert!(Rc::ptr_eq(&f.registry.component_for_node(card_node).unwrap(), &card));

        // The next build takes a freed slot instead of growing the arena
        let again = visual(&f.dom, "Card");
        assert!(again.node().unwrap().index() < card_node.index());
        assert_eq!(f.dom.node_count(), before - 2);
    }

    #[test]
    fn test_destroy_by_container_and_pattern() {
        let f = fixture(false);
        let host = f.dom.create_element("div");
        let mut handles = Vec::new();
        for id in ["route-Home", "route-Deck", "card-1"] {
            let handle = visual(&f.dom, "Card");
            handle.set_slice_id(id);
            f.dom.append_child(host, handle.node().unwrap());
            f.registry.register_component(&handle, None);
            handles.push(handle);
        }

        assert_eq!(f.registry.destroy_by_pattern("(unclosed"), 0);
        assert_eq!(f.registry.destroy_by_pattern("^route-"), 2);
        assert_eq!(f.registry.active_ids(), vec!["card-1"]);

        assert_eq!(f.registry.destroy_by_container(None), 0);
        assert_eq!(f.registry.destroy_by_container(Some(host)), 1);
        assert!(f.registry.is_empty());
    }

    #[test]
    fn test_resource_urls() {
        let f = fixture(false);
        assert_eq!(
            f.registry.resource_url("Card", ResourceType::Html, None).unwrap(),
            "/Components/Visual/Card/Card.html"
        );
        assert_eq!(
            f.registry.resource_url("Router", ResourceType::Css, None).unwrap(),
            "/Slice/Components/Structural/Router/Router.css"
        );
        assert_eq!(f.registry.resource_url("Dark", ResourceType::Theme, None).unwrap(), "/Themes/Dark.css");
        assert_eq!(f.registry.resource_url("main", ResourceType::Styles, None).unwrap(), "/Styles/main.css");
        assert_eq!(
            f.registry.resource_url("Card", ResourceType::Html, Some("Missing")),
            Err(FetchError::UnknownCategory("Missing".to_string()))
        );
    }

    #[test]
    fn test_fetch_text_custom_path_and_errors() {
        let f = fixture(true);
        f.fetcher.insert("/custom/card.html", "<p>custom</p>");
        f.fetcher.insert("/Components/Visual/Card/Card.css", ".card{}");

        let custom = block_on(f.registry.fetch_text("Card", ResourceType::Html, None, Some("/custom/card.html")));
        assert_eq!(custom.unwrap(), "<p>custom</p>");

        let css = block_on(f.registry.fetch_text("Card", ResourceType::Css, None, None));
        assert_eq!(css.unwrap(), ".card{}");

        let missing = block_on(f.registry.fetch_text("Card", ResourceType::Html, None, None));
        assert!(matches!(missing, Err(FetchError::Request { .. })));
    }
}
