//! Component instance record.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use super::{Capabilities, Component, ComponentClass};
use crate::dom::{Dom, NodeId};
use crate::types::{ComponentKind, Props};

/// Shared handle to a live instance.
pub type ComponentHandle = Rc<ComponentInstance>;

/// The runtime's record of one component instance.
///
/// Identity fields are only written by the build pipeline and the registry.
/// The parent link is not stored here: it lives in the registry slot the
/// instance occupies, so a destroyed parent never dangles.
pub struct ComponentInstance {
    class: Rc<dyn ComponentClass>,
    category: String,
    kind: ComponentKind,
    slice_id: RefCell<String>,
    dom_id: RefCell<Option<String>>,
    node: Option<NodeId>,
    props: RefCell<Props>,
    behavior: Rc<dyn Component>,
    slot: Cell<Option<usize>>,
}

impl ComponentInstance {
    pub fn new(
        class: Rc<dyn ComponentClass>,
        category: impl Into<String>,
        kind: ComponentKind,
        node: Option<NodeId>,
        behavior: Rc<dyn Component>,
    ) -> Self {
        Self {
            class,
            category: category.into(),
            kind,
            slice_id: RefCell::new(String::new()),
            dom_id: RefCell::new(None),
            node,
            props: RefCell::new(Props::new()),
            behavior,
            slot: Cell::new(None),
        }
    }

    // -------------------------------------------------------------------------
    // Identity
    // -------------------------------------------------------------------------

    /// Registry key. Empty until verified or explicitly assigned.
    pub fn slice_id(&self) -> String {
        self.slice_id.borrow().clone()
    }

    pub fn set_slice_id(&self, id: impl Into<String>) {
        *self.slice_id.borrow_mut() = id.into();
    }

    /// DOM `id` attribute, visual components only.
    pub fn dom_id(&self) -> Option<String> {
        self.dom_id.borrow().clone()
    }

    pub fn set_dom_id(&self, id: Option<String>) {
        *self.dom_id.borrow_mut() = id;
    }

    pub fn class(&self) -> &Rc<dyn ComponentClass> {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn is_visual(&self) -> bool {
        self.kind.is_visual()
    }

    /// Host element, `None` for service components.
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn is_connected(&self, dom: &Dom) -> bool {
        self.node.is_some_and(|node| dom.is_connected(node))
    }

    // -------------------------------------------------------------------------
    // Behaviour & Props
    // -------------------------------------------------------------------------

    pub fn behavior(&self) -> &Rc<dyn Component> {
        &self.behavior
    }

    pub fn capabilities(&self) -> Capabilities {
        self.behavior.capabilities()
    }

    pub fn has(&self, capability: Capabilities) -> bool {
        self.capabilities().contains(capability)
    }

    /// Snapshot of the assigned props.
    pub fn props(&self) -> Props {
        self.props.borrow().clone()
    }

    pub fn prop(&self, name: &str) -> Option<Value> {
        self.props.borrow().get(name).cloned()
    }

    /// Store a prop value and run the behaviour's accessor.
    pub(crate) fn assign_prop(&self, name: &str, value: Value) {
        self.props.borrow_mut().insert(name.to_string(), value.clone());
        self.behavior.set_prop(name, &value);
    }

    // -------------------------------------------------------------------------
    // Registry slot
    // -------------------------------------------------------------------------

    pub(crate) fn slot(&self) -> Option<usize> {
        self.slot.get()
    }

    pub(crate) fn set_slot(&self, slot: Option<usize>) {
        self.slot.set(slot);
    }

    /// Whether the instance currently occupies a registry slot.
    pub fn is_registered(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("class", &self.class_name())
            .field("slice_id", &self.slice_id())
            .field("category", &self.category)
            .field("node", &self.node)
            .field("slot", &self.slot.get())
            .finish()
    }
}
