//! DOM - Node arena the runtime mounts components into.
//!
//! Nodes are indices into one arena, the same way the component registry
//! hands out slots. Each record holds explicit parent/children links, so
//! `is_connected`, subtree walks and detaching never need a live browser.
//!
//! ```text
//! #0 document
//! └── #1 body
//!     └── #2 div#app
//!         └── #5 slice-home-page [slice-id=route-HomePage]
//!             └── #6 slice-route [path=/settings]
//! ```
//!
//! Structural changes (`append_child`, `remove`, `clear_children`) notify
//! mutation observers synchronously with the added and removed nodes.
//! Detached nodes stay in the arena and can be re-attached later, which is
//! how cached route components move between containers. Subtrees of destroyed
//! components go back to a free pool through [`Dom::release_subtree`].

pub mod template;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;

pub use template::{Template, TemplateNode};

// =============================================================================
// Types
// =============================================================================

/// Handle to a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
enum NodeData {
    Document,
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeRecord {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// One structural change under `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

/// Node storage with a free index pool, like the registry's slot arena.
#[derive(Debug, Default)]
struct NodeArena {
    records: Vec<Option<NodeRecord>>,
    /// Released indices, reused before the arena grows.
    free_indices: Vec<usize>,
}

impl NodeArena {
    fn get(&self, index: usize) -> Option<&NodeRecord> {
        self.records.get(index).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut NodeRecord> {
        self.records.get_mut(index).and_then(Option::as_mut)
    }

    fn allocate(&mut self, record: NodeRecord) -> NodeId {
        match self.free_indices.pop() {
            Some(index) => {
                self.records[index] = Some(record);
                NodeId(index)
            }
            None => {
                self.records.push(Some(record));
                NodeId(self.records.len() - 1)
            }
        }
    }

    fn release(&mut self, index: usize) -> bool {
        match self.records.get_mut(index).and_then(Option::take) {
            Some(_) => {
                self.free_indices.push(index);
                true
            }
            None => false,
        }
    }

    fn live(&self) -> usize {
        self.records.len() - self.free_indices.len()
    }
}

/// Mutation observer callback.
pub type MutationCallback = Rc<dyn Fn(&Dom, &MutationRecord)>;

/// Returned by [`Dom::observe`]; pass to [`Dom::disconnect`] to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverHandle(usize);

// =============================================================================
// Dom
// =============================================================================

/// The document: node arena plus mutation observers.
pub struct Dom {
    nodes: RefCell<NodeArena>,
    observers: RefCell<Vec<(ObserverHandle, MutationCallback)>>,
    next_observer: Cell<usize>,
    document: NodeId,
    body: NodeId,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    /// Create a document containing an empty `body`.
    pub fn new() -> Self {
        let document = NodeRecord {
            data: NodeData::Document,
            parent: None,
            children: vec![NodeId(1)],
        };
        let body = NodeRecord {
            data: NodeData::Element {
                tag: "body".to_string(),
                attributes: IndexMap::new(),
            },
            parent: Some(NodeId(0)),
            children: Vec::new(),
        };
        Self {
            nodes: RefCell::new(NodeArena {
                records: vec![Some(document), Some(body)],
                free_indices: Vec::new(),
            }),
            observers: RefCell::new(Vec::new()),
            next_observer: Cell::new(0),
            document: NodeId(0),
            body: NodeId(1),
        }
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Number of live nodes, released ones excluded.
    pub fn node_count(&self) -> usize {
        self.nodes.borrow().live()
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    /// Create a detached element. Tags are case-insensitive.
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.push_record(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: IndexMap::new(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&self, text: &str) -> NodeId {
        self.push_record(NodeData::Text(text.to_string()))
    }

    fn push_record(&self, data: NodeData) -> NodeId {
        self.nodes.borrow_mut().allocate(NodeRecord {
            data,
            parent: None,
            children: Vec::new(),
        })
    }

    /// Instantiate a template under `parent`. Returns the new top-level nodes.
    pub fn instantiate(&self, template: &Template, parent: NodeId) -> Vec<NodeId> {
        let created: Vec<NodeId> = template
            .nodes()
            .iter()
            .map(|node| self.build_subtree(node))
            .collect();
        for node in &created {
            self.link(parent, *node);
        }
        if !created.is_empty() {
            self.notify(MutationRecord {
                target: parent,
                added: created.clone(),
                removed: Vec::new(),
            });
        }
        created
    }

    fn build_subtree(&self, node: &TemplateNode) -> NodeId {
        match node {
            TemplateNode::Text(text) => self.create_text(text),
            TemplateNode::Element {
                tag,
                attributes,
                children,
            } => {
                let id = self.create_element(tag);
                for (name, value) in attributes {
                    self.set_attribute(id, name, value);
                }
                for child in children {
                    let child_id = self.build_subtree(child);
                    self.link(id, child_id);
                }
                id
            }
        }
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// Lowercase tag name, `None` for text and the document.
    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        match &self.nodes.borrow().get(node.0)?.data {
            NodeData::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        }
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.tag_name(node).is_some()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow().get(node.0)?.parent
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(node.0)
            .map(|record| record.children.clone())
            .unwrap_or_default()
    }

    /// Whether the node is attached to the document.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.document {
                return true;
            }
            current = nodes.get(id.0).and_then(|record| record.parent);
        }
        false
    }

    /// Whether `node` is `ancestor` or inside its subtree.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = nodes.get(id.0).and_then(|record| record.parent);
        }
        false
    }

    /// All nodes below `root` in document order, `root` excluded.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let nodes = self.nodes.borrow();
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match nodes.get(root.0) {
            Some(record) => record.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(record) = nodes.get(id.0) {
                stack.extend(record.children.iter().rev().copied());
            }
        }
        out
    }

    /// Elements below `root` whose tag satisfies `predicate`.
    pub fn find_elements(&self, root: NodeId, predicate: impl Fn(&str) -> bool) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|node| self.tag_name(*node).is_some_and(|tag| predicate(&tag)))
            .collect()
    }

    /// First connected element carrying `id="..."`.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.document)
            .into_iter()
            .find(|node| self.get_attribute(*node, "id").as_deref() == Some(id))
    }

    /// Concatenated text of the node and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut text = String::new();
        let nodes = std::iter::once(node).chain(self.descendants(node));
        for id in nodes {
            if let Some(NodeData::Text(value)) = self.nodes.borrow().get(id.0).map(|r| &r.data) {
                text.push_str(value);
            }
        }
        text
    }

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        match &self.nodes.borrow().get(node.0)?.data {
            NodeData::Element { attributes, .. } => attributes.get(name).cloned(),
            _ => None,
        }
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.get_attribute(node, name).is_some()
    }

    /// Set an attribute. Ignored on text nodes and the document.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(NodeData::Element { attributes, .. }) = nodes.get_mut(node.0).map(|r| &mut r.data) {
            attributes.insert(name.to_ascii_lowercase(), value.to_string());
        }
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(NodeData::Element { attributes, .. }) = nodes.get_mut(node.0).map(|r| &mut r.data) {
            attributes.shift_remove(name);
        }
    }

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    /// Append `child` to `parent`, detaching it from any previous parent.
    ///
    /// Returns false (and changes nothing) when `child` is `parent` or one of
    /// its ancestors.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> bool {
        if self.contains(child, parent) {
            tracing::warn!(component = "Dom", ?parent, ?child, "refusing to append a node into itself");
            return false;
        }
        self.remove(child);
        self.link(parent, child);
        self.notify(MutationRecord {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
        true
    }

    /// Detach a node from its parent. No-op when already detached.
    pub fn remove(&self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        {
            let mut nodes = self.nodes.borrow_mut();
            if let Some(record) = nodes.get_mut(parent.0) {
                record.children.retain(|child| *child != node);
            }
            if let Some(record) = nodes.get_mut(node.0) {
                record.parent = None;
            }
        }
        self.notify(MutationRecord {
            target: parent,
            added: Vec::new(),
            removed: vec![node],
        });
    }

    /// Detach every child of `node` (`innerHTML = ''`).
    pub fn clear_children(&self, node: NodeId) {
        let removed = {
            let mut nodes = self.nodes.borrow_mut();
            let Some(record) = nodes.get_mut(node.0) else {
                return;
            };
            let removed = std::mem::take(&mut record.children);
            for child in &removed {
                if let Some(record) = nodes.get_mut(child.0) {
                    record.parent = None;
                }
            }
            removed
        };
        if !removed.is_empty() {
            self.notify(MutationRecord {
                target: node,
                added: Vec::new(),
                removed,
            });
        }
    }

    fn link(&self, parent: NodeId, child: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if nodes.get(parent.0).is_none() {
            return;
        }
        if let Some(record) = nodes.get_mut(child.0) {
            record.parent = Some(parent);
        }
        if let Some(record) = nodes.get_mut(parent.0) {
            record.children.push(child);
        }
    }

    /// Detach `root` and return it and its subtree to the free pool.
    ///
    /// Descendants for which `keep` returns true are detached instead of
    /// released, together with their own subtrees. Observers get one record
    /// listing the released nodes. The document and body are never released.
    /// Returns the number of released nodes.
    pub fn release_subtree(&self, root: NodeId, keep: impl Fn(NodeId) -> bool) -> usize {
        if root == self.document || root == self.body || self.nodes.borrow().get(root.0).is_none() {
            return 0;
        }
        self.remove(root);

        let mut doomed = Vec::new();
        let mut kept = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            doomed.push(node);
            for child in self.children(node) {
                if keep(child) {
                    kept.push(child);
                } else {
                    stack.push(child);
                }
            }
        }

        {
            let mut nodes = self.nodes.borrow_mut();
            for node in kept {
                if let Some(record) = nodes.get_mut(node.0) {
                    record.parent = None;
                }
            }
        }
        // Observers see the doomed nodes while they can still be inspected
        self.notify(MutationRecord {
            target: root,
            added: Vec::new(),
            removed: doomed.clone(),
        });

        let mut nodes = self.nodes.borrow_mut();
        doomed.into_iter().filter(|node| nodes.release(node.0)).count()
    }

    // -------------------------------------------------------------------------
    // Mutation Observers
    // -------------------------------------------------------------------------

    /// Observe structural changes anywhere in the arena.
    pub fn observe(&self, callback: impl Fn(&Dom, &MutationRecord) + 'static) -> ObserverHandle {
        let handle = ObserverHandle(self.next_observer.get());
        self.next_observer.set(handle.0 + 1);
        self.observers.borrow_mut().push((handle, Rc::new(callback)));
        handle
    }

    pub fn disconnect(&self, handle: ObserverHandle) {
        self.observers.borrow_mut().retain(|(h, _)| *h != handle);
    }

    fn notify(&self, record: MutationRecord) {
        // Observers may touch the DOM, so no borrow is held while they run
        let observers: Vec<MutationCallback> = self
            .observers
            .borrow()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for observer in observers {
            observer(self, &record);
        }
    }

    // -------------------------------------------------------------------------
    // Serialization
    // -------------------------------------------------------------------------

    /// Markup of the node's children.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.write_outer_html(child, &mut out);
        }
        out
    }

    fn write_outer_html(&self, node: NodeId, out: &mut String) {
        let data = match self.nodes.borrow().get(node.0) {
            Some(record) => record.data.clone(),
            None => return,
        };
        match data {
            NodeData::Document => out.push_str(&self.inner_html(node)),
            NodeData::Text(text) => out.push_str(&text),
            NodeData::Element { tag, attributes } => {
                out.push('<');
                out.push_str(&tag);
                for (name, value) in &attributes {
                    out.push_str(&format!(" {name}=\"{value}\""));
                }
                out.push('>');
                out.push_str(&self.inner_html(node));
                out.push_str(&format!("</{tag}>"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_connectivity() {
        let dom = Dom::new();
        let app = dom.create_element("DIV");
        dom.set_attribute(app, "id", "app");

        assert!(!dom.is_connected(app));
        assert!(dom.append_child(dom.body(), app));
        assert!(dom.is_connected(app));
        assert_eq!(dom.tag_name(app).as_deref(), Some("div"));
        assert_eq!(dom.get_element_by_id("app"), Some(app));

        let child = dom.create_element("span");
        dom.append_child(app, child);
        assert_eq!(dom.parent(child), Some(app));
        assert!(dom.contains(dom.body(), child));

        dom.remove(app);
        assert!(!dom.is_connected(child));
        assert_eq!(dom.get_element_by_id("app"), None);
    }

    #[test]
    fn test_reparenting_moves_node() {
        let dom = Dom::new();
        let a = dom.create_element("div");
        let b = dom.create_element("div");
        let item = dom.create_element("p");
        dom.append_child(a, item);
        dom.append_child(b, item);

        assert!(dom.children(a).is_empty());
        assert_eq!(dom.children(b), vec![item]);
    }

    #[test]
    fn test_cycle_rejected() {
        let dom = Dom::new();
        let outer = dom.create_element("div");
        let inner = dom.create_element("div");
        dom.append_child(outer, inner);

        assert!(!dom.append_child(inner, outer));
        assert!(!dom.append_child(outer, outer));
        assert_eq!(dom.parent(inner), Some(outer));
    }

    #[test]
    fn test_instantiate_template() {
        let dom = Dom::new();
        let host = dom.create_element("slice-page");
        let template = Template::parse(r#"<h1 class="t">Hi</h1><slice-route path="/a"></slice-route>"#);

        let created = dom.instantiate(&template, host);
        assert_eq!(created.len(), 2);
        assert_eq!(dom.text_content(host), "Hi");
        assert_eq!(
            dom.find_elements(host, |tag| tag == "slice-route"),
            vec![created[1]]
        );
        assert_eq!(
            dom.inner_html(host),
            r#"<h1 class="t">Hi</h1><slice-route path="/a"></slice-route>"#
        );
    }

    #[test]
    fn test_descendants_document_order() {
        let dom = Dom::new();
        let root = dom.create_element("div");
        dom.instantiate(&Template::parse("<a><b></b></a><c></c>"), root);

        let tags: Vec<String> = dom
            .descendants(root)
            .into_iter()
            .filter_map(|node| dom.tag_name(node))
            .collect();
        assert_eq!(tags, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_release_subtree_reuses_slots() {
        let dom = Dom::new();
        let host = dom.create_element("slice-page");
        dom.append_child(dom.body(), host);
        dom.instantiate(&Template::parse("<h1>Title</h1><div><slice-card></slice-card></div>"), host);
        let card = dom.find_elements(host, |tag| tag == "slice-card")[0];
        let before = dom.node_count();

        // The card belongs to someone else and survives, detached
        let released = dom.release_subtree(host, |node| node == card);
        assert_eq!(released, 4);
        assert_eq!(dom.node_count(), before - 4);
        assert!(dom.children(dom.body()).is_empty());
        assert_eq!(dom.parent(card), None);
        assert_eq!(dom.tag_name(card).as_deref(), Some("slice-card"));
        assert_eq!(dom.tag_name(host), None);
        assert_eq!(dom.release_subtree(host, |_| false), 0);
        assert_eq!(dom.release_subtree(dom.body(), |_| false), 0);

        let reused: Vec<NodeId> = (0..4).map(|_| dom.create_element("p")).collect();
        assert!(reused.iter().all(|node| node.index() < before));
        assert_eq!(dom.node_count(), before);
    }

    #[test]
    fn test_mutation_observer() {
        let dom = Dom::new();
        let seen: Rc<RefCell<Vec<MutationRecord>>> = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let handle = dom.observe(move |_, record| seen_clone.borrow_mut().push(record.clone()));

        let node = dom.create_element("div");
        dom.append_child(dom.body(), node);
        dom.clear_children(dom.body());

        {
            let seen = seen.borrow();
            assert_eq!(seen.len(), 2);
            assert_eq!(seen[0].added, vec![node]);
            assert_eq!(seen[1].removed, vec![node]);
        }

        dom.disconnect(handle);
        dom.append_child(dom.body(), node);
        assert_eq!(seen.borrow().len(), 2);
    }
}
