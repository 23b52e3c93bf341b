//! Route-container lookup cache.
//!
//! Finding `slice-route` / `slice-multi-route` elements means walking a
//! subtree. Results are kept per search root for a short TTL and dropped
//! early when a mutation adds or removes a route container.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use crate::dom::{Dom, MutationRecord, NodeId, ObserverHandle};
use crate::types::is_route_container_tag;

struct CacheEntry {
    containers: Rc<[NodeId]>,
    stored_at: Instant,
}

/// Route containers under a search root, cached with a TTL.
pub struct RouteContainerCache {
    ttl: Duration,
    entries: RefCell<HashMap<NodeId, CacheEntry>>,
    observer: RefCell<Option<ObserverHandle>>,
}

impl RouteContainerCache {
    pub fn new(ttl: Duration) -> Rc<Self> {
        Rc::new(Self {
            ttl,
            entries: RefCell::new(HashMap::new()),
            observer: RefCell::new(None),
        })
    }

    /// Invalidate on DOM mutations that touch route containers.
    pub fn attach(self: &Rc<Self>, dom: &Dom) {
        let weak: Weak<Self> = Rc::downgrade(self);
        let handle = dom.observe(move |dom, record| {
            if let Some(cache) = weak.upgrade() {
                if touches_route_containers(dom, record) {
                    cache.invalidate();
                } else {
                    cache.forget_roots(&record.removed);
                }
            }
        });
        if let Some(previous) = self.observer.borrow_mut().replace(handle) {
            dom.disconnect(previous);
        }
    }

    /// Containers under `root`, from cache when fresh.
    pub fn get(&self, dom: &Dom, root: NodeId) -> Rc<[NodeId]> {
        let now = Instant::now();
        if let Some(entry) = self.entries.borrow().get(&root) {
            if now.duration_since(entry.stored_at) < self.ttl {
                return entry.containers.clone();
            }
        }
        let containers: Rc<[NodeId]> = find_route_containers(dom, root).into();
        self.entries.borrow_mut().insert(
            root,
            CacheEntry {
                containers: containers.clone(),
                stored_at: now,
            },
        );
        containers
    }

    pub fn invalidate(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Drop entries searched from `roots`. Removed roots may be released and
    /// their ids reused.
    fn forget_roots(&self, roots: &[NodeId]) {
        let mut entries = self.entries.borrow_mut();
        for root in roots {
            entries.remove(root);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

/// Every route container element under `root`, in document order.
pub fn find_route_containers(dom: &Dom, root: NodeId) -> Vec<NodeId> {
    dom.find_elements(root, is_route_container_tag)
}

fn touches_route_containers(dom: &Dom, record: &MutationRecord) -> bool {
    record.added.iter().chain(&record.removed).any(|node| {
        dom.tag_name(*node).is_some_and(|tag| is_route_container_tag(&tag))
            || !find_route_containers(dom, *node).is_empty()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_expiry() {
        let dom = Dom::new();
        let route = dom.create_element("slice-route");
        dom.append_child(dom.body(), route);

        let cache = RouteContainerCache::new(Duration::from_millis(30));
        let first = cache.get(&dom, dom.document());
        assert_eq!(&*first, &[route]);
        assert!(Rc::ptr_eq(&first, &cache.get(&dom, dom.document())));

        std::thread::sleep(Duration::from_millis(40));
        assert!(!Rc::ptr_eq(&first, &cache.get(&dom, dom.document())));
    }

    #[test]
    fn test_mutation_invalidates() {
        let dom = Dom::new();
        let cache = RouteContainerCache::new(Duration::from_secs(60));
        cache.attach(&dom);

        let wrapper = dom.create_element("section");
        let multi = dom.create_element("slice-multi-route");
        dom.append_child(wrapper, multi);

        let before = cache.get(&dom, dom.document());
        assert!(before.is_empty());

        // Unrelated nodes keep the entry
        let div = dom.create_element("div");
        dom.append_child(dom.body(), div);
        assert!(Rc::ptr_eq(&before, &cache.get(&dom, dom.document())));
        assert_eq!(cache.len(), 1);

        // A subtree holding a container drops it
        dom.append_child(dom.body(), wrapper);
        assert!(cache.is_empty());
        assert_eq!(&*cache.get(&dom, dom.document()), &[multi]);
    }

    #[test]
    fn test_released_root_is_forgotten() {
        let dom = Dom::new();
        let cache = RouteContainerCache::new(Duration::from_secs(60));
        cache.attach(&dom);

        let page = dom.create_element("slice-home-page");
        let other = dom.create_element("slice-card");
        assert!(cache.get(&dom, page).is_empty());
        assert!(cache.get(&dom, other).is_empty());
        assert_eq!(cache.len(), 2);

        dom.release_subtree(page, |_| false);
        assert_eq!(cache.len(), 1);

        // The freed id now belongs to a page holding a container
        let reused = dom.create_element("slice-docs-page");
        assert_eq!(reused, page);
        let route = dom.create_element("slice-route");
        dom.append_child(reused, route);
        assert_eq!(&*cache.get(&dom, reused), &[route]);
    }
}
