//! Per-name resource cache.
//!
//! Each component name's class, template and CSS are written at most once.
//! Loads still in flight are shared so concurrent first builds of the same
//! name wait on one request per resource.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use futures::future::{LocalBoxFuture, Shared};
use indexmap::IndexMap;

use crate::component::ComponentClass;
use crate::dom::Template;
use crate::error::FetchError;

/// Which of a component's three resources a load produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ResourceSlot {
    Class,
    Template,
    Css,
}

/// Output of one resource load.
#[derive(Clone)]
pub(crate) enum Loaded {
    Class(Rc<dyn ComponentClass>),
    Text(Rc<str>),
}

pub(crate) type SharedLoad = Shared<LocalBoxFuture<'static, Result<Loaded, FetchError>>>;

#[derive(Default)]
pub(crate) struct ResourceCache {
    templates: HashMap<String, Rc<Template>>,
    classes: HashMap<String, Rc<dyn ComponentClass>>,
    /// Names whose CSS was requested, including empty stylesheets.
    requested_styles: HashSet<String>,
    /// Registered component CSS in load order.
    styles: IndexMap<String, String>,
    inflight: HashMap<(String, ResourceSlot), SharedLoad>,
}

impl ResourceCache {
    pub fn has(&self, name: &str, slot: ResourceSlot) -> bool {
        match slot {
            ResourceSlot::Class => self.classes.contains_key(name),
            ResourceSlot::Template => self.templates.contains_key(name),
            ResourceSlot::Css => self.requested_styles.contains(name),
        }
    }

    pub fn class(&self, name: &str) -> Option<Rc<dyn ComponentClass>> {
        self.classes.get(name).cloned()
    }

    pub fn template(&self, name: &str) -> Option<Rc<Template>> {
        self.templates.get(name).cloned()
    }

    pub fn styles(&self, name: &str) -> Option<&str> {
        self.styles.get(name).map(String::as_str)
    }

    /// Every registered stylesheet, concatenated in load order.
    pub fn component_styles(&self) -> String {
        self.styles.values().map(String::as_str).collect::<Vec<_>>().join("\n")
    }

    // First write wins for all three stores

    pub fn store_class(&mut self, name: &str, class: Rc<dyn ComponentClass>) {
        self.classes.entry(name.to_string()).or_insert(class);
    }

    pub fn store_template(&mut self, name: &str, markup: &str) {
        self.templates
            .entry(name.to_string())
            .or_insert_with(|| Rc::new(Template::parse(markup)));
    }

    pub fn store_css(&mut self, name: &str, css: &str) {
        if !self.requested_styles.insert(name.to_string()) {
            return;
        }
        if !css.trim().is_empty() {
            self.styles.insert(name.to_string(), css.to_string());
        }
    }

    /// The in-flight load for `(name, slot)`, started by `start` if none.
    pub fn inflight(
        &mut self,
        name: &str,
        slot: ResourceSlot,
        start: impl FnOnce() -> SharedLoad,
    ) -> SharedLoad {
        self.inflight
            .entry((name.to_string(), slot))
            .or_insert_with(start)
            .clone()
    }

    pub fn finish(&mut self, name: &str, slot: ResourceSlot) {
        self.inflight.remove(&(name.to_string(), slot));
    }

    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Markup, SimpleClass};
    use futures::FutureExt;
    use futures::executor::block_on;
    use std::cell::Cell;

    #[test]
    fn test_first_write_wins() {
        let mut cache = ResourceCache::default();
        cache.store_template("Card", "<p>first</p>");
        cache.store_template("Card", "<p>second</p>");
        assert_eq!(cache.template("Card").unwrap().source(), "<p>first</p>");

        cache.store_css("Card", ".a{}");
        cache.store_css("Card", ".b{}");
        assert_eq!(cache.styles("Card"), Some(".a{}"));

        cache.store_css("Plain", "");
        assert!(cache.has("Plain", ResourceSlot::Css));
        assert_eq!(cache.component_styles(), ".a{}");

        cache.store_class("Card", Rc::new(SimpleClass::new("Card", |_| Markup)));
        assert!(cache.has("Card", ResourceSlot::Class));
        assert!(!cache.has("Other", ResourceSlot::Class));
    }

    #[test]
    fn test_inflight_is_shared() {
        let mut cache = ResourceCache::default();
        let started = Cell::new(0);
        let start = || {
            started.set(started.get() + 1);
            async { Ok(Loaded::Text(Rc::from("body"))) }.boxed_local().shared()
        };

        let first = cache.inflight("Card", ResourceSlot::Template, start);
        let second = cache.inflight("Card", ResourceSlot::Template, || unreachable!());
        assert_eq!(started.get(), 1);
        assert_eq!(cache.inflight_len(), 1);

        let (a, b) = block_on(futures::future::join(first, second));
        assert!(matches!(a, Ok(Loaded::Text(ref text)) if &**text == "body"));
        assert!(b.is_ok());

        cache.finish("Card", ResourceSlot::Template);
        assert_eq!(cache.inflight_len(), 0);
    }
}
