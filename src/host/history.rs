//! Browser history integration.
//!
//! The router pushes and replaces entries through [`History`] and reads the
//! current [`Location`] back from it. Back/forward are the host's business:
//! after moving, the host calls `Router::on_route_change`.

use std::cell::{Cell, RefCell};

use crate::types::Query;

// =============================================================================
// Location
// =============================================================================

/// Path and query of the current entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub pathname: String,
    /// Query string including the leading `?`, or empty.
    pub search: String,
}

impl Location {
    /// Split a `/path?query#fragment` string. The fragment is dropped.
    pub fn parse(href: &str) -> Self {
        let without_fragment = href.split('#').next().unwrap_or_default();
        let (pathname, search) = match without_fragment.find('?') {
            Some(idx) => (&without_fragment[..idx], &without_fragment[idx..]),
            None => (without_fragment, ""),
        };
        let pathname = if pathname.is_empty() { "/" } else { pathname };
        Self {
            pathname: pathname.to_string(),
            search: search.to_string(),
        }
    }

    /// Decoded `key=value` pairs. Later keys win.
    pub fn query(&self) -> Query {
        self.search
            .trim_start_matches('?')
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (decode_component(key), decode_component(value)),
                None => (decode_component(pair), String::new()),
            })
            .collect()
    }

    pub fn href(&self) -> String {
        format!("{}{}", self.pathname, self.search)
    }
}

fn decode_component(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            byte => out.push(byte),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

// =============================================================================
// History
// =============================================================================

/// The host's session history.
pub trait History {
    fn location(&self) -> Location;
    fn push_state(&self, href: &str);
    fn replace_state(&self, href: &str);
}

/// Session history kept in memory.
#[derive(Debug)]
pub struct MemoryHistory {
    entries: RefCell<Vec<String>>,
    index: Cell<usize>,
}

impl MemoryHistory {
    pub fn new(initial: &str) -> Self {
        Self {
            entries: RefCell::new(vec![initial.to_string()]),
            index: Cell::new(0),
        }
    }

    /// Step back one entry. Returns false at the start.
    pub fn back(&self) -> bool {
        let index = self.index.get();
        if index == 0 {
            return false;
        }
        self.index.set(index - 1);
        true
    }

    /// Step forward one entry. Returns false at the end.
    pub fn forward(&self) -> bool {
        let index = self.index.get();
        if index + 1 >= self.entries.borrow().len() {
            return false;
        }
        self.index.set(index + 1);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("/")
    }
}

impl History for MemoryHistory {
    fn location(&self) -> Location {
        let entries = self.entries.borrow();
        Location::parse(entries.get(self.index.get()).map_or("/", String::as_str))
    }

    fn push_state(&self, href: &str) {
        let mut entries = self.entries.borrow_mut();
        let index = self.index.get();
        entries.truncate(index + 1);
        entries.push(href.to_string());
        self.index.set(entries.len() - 1);
    }

    fn replace_state(&self, href: &str) {
        let mut entries = self.entries.borrow_mut();
        let index = self.index.get();
        match entries.get_mut(index) {
            Some(entry) => *entry = href.to_string(),
            None => entries.push(href.to_string()),
        }
    }
}
