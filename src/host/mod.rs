//! Host environment seams.
//!
//! Everything the runtime needs from the outside world goes through [`Host`]:
//! text resources, class imports and session history.

mod classes;
mod fetch;
mod history;

use std::rc::Rc;

pub use classes::{ClassLoader, StaticClassLoader};
pub use fetch::{DirectoryFetcher, MemoryFetcher, ResourceFetcher};
pub use history::{History, Location, MemoryHistory};

/// The host's services, shared by every runtime subsystem.
#[derive(Clone)]
pub struct Host {
    pub fetcher: Rc<dyn ResourceFetcher>,
    pub classes: Rc<dyn ClassLoader>,
    pub history: Rc<dyn History>,
}

impl Host {
    pub fn new(fetcher: Rc<dyn ResourceFetcher>, classes: Rc<dyn ClassLoader>, history: Rc<dyn History>) -> Self {
        Self {
            fetcher,
            classes,
            history,
        }
    }
}
