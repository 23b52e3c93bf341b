//! Component class imports.
//!
//! The build pipeline resolves a class module path (`P/X/X.js`) and asks the
//! host's [`ClassLoader`] for the class behind it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;

use crate::component::ComponentClass;
use crate::error::FetchError;

/// Resolves class module paths to component classes.
#[async_trait(?Send)]
pub trait ClassLoader {
    async fn import_class(&self, module_path: &str) -> Result<Rc<dyn ComponentClass>, FetchError>;
}

/// Classes linked into the binary, looked up by module file stem.
#[derive(Default)]
pub struct StaticClassLoader {
    classes: RefCell<HashMap<String, Rc<dyn ComponentClass>>>,
    imports: RefCell<Vec<String>>,
}

impl StaticClassLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style register.
    pub fn with(self, class: impl ComponentClass + 'static) -> Self {
        self.register(Rc::new(class));
        self
    }

    pub fn register(&self, class: Rc<dyn ComponentClass>) {
        self.classes.borrow_mut().insert(class.name().to_string(), class);
    }

    /// Module paths imported so far, in order.
    pub fn imports(&self) -> Vec<String> {
        self.imports.borrow().clone()
    }

    pub fn import_count(&self, module_path: &str) -> usize {
        self.imports.borrow().iter().filter(|m| *m == module_path).count()
    }
}

/// `/Components/Visual/Card/Card.js` → `Card`.
fn module_stem(module_path: &str) -> &str {
    let file = module_path.rsplit('/').next().unwrap_or(module_path);
    file.strip_suffix(".js").unwrap_or(file)
}

#[async_trait(?Send)]
impl ClassLoader for StaticClassLoader {
    async fn import_class(&self, module_path: &str) -> Result<Rc<dyn ComponentClass>, FetchError> {
        self.imports.borrow_mut().push(module_path.to_string());
        self.classes
            .borrow()
            .get(module_stem(module_path))
            .cloned()
            .ok_or_else(|| FetchError::ClassImport {
                module: module_path.to_string(),
                reason: "no class registered for module".to_string(),
            })
    }
}
