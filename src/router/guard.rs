//! Navigation guards.
//!
//! A `beforeEach` guard sees `(to, from, next)` and decides through [`Next`]:
//! proceed, cancel, or redirect. A guard that never decides, returns an
//! error or panics lets the navigation continue.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::HookError;
use crate::types::{Metadata, Params, Query};

/// Where a navigation is going, or where it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationContext {
    pub path: String,
    /// Component mounted for the path, if any route matched.
    pub component: Option<String>,
    pub params: Params,
    pub query: Query,
    pub metadata: Metadata,
}

impl NavigationContext {
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

/// What a guard decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Continue,
    Cancel,
    Redirect { path: String, replace: bool },
}

/// The guard's decision callback. Only the first call counts.
#[derive(Debug, Clone, Default)]
pub struct Next {
    decision: Rc<RefCell<Option<GuardDecision>>>,
}

impl Next {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn decide(&self, decision: GuardDecision) {
        let mut slot = self.decision.borrow_mut();
        if slot.is_none() {
            *slot = Some(decision);
        } else {
            tracing::warn!(component = "Router", ?decision, "guard decided more than once; ignoring");
        }
    }

    pub fn proceed(&self) {
        self.decide(GuardDecision::Continue);
    }

    pub fn cancel(&self) {
        self.decide(GuardDecision::Cancel);
    }

    /// Redirect, pushing a new history entry.
    pub fn redirect(&self, path: impl Into<String>) {
        self.decide(GuardDecision::Redirect {
            path: path.into(),
            replace: false,
        });
    }

    /// Redirect, replacing the current history entry.
    pub fn redirect_replace(&self, path: impl Into<String>) {
        self.decide(GuardDecision::Redirect {
            path: path.into(),
            replace: true,
        });
    }

    pub(crate) fn decision(&self) -> Option<GuardDecision> {
        self.decision.borrow().clone()
    }
}

/// Runs before a navigation commits.
#[async_trait(?Send)]
pub trait BeforeEachGuard {
    async fn check(&self, to: &NavigationContext, from: Option<&NavigationContext>, next: Next) -> Result<(), HookError>;
}

/// Runs after the target has been mounted.
#[async_trait(?Send)]
pub trait AfterEachGuard {
    async fn after(&self, to: &NavigationContext, from: Option<&NavigationContext>) -> Result<(), HookError>;
}

/// Synchronous closure as a [`BeforeEachGuard`].
pub struct BeforeFn<F>(pub F);

#[async_trait(?Send)]
impl<F> BeforeEachGuard for BeforeFn<F>
where
    F: Fn(&NavigationContext, Option<&NavigationContext>, Next) -> Result<(), HookError> + 'static,
{
    async fn check(&self, to: &NavigationContext, from: Option<&NavigationContext>, next: Next) -> Result<(), HookError> {
        (self.0)(to, from, next)
    }
}

/// Synchronous closure as an [`AfterEachGuard`].
pub struct AfterFn<F>(pub F);

#[async_trait(?Send)]
impl<F> AfterEachGuard for AfterFn<F>
where
    F: Fn(&NavigationContext, Option<&NavigationContext>) -> Result<(), HookError> + 'static,
{
    async fn after(&self, to: &NavigationContext, from: Option<&NavigationContext>) -> Result<(), HookError> {
        (self.0)(to, from)
    }
}
