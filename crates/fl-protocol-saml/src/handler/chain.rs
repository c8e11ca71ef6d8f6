//! Ordered handler sets.

use std::sync::Arc;

use tracing::warn;

use super::Handler;

/// Handlers in execution order, unique by name.
#[derive(Clone, Default)]
pub struct HandlerChain {
    handlers: Vec<Arc<dyn Handler>>,
}

impl std::fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl HandlerChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` unless one with the same name is present.
    ///
    /// Returns `false` if the handler was a duplicate.
    pub fn add(&mut self, handler: Arc<dyn Handler>) -> bool {
        if self.handlers.iter().any(|h| h.name() == handler.name()) {
            warn!(handler = handler.name(), "ignoring duplicate handler");
            return false;
        }
        self.handlers.push(handler);
        true
    }

    /// Appends `handler`, builder style.
    #[must_use]
    pub fn with(mut self, handler: Arc<dyn Handler>) -> Self {
        self.add(handler);
        self
    }

    /// Iterates the handlers in order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Handler>> {
        self.handlers.iter()
    }

    /// Returns the handler names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Returns the number of handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl FromIterator<Arc<dyn Handler>> for HandlerChain {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Handler>>>(iter: I) -> Self {
        let mut chain = Self::new();
        for handler in iter {
            chain.add(handler);
        }
        chain
    }
}
