pub mod containment;
pub mod membership;

use crate::core::Result;
use crate::filter::{Constraint, Predicate};
use serde_json::Value;

/// Turns one constraint into one clause of a predicate.
///
/// Implementations must never splice caller text into the clause; every
/// field name and value goes through [`Predicate::bind`].
pub trait ClausePlugin: Send + Sync {
    /// Plugin name, used in diagnostics
    fn name(&self) -> &'static str;

    /// Can this plugin compile a constraint with this value?
    fn can_handle(&self, value: &Value) -> bool;

    /// Bind the constraint's parameters and return the clause text.
    fn compile(&self, constraint: &Constraint, predicate: &mut Predicate) -> Result<String>;
}

/// Ordered set of clause plugins; the first one that can handle a value wins.
pub struct ClausePluginRegistry {
    plugins: Vec<Box<dyn ClausePlugin>>,
}

impl ClausePluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    pub fn register(&mut self, plugin: Box<dyn ClausePlugin>) {
        tracing::trace!(plugin = plugin.name(), "registered clause plugin");
        self.plugins.push(plugin);
    }

    /// Membership for lists, containment for everything else.
    pub fn with_default_plugins() -> Self {
        let mut registry = Self::new();

        // Membership must come first: containment accepts any value.
        registry.register(Box::new(membership::MembershipClause));
        registry.register(Box::new(containment::ContainmentClause));

        registry
    }

    pub fn find_plugin(&self, value: &Value) -> Option<&dyn ClausePlugin> {
        self.plugins
            .iter()
            .find(|plugin| plugin.can_handle(value))
            .map(|boxed| &**boxed)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl Default for ClausePluginRegistry {
    fn default() -> Self {
        Self::with_default_plugins()
    }
}
