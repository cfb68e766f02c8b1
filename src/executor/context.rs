use super::TransactionHandle;
use im::HashMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Well-known key under which the ambient transaction is stored.
pub const TRANSACTION_KEY: &str = "jsonbdb.transaction";

/// Immutable, derivable carrier of call-scoped values.
///
/// Deriving a context never changes its parent, and the persistent map makes
/// derivation cheap. One logical call chain owns one context; chains running
/// concurrently with different transactions must not share one.
#[derive(Clone, Default)]
pub struct Context {
    values: HashMap<&'static str, Arc<dyn Any + Send + Sync>>,
}

impl Context {
    /// A context carrying nothing.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context with `key` bound to `value`.
    pub fn with_value<V: Any + Send + Sync>(&self, key: &'static str, value: V) -> Self {
        Self {
            values: self.values.update(key, Arc::new(value)),
        }
    }

    /// Derive a context without `key`.
    pub fn without(&self, key: &str) -> Self {
        Self {
            values: self.values.without(key),
        }
    }

    pub fn value<V: Any + Send + Sync>(&self, key: &str) -> Option<&V> {
        self.values
            .get(key)
            .and_then(|value| value.as_ref().downcast_ref::<V>())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.values.keys().copied().collect();
        keys.sort_unstable();
        f.debug_struct("Context").field("keys", &keys).finish()
    }
}

/// Derive a context whose operations run inside `transaction`.
pub fn with_transaction(ctx: &Context, transaction: TransactionHandle) -> Context {
    ctx.with_value(TRANSACTION_KEY, transaction)
}

/// The ambient transaction, if any. `None` means "use the default target".
pub fn current_transaction(ctx: &Context) -> Option<TransactionHandle> {
    ctx.value::<TransactionHandle>(TRANSACTION_KEY).cloned()
}
