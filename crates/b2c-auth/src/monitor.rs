//! Named, lazily built option objects
//!
//! Configure actions are registered per name during startup and applied
//! in registration order the first time a name is read. Results are cached
//! until the name is configured again or explicitly invalidated.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

/// A configure action applied to a freshly defaulted option object.
pub type ConfigureFn<T> = Arc<dyn Fn(&mut T) + Send + Sync>;

pub struct OptionsMonitor<T> {
    actions: RwLock<HashMap<String, Vec<ConfigureFn<T>>>>,
    cache: DashMap<String, Arc<T>>,
}

impl<T> OptionsMonitor<T>
where
    T: Default + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            actions: RwLock::new(HashMap::new()),
            cache: DashMap::new(),
        }
    }

    /// Append a configure action for `name`.
    pub fn configure<F>(&self, name: &str, action: F)
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.configure_arc(name, Arc::new(action));
    }

    pub fn configure_arc(&self, name: &str, action: ConfigureFn<T>) {
        self.actions
            .write()
            .entry(name.to_string())
            .or_default()
            .push(action);
        self.cache.remove(name);
    }

    pub fn is_configured(&self, name: &str) -> bool {
        self.actions.read().contains_key(name)
    }

    /// Drop the cached value for `name`; the next read rebuilds it.
    pub fn invalidate(&self, name: &str) {
        self.cache.remove(name);
    }

    /// Options for `name`, built on first use.
    ///
    /// Actions run outside any lock. Two racing readers may both build;
    /// the first stored value is returned to both.
    pub fn get(&self, name: &str) -> Arc<T> {
        if let Some(cached) = self.cache.get(name) {
            return Arc::clone(cached.value());
        }

        let actions: Vec<ConfigureFn<T>> = self
            .actions
            .read()
            .get(name)
            .cloned()
            .unwrap_or_default();

        let mut value = T::default();
        for action in &actions {
            action(&mut value);
        }
        debug!(name = %name, actions = actions.len(), "Options built");

        let built = Arc::new(value);
        Arc::clone(
            self.cache
                .entry(name.to_string())
                .or_insert(built)
                .value(),
        )
    }
}

impl<T> Default for OptionsMonitor<T>
where
    T: Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for OptionsMonitor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionsMonitor")
            .field("names", &self.actions.read().keys().collect::<Vec<_>>())
            .field("cached", &self.cache.len())
            .finish()
    }
}
