use std::{collections::HashMap, sync::Arc};

use tracing::debug;

use crate::plugin::PublisherPlugin;

/// Registry of channel plug-ins, keyed by channel name.
#[derive(Clone, Default)]
pub struct PublisherRegistry {
    plugins: HashMap<String, Arc<dyn PublisherPlugin>>,
}

impl PublisherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plug-in under its own id.
    pub fn register(&mut self, plugin: Arc<dyn PublisherPlugin>) {
        let name = plugin.id().to_string();
        self.register_as(name, plugin);
    }

    /// Register a plug-in under an explicit channel name.
    pub fn register_as(&mut self, name: impl Into<String>, plugin: Arc<dyn PublisherPlugin>) {
        let name = name.into();
        debug!(channel = %name, plugin = plugin.id(), "registered publisher");
        self.plugins.insert(name, plugin);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PublisherPlugin>> {
        self.plugins.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Registered channel names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl std::fmt::Debug for PublisherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublisherRegistry")
            .field("channels", &self.list())
            .finish()
    }
}
