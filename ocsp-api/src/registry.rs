use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::memory::MemoryStoreFactory;
use crate::store::{StatusStore, StoreSettings};

/// Connection settings a store may reference by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasourceConf {
    pub name: String,
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// Everything a factory needs to build one store instance.
#[derive(Debug, Clone)]
pub struct StoreContext {
    pub settings: StoreSettings,
    /// Implementation-specific configuration, passed through untouched.
    pub conf: serde_json::Value,
    pub datasource: Option<DatasourceConf>,
}

#[async_trait]
pub trait StoreFactory: Send + Sync {
    /// Type tag used in configuration, matched case-insensitively.
    fn type_name(&self) -> &str;

    /// # Errors
    /// Returns an error when the store cannot be created from `context`.
    async fn create(&self, context: StoreContext) -> StoreResult<Arc<dyn StatusStore>>;
}

/// Store factories keyed by type tag.
///
/// Built once during start-up and read-only afterwards.
pub struct StoreFactoryRegistry {
    factories: HashMap<String, Arc<dyn StoreFactory>>,
}

impl StoreFactoryRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in `memory` store type.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MemoryStoreFactory));
        registry
    }

    /// Registers a factory, replacing any previous one with the same type tag.
    pub fn register(&mut self, factory: Arc<dyn StoreFactory>) {
        let key = factory.type_name().to_lowercase();
        debug!(store_type = %key, "Registered status store factory");
        self.factories.insert(key, factory);
    }

    pub fn can_create(&self, store_type: &str) -> bool {
        self.factories.contains_key(&store_type.to_lowercase())
    }

    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }

    /// # Errors
    /// Returns [`StoreError::UnknownType`] when no factory handles `store_type`,
    /// or the factory's own error.
    pub async fn create(
        &self,
        store_type: &str,
        context: StoreContext,
    ) -> StoreResult<Arc<dyn StatusStore>> {
        let factory = self
            .factories
            .get(&store_type.to_lowercase())
            .ok_or_else(|| StoreError::UnknownType(store_type.to_string()))?;
        factory.create(context).await
    }
}

impl Default for StoreFactoryRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
