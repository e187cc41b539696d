//! Host-side provider registry and configuration-driven registration.
//!
//! The registry is owned by the host and handed to registration explicitly.
//! Providers never look it up themselves.

use crate::config::DatabasesConfig;
use crate::db::MySqlProvider;
use crate::error::{DbError, DbResult};
use crate::models::{QueryResult, SchemaMap};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Interface the host uses to talk to any registered database provider.
#[async_trait]
pub trait DatabaseProvider: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn allow_writes(&self) -> bool;

    async fn execute_sql(&self, sql: &str) -> DbResult<QueryResult>;

    async fn show_schema(&self) -> DbResult<SchemaMap>;

    async fn verify_connectivity(&self) -> DbResult<String>;
}

#[async_trait]
impl DatabaseProvider for MySqlProvider {
    fn name(&self) -> &str {
        MySqlProvider::name(self)
    }

    fn allow_writes(&self) -> bool {
        MySqlProvider::allow_writes(self)
    }

    async fn execute_sql(&self, sql: &str) -> DbResult<QueryResult> {
        MySqlProvider::execute_sql(self, sql).await
    }

    async fn show_schema(&self) -> DbResult<SchemaMap> {
        MySqlProvider::show_schema(self).await
    }

    async fn verify_connectivity(&self) -> DbResult<String> {
        MySqlProvider::verify_connectivity(self).await
    }
}

/// Name to provider mapping owned by the host.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Arc<RwLock<HashMap<String, Arc<dyn DatabaseProvider>>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under `name`, returning the provider it replaced.
    pub async fn register(
        &self,
        name: impl Into<String>,
        provider: Arc<dyn DatabaseProvider>,
    ) -> Option<Arc<dyn DatabaseProvider>> {
        let name = name.into();
        let previous = self.providers.write().await.insert(name.clone(), provider);
        if previous.is_some() {
            warn!(provider = %name, "Replaced existing provider registration");
        }
        previous
    }

    /// Look up a provider by name.
    pub async fn get(&self, name: &str) -> DbResult<Arc<dyn DatabaseProvider>> {
        self.providers
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::provider_not_found(name))
    }

    pub async fn remove(&self, name: &str) -> Option<Arc<dyn DatabaseProvider>> {
        self.providers.write().await.remove(name)
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.providers.read().await.contains_key(name)
    }

    /// Registered names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn len(&self) -> usize {
        self.providers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.providers.read().await.is_empty()
    }
}

/// Construct and register a provider for every `mysql` entry of `databases`.
///
/// Entries of other types are left to their own drivers. Malformed `mysql`
/// entries are logged and skipped. Returns the names that were registered.
pub async fn register_mysql_providers(
    registry: &ProviderRegistry,
    databases: &DatabasesConfig,
) -> Vec<String> {
    let mut registered = Vec::new();

    for (name, config) in databases.mysql_entries() {
        match config {
            Ok(config) => {
                info!(
                    provider = %name,
                    host = %config.host,
                    database = %config.database_name,
                    allow_writes = config.allow_writes,
                    "Registering MySQL provider"
                );
                let provider = MySqlProvider::new(config).with_name(name.as_str());
                registry.register(name.clone(), Arc::new(provider)).await;
                registered.push(name);
            }
            Err(e) => {
                error!(provider = %name, error = %e, "Skipping invalid MySQL provider configuration");
            }
        }
    }

    info!(count = registered.len(), "MySQL provider registration complete");
    registered
}

/// Run [`register_mysql_providers`] in the background.
///
/// Lookups made before the task finishes see [`DbError::ProviderNotFound`];
/// await the handle to know registration is done.
pub fn spawn_registration(
    registry: ProviderRegistry,
    databases: DatabasesConfig,
) -> JoinHandle<Vec<String>> {
    tokio::spawn(async move { register_mysql_providers(&registry, &databases).await })
}
