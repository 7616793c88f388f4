//! Resource adapters.
//!
//! Each resource kind implements [`Resource`]: a fixed set of lifecycle
//! operations over a [`ResourceData`] bag, backed by the [`Executor`] it was
//! constructed with. The [`ResourceRegistry`] maps kind names such as
//! `snowflake_schema` to their adapters.

mod data;
mod database;
mod generic;
pub mod id;
mod managed_account;
mod role;
mod schema;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use data::{ResourceData, ID_ATTRIBUTE};
pub use database::{DatabaseModel, DatabaseResource};
pub use managed_account::{LocatorWait, ManagedAccountModel, ManagedAccountResource};
pub use role::{RoleModel, RoleResource};
pub use schema::{SchemaModel, SchemaResource};

use crate::error::ProviderError;
use crate::executor::{Executor, Row, SqlValue};
use crate::schema::{Attribute, Schema};

/// Lifecycle operations of one resource kind.
///
/// Create and Update finish by reading the object back, so the bag always
/// reflects server-confirmed state when they return.
#[async_trait::async_trait]
pub trait Resource: Send + Sync {
    /// The kind name, e.g. `snowflake_schema`.
    fn type_name(&self) -> &'static str;

    /// The attribute schema, without the implicit `id` attribute.
    fn schema(&self) -> Schema;

    /// Create the object and store its ID.
    async fn create(&self, data: &mut ResourceData) -> Result<(), ProviderError>;

    /// Refresh the bag from the server.
    async fn read(&self, data: &mut ResourceData) -> Result<(), ProviderError>;

    /// Apply changed attributes in place.
    async fn update(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let _ = data;
        Err(ProviderError::Unimplemented(format!(
            "{} does not support in-place updates",
            self.type_name()
        )))
    }

    /// Drop the object and clear the ID.
    async fn delete(&self, data: &mut ResourceData) -> Result<(), ProviderError>;

    /// Whether the object is still present.
    async fn exists(&self, data: &ResourceData) -> Result<bool, ProviderError>;

    /// Adopt an existing object by ID. The caller reads it afterwards.
    fn import(&self, id: &str) -> Result<ResourceData, ProviderError> {
        Ok(ResourceData::with_id(id))
    }
}

/// Resource kinds by name.
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<String, Arc<dyn Resource>>,
}

impl ResourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every Snowflake resource kind bound to `db`.
    pub fn snowflake(db: Arc<dyn Executor>) -> Self {
        Self::new()
            .with(SchemaResource::new(Arc::clone(&db)))
            .with(DatabaseResource::new(Arc::clone(&db)))
            .with(RoleResource::new(Arc::clone(&db)))
            .with(ManagedAccountResource::new(db))
    }

    /// Register an adapter under its kind name.
    pub fn with<R: Resource + 'static>(mut self, resource: R) -> Self {
        self.register(Arc::new(resource));
        self
    }

    /// Register an adapter, replacing any adapter with the same name.
    pub fn register(&mut self, resource: Arc<dyn Resource>) {
        self.resources
            .insert(resource.type_name().to_string(), resource);
    }

    /// Look an adapter up by kind name.
    pub fn get(&self, type_name: &str) -> Result<&Arc<dyn Resource>, ProviderError> {
        self.resources
            .get(type_name)
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    /// Registered kind names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.resources.keys().cloned().collect()
    }

    /// A kind's schema extended with the computed `id` attribute.
    pub fn schema(&self, type_name: &str) -> Result<Schema, ProviderError> {
        self.get(type_name).map(|resource| with_id(resource.as_ref()))
    }

    /// Every kind's schema, each extended with the computed `id` attribute.
    pub fn schemas(&self) -> impl Iterator<Item = (&str, Schema)> {
        self.resources
            .iter()
            .map(|(name, resource)| (name.as_str(), with_id(resource.as_ref())))
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("resources", &self.names())
            .finish()
    }
}

fn with_id(resource: &dyn Resource) -> Schema {
    resource.schema().with_attribute(
        ID_ATTRIBUTE,
        Attribute::computed_string().with_description("The resource identifier."),
    )
}

/// The SHOW row naming exactly `name`, or a not-found error for the object.
///
/// `SHOW ... LIKE` matches case-insensitively and treats `_` and `%` as
/// wildcards, so other objects can come back alongside the one asked for.
pub(crate) fn named_row(
    rows: Vec<Row>,
    name: &str,
    what: impl FnOnce() -> String,
) -> Result<Row, ProviderError> {
    rows.into_iter()
        .find(|row| is_named(row, name))
        .ok_or_else(|| ProviderError::NotFound(what()))
}

/// Whether any SHOW row names exactly `name`.
pub(crate) fn has_named_row(rows: &[Row], name: &str) -> bool {
    rows.iter().any(|row| is_named(row, name))
}

fn is_named(row: &Row, name: &str) -> bool {
    matches!(row.get("name"), Some(SqlValue::Text(n)) if n == name)
}
