use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::generic::{create_entity, delete_entity, entity_exists, update_entity};
use super::{named_row, Resource, ResourceData};
use crate::error::ProviderError;
use crate::executor::{db_query, Executor};
use crate::schema::{Attribute, Schema, Validator};
use crate::sql::EntityBuilder;

/// Columns returned by `SHOW DATABASES`, in order.
const SHOW_COLUMNS: usize = 9;

const PROPERTIES: &[&str] = &["comment", "data_retention_time_in_days"];

/// Typed attributes of a `snowflake_database`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseModel {
    /// Database identifier.
    #[serde(default)]
    pub name: String,
    /// Optional comment.
    #[serde(default)]
    pub comment: Option<String>,
    /// Time Travel retention in days; the account default when unset.
    #[serde(default)]
    pub data_retention_time_in_days: Option<i64>,
}

/// Adapter for `snowflake_database`. ID format: the database name.
pub struct DatabaseResource {
    db: Arc<dyn Executor>,
}

impl DatabaseResource {
    /// Bind the adapter to a database handle.
    pub fn new(db: Arc<dyn Executor>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl Resource for DatabaseResource {
    fn type_name(&self) -> &'static str {
        "snowflake_database"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A Snowflake database.")
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("Specifies the identifier for the database.")
                    .with_force_new(),
            )
            .with_attribute(
                "comment",
                Attribute::optional_string().with_description("Specifies a comment for the database."),
            )
            .with_attribute(
                "data_retention_time_in_days",
                Attribute::optional_int64()
                    .computed()
                    .with_validator(Validator::int_between(0, 90))
                    .with_description("Number of days for which Time Travel actions can be performed on the database."),
            )
    }

    async fn create(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let model: DatabaseModel = data.decode()?;
        let builder = EntityBuilder::database(&model.name);
        create_entity(
            self.db.as_ref(),
            &builder,
            &model.name,
            PROPERTIES,
            &self.schema(),
            data,
        )
        .await?;

        data.set_id(&model.name);
        info!(database = %model.name, "created database");
        self.read(data).await
    }

    async fn read(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let builder = EntityBuilder::database(data.id());
        let rows = db_query(self.db.as_ref(), &builder.show()).await?;
        let row = named_row(rows, builder.name(), || format!("database {}", data.id()))?;

        // created_on, name, is_default, is_current, origin, owner, comment,
        // options, retention_time
        let mut scan = row.scan(SHOW_COLUMNS)?;
        scan.skip();
        let name = scan.string()?.unwrap_or_default();
        scan.skip().skip().skip().skip();
        let comment = scan.string()?.filter(|c| !c.is_empty());
        scan.skip();
        let retention = scan.int()?;

        data.encode(&DatabaseModel {
            name,
            comment,
            data_retention_time_in_days: retention,
        })
    }

    async fn update(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let builder = EntityBuilder::database(data.id());
        update_entity(self.db.as_ref(), &builder, PROPERTIES, &self.schema(), data).await?;
        info!(database = %data.id(), "updated database");
        self.read(data).await.map_err(|e| data.partial_failure(e))
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let builder = EntityBuilder::database(data.id());
        delete_entity(self.db.as_ref(), &builder, data).await
    }

    async fn exists(&self, data: &ResourceData) -> Result<bool, ProviderError> {
        entity_exists(self.db.as_ref(), &EntityBuilder::database(data.id())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Row, SqlError, SqlValue};
    use crate::testing::MockExecutor;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn database_row(comment: &str, days: i64) -> Row {
        Row::new()
            .with("created_on", "2024-01-01 00:00:00")
            .with("name", "analytics")
            .with("is_default", "N")
            .with("is_current", "N")
            .with("origin", "")
            .with("owner", "SYSADMIN")
            .with("comment", comment)
            .with("options", "")
            .with("retention_time", SqlValue::Int(days))
    }

    #[tokio::test]
    async fn test_create_sets_configured_properties() {
        let mock = Arc::new(MockExecutor::new());
        mock.on_query("SHOW DATABASES", vec![database_row("raw data", 3)]);
        let resource = DatabaseResource::new(mock.clone());

        let mut data = ResourceData::new(json!({
            "name": "analytics",
            "comment": "raw data",
            "data_retention_time_in_days": 3,
        }))
        .unwrap();
        assert_ok!(resource.create(&mut data).await);

        assert_eq!(
            mock.statements()[0],
            r#"CREATE DATABASE "analytics" COMMENT = 'raw data' DATA_RETENTION_TIME_IN_DAYS = 3"#
        );
        assert_eq!(data.id(), "analytics");
        assert_eq!(data.state()["data_retention_time_in_days"], 3);
    }

    #[tokio::test]
    async fn test_create_omits_unset_properties() {
        let mock = Arc::new(MockExecutor::new());
        mock.on_query("SHOW DATABASES", vec![database_row("", 1)]);
        let resource = DatabaseResource::new(mock.clone());

        let mut data = ResourceData::new(json!({"name": "analytics", "comment": ""})).unwrap();
        assert_ok!(resource.create(&mut data).await);

        assert_eq!(mock.statements()[0], r#"CREATE DATABASE "analytics""#);
        // computed from the server
        assert_eq!(data.state()["data_retention_time_in_days"], 1);
        assert!(data.state()["comment"].is_null());
    }

    #[tokio::test]
    async fn test_update_sets_and_unsets() {
        let mock = Arc::new(MockExecutor::new());
        mock.on_query("SHOW DATABASES", vec![database_row("", 7)]);
        let resource = DatabaseResource::new(mock.clone());

        let mut data = ResourceData::for_update(
            json!({"id": "analytics", "name": "analytics", "comment": "old",
                   "data_retention_time_in_days": 1}),
            json!({"name": "analytics", "data_retention_time_in_days": 7}),
        )
        .unwrap();
        assert_ok!(resource.update(&mut data).await);

        let statements = mock.statements();
        assert_eq!(statements[0], r#"ALTER DATABASE "analytics" UNSET COMMENT"#);
        assert_eq!(
            statements[1],
            r#"ALTER DATABASE "analytics" SET DATA_RETENTION_TIME_IN_DAYS = 7"#
        );
        assert_eq!(statements.len(), 3);
    }

    #[tokio::test]
    async fn test_update_failure_reports_committed_state() {
        let mock = Arc::new(MockExecutor::new());
        mock.fail_on("DATA_RETENTION", SqlError::Execution("denied".to_string()));
        let resource = DatabaseResource::new(mock.clone());

        let mut data = ResourceData::for_update(
            json!({"id": "analytics", "name": "analytics", "comment": "old",
                   "data_retention_time_in_days": 1}),
            json!({"name": "analytics", "comment": "new", "data_retention_time_in_days": 7}),
        )
        .unwrap();
        let err = assert_err!(resource.update(&mut data).await);

        assert_eq!(
            err.to_string(),
            "error updating data_retention_time_in_days on database analytics: SQL execution error: denied"
        );
        let state = err.partial_state().unwrap();
        assert_eq!(state["comment"], "new");
        assert_eq!(state["data_retention_time_in_days"], 1);
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let mock = Arc::new(MockExecutor::new());
        let resource = DatabaseResource::new(mock);

        let mut data = ResourceData::with_id("analytics");
        let err = assert_err!(resource.read(&mut data).await);
        assert!(err.is_not_found());
        assert!(!assert_ok!(resource.exists(&data).await));
    }

    #[test]
    fn test_retention_is_optional_computed() {
        let schema = DatabaseResource::new(Arc::new(MockExecutor::new())).schema();
        let attr = schema.attribute("data_retention_time_in_days").unwrap();
        assert!(attr.flags.optional);
        assert!(attr.flags.computed);
    }

    #[tokio::test]
    async fn test_update_rejects_float_retention() {
        let mock = Arc::new(MockExecutor::new());
        mock.on_query("SHOW DATABASES", vec![database_row("", 7)]);
        let resource = DatabaseResource::new(mock.clone());

        let mut data = ResourceData::for_update(
            json!({"id": "analytics", "name": "analytics", "data_retention_time_in_days": 1}),
            json!({"name": "analytics", "data_retention_time_in_days": 7.0}),
        )
        .unwrap();
        let err = assert_err!(resource.update(&mut data).await);

        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(err.to_string().contains("data_retention_time_in_days"));
        assert!(mock.statements().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_float_retention() {
        let mock = Arc::new(MockExecutor::new());
        let resource = DatabaseResource::new(mock.clone());

        let mut data = ResourceData::new(json!({
            "name": "analytics",
            "data_retention_time_in_days": 7.0,
        }))
        .unwrap();
        let err = assert_err!(resource.create(&mut data).await);

        assert!(matches!(err, ProviderError::Serialization(_)));
        assert!(mock.statements().is_empty());
        assert_eq!(data.id(), "");
    }
}
