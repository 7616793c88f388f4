use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::{has_named_row, id, named_row, Resource, ResourceData};
use crate::error::ProviderError;
use crate::executor::{db_exec, db_query, Executor};
use crate::schema::{Attribute, Schema, Validator};
use crate::sql::SchemaBuilder;

const DEFAULT_DATA_RETENTION_DAYS: i64 = 1;

/// Columns returned by `SHOW SCHEMAS`, in order.
const SHOW_COLUMNS: usize = 9;

fn default_data_retention_days() -> i64 {
    DEFAULT_DATA_RETENTION_DAYS
}

/// Typed attributes of a `snowflake_schema`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaModel {
    /// Schema identifier, unique within its database.
    pub name: String,
    /// The database the schema lives in.
    pub database: String,
    /// Optional comment.
    #[serde(default)]
    pub comment: Option<String>,
    /// Transient schemas have no Fail-safe period.
    #[serde(default)]
    pub is_transient: bool,
    /// Managed access centralizes grants with the schema owner.
    #[serde(default)]
    pub is_managed: bool,
    /// Time Travel retention in days.
    #[serde(default = "default_data_retention_days")]
    pub data_retention_days: i64,
}

impl SchemaModel {
    fn builder(&self) -> SchemaBuilder {
        SchemaBuilder::new(&self.name).with_db(&self.database)
    }

    /// Apply an options string such as `"TRANSIENT, MANAGED"`.
    ///
    /// Every flag is reset first so an option removed on the server reads
    /// back as false.
    fn apply_options(&mut self, options: &str) {
        self.is_transient = false;
        self.is_managed = false;
        for option in options.split(", ").map(str::trim) {
            match option {
                "TRANSIENT" => self.is_transient = true,
                "MANAGED" => self.is_managed = true,
                _ => {}
            }
        }
    }
}

/// Adapter for `snowflake_schema`. ID format: `<database>|<schema>`.
pub struct SchemaResource {
    db: Arc<dyn Executor>,
}

impl SchemaResource {
    /// Bind the adapter to a database handle.
    pub fn new(db: Arc<dyn Executor>) -> Self {
        Self { db }
    }

    fn builder_for(id: &str) -> Result<SchemaBuilder, ProviderError> {
        let (database, schema) = id::decode_pair(id)?;
        Ok(SchemaBuilder::new(schema).with_db(database))
    }

    async fn exec(&self, sql: &str, context: impl FnOnce() -> String) -> Result<(), ProviderError> {
        db_exec(self.db.as_ref(), sql)
            .await
            .map_err(|e| ProviderError::sql(context(), e))
    }
}

#[async_trait::async_trait]
impl Resource for SchemaResource {
    fn type_name(&self) -> &'static str {
        "snowflake_schema"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A schema inside a Snowflake database.")
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("Specifies the identifier for the schema; must be unique for the database in which the schema is created.")
                    .with_force_new(),
            )
            .with_attribute(
                "database",
                Attribute::required_string()
                    .with_description("The database in which to create the schema.")
                    .with_force_new(),
            )
            .with_attribute(
                "comment",
                Attribute::optional_string().with_description("Specifies a comment for the schema."),
            )
            .with_attribute(
                "is_transient",
                Attribute::optional_bool()
                    .with_default(json!(false))
                    .with_description("Specifies a schema as transient. Transient schemas do not have a Fail-safe period.")
                    .with_force_new(),
            )
            .with_attribute(
                "is_managed",
                Attribute::optional_bool()
                    .with_default(json!(false))
                    .with_description("Specifies a managed schema. Managed access schemas centralize privilege management with the schema owner."),
            )
            .with_attribute(
                "data_retention_days",
                Attribute::optional_int64()
                    .with_default(json!(DEFAULT_DATA_RETENTION_DAYS))
                    .with_validator(Validator::int_between(0, 90))
                    .with_description("Specifies the number of days for which Time Travel actions (CLONE and UNDROP) can be performed on the schema."),
            )
    }

    async fn create(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let model: SchemaModel = data.decode()?;

        let mut builder = model
            .builder()
            .with_data_retention_days(model.data_retention_days);
        if let Some(comment) = &model.comment {
            builder = builder.with_comment(comment);
        }
        if model.is_transient {
            builder = builder.transient();
        }
        if model.is_managed {
            builder = builder.managed();
        }

        self.exec(&builder.create(), || {
            format!("error creating schema {}", model.name)
        })
        .await?;

        data.set_id(id::encode(&[&model.database, &model.name]));
        info!(id = %data.id(), "created schema");

        self.read(data).await
    }

    async fn read(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let builder = Self::builder_for(data.id())?;
        let rows = db_query(self.db.as_ref(), &builder.show()).await?;
        let row = named_row(rows, builder.name(), || format!("schema {}", data.id()))?;

        // created_on, name, is_default, is_current, database_name, owner,
        // comment, options, retention_time
        let mut scan = row.scan(SHOW_COLUMNS)?;
        scan.skip();
        let name = scan.string()?.unwrap_or_default();
        scan.skip().skip();
        let database = scan.string()?.unwrap_or_default();
        scan.skip();
        let comment = scan.string()?.filter(|c| !c.is_empty());
        let options = scan.string()?.unwrap_or_default();
        let retention = scan.int()?.unwrap_or_default();

        let mut model = SchemaModel {
            name,
            database,
            comment,
            is_transient: false,
            is_managed: false,
            data_retention_days: retention,
        };
        model.apply_options(&options);
        debug!(id = %data.id(), options = %options, "read schema");

        data.encode(&model)
    }

    async fn update(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let builder = Self::builder_for(data.id())?;
        let model: SchemaModel = data.decode()?;
        let id = data.id().to_string();

        if data.has_change("comment") {
            let q = match model.comment.as_deref() {
                Some(comment) if !comment.is_empty() => builder.change_comment(comment),
                _ => builder.remove_comment(),
            };
            if let Err(e) = self
                .exec(&q, || format!("error updating schema comment on {}", id))
                .await
            {
                return Err(data.partial_failure(e));
            }
            data.set_partial("comment");
        }

        if data.has_change("is_managed") {
            let q = if model.is_managed {
                builder.manage()
            } else {
                builder.unmanage()
            };
            if let Err(e) = self
                .exec(&q, || format!("error changing management state on {}", id))
                .await
            {
                return Err(data.partial_failure(e));
            }
            data.set_partial("is_managed");
        }

        if data.has_change("data_retention_days") {
            let q = builder.change_data_retention_days(model.data_retention_days);
            if let Err(e) = self
                .exec(&q, || format!("error updating data retention days on {}", id))
                .await
            {
                return Err(data.partial_failure(e));
            }
            data.set_partial("data_retention_days");
        }

        info!(id = %id, "updated schema");
        self.read(data).await.map_err(|e| data.partial_failure(e))
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let builder = Self::builder_for(data.id())?;
        let id = data.id().to_string();
        self.exec(&builder.drop(), || format!("error deleting schema {}", id))
            .await?;
        data.clear_id();
        info!(id = %id, "deleted schema");
        Ok(())
    }

    async fn exists(&self, data: &ResourceData) -> Result<bool, ProviderError> {
        let builder = Self::builder_for(data.id())?;
        let rows = db_query(self.db.as_ref(), &builder.show()).await?;
        Ok(has_named_row(&rows, builder.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Row, SqlError, SqlValue};
    use crate::testing::MockExecutor;
    use serde_json::json;

    fn show_row(name: &str, database: &str, comment: Option<&str>, options: &str, days: i64) -> Row {
        Row::new()
            .with("created_on", "2024-01-01 00:00:00")
            .with("name", name)
            .with("is_default", "N")
            .with("is_current", "N")
            .with("database_name", database)
            .with("owner", "SYSADMIN")
            .with("comment", comment)
            .with("options", options)
            .with("retention_time", SqlValue::Int(days))
    }

    fn setup() -> (Arc<MockExecutor>, SchemaResource) {
        let mock = Arc::new(MockExecutor::new());
        let resource = SchemaResource::new(mock.clone());
        (mock, resource)
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let (mock, resource) = setup();
        mock.on_query(
            "SHOW SCHEMAS LIKE 'S'",
            vec![show_row("S", "D", None, "TRANSIENT", 5)],
        );

        let mut data = ResourceData::new(json!({
            "name": "S",
            "database": "D",
            "is_transient": true,
            "data_retention_days": 5,
        }))
        .unwrap();
        resource.create(&mut data).await.unwrap();

        let statements = mock.statements();
        assert_eq!(
            statements[0],
            r#"CREATE TRANSIENT SCHEMA "D"."S" DATA_RETENTION_TIME_IN_DAYS = 5"#
        );
        assert_eq!(statements[1], r#"SHOW SCHEMAS LIKE 'S' IN DATABASE "D""#);

        assert_eq!(data.id(), "D|S");
        let state = data.state();
        assert_eq!(state["database"], "D");
        assert_eq!(state["name"], "S");
        assert_eq!(state["is_transient"], true);
        assert_eq!(state["is_managed"], false);
        assert_eq!(state["data_retention_days"], 5);
        assert!(state["comment"].is_null());
    }

    #[tokio::test]
    async fn test_create_uses_defaults() {
        let (mock, resource) = setup();
        mock.on_query("SHOW SCHEMAS", vec![show_row("S", "D", Some("c"), "", 1)]);

        let mut data = ResourceData::new(json!({"name": "S", "database": "D", "comment": "c"}))
            .unwrap();
        resource.create(&mut data).await.unwrap();

        assert_eq!(
            mock.statements()[0],
            r#"CREATE SCHEMA "D"."S" DATA_RETENTION_TIME_IN_DAYS = 1 COMMENT = 'c'"#
        );
        assert_eq!(data.state()["comment"], "c");
    }

    #[tokio::test]
    async fn test_create_failure_is_wrapped() {
        let (mock, resource) = setup();
        mock.fail_on("CREATE", SqlError::Execution("already exists".to_string()));

        let mut data = ResourceData::new(json!({"name": "S", "database": "D"})).unwrap();
        let err = resource.create(&mut data).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "error creating schema S: SQL execution error: already exists"
        );
        assert_eq!(data.id(), "");
        assert_eq!(mock.statements().len(), 1);
    }

    #[tokio::test]
    async fn test_read_resets_options() {
        let (mock, resource) = setup();
        mock.on_query_times("SHOW SCHEMAS", vec![show_row("S", "D", None, "MANAGED", 1)], 1);
        mock.on_query("SHOW SCHEMAS", vec![show_row("S", "D", None, "", 1)]);

        let mut data = ResourceData::with_id("D|S");
        resource.read(&mut data).await.unwrap();
        assert_eq!(data.state()["is_managed"], true);

        resource.read(&mut data).await.unwrap();
        assert_eq!(data.state()["is_managed"], false);
        assert_eq!(data.state()["is_transient"], false);
    }

    #[tokio::test]
    async fn test_read_both_options() {
        let (mock, resource) = setup();
        mock.on_query(
            "SHOW SCHEMAS",
            vec![show_row("S", "D", None, "TRANSIENT, MANAGED", 0)],
        );

        let mut data = ResourceData::with_id("D|S");
        resource.read(&mut data).await.unwrap();
        assert_eq!(data.state()["is_transient"], true);
        assert_eq!(data.state()["is_managed"], true);
        assert_eq!(data.state()["data_retention_days"], 0);
    }

    #[tokio::test]
    async fn test_read_missing_row_is_not_found() {
        let (_mock, resource) = setup();
        let mut data = ResourceData::with_id("D|S");
        let err = resource.read(&mut data).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_read_wrong_shape_is_scan_error() {
        let (mock, resource) = setup();
        mock.on_query("SHOW SCHEMAS", vec![Row::new().with("name", "S")]);

        let mut data = ResourceData::with_id("D|S");
        let err = resource.read(&mut data).await.unwrap_err();
        assert!(matches!(err, ProviderError::Scan(_)));
    }

    #[tokio::test]
    async fn test_read_invalid_id() {
        let (mock, resource) = setup();
        let mut data = ResourceData::with_id("just-a-name");
        let err = resource.read(&mut data).await.unwrap_err();
        assert_eq!(err.to_string(), "ID just-a-name is invalid");
        assert!(mock.statements().is_empty());
    }

    #[tokio::test]
    async fn test_update_one_alter_per_change() {
        let (mock, resource) = setup();
        mock.on_query("SHOW SCHEMAS", vec![show_row("S", "D", Some("new"), "MANAGED", 7)]);

        let mut data = ResourceData::for_update(
            json!({"id": "D|S", "name": "S", "database": "D", "comment": "old",
                   "is_transient": false, "is_managed": false, "data_retention_days": 1}),
            json!({"name": "S", "database": "D", "comment": "new",
                   "is_transient": false, "is_managed": true, "data_retention_days": 7}),
        )
        .unwrap();
        resource.update(&mut data).await.unwrap();

        assert_eq!(
            mock.statements(),
            vec![
                r#"ALTER SCHEMA "D"."S" SET COMMENT = 'new'"#.to_string(),
                r#"ALTER SCHEMA "D"."S" ENABLE MANAGED ACCESS"#.to_string(),
                r#"ALTER SCHEMA "D"."S" SET DATA_RETENTION_TIME_IN_DAYS = 7"#.to_string(),
                r#"SHOW SCHEMAS LIKE 'S' IN DATABASE "D""#.to_string(),
            ]
        );
        assert_eq!(data.state()["is_managed"], true);
    }

    #[tokio::test]
    async fn test_update_only_changed_attributes() {
        let (mock, resource) = setup();
        mock.on_query("SHOW SCHEMAS", vec![show_row("S", "D", None, "", 1)]);

        let mut data = ResourceData::for_update(
            json!({"id": "D|S", "name": "S", "database": "D", "comment": "old",
                   "is_managed": true, "data_retention_days": 1}),
            json!({"name": "S", "database": "D", "is_managed": false, "data_retention_days": 1}),
        )
        .unwrap();
        resource.update(&mut data).await.unwrap();

        let statements = mock.statements();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0], r#"ALTER SCHEMA "D"."S" UNSET COMMENT"#);
        assert_eq!(statements[1], r#"ALTER SCHEMA "D"."S" DISABLE MANAGED ACCESS"#);
    }

    #[tokio::test]
    async fn test_update_failure_keeps_earlier_changes() {
        let (mock, resource) = setup();
        mock.fail_on(
            "MANAGED ACCESS",
            SqlError::Execution("insufficient privileges".to_string()),
        );

        let mut data = ResourceData::for_update(
            json!({"id": "D|S", "name": "S", "database": "D", "comment": "old",
                   "is_managed": false, "data_retention_days": 1}),
            json!({"name": "S", "database": "D", "comment": "new",
                   "is_managed": true, "data_retention_days": 7}),
        )
        .unwrap();
        let err = resource.update(&mut data).await.unwrap_err();

        // comment applied, managed failed, retention never attempted
        assert_eq!(mock.statements().len(), 2);
        assert!(err
            .to_string()
            .starts_with("error changing management state on D|S"));

        let state = err.partial_state().unwrap();
        assert_eq!(state["comment"], "new");
        assert_eq!(state["is_managed"], false);
        assert_eq!(state["data_retention_days"], 1);
    }

    #[tokio::test]
    async fn test_delete_clears_id() {
        let (mock, resource) = setup();
        let mut data = ResourceData::with_id("D|S");
        resource.delete(&mut data).await.unwrap();

        assert_eq!(mock.statements(), vec![r#"DROP SCHEMA "D"."S""#.to_string()]);
        assert_eq!(data.id(), "");
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_id() {
        let (mock, resource) = setup();
        mock.fail_on("DROP", SqlError::Execution("nope".to_string()));

        let mut data = ResourceData::with_id("D|S");
        let err = resource.delete(&mut data).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "error deleting schema D|S: SQL execution error: nope"
        );
        assert_eq!(data.id(), "D|S");
    }

    #[tokio::test]
    async fn test_exists() {
        let (mock, resource) = setup();
        let data = ResourceData::with_id("D|S");

        assert!(!resource.exists(&data).await.unwrap());

        mock.on_query("SHOW SCHEMAS", vec![show_row("S", "D", None, "", 1)]);
        assert!(resource.exists(&data).await.unwrap());
    }

    #[tokio::test]
    async fn test_exists_propagates_errors() {
        let (mock, resource) = setup();
        mock.fail_on("SHOW SCHEMAS", SqlError::Connection("refused".to_string()));

        let data = ResourceData::with_id("D|S");
        let err = resource.exists(&data).await.unwrap_err();
        assert!(matches!(err, ProviderError::Query(SqlError::Connection(_))));
    }

    #[tokio::test]
    async fn test_read_ignores_wildcard_matches() {
        let (mock, resource) = setup();
        mock.on_query(
            "SHOW SCHEMAS LIKE 'A_B'",
            vec![
                show_row("AXB", "D", Some("other"), "", 1),
                show_row("A_B", "D", Some("mine"), "", 3),
            ],
        );

        let mut data = ResourceData::with_id("D|A_B");
        resource.read(&mut data).await.unwrap();
        assert_eq!(data.state()["name"], "A_B");
        assert_eq!(data.state()["comment"], "mine");
        assert_eq!(data.state()["data_retention_days"], 3);
    }

    #[tokio::test]
    async fn test_exists_requires_exact_name() {
        let (mock, resource) = setup();
        mock.on_query("SHOW SCHEMAS", vec![show_row("AXB", "D", None, "", 1)]);

        let data = ResourceData::with_id("D|A_B");
        assert!(!resource.exists(&data).await.unwrap());
        let err = resource.read(&mut data.clone()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_retention_must_be_an_integer() {
        let (_mock, resource) = setup();
        let diagnostics = crate::validation::validate(
            &resource.schema(),
            &json!({"name": "S", "database": "D", "data_retention_days": 5.0}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute,
            Some("data_retention_days".to_string())
        );
    }
}
