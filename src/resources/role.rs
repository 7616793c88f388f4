use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::generic::{create_entity, delete_entity, entity_exists, update_entity};
use super::{named_row, Resource, ResourceData};
use crate::error::ProviderError;
use crate::executor::{db_query, Executor};
use crate::schema::{Attribute, Schema};
use crate::sql::EntityBuilder;

/// Columns returned by `SHOW ROLES`, in order.
const SHOW_COLUMNS: usize = 10;

const PROPERTIES: &[&str] = &["comment"];

/// Typed attributes of a `snowflake_role`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleModel {
    /// Role identifier.
    #[serde(default)]
    pub name: String,
    /// Optional comment.
    #[serde(default)]
    pub comment: Option<String>,
}

/// Adapter for `snowflake_role`. ID format: the role name.
pub struct RoleResource {
    db: Arc<dyn Executor>,
}

impl RoleResource {
    /// Bind the adapter to a database handle.
    pub fn new(db: Arc<dyn Executor>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl Resource for RoleResource {
    fn type_name(&self) -> &'static str {
        "snowflake_role"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("An account role.")
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("Identifier for the role.")
                    .with_force_new(),
            )
            .with_attribute("comment", Attribute::optional_string())
    }

    async fn create(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let model: RoleModel = data.decode()?;
        let builder = EntityBuilder::role(&model.name);
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
        info!(role = %model.name, "created role");
        self.read(data).await
    }

    async fn read(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let builder = EntityBuilder::role(data.id());
        let rows = db_query(self.db.as_ref(), &builder.show()).await?;
        let row = named_row(rows, builder.name(), || format!("role {}", data.id()))?;

        // created_on, name, is_default, is_current, is_inherited,
        // assigned_to_users, granted_to_roles, granted_roles, owner, comment
        let mut scan = row.scan(SHOW_COLUMNS)?;
        scan.skip();
        let name = scan.string()?.unwrap_or_default();
        for _ in 0..7 {
            scan.skip();
        }
        let comment = scan.string()?.filter(|c| !c.is_empty());

        data.encode(&RoleModel { name, comment })
    }

    async fn update(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let builder = EntityBuilder::role(data.id());
        update_entity(self.db.as_ref(), &builder, PROPERTIES, &self.schema(), data).await?;
        self.read(data).await.map_err(|e| data.partial_failure(e))
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let builder = EntityBuilder::role(data.id());
        delete_entity(self.db.as_ref(), &builder, data).await
    }

    async fn exists(&self, data: &ResourceData) -> Result<bool, ProviderError> {
        entity_exists(self.db.as_ref(), &EntityBuilder::role(data.id())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Row, SqlValue};
    use crate::testing::MockExecutor;
    use serde_json::json;

    fn role_row(comment: Option<&str>) -> Row {
        Row::new()
            .with("created_on", "2024-01-01 00:00:00")
            .with("name", "ANALYST")
            .with("is_default", "N")
            .with("is_current", "N")
            .with("is_inherited", "N")
            .with("assigned_to_users", SqlValue::Int(0))
            .with("granted_to_roles", SqlValue::Int(0))
            .with("granted_roles", SqlValue::Int(0))
            .with("owner", "SECURITYADMIN")
            .with("comment", comment)
    }

    #[tokio::test]
    async fn test_role_lifecycle() {
        let mock = Arc::new(MockExecutor::new());
        mock.on_query("SHOW ROLES LIKE 'ANALYST'", vec![role_row(Some("reads things"))]);
        let resource = RoleResource::new(mock.clone());

        let mut data =
            ResourceData::new(json!({"name": "ANALYST", "comment": "reads things"})).unwrap();
        resource.create(&mut data).await.unwrap();
        assert_eq!(data.id(), "ANALYST");
        assert_eq!(data.state()["comment"], "reads things");

        assert!(resource.exists(&data).await.unwrap());
        resource.delete(&mut data).await.unwrap();
        assert_eq!(data.id(), "");

        assert_eq!(
            mock.statements(),
            vec![
                r#"CREATE ROLE "ANALYST" COMMENT = 'reads things'"#.to_string(),
                "SHOW ROLES LIKE 'ANALYST'".to_string(),
                "SHOW ROLES LIKE 'ANALYST'".to_string(),
                r#"DROP ROLE "ANALYST""#.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_update_comment() {
        let mock = Arc::new(MockExecutor::new());
        mock.on_query("SHOW ROLES", vec![role_row(Some("it's new"))]);
        let resource = RoleResource::new(mock.clone());

        let mut data = ResourceData::for_update(
            json!({"id": "ANALYST", "name": "ANALYST", "comment": "old"}),
            json!({"name": "ANALYST", "comment": "it's new"}),
        )
        .unwrap();
        resource.update(&mut data).await.unwrap();

        assert_eq!(
            mock.statements()[0],
            r#"ALTER ROLE "ANALYST" SET COMMENT = 'it\'s new'"#
        );
        assert_eq!(data.state()["comment"], "it's new");
    }

    #[tokio::test]
    async fn test_update_without_changes_only_reads() {
        let mock = Arc::new(MockExecutor::new());
        mock.on_query("SHOW ROLES", vec![role_row(None)]);
        let resource = RoleResource::new(mock.clone());

        let mut data = ResourceData::for_update(
            json!({"id": "ANALYST", "name": "ANALYST"}),
            json!({"name": "ANALYST"}),
        )
        .unwrap();
        resource.update(&mut data).await.unwrap();
        assert_eq!(mock.statements(), vec!["SHOW ROLES LIKE 'ANALYST'".to_string()]);
    }

    #[tokio::test]
    async fn test_read_matches_name_case_sensitively() {
        let mock = Arc::new(MockExecutor::new());
        mock.on_query("SHOW ROLES LIKE 'analyst'", vec![role_row(None)]);
        let resource = RoleResource::new(mock.clone());

        let mut data = ResourceData::with_id("analyst");
        assert!(!resource.exists(&data).await.unwrap());
        let err = resource.read(&mut data).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_rejects_mistyped_comment() {
        let mock = Arc::new(MockExecutor::new());
        let resource = RoleResource::new(mock.clone());

        let mut data = ResourceData::for_update(
            json!({"id": "ANALYST", "name": "ANALYST", "comment": "old"}),
            json!({"name": "ANALYST", "comment": 5}),
        )
        .unwrap();
        let err = resource.update(&mut data).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(mock.statements().is_empty());
    }
}
