//! Value types exchanged with the host across the lifecycle contract.

use serde::{Deserialize, Serialize};

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The attribute that changed.
    pub path: String,
    /// The value before the change (None if creating).
    pub before: Option<serde_json::Value>,
    /// The value after the change (None if removing).
    pub after: Option<serde_json::Value>,
    /// Whether applying this change requires replacing the resource.
    #[serde(default)]
    pub requires_replace: bool,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(
        path: impl Into<String>,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) -> Self {
        Self {
            path: path.into(),
            before,
            after,
            requires_replace: false,
        }
    }

    /// Create a change for a new attribute.
    pub fn added(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Create a change for a modified attribute.
    pub fn modified(
        path: impl Into<String>,
        before: serde_json::Value,
        after: serde_json::Value,
    ) -> Self {
        Self::new(path, Some(before), Some(after))
    }

    /// Mark the change as forcing replacement.
    pub fn forcing_replace(mut self) -> Self {
        self.requires_replace = true;
        self
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after the operation.
    pub planned_state: serde_json::Value,
    /// The list of attribute changes, sorted by path.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource requires replacement.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Create a plan result with no changes.
    pub fn no_change(state: serde_json::Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// Create a plan result with changes.
    pub fn with_changes(
        planned_state: serde_json::Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }

    /// Whether the plan leaves the resource untouched.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// An imported resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: serde_json::Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: serde_json::Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Provider metadata returned to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Provider name.
    pub name: String,
    /// Provider version.
    pub version: String,
    /// List of resource type names.
    pub resources: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_change_constructors() {
        let added = AttributeChange::added("name", json!("test"));
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(json!("test")));
        assert!(!added.requires_replace);

        let removed = AttributeChange::removed("comment", json!("old"));
        assert_eq!(removed.before, Some(json!("old")));
        assert!(removed.after.is_none());

        let modified = AttributeChange::modified("data_retention_days", json!(1), json!(2))
            .forcing_replace();
        assert_eq!(modified.before, Some(json!(1)));
        assert!(modified.requires_replace);
    }

    #[test]
    fn test_attribute_change_serde_default() {
        let change: AttributeChange =
            serde_json::from_value(json!({"path": "name", "before": null, "after": "S"})).unwrap();
        assert!(!change.requires_replace);
        assert_eq!(change.after, Some(json!("S")));
    }

    #[test]
    fn test_plan_result() {
        let no_change = PlanResult::no_change(json!({"id": "D|S"}));
        assert!(no_change.is_empty());
        assert!(!no_change.requires_replace);

        let with_changes = PlanResult::with_changes(
            json!({"id": "D|S", "comment": "new"}),
            vec![AttributeChange::modified("comment", json!("old"), json!("new"))],
            false,
        );
        assert_eq!(with_changes.changes.len(), 1);
        assert!(!with_changes.is_empty());
    }

    #[test]
    fn test_imported_resource() {
        let imported = ImportedResource::new("snowflake_schema", json!({"id": "D|S"}));
        assert_eq!(imported.resource_type, "snowflake_schema");
        assert_eq!(imported.state["id"], "D|S");
    }
}
