//! Testing utilities.
//!
//! [`MockExecutor`] stands in for a Snowflake connection: it records every
//! statement and answers from scripted rules matched by SQL substring.
//! [`ProviderTester`] drives a [`ProviderService`] directly, without a host.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use snowflake_provider::testing::{MockExecutor, ProviderTester};
//! use snowflake_provider::SnowflakeProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_schema() {
//!     let db = Arc::new(MockExecutor::new());
//!     db.on_query("SHOW SCHEMAS", vec![/* rows */]);
//!     let tester = ProviderTester::new(SnowflakeProvider::new(db.clone()));
//!
//!     let state = tester
//!         .lifecycle_create("snowflake_schema", json!({"name": "S", "database": "D"}))
//!         .await
//!         .unwrap();
//!     assert_eq!(state["id"], "D|S");
//! }
//! ```

use std::sync::{Mutex, MutexGuard};

use crate::error::ProviderError;
use crate::executor::{Executor, Row, SqlError};
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use serde_json::Value;

#[derive(Debug, Clone)]
enum Reply {
    Rows(Vec<Row>),
    Affected(u64),
    Fail(SqlError),
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    reply: Reply,
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct MockState {
    rules: Vec<Rule>,
    statements: Vec<String>,
}

/// A scripted [`Executor`].
///
/// Rules are tried in the order they were added; the first rule whose
/// pattern occurs in the statement and has uses left answers it. Statements
/// matching no rule succeed with no rows and zero affected rows.
#[derive(Debug, Default)]
pub struct MockExecutor {
    state: Mutex<MockState>,
}

impl MockExecutor {
    /// Create an executor with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the statements from others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn add(&self, pattern: &str, reply: Reply, remaining: Option<usize>) {
        self.lock().rules.push(Rule {
            pattern: pattern.to_string(),
            reply,
            remaining,
        });
    }

    /// Answer queries containing `pattern` with `rows`.
    pub fn on_query(&self, pattern: &str, rows: Vec<Row>) {
        self.add(pattern, Reply::Rows(rows), None);
    }

    /// Answer the next `times` queries containing `pattern` with `rows`.
    pub fn on_query_times(&self, pattern: &str, rows: Vec<Row>, times: usize) {
        self.add(pattern, Reply::Rows(rows), Some(times));
    }

    /// Report `affected` rows for statements containing `pattern`.
    pub fn on_exec(&self, pattern: &str, affected: u64) {
        self.add(pattern, Reply::Affected(affected), None);
    }

    /// Fail every statement containing `pattern`.
    pub fn fail_on(&self, pattern: &str, error: SqlError) {
        self.add(pattern, Reply::Fail(error), None);
    }

    /// Fail the next `times` statements containing `pattern`.
    pub fn fail_times(&self, pattern: &str, error: SqlError, times: usize) {
        self.add(pattern, Reply::Fail(error), Some(times));
    }

    /// Every statement received so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    /// Statements containing `pattern`.
    pub fn statements_matching(&self, pattern: &str) -> Vec<String> {
        self.lock()
            .statements
            .iter()
            .filter(|s| s.contains(pattern))
            .cloned()
            .collect()
    }

    /// Forget the recorded statements, keeping the rules.
    pub fn clear_statements(&self) {
        self.lock().statements.clear();
    }

    fn respond(&self, sql: &str) -> Option<Reply> {
        let mut state = self.lock();
        state.statements.push(sql.to_string());
        let rule = state
            .rules
            .iter_mut()
            .find(|r| r.remaining != Some(0) && sql.contains(&r.pattern))?;
        if let Some(n) = rule.remaining.as_mut() {
            *n -= 1;
        }
        Some(rule.reply.clone())
    }
}

#[async_trait::async_trait]
impl Executor for MockExecutor {
    async fn exec(&self, sql: &str) -> Result<u64, SqlError> {
        match self.respond(sql) {
            Some(Reply::Fail(e)) => Err(e),
            Some(Reply::Affected(n)) => Ok(n),
            Some(Reply::Rows(rows)) => Ok(rows.len() as u64),
            None => Ok(0),
        }
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>, SqlError> {
        match self.respond(sql) {
            Some(Reply::Fail(e)) => Err(e),
            Some(Reply::Rows(rows)) => Ok(rows),
            Some(Reply::Affected(_)) | None => Ok(Vec::new()),
        }
    }
}

/// Drives a provider through its lifecycle without a host.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration; error diagnostics become `Err`.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider; error diagnostics become `Err`.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, config.clone(), config)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), config.clone(), config)
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Run plan, create and read; returns the state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read(resource_type, created).await
    }

    /// Run plan, update and read; returns the state after read.
    ///
    /// A plan that requires replacement is an error here.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), config)
            .await?;
        if plan.requires_replace {
            return Err(ProviderError::InvalidRequest(format!(
                "{} cannot be updated in place",
                resource_type
            )));
        }
        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        self.read(resource_type, updated).await
    }

    /// Run plan and delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.plan_delete(resource_type, current_state.clone())
            .await?;
        self.delete(resource_type, current_state).await
    }

    /// Run create, update and delete; returns the state after the update.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created = self.lifecycle_create(resource_type, initial_config).await?;
        let updated = self
            .lifecycle_update(resource_type, created, updated_config)
            .await?;
        self.lifecycle_delete(resource_type, updated.clone()).await?;
        Ok(updated)
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

fn changed_paths(plan: &PlanResult) -> Vec<&str> {
    plan.changes.iter().map(|c| c.path.as_str()).collect()
}

/// Assert that a plan has no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        changed_paths(plan)
    );
}

/// Assert that a plan requires resource replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not. Changed attributes: {:?}",
        changed_paths(plan)
    );
}

/// Assert that a plan changes something without replacing the resource.
///
/// # Panics
///
/// Panics if the plan is empty or requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(!plan.changes.is_empty(), "Expected changes, but got none");
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan changes the given attribute.
///
/// # Panics
///
/// Panics if the plan does not change `path`.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "Expected plan to change attribute '{}'. Changed attributes: {:?}",
        path,
        changed_paths(plan)
    );
}

/// Assert that diagnostics contain an error whose summary contains `substring`.
///
/// # Panics
///
/// Panics if no error diagnostic matches.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let found = diagnostics
        .iter()
        .any(|d| d.severity == DiagnosticSeverity::Error && d.summary.contains(substring));
    assert!(
        found,
        "Expected an error containing '{}'. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::SqlValue;
    use crate::provider::SnowflakeProvider;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_mock_rules_in_order() {
        let mock = MockExecutor::new();
        mock.on_query_times("SHOW", vec![Row::new().with("n", SqlValue::Int(1))], 1);
        mock.fail_on("SHOW", SqlError::Connection("down".to_string()));
        mock.on_exec("DROP", 3);

        assert_eq!(mock.query("SHOW ROLES").await.unwrap().len(), 1);
        assert!(mock.query("SHOW ROLES").await.is_err());
        assert_eq!(mock.exec("DROP ROLE \"R\"").await.unwrap(), 3);
        assert_eq!(mock.exec("CREATE ROLE \"R\"").await.unwrap(), 0);
        assert!(mock.query("SELECT 1").await.unwrap().is_empty());

        assert_eq!(mock.statements().len(), 5);
        assert_eq!(mock.statements_matching("ROLE").len(), 4);

        mock.clear_statements();
        assert!(mock.statements().is_empty());
    }

    #[tokio::test]
    async fn test_mock_fail_times() {
        let mock = MockExecutor::new();
        mock.fail_times("ALTER", SqlError::Execution("busy".to_string()), 1);

        assert!(mock.exec("ALTER ROLE").await.is_err());
        assert!(mock.exec("ALTER ROLE").await.is_ok());
    }

    #[tokio::test]
    async fn test_tester_configure() {
        let tester = ProviderTester::new(SnowflakeProvider::new(Arc::new(MockExecutor::new())));
        tester
            .configure(json!({"account": "xy12345", "username": "tf", "password": "Secret123"}))
            .await
            .unwrap();

        let err = tester
            .validate_provider_config(json!({"account": ""}))
            .await
            .unwrap_err();
        match err {
            TestError::Diagnostics(diags) => assert_error_contains(&diags, "Missing required"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_tester_resource_types() {
        let tester = ProviderTester::new(SnowflakeProvider::new(Arc::new(MockExecutor::new())));
        let types = tester.resource_types();
        assert!(types.contains(&"snowflake_schema".to_string()));
        assert!(tester.schema().resources.contains_key("snowflake_role"));
    }

    #[test]
    #[should_panic(expected = "Expected no changes")]
    fn test_assert_plan_no_changes_fails() {
        let plan = PlanResult::with_changes(
            json!({}),
            vec![crate::types::AttributeChange::added("name", json!("S"))],
            false,
        );
        assert_plan_no_changes(&plan);
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("name"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);

        let display = format!("{}", err);
        assert!(display.contains("First error"));
        assert!(display.contains("(at name)"));
        assert!(display.contains("More info"));
    }
}
