//! Snowflake infrastructure provider.
//!
//! Translates declarative resource definitions into Snowflake SQL DDL and
//! runs it through an injected [`Executor`]. Supported resource kinds:
//!
//! - `snowflake_schema` (ID `<database>|<schema>`)
//! - `snowflake_database`
//! - `snowflake_role`
//! - `snowflake_managed_account`
//!
//! # Overview
//!
//! - **SQL builders** ([`sql`]): render CREATE/SHOW/ALTER/DROP text with
//!   quoted identifiers and escaped literals
//! - **Executor** ([`executor`]): the seam to a driver; rows are scanned with
//!   a strict column count
//! - **Resource adapters** ([`resources`]): Create, Read, Update, Delete,
//!   Exists and Import per kind, over an attribute bag
//! - **Provider** ([`SnowflakeProvider`]): implements [`ProviderService`],
//!   planning, validation and drift handling on top of the adapters
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use snowflake_provider::{init_logging, ProviderService, SnowflakeProvider};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let db = Arc::new(MyDriver::connect().await?);
//!     let provider = SnowflakeProvider::new(db);
//!     provider.configure(json!({"account": "xy12345", "username": "tf"})).await?;
//!
//!     let plan = provider
//!         .plan("snowflake_schema", None, json!({"name": "RAW", "database": "ANALYTICS"}), json!({}))
//!         .await?;
//!     let state = provider.create("snowflake_schema", plan.planned_state).await?;
//!     assert_eq!(state["id"], "ANALYTICS|RAW");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod service;
pub mod sql;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use executor::{Executor, Row, SqlError, SqlValue};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::SnowflakeProvider;
pub use resources::{Resource, ResourceData, ResourceRegistry};
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for executor implementations
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
