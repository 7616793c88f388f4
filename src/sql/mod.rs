//! Snowflake statement builders.
//!
//! Builders accumulate clauses and render complete SQL text. They trust their
//! inputs; range and enum checks belong to the attribute schema.
//!
//! ```
//! use snowflake_provider::sql::SchemaBuilder;
//!
//! let sql = SchemaBuilder::new("analytics")
//!     .with_db("warehouse")
//!     .transient()
//!     .with_data_retention_days(5)
//!     .create();
//! assert_eq!(
//!     sql,
//!     r#"CREATE TRANSIENT SCHEMA "warehouse"."analytics" DATA_RETENTION_TIME_IN_DAYS = 5"#
//! );
//! ```

mod entity;
mod schema;

pub use entity::{EntityBuilder, EntityKind, PropertyBuilder};
pub use schema::SchemaBuilder;

/// Quote an identifier, doubling any embedded double quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Escape a value for use inside a single-quoted string literal.
pub fn escape_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Render a single-quoted string literal.
pub fn quote_string(value: &str) -> String {
    format!("'{}'", escape_string(value))
}
