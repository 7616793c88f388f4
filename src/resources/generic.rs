//! Lifecycle steps shared by the resource kinds built on [`EntityBuilder`].
//!
//! These kinds map a list of configurable attributes one-to-one onto
//! Snowflake object properties, so creation and in-place updates can be
//! driven from the attribute schema alone.

use serde_json::Value;
use tracing::debug;

use super::{has_named_row, ResourceData};
use crate::error::ProviderError;
use crate::executor::{db_exec, db_query, Executor};
use crate::schema::{AttributeType, Schema};
use crate::sql::{EntityBuilder, PropertyBuilder};
use crate::validation::as_int64;

fn noun(builder: &EntityBuilder) -> String {
    builder.kind().as_sql().to_lowercase()
}

/// Render `value` into `statement`.
///
/// Returns `false` for an empty string, which the caller treats as unset. A
/// value that does not fit the attribute's type is an error.
fn set_property(
    statement: &mut PropertyBuilder,
    schema: &Schema,
    property: &str,
    value: &Value,
) -> Result<bool, ProviderError> {
    let attr = schema.attribute(property).ok_or_else(|| {
        ProviderError::InvalidRequest(format!("unknown property {}", property))
    })?;
    let mismatch = || {
        ProviderError::Validation(format!(
            "{} expects {:?}, got {}",
            property, attr.attr_type, value
        ))
    };
    match attr.attr_type {
        AttributeType::String => match value.as_str().ok_or_else(mismatch)? {
            "" => return Ok(false),
            s => {
                statement.set_string(property, s);
            }
        },
        AttributeType::Int64 => {
            statement.set_int(property, as_int64(value).ok_or_else(mismatch)?);
        }
        AttributeType::Bool => {
            statement.set_bool(property, value.as_bool().ok_or_else(mismatch)?);
        }
    }
    Ok(true)
}

/// Run `CREATE <KIND> "<name>"` with every configured property set.
pub(crate) async fn create_entity(
    db: &dyn Executor,
    builder: &EntityBuilder,
    name: &str,
    properties: &[&str],
    schema: &Schema,
    data: &ResourceData,
) -> Result<(), ProviderError> {
    let mut statement = builder.create();
    for property in properties {
        if let Some(value) = data.get(property) {
            set_property(&mut statement, schema, property, value)?;
        }
    }

    db_exec(db, &statement.statement())
        .await
        .map_err(|e| ProviderError::sql(format!("error creating {} {}", noun(builder), name), e))
}

/// Issue one `ALTER` per changed property, recording each success.
///
/// A property whose new value is empty or absent is unset. On failure the
/// returned error carries the state committed so far.
pub(crate) async fn update_entity(
    db: &dyn Executor,
    builder: &EntityBuilder,
    properties: &[&str],
    schema: &Schema,
    data: &mut ResourceData,
) -> Result<(), ProviderError> {
    for property in properties {
        if !data.has_change(property) {
            continue;
        }
        let (_, new_value) = data.get_change(property);
        let mut alter = builder.alter();
        let set = match new_value {
            Some(value) => set_property(&mut alter, schema, property, value)
                .map_err(|e| data.partial_failure(e))?,
            None => false,
        };
        let statement = if set {
            alter.statement()
        } else {
            builder.unset(property)
        };

        debug!(property = %property, id = %data.id(), "updating property");
        if let Err(e) = db_exec(db, &statement).await {
            let err = ProviderError::sql(
                format!(
                    "error updating {} on {} {}",
                    property,
                    noun(builder),
                    data.id()
                ),
                e,
            );
            return Err(data.partial_failure(err));
        }
        data.set_partial(*property);
    }
    Ok(())
}

/// Run `DROP <KIND> "<name>"` and clear the ID.
pub(crate) async fn delete_entity(
    db: &dyn Executor,
    builder: &EntityBuilder,
    data: &mut ResourceData,
) -> Result<(), ProviderError> {
    db_exec(db, &builder.drop()).await.map_err(|e| {
        ProviderError::sql(format!("error deleting {} {}", noun(builder), data.id()), e)
    })?;
    data.clear_id();
    Ok(())
}

/// Whether `SHOW <KIND>S LIKE '<name>'` returns a row for exactly `<name>`.
pub(crate) async fn entity_exists(
    db: &dyn Executor,
    builder: &EntityBuilder,
) -> Result<bool, ProviderError> {
    let rows = db_query(db, &builder.show()).await?;
    Ok(has_named_row(&rows, builder.name()))
}
