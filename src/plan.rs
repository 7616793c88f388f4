//! Plan computation: diff a prior state against a proposed configuration.
//!
//! Planning fills defaults for unset optional attributes, carries computed
//! values forward from the prior state, and flags a replacement when any
//! changed attribute is marked force-new.

use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::resources::ID_ATTRIBUTE;
use crate::schema::Schema;
use crate::types::{AttributeChange, PlanResult};

/// Compute the plan for one resource instance.
///
/// `prior` is `None` for a create; a null `proposed` plans a delete.
pub fn plan_resource(
    schema: &Schema,
    prior: Option<&Value>,
    proposed: &Value,
) -> Result<PlanResult, ProviderError> {
    let prior = match prior {
        Some(Value::Null) | None => None,
        Some(Value::Object(map)) => Some(map),
        Some(other) => {
            return Err(ProviderError::InvalidRequest(format!(
                "prior state must be an object, got {}",
                other
            )))
        }
    };

    let proposed = match proposed {
        Value::Null => return Ok(plan_delete(prior)),
        Value::Object(map) => map,
        other => {
            return Err(ProviderError::InvalidRequest(format!(
                "proposed state must be an object, got {}",
                other
            )))
        }
    };

    let mut planned = proposed.clone();
    for name in schema.attribute_names() {
        let Some(attr) = schema.attribute(name) else {
            continue;
        };
        if is_set(planned.get(name)) {
            continue;
        }
        if let Some(default) = &attr.default {
            planned.insert(name.to_string(), default.clone());
        } else if attr.flags.computed {
            if let Some(value) = prior.and_then(|p| p.get(name)).filter(|v| !v.is_null()) {
                planned.insert(name.to_string(), value.clone());
            }
        }
    }

    let Some(prior) = prior else {
        let changes = schema
            .attribute_names()
            .into_iter()
            .filter_map(|name| {
                planned
                    .get(name)
                    .filter(|v| !v.is_null())
                    .map(|v| AttributeChange::added(name, v.clone()))
            })
            .collect();
        return Ok(PlanResult::with_changes(
            Value::Object(planned),
            changes,
            false,
        ));
    };

    let mut changes = Vec::new();
    let mut requires_replace = false;
    for name in schema.attribute_names() {
        let before = prior.get(name).filter(|v| !v.is_null());
        let after = planned.get(name).filter(|v| !v.is_null());
        if before == after {
            continue;
        }
        let mut change = AttributeChange::new(name, before.cloned(), after.cloned());
        if schema.attribute(name).is_some_and(|a| a.force_new) {
            change = change.forcing_replace();
            requires_replace = true;
        }
        changes.push(change);
    }

    if requires_replace {
        // The replacement gets a fresh ID and fresh computed values.
        for name in schema.attribute_names() {
            if schema.attribute(name).is_some_and(|a| a.flags.is_read_only()) {
                planned.remove(name);
            }
        }
        planned.remove(ID_ATTRIBUTE);
    }

    Ok(PlanResult::with_changes(
        Value::Object(planned),
        changes,
        requires_replace,
    ))
}

fn plan_delete(prior: Option<&Map<String, Value>>) -> PlanResult {
    let mut changes: Vec<AttributeChange> = prior
        .into_iter()
        .flatten()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| AttributeChange::removed(k.clone(), v.clone()))
        .collect();
    changes.sort_by(|a, b| a.path.cmp(&b.path));
    PlanResult::with_changes(Value::Null, changes, false)
}

fn is_set(value: Option<&Value>) -> bool {
    value.is_some_and(|v| !v.is_null())
}
