use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ProviderError;

/// The attribute name that holds the composite ID.
pub const ID_ATTRIBUTE: &str = "id";

/// The attribute bag for one resource instance during one lifecycle call.
///
/// Values are the host's JSON state. During an update the bag also keeps the
/// prior state so adapters can ask which attributes changed, and records the
/// attributes whose change was applied so a failed update reports exactly
/// what reached the server.
#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    values: Map<String, Value>,
    prior: Option<Map<String, Value>>,
    applied: BTreeSet<String>,
}

impl ResourceData {
    /// Wrap a planned or current state.
    pub fn new(state: Value) -> Result<Self, ProviderError> {
        Ok(Self {
            values: into_map(state)?,
            ..Default::default()
        })
    }

    /// Wrap the prior and planned states of an update.
    pub fn for_update(prior: Value, planned: Value) -> Result<Self, ProviderError> {
        let prior = into_map(prior)?;
        let mut values = into_map(planned)?;
        // The planned state may not carry the ID; it never changes in place.
        if !values.contains_key(ID_ATTRIBUTE) {
            if let Some(id) = prior.get(ID_ATTRIBUTE) {
                values.insert(ID_ATTRIBUTE.to_string(), id.clone());
            }
        }
        Ok(Self {
            values,
            prior: Some(prior),
            applied: BTreeSet::new(),
        })
    }

    /// A bag holding nothing but an ID, as produced by import.
    pub fn with_id(id: impl Into<String>) -> Self {
        let mut data = Self::default();
        data.set_id(id);
        data
    }

    /// The composite ID, or an empty string when none is set.
    pub fn id(&self) -> &str {
        self.values
            .get(ID_ATTRIBUTE)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Store the composite ID.
    pub fn set_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        if id.is_empty() {
            self.values.remove(ID_ATTRIBUTE);
        } else {
            self.values.insert(ID_ATTRIBUTE.to_string(), Value::String(id));
        }
    }

    /// Forget the ID; the host drops the instance from state.
    pub fn clear_id(&mut self) {
        self.set_id("");
    }

    /// Raw access to an attribute value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    /// Set a single attribute.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Decode the bag into a typed model. Unknown attributes are ignored.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ProviderError> {
        Ok(serde_json::from_value(Value::Object(self.values.clone()))?)
    }

    /// Encode a typed model into the bag, overwriting its attributes.
    pub fn encode<T: Serialize>(&mut self, model: &T) -> Result<(), ProviderError> {
        match serde_json::to_value(model)? {
            Value::Object(map) => {
                self.values.extend(map);
                Ok(())
            }
            other => Err(ProviderError::InvalidRequest(format!(
                "model encoded to {} instead of an object",
                other
            ))),
        }
    }

    /// Whether `key` differs between the prior and planned state.
    ///
    /// Outside an update nothing has changed.
    pub fn has_change(&self, key: &str) -> bool {
        match &self.prior {
            Some(prior) => normalized(prior.get(key)) != normalized(self.values.get(key)),
            None => false,
        }
    }

    /// The prior and planned values of `key`.
    pub fn get_change(&self, key: &str) -> (Option<&Value>, Option<&Value>) {
        let old = self.prior.as_ref().and_then(|p| normalized(p.get(key)));
        (old, normalized(self.values.get(key)))
    }

    /// Record that the change to `key` has been applied on the server.
    pub fn set_partial(&mut self, key: impl Into<String>) {
        self.applied.insert(key.into());
    }

    /// Attributes recorded with [`set_partial`](Self::set_partial).
    pub fn applied(&self) -> impl Iterator<Item = &str> {
        self.applied.iter().map(String::as_str)
    }

    /// The state that is known to be on the server after a failed update:
    /// the prior state with every applied attribute taken from the plan.
    pub fn committed_state(&self) -> Value {
        let Some(prior) = &self.prior else {
            return self.state();
        };
        let mut committed = prior.clone();
        for key in &self.applied {
            match self.values.get(key) {
                Some(value) => committed.insert(key.clone(), value.clone()),
                None => committed.remove(key),
            };
        }
        Value::Object(committed)
    }

    /// Wrap an update failure so the host keeps the applied changes.
    pub fn partial_failure(&self, source: ProviderError) -> ProviderError {
        if self.applied.is_empty() {
            return source;
        }
        ProviderError::PartialApply {
            state: self.committed_state(),
            source: Box::new(source),
        }
    }

    /// The full current state.
    pub fn state(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Consume the bag, yielding its state.
    pub fn into_state(self) -> Value {
        Value::Object(self.values)
    }
}

fn normalized(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn into_map(state: Value) -> Result<Map<String, Value>, ProviderError> {
    match state {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ProviderError::InvalidRequest(format!(
            "expected resource state to be an object, got {}",
            other
        ))),
    }
}
