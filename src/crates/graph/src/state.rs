//! Typed workflow state: a schema of named fields, each carrying a merge
//! strategy, applied to a `serde_json::Value` object. Unlike a bare
//! dynamically-typed dict, a field not declared in the schema is
//! rejected at merge time rather than silently overwritten.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{GraphError, Result};

/// How a field's current value is combined with an incoming partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Last write wins.
    Overwrite,
    /// Concatenates arrays (or appends a scalar update as one element).
    Append,
    /// Deep-merges two JSON objects, keys from `update` winning on conflict.
    Merge,
    /// Discards the update; the current value is retained.
    Keep,
}

impl MergeStrategy {
    fn apply(self, current: &Value, update: &Value) -> Value {
        match self {
            MergeStrategy::Overwrite => update.clone(),
            MergeStrategy::Keep => current.clone(),
            MergeStrategy::Append => append(current, update),
            MergeStrategy::Merge => deep_merge(current, update),
        }
    }
}

fn append(current: &Value, update: &Value) -> Value {
    let mut items = match current {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    };
    match update {
        Value::Array(new_items) => items.extend(new_items.clone()),
        other => items.push(other.clone()),
    }
    Value::Array(items)
}

fn deep_merge(current: &Value, update: &Value) -> Value {
    match (current, update) {
        (Value::Object(current_map), Value::Object(update_map)) => {
            let mut merged = current_map.clone();
            for (key, value) in update_map {
                let combined = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), combined);
            }
            Value::Object(merged)
        }
        _ => update.clone(),
    }
}

/// Declares every field a workflow's state may carry and how concurrent
/// or sequential writes to it are reconciled.
#[derive(Debug, Clone, Default)]
pub struct StateSchema {
    fields: HashMap<String, MergeStrategy>,
}

impl StateSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, strategy: MergeStrategy) -> Self {
        self.fields.insert(name.into(), strategy);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, MergeStrategy)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Merges `update`'s fields into `state` in place. Every key in
    /// `update` must be declared in the schema; an undeclared key fails
    /// the merge with no partial mutation of `state`.
    pub fn apply(&self, state: &mut Value, update: &Value) -> Result<()> {
        let update_obj = update
            .as_object()
            .ok_or_else(|| GraphError::State("partial state update must be a JSON object".to_string()))?;

        for key in update_obj.keys() {
            if !self.fields.contains_key(key) {
                return Err(GraphError::State(format!(
                    "field `{key}` is not declared in the state schema"
                )));
            }
        }

        if !state.is_object() {
            *state = Value::Object(Map::new());
        }
        let state_obj = state.as_object_mut().expect("state coerced to object above");

        for (key, update_value) in update_obj {
            let strategy = self.fields[key];
            let current_value = state_obj.get(key).cloned().unwrap_or(Value::Null);
            state_obj.insert(key.clone(), strategy.apply(&current_value, update_value));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overwrite_replaces_scalar_field() {
        let schema = StateSchema::new().with_field("status", MergeStrategy::Overwrite);
        let mut state = json!({"status": "idle"});
        schema.apply(&mut state, &json!({"status": "running"})).unwrap();
        assert_eq!(state["status"], "running");
    }

    #[test]
    fn append_concatenates_arrays() {
        let schema = StateSchema::new().with_field("results", MergeStrategy::Append);
        let mut state = json!({"results": ["item_0"]});
        schema.apply(&mut state, &json!({"results": ["item_1"]})).unwrap();
        assert_eq!(state["results"], json!(["item_0", "item_1"]));
    }

    #[test]
    fn merge_combines_object_fields() {
        let schema = StateSchema::new().with_field("config", MergeStrategy::Merge);
        let mut state = json!({"config": {"a": 1}});
        schema.apply(&mut state, &json!({"config": {"b": 2}})).unwrap();
        assert_eq!(state["config"], json!({"a": 1, "b": 2}));
    }

    #[test]
    fn keep_discards_the_update() {
        let schema = StateSchema::new().with_field("locked", MergeStrategy::Keep);
        let mut state = json!({"locked": "original"});
        schema.apply(&mut state, &json!({"locked": "attempted overwrite"})).unwrap();
        assert_eq!(state["locked"], "original");
    }

    #[test]
    fn undeclared_field_is_rejected_without_mutating_state() {
        let schema = StateSchema::new().with_field("status", MergeStrategy::Overwrite);
        let mut state = json!({"status": "idle"});
        let err = schema.apply(&mut state, &json!({"unknown": 1})).unwrap_err();
        assert!(matches!(err, GraphError::State(_)));
        assert_eq!(state, json!({"status": "idle"}));
    }
}
