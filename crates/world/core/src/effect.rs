//! Effect carrier definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

use crate::ids::EffectId;

/// How an effect reaches its owner.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CarrierType {
    /// Always on while owned.
    #[default]
    Passive,
    /// Triggered explicitly by the owner.
    Active,
    /// Spent on first use.
    Consumable,
    /// Fires on a world event.
    Trigger,
}

/// Authoring input for a new effect; the registry mints the id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectDraft {
    pub name: String,
    #[serde(default)]
    pub carrier_type: CarrierType,
    pub payload: Value,
    #[serde(default)]
    pub constraints: BTreeMap<String, Value>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl EffectDraft {
    pub fn new(name: impl Into<String>, carrier_type: CarrierType, payload: Value) -> Self {
        Self {
            name: name.into(),
            carrier_type,
            payload,
            constraints: BTreeMap::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_constraint(mut self, key: impl Into<String>, value: Value) -> Self {
        self.constraints.insert(key.into(), value);
        self
    }

    pub fn validate(&self) -> Result<(), EffectValidationError> {
        validate_fields(&self.name, &self.payload)
    }

    pub fn into_definition(self, id: EffectId) -> EffectCarrierDefinition {
        EffectCarrierDefinition {
            id,
            name: self.name,
            carrier_type: self.carrier_type,
            payload: self.payload,
            constraints: self.constraints,
            tags: self.tags,
        }
    }
}

/// Named effect recipe that instances can own.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectCarrierDefinition {
    pub id: EffectId,
    pub name: String,
    pub carrier_type: CarrierType,
    pub payload: Value,
    #[serde(default)]
    pub constraints: BTreeMap<String, Value>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl EffectCarrierDefinition {
    pub fn validate(&self) -> Result<(), EffectValidationError> {
        validate_fields(&self.name, &self.payload)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EffectValidationError {
    #[error("effect name must not be empty")]
    EmptyName,

    #[error("effect payload must not be empty")]
    EmptyPayload,
}

fn validate_fields(name: &str, payload: &Value) -> Result<(), EffectValidationError> {
    if name.trim().is_empty() {
        return Err(EffectValidationError::EmptyName);
    }

    let empty = match payload {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    };
    if empty {
        return Err(EffectValidationError::EmptyPayload);
    }

    Ok(())
}
