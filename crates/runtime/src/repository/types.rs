//! Row types persisted by the store.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use world_core::{EffectId, EntityRole, InstanceKind, RuntimeId, SessionId, TemplateId};

use crate::repository::{RepositoryError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub status: SessionStatus,
    pub created_at: String,
    pub closed_at: Option<String>,
}

impl SessionRecord {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InstanceStatus {
    Active,
    Retired,
}

/// Identity row of a runtime instance.
///
/// `slot` separates multiple instances of one template in a session; the
/// default instance sits in slot 0.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub runtime_id: RuntimeId,
    pub session_id: SessionId,
    pub template_id: TemplateId,
    pub kind: InstanceKind,
    pub slot: u32,
    pub status: InstanceStatus,
    pub created_at: String,
}

impl InstanceRecord {
    pub fn is_active(&self) -> bool {
        self.status == InstanceStatus::Active
    }
}

/// Denormalized lookup row kept 1:1 with [`InstanceRecord`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceReference {
    pub runtime_id: RuntimeId,
    pub session_id: SessionId,
    pub template_id: TemplateId,
    pub kind: InstanceKind,
    pub is_player: bool,
    pub role: Option<EntityRole>,
}

/// Derived row: which cell an entity is in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyEntry {
    pub cell_runtime_id: RuntimeId,
    pub entity_runtime_id: RuntimeId,
    pub entered_at: String,
}

/// Ownership of an effect by a runtime instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectGrant {
    pub session_id: SessionId,
    pub owner: RuntimeId,
    pub effect_id: EffectId,
    pub acquired_at: String,
    pub source: String,
}

/// Parses a stored label back into its enum, flagging unknown values.
pub(crate) fn parse_label<T: FromStr>(column: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| RepositoryError::CorruptedData(format!("unknown {column} '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_labels_are_corruption() {
        assert_eq!(
            parse_label::<InstanceStatus>("status", "retired").unwrap(),
            InstanceStatus::Retired
        );
        assert!(matches!(
            parse_label::<InstanceKind>("kind", "region"),
            Err(RepositoryError::CorruptedData(_))
        ));
    }
}
