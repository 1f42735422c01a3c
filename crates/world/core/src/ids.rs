use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of an immutable template in the template store.
    TemplateId
);

string_id!(
    /// Scoping context that owns every runtime row created under it.
    SessionId
);

string_id!(
    /// Opaque identifier of a per-session runtime instance.
    ///
    /// Runtime ids are minted by the instance factory and carry no meaning;
    /// callers must never derive a template or session from the string.
    RuntimeId
);

string_id!(
    /// Identifier of an effect carrier definition.
    EffectId
);

/// Sealed set of instance kinds materialized by the factory.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InstanceKind {
    Cell,
    Entity,
    Object,
}

/// Role of an entity instance, denormalized onto its reference row.
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
pub enum EntityRole {
    Player,
    #[default]
    Npc,
}

/// Point inside a cell, in cell-local grid coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Authoritative location of an entity.
///
/// This is the single source of truth for where an entity is. The occupancy
/// index is derived from it and never read back into it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub runtime_cell_id: RuntimeId,
    #[serde(default)]
    pub point: GridPoint,
}

impl Position {
    pub fn new(runtime_cell_id: RuntimeId, point: GridPoint) -> Self {
        Self {
            runtime_cell_id,
            point,
        }
    }
}
