use serde::{Deserialize, Serialize};

use crate::ids::TemplateId;

/// World rules configuration and tunable parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Scalar state reported when neither the runtime document nor the
    /// template declares one.
    pub fallback_state: String,

    /// Template used to materialize the product of a successful combination.
    pub combination_template: TemplateId,

    /// Source label recorded on grants created by item combination.
    pub combination_grant_source: String,
}

impl WorldConfig {
    // ===== compile-time constants =====
    pub const MIN_COMBINATION_ITEMS: usize = 2;
    pub const MAX_COMBINATION_ITEMS: usize = 5;

    pub const BASE_COMBINATION_CHANCE: f64 = 0.5;
    pub const PER_ITEM_PENALTY: f64 = 0.08;
    pub const PER_CARRIER_BONUS: f64 = 0.03;
    pub const MIN_COMBINATION_CHANCE: f64 = 0.1;
    pub const MAX_COMBINATION_CHANCE: f64 = 0.9;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_FALLBACK_STATE: &'static str = "default";
    pub const DEFAULT_COMBINATION_TEMPLATE: &'static str = "combined_item";
    pub const DEFAULT_GRANT_SOURCE: &'static str = "combination";

    pub fn new() -> Self {
        Self {
            fallback_state: Self::DEFAULT_FALLBACK_STATE.to_owned(),
            combination_template: TemplateId::from(Self::DEFAULT_COMBINATION_TEMPLATE),
            combination_grant_source: Self::DEFAULT_GRANT_SOURCE.to_owned(),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self::new()
    }
}
