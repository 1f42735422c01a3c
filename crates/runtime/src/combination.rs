//! Applies combination plans to an actor's inventory.

use rand::Rng;
use serde::{Deserialize, Serialize};
use world_core::{
    CombinationInput, CombinationPlan, CombinationRejection, EffectId, InstanceKind, RuntimeId,
    StatePatch, plan_combination, validate_offer,
};

use crate::effects::{carriers_in, grant_in};
use crate::error::{RepositoryError, Result, RuntimeError};
use crate::guard;
use crate::repository::{instances, states};
use crate::state::patch_document;
use crate::world::WorldRuntime;

/// Outcome of one combination attempt.
///
/// A refused offer is an outcome, not an error: `rejection` is set and
/// nothing was rolled or consumed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombinationResult {
    pub success: bool,
    pub message: String,
    pub probability: f64,
    pub roll: Option<f64>,
    pub consumed: Vec<RuntimeId>,
    pub created: Option<RuntimeId>,
    /// Effects granted to the created item.
    pub carriers: Vec<EffectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<CombinationRejection>,
}

impl CombinationResult {
    fn rejected(rejection: CombinationRejection) -> Self {
        Self {
            success: false,
            message: rejection.to_string(),
            probability: 0.0,
            roll: None,
            consumed: Vec::new(),
            created: None,
            carriers: Vec::new(),
            rejection: Some(rejection),
        }
    }
}

impl WorldRuntime {
    /// Combines held items using the runtime's own generator.
    pub fn attempt_combination(
        &self,
        actor: &RuntimeId,
        items: &[RuntimeId],
    ) -> Result<CombinationResult> {
        let mut rng = self.rng.lock().map_err(|_| RepositoryError::LockPoisoned)?;
        self.attempt_combination_with(actor, items, &mut *rng)
    }

    /// Combines held items, rolling with `rng`.
    ///
    /// Validation, the roll, consumption, creation of the product and its
    /// grants all happen in one transaction.
    pub fn attempt_combination_with<R: Rng + ?Sized>(
        &self,
        actor: &RuntimeId,
        items: &[RuntimeId],
        rng: &mut R,
    ) -> Result<CombinationResult> {
        let product = &self.config.world.combination_template;
        let grant_source = &self.config.world.combination_grant_source;
        self.resolver
            .factory()
            .template_for(product, InstanceKind::Object)?;

        let result = self.store.write(|tx| {
            let actor_record = guard::writable(tx, actor, Some(InstanceKind::Entity))?;
            let session = &actor_record.session_id;
            let document = states::load_document(tx, actor)?.unwrap_or_default();
            let mut inventory = document.inventory_ids().to_vec();

            if let Err(rejection) = validate_offer(items, &inventory) {
                return Ok(CombinationResult::rejected(rejection));
            }

            let mut inputs = Vec::with_capacity(items.len());
            for item in items {
                inputs.push(CombinationInput::new(
                    item.clone(),
                    carriers_in(tx, session, item)?,
                ));
            }

            let roll = plan_combination(&inputs, rng);
            for item in roll.plan.consumed() {
                instances::retire_instance(tx, item)?;
            }
            inventory.retain(|held| !roll.plan.consumed().contains(held));

            let (created, carriers) = match &roll.plan {
                CombinationPlan::Success { carriers, .. } => {
                    let created = self.resolver.factory().create_item(tx, session, product)?;
                    for effect in carriers {
                        grant_in(tx, session, &created, effect, grant_source)?;
                    }
                    inventory.push(created.clone());
                    (Some(created), carriers.clone())
                }
                CombinationPlan::Failure { .. } => (None, Vec::new()),
            };

            patch_document(tx, &actor_record, StatePatch::new().inventory(inventory))?;

            let message = match &created {
                Some(item) => format!("combined {} items into {item}", items.len()),
                None => format!("combination failed, lost {} item(s)", roll.plan.consumed().len()),
            };
            Ok::<_, RuntimeError>(CombinationResult {
                success: roll.plan.is_success(),
                message,
                probability: roll.probability,
                roll: Some(roll.roll),
                consumed: roll.plan.consumed().to_vec(),
                created,
                carriers,
                rejection: None,
            })
        })?;

        self.states.invalidate(actor);
        for item in &result.consumed {
            self.states.invalidate(item);
        }

        tracing::info!(
            actor = %actor,
            success = result.success,
            probability = result.probability,
            roll = ?result.roll,
            consumed = result.consumed.len(),
            "combination attempted"
        );
        Ok(result)
    }
}
