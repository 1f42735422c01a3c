//! Action listing and execution against the merged state of a cell.
//!
//! Listing resolves the cell's exits and contents to runtime instances of the
//! actor's session (creating them on first sight) and hands the merged view to
//! [`world_core::resolve_actions`]. Execution re-lists from the actor's
//! current cell, so a stale descriptor is refused instead of applied.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use world_core::{
    ActionDescriptor, ActionKind, CellView, EffectiveState, GridPoint, InstanceKind, Interactable,
    ResolvedExit, RuleRejection, RuntimeId, SessionId, StatePatch, TemplateId, check_transition,
    explain_rejection, resolve_actions,
};

use crate::error::{Result, RuntimeError};
use crate::guard;
use crate::repository::states;
use crate::state::patch_document;
use crate::world::WorldRuntime;

/// What happened when an action was performed.
///
/// A refused action is an outcome, not an error: `success` is false and
/// `rejection` says why.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
    pub action: String,
    pub target: RuntimeId,
    /// State of whatever the action changed, after the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<EffectiveState>,
    /// Instances minted by the action.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub created: Vec<RuntimeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<RuleRejection>,
}

impl ActionOutcome {
    fn performed(
        descriptor: &ActionDescriptor,
        message: String,
        state: Option<EffectiveState>,
    ) -> Self {
        Self {
            success: true,
            message,
            action: descriptor.action.clone(),
            target: descriptor.target.runtime_id.clone(),
            state,
            created: Vec::new(),
            rejection: None,
        }
    }

    fn rejected(action: &str, target: &RuntimeId, rejection: RuleRejection) -> Self {
        Self {
            success: false,
            message: rejection.to_string(),
            action: action.to_owned(),
            target: target.clone(),
            state: None,
            created: Vec::new(),
            rejection: Some(rejection),
        }
    }
}

/// Merged contents of one cell, owned so a [`CellView`] can borrow it.
struct Scene {
    session: SessionId,
    exits: Vec<ResolvedExit>,
    objects: Vec<EffectiveState>,
    entities: Vec<EffectiveState>,
}

impl WorldRuntime {
    /// Actions `actor` can take in `cell` right now, in display order.
    pub fn list_available_actions(
        &self,
        actor: &RuntimeId,
        cell: &RuntimeId,
    ) -> Result<Vec<ActionDescriptor>> {
        let scene = self.gather_scene(actor, cell)?;
        let view = self.view(&scene)?;
        Ok(resolve_actions(actor, &view))
    }

    /// Performs `request` for `actor` in the cell the actor is standing in.
    ///
    /// The request is matched by verb and target against a fresh listing.
    pub fn perform_action(
        &self,
        actor: &RuntimeId,
        request: &ActionDescriptor,
    ) -> Result<ActionOutcome> {
        let actor_state = self.states.get_effective_state(actor)?;
        let cell = actor_state
            .cell_id()
            .cloned()
            .ok_or_else(|| RuntimeError::constraint(format!("entity {actor} is not placed")))?;

        let scene = self.gather_scene(actor, &cell)?;
        let view = self.view(&scene)?;
        let available = resolve_actions(actor, &view);

        let target = &request.target.runtime_id;
        let Some(descriptor) = available
            .into_iter()
            .find(|d| d.matches(&request.action, target))
        else {
            let rejection = view
                .objects
                .iter()
                .chain(view.entities.iter())
                .find(|i| i.runtime_id() == target)
                .map(|i| explain_rejection(&request.action, i))
                .unwrap_or_else(|| RuleRejection::UnknownAction {
                    action: request.action.clone(),
                });
            tracing::debug!(actor = %actor, action = %request.action, target = %target, %rejection, "action refused");
            return Ok(ActionOutcome::rejected(&request.action, target, rejection));
        };

        let outcome = match descriptor.kind {
            ActionKind::Move => {
                self.enforcer
                    .move_entity(actor, target, GridPoint::ORIGIN)?;
                let state = self.states.get_effective_state(actor)?;
                ActionOutcome::performed(&descriptor, descriptor.label.clone(), Some(state))
            }
            ActionKind::Interact => match &descriptor.target_state {
                Some(next) => self.transition(&descriptor, next)?,
                None => ActionOutcome::performed(&descriptor, descriptor.label.clone(), None),
            },
            ActionKind::Pickup => self.pickup(&scene.session, actor, &descriptor)?,
        };

        tracing::info!(
            actor = %actor,
            action = %outcome.action,
            target = %outcome.target,
            success = outcome.success,
            "action performed"
        );
        Ok(outcome)
    }

    fn gather_scene(&self, actor: &RuntimeId, cell: &RuntimeId) -> Result<Scene> {
        let (actor_record, cell_record) = self.store.read(|conn| {
            let actor_record = guard::instance(conn, actor)?;
            guard::of_kind(&actor_record, InstanceKind::Entity)?;
            let cell_record = guard::instance(conn, cell)?;
            guard::of_kind(&cell_record, InstanceKind::Cell)?;
            guard::same_session(&actor_record, &cell_record)?;
            Ok::<_, RuntimeError>((actor_record, cell_record))
        })?;
        let session = actor_record.session_id;

        let actor_state = self.states.get_effective_state(actor)?;
        if actor_state.cell_id() != Some(cell) {
            return Err(RuntimeError::constraint(format!(
                "entity {actor} is not in cell {cell}"
            )));
        }

        let cell_template = self.template(&cell_record.template_id)?;
        let mut exits = Vec::with_capacity(cell_template.exits.len());
        for exit in &cell_template.exits {
            exits.push(ResolvedExit {
                direction: exit.direction.clone(),
                label: exit.label.clone(),
                target_template: exit.target.clone(),
                target_runtime_id: self.resolver.resolve_or_create_cell(&session, &exit.target)?,
            });
        }

        // A template listed twice resolves to the same instance; show it once.
        let cell_state = self.states.get_effective_state(cell)?;
        let mut seen = HashSet::with_capacity(cell_state.contents.len());
        let mut objects = Vec::with_capacity(cell_state.contents.len());
        for template in &cell_state.contents {
            let object = self.resolver.resolve_or_create_object(&session, template)?;
            if seen.insert(object.clone()) {
                objects.push(self.states.get_effective_state(&object)?);
            }
        }

        let mut entities = Vec::new();
        for entry in self.enforcer.occupants(cell)? {
            entities.push(self.states.get_effective_state(&entry.entity_runtime_id)?);
        }

        Ok(Scene {
            session,
            exits,
            objects,
            entities,
        })
    }

    fn view<'a>(&'a self, scene: &'a Scene) -> Result<CellView<'a>> {
        let interactable = |state: &'a EffectiveState| -> Result<Interactable<'a>> {
            Ok(Interactable {
                template: self.template(&state.template_id)?,
                state,
            })
        };

        Ok(CellView {
            exits: scene.exits.clone(),
            objects: scene.objects.iter().map(interactable).collect::<Result<_>>()?,
            entities: scene.entities.iter().map(interactable).collect::<Result<_>>()?,
        })
    }

    /// Moves the target to `next`, re-checking legality in the write
    /// transaction so that two racing requests cannot both succeed.
    fn transition(&self, descriptor: &ActionDescriptor, next: &str) -> Result<ActionOutcome> {
        let target = &descriptor.target.runtime_id;

        let result = self.store.write(|tx| {
            let record = guard::writable(tx, target, None)?;
            let template = self.template(&record.template_id)?;
            let document = states::load_document(tx, target)?;
            let current = self.states.merge(&record, document.as_ref())?;
            if let Err(rejection) = check_transition(template, &current.state, next) {
                return Ok(Err(rejection));
            }

            let saved = patch_document(tx, &record, StatePatch::new().state(next))?;
            Ok::<_, RuntimeError>(Ok(self.states.merge(&record, Some(&saved))?))
        })?;
        self.states.invalidate(target);

        Ok(match result {
            Ok(state) => ActionOutcome::performed(
                descriptor,
                format!("{} is now {}", state.template_id, state.state),
                Some(state),
            ),
            Err(rejection) => ActionOutcome::rejected(&descriptor.action, target, rejection),
        })
    }

    /// Moves every content entry of the target into the actor's inventory as
    /// fresh item instances and leaves the target explicitly empty.
    fn pickup(
        &self,
        session: &SessionId,
        actor: &RuntimeId,
        descriptor: &ActionDescriptor,
    ) -> Result<ActionOutcome> {
        let source = &descriptor.target.runtime_id;

        let (state, created) = self.store.write(|tx| {
            let source_record = guard::writable(tx, source, Some(InstanceKind::Object))?;
            let actor_record = guard::writable(tx, actor, Some(InstanceKind::Entity))?;

            let source_document = states::load_document(tx, source)?;
            let current = self.states.merge(&source_record, source_document.as_ref())?;

            let mut created = Vec::with_capacity(current.contents.len());
            for template in &current.contents {
                created.push(self.resolver.factory().create_item(tx, session, template)?);
            }

            let mut patch = StatePatch::new().contents(Vec::<TemplateId>::new());
            if let Some(next) = &descriptor.target_state {
                let template = self.template(&source_record.template_id)?;
                if check_transition(template, &current.state, next).is_ok() {
                    patch = patch.state(next.clone());
                }
            }
            let saved = patch_document(tx, &source_record, patch)?;

            let actor_document = states::load_document(tx, actor)?.unwrap_or_default();
            let mut inventory = actor_document.inventory_ids().to_vec();
            inventory.extend(created.iter().cloned());
            patch_document(tx, &actor_record, StatePatch::new().inventory(inventory))?;

            let state = self.states.merge(&source_record, Some(&saved))?;
            Ok::<_, RuntimeError>((state, created))
        })?;

        self.states.invalidate(source);
        self.states.invalidate(actor);

        let mut outcome = ActionOutcome::performed(
            descriptor,
            format!("took {} item(s)", created.len()),
            Some(state),
        );
        outcome.created = created;
        Ok(outcome)
    }
}
