//! [`TemplateStore`] backed by an in-memory map.

use std::collections::HashMap;

use thiserror::Error;
use world_core::{InstanceKind, TemplateDefinition, TemplateId, TemplateStore};

/// Problems found when cross-checking a set of templates.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("template '{0}' is defined more than once")]
    Duplicate(TemplateId),

    #[error("template '{template}' references unknown template '{missing}'")]
    UnknownReference {
        template: TemplateId,
        missing: TemplateId,
    },

    #[error("exit '{direction}' of '{template}' leads to '{target}', which is not a cell")]
    ExitNotCell {
        template: TemplateId,
        direction: String,
        target: TemplateId,
    },

    #[error("template '{template}' has default state '{state}' outside its possible states")]
    DefaultStateOutOfRange { template: TemplateId, state: String },

    #[error("transition table of '{template}' mentions undeclared state '{state}'")]
    UndeclaredTransitionState { template: TemplateId, state: String },
}

/// Immutable template content indexed by id.
#[derive(Clone, Debug, Default)]
pub struct TemplateCatalog {
    templates: HashMap<TemplateId, TemplateDefinition>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog and cross-checks every reference.
    pub fn from_templates(
        templates: impl IntoIterator<Item = TemplateDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for template in templates {
            let id = template.id.clone();
            if catalog.add(template).is_some() {
                return Err(CatalogError::Duplicate(id));
            }
        }
        catalog.check()?;
        Ok(catalog)
    }

    /// Adds a template, returning the one it replaced.
    pub fn add(&mut self, template: TemplateDefinition) -> Option<TemplateDefinition> {
        self.templates.insert(template.id.clone(), template)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Returns the first player template, if any.
    pub fn player_template(&self) -> Option<&TemplateDefinition> {
        let mut players: Vec<_> = self.templates.values().filter(|t| t.is_player).collect();
        players.sort_by(|a, b| a.id.cmp(&b.id));
        players.into_iter().next()
    }

    /// Verifies that every reference resolves and state declarations agree.
    pub fn check(&self) -> Result<(), CatalogError> {
        let mut ids: Vec<&TemplateId> = self.templates.keys().collect();
        ids.sort();

        for id in ids {
            let template = &self.templates[id];
            self.check_references(template)?;
            check_states(template)?;
        }
        Ok(())
    }

    fn check_references(&self, template: &TemplateDefinition) -> Result<(), CatalogError> {
        for referenced in template.contents.iter().chain(&template.inventory) {
            if !self.templates.contains_key(referenced) {
                return Err(CatalogError::UnknownReference {
                    template: template.id.clone(),
                    missing: referenced.clone(),
                });
            }
        }

        for exit in &template.exits {
            match self.templates.get(&exit.target) {
                None => {
                    return Err(CatalogError::UnknownReference {
                        template: template.id.clone(),
                        missing: exit.target.clone(),
                    });
                }
                Some(target) if target.kind != InstanceKind::Cell => {
                    return Err(CatalogError::ExitNotCell {
                        template: template.id.clone(),
                        direction: exit.direction.clone(),
                        target: exit.target.clone(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

fn check_states(template: &TemplateDefinition) -> Result<(), CatalogError> {
    if template.possible_states.is_empty() {
        return Ok(());
    }

    if let Some(state) = &template.default_state {
        if template.state_index(state).is_none() {
            return Err(CatalogError::DefaultStateOutOfRange {
                template: template.id.clone(),
                state: state.clone(),
            });
        }
    }

    if let Some(table) = &template.transitions {
        let mentioned = table
            .iter()
            .flat_map(|(from, targets)| std::iter::once(from).chain(targets));
        for state in mentioned {
            if template.state_index(state).is_none() {
                return Err(CatalogError::UndeclaredTransitionState {
                    template: template.id.clone(),
                    state: state.clone(),
                });
            }
        }
    }
    Ok(())
}

impl TemplateStore for TemplateCatalog {
    fn template(&self, id: &TemplateId) -> Option<&TemplateDefinition> {
        self.templates.get(id)
    }

    fn templates(&self) -> Vec<&TemplateDefinition> {
        let mut all: Vec<_> = self.templates.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}
