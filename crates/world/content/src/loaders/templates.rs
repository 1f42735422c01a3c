//! Template catalog loader.

use std::path::Path;

use serde::{Deserialize, Serialize};
use world_core::TemplateDefinition;

use crate::catalog::TemplateCatalog;
use crate::loaders::{LoadResult, read_file};

/// Template file structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateFile {
    pub templates: Vec<TemplateDefinition>,
}

/// Loader for template catalogs from RON files.
pub struct TemplateLoader;

impl TemplateLoader {
    /// Load and cross-check a template catalog from a RON file.
    pub fn load(path: &Path) -> LoadResult<TemplateCatalog> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<TemplateCatalog> {
        let file: TemplateFile = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse template RON: {}", e))?;
        let count = file.templates.len();

        let catalog = TemplateCatalog::from_templates(file.templates)
            .map_err(|e| anyhow::anyhow!("Invalid template catalog: {}", e))?;
        tracing::debug!(count, "loaded template catalog");

        Ok(catalog)
    }
}
