//! Content factory for building the template store from data files.

use std::path::{Path, PathBuf};

use world_core::WorldConfig;

use crate::catalog::TemplateCatalog;
use crate::loaders::{ConfigLoader, LoadResult, TemplateLoader};

/// Content factory that loads all world content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── world.toml
/// └── templates.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Factory over the sample content shipped with this crate.
    pub fn bundled() -> Self {
        Self::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("data"))
    }

    /// Load world configuration from `world.toml`.
    ///
    /// A missing file yields the defaults.
    pub fn load_config(&self) -> LoadResult<WorldConfig> {
        let path = self.data_dir.join("world.toml");
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no world config, using defaults");
            return Ok(WorldConfig::default());
        }
        ConfigLoader::load(&path)
    }

    /// Load the template catalog from `templates.ron`.
    pub fn load_templates(&self) -> LoadResult<TemplateCatalog> {
        let path = self.data_dir.join("templates.ron");
        TemplateLoader::load(&path)
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
