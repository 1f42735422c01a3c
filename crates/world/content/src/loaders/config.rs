//! World configuration loader.

use std::path::Path;

use world_core::WorldConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for [`WorldConfig`] from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file.
    ///
    /// Missing keys fall back to [`WorldConfig::default`].
    pub fn load(path: &Path) -> LoadResult<WorldConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<WorldConfig> {
        let config: WorldConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse world config TOML: {}", e))?;

        Ok(config)
    }
}
