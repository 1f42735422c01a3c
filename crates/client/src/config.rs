//! Client configuration structures and loaders.
use std::env;
use std::path::PathBuf;

use world_core::{SessionId, TemplateId};

/// Settings the `world` binary needs before it can build a runtime.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Content directory with `templates.ron` and `world.toml`.
    pub content_dir: Option<PathBuf>,
    pub session_id: Option<SessionId>,
    pub start_cell: TemplateId,
    /// Falls back to the catalog's player template when unset.
    pub player_template: Option<TemplateId>,
    pub log_dir: Option<PathBuf>,
}

impl ClientConfig {
    pub const DEFAULT_START_CELL: &'static str = "CELL_A";

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `WORLD_CONTENT_DIR` - Content directory (default: bundled sample world)
    /// - `WORLD_SESSION_ID` - Session to open or resume (default: new session)
    /// - `WORLD_START_CELL` - Cell template the player starts in (default: CELL_A)
    /// - `WORLD_PLAYER_TEMPLATE` - Player entity template (default: catalog player)
    /// - `WORLD_LOG_DIR` - Log directory (default: platform cache directory)
    pub fn from_env() -> Self {
        Self {
            content_dir: env::var("WORLD_CONTENT_DIR").ok().map(PathBuf::from),
            session_id: env::var("WORLD_SESSION_ID").ok().map(SessionId::from),
            start_cell: env::var("WORLD_START_CELL")
                .map(TemplateId::from)
                .unwrap_or_else(|_| TemplateId::from(Self::DEFAULT_START_CELL)),
            player_template: env::var("WORLD_PLAYER_TEMPLATE").ok().map(TemplateId::from),
            log_dir: env::var("WORLD_LOG_DIR").ok().map(PathBuf::from),
        }
    }

    /// Platform log directory for the `world` binary.
    ///
    /// - macOS: `~/Library/Caches/world/logs`
    /// - Linux: `~/.cache/world/logs` (or `$XDG_CACHE_HOME/world/logs`)
    /// - Windows: `%LOCALAPPDATA%\world\logs`
    /// - Fallback: `/tmp/world/logs`
    pub fn log_dir(&self) -> PathBuf {
        if let Some(dir) = &self.log_dir {
            return dir.clone();
        }
        directories::ProjectDirs::from("", "", "world")
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("/tmp/world"))
            .join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(log_dir: Option<PathBuf>) -> ClientConfig {
        ClientConfig {
            content_dir: None,
            session_id: None,
            start_cell: TemplateId::from(ClientConfig::DEFAULT_START_CELL),
            player_template: None,
            log_dir,
        }
    }

    #[test]
    fn explicit_log_dir_wins() {
        let config = config(Some(PathBuf::from("/var/log/world")));
        assert_eq!(config.log_dir(), PathBuf::from("/var/log/world"));
    }

    #[test]
    fn platform_log_dir_ends_in_logs() {
        let config = config(None);
        assert!(config.log_dir().ends_with("logs"));
        assert_eq!(config.start_cell.as_str(), "CELL_A");
    }
}
