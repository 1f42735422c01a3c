//! Runtime configuration and environment overrides.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use world_core::WorldConfig;

/// Configuration shared by every runtime service.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub world: WorldConfig,
    /// SQLite database file. `None` selects a private in-memory database.
    pub db_path: Option<PathBuf>,
    /// Maximum effective states kept in memory; 0 disables caching.
    pub state_cache_capacity: usize,
    /// Maximum effect definitions kept in memory; 0 disables caching.
    pub effect_cache_capacity: usize,
    /// How long a writer waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Seed for combination rolls. `None` draws from OS entropy.
    pub rng_seed: Option<u64>,
}

impl RuntimeConfig {
    pub const DEFAULT_STATE_CACHE_CAPACITY: usize = 1024;
    pub const DEFAULT_EFFECT_CACHE_CAPACITY: usize = 256;
    pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

    pub fn new(world: WorldConfig) -> Self {
        Self {
            world,
            db_path: None,
            state_cache_capacity: Self::DEFAULT_STATE_CACHE_CAPACITY,
            effect_cache_capacity: Self::DEFAULT_EFFECT_CACHE_CAPACITY,
            busy_timeout: Duration::from_millis(Self::DEFAULT_BUSY_TIMEOUT_MS),
            rng_seed: None,
        }
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `WORLD_DB_PATH` - SQLite file (default: in-memory)
    /// - `WORLD_STATE_CACHE_CAPACITY` - State cache entries (default: 1024)
    /// - `WORLD_EFFECT_CACHE_CAPACITY` - Effect cache entries (default: 256)
    /// - `WORLD_BUSY_TIMEOUT_MS` - Lock wait in milliseconds (default: 5000)
    /// - `WORLD_RNG_SEED` - Fixed seed for combination rolls (default: entropy)
    pub fn from_env(world: WorldConfig) -> Self {
        let mut config = Self::new(world);

        config.db_path = env::var("WORLD_DB_PATH").ok().map(PathBuf::from);

        if let Some(capacity) = read_env::<usize>("WORLD_STATE_CACHE_CAPACITY") {
            config.state_cache_capacity = capacity;
        }

        if let Some(capacity) = read_env::<usize>("WORLD_EFFECT_CACHE_CAPACITY") {
            config.effect_cache_capacity = capacity;
        }

        if let Some(millis) = read_env::<u64>("WORLD_BUSY_TIMEOUT_MS") {
            config.busy_timeout = Duration::from_millis(millis);
        }

        config.rng_seed = read_env::<u64>("WORLD_RNG_SEED");

        config
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
