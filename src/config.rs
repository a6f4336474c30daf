use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

/// Where the store lives and how its connection is tuned.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database file. `:memory:` opens a private in-memory database.
    pub database_path: PathBuf,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("demo.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    pub const IN_MEMORY: &'static str = ":memory:";

    /// Create a config for the given database file with default tuning.
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Self::IN_MEMORY)
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == Self::IN_MEMORY
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Loads the configuration used by the demo binary.
    ///
    /// Sources, later ones winning: built-in defaults, an optional
    /// `bakery.toml` in the working directory, then `BAKERY_*` environment
    /// variables (a `.env` file is read first if present).
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_from(
            config::File::with_name("bakery").required(false),
            config::Environment::with_prefix("BAKERY"),
        )
    }

    pub(crate) fn load_from(
        file: config::File<config::FileSourceFile, config::FileFormat>,
        env: config::Environment,
    ) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(file)
            .add_source(env.try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize::<StoreConfig>()?)
    }
}
