//! Configuration for the fedblock binary

use fedblock_types::{NewPolicy, PolicyRecord};
use serde::{Deserialize, Serialize};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FedblockConfig {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Policies inserted into the memory backend at start-up
    #[serde(default)]
    pub seed: Vec<SeedPolicy>,
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage, lost on exit
    #[default]
    Memory,

    /// PostgreSQL storage
    Postgres {
        /// Connection URL
        url: String,

        /// Maximum connections in pool
        #[serde(default = "default_pool_size")]
        max_connections: u32,

        /// Connection timeout in seconds
        #[serde(default = "default_connection_timeout")]
        connect_timeout_secs: u64,
    },
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Policy declared in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedPolicy {
    pub order: i64,

    pub kind: String,

    #[serde(default)]
    pub subject: Option<String>,

    /// Owning local actor; instance-wide when absent
    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl SeedPolicy {
    /// Validate into a persistable record
    pub fn to_record(&self) -> fedblock_types::Result<PolicyRecord> {
        let mut policy = match &self.owner {
            Some(owner) => NewPolicy::for_actor(owner.clone(), self.order, self.kind.clone()),
            None => NewPolicy::instance(self.order, self.kind.clone()),
        };
        if let Some(subject) = &self.subject {
            policy = policy.with_subject(subject.clone());
        }
        if let Some(description) = &self.description {
            policy = policy.with_description(description.clone());
        }
        policy.build()
    }
}

// Default value helpers
fn default_pool_size() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl FedblockConfig {
    /// Load configuration from defaults, an optional file, then the environment
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&FedblockConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // FEDBLOCK_LOGGING__LEVEL=debug
        builder = builder.add_source(
            config::Environment::with_prefix("FEDBLOCK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
