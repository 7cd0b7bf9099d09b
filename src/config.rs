use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    /// Organization that owns the datasources served by this instance.
    #[serde(default = "default_org_id")]
    pub org_id: i64,
}

fn default_org_id() -> i64 {
    1
}

/// Settings for clients that dispatch queries to datasources.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Line limit for targets that don't set max_lines.
    #[serde(default = "default_max_lines")]
    pub max_lines: u32,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_lines() -> u32 {
    1000
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_lines: default_max_lines(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.org_id > 0,
            "database.org_id must be > 0, got {}",
            self.database.org_id
        );
        anyhow::ensure!(
            self.query.timeout_secs > 0,
            "query.timeout_secs must be > 0, got {}",
            self.query.timeout_secs
        );
        anyhow::ensure!(
            self.query.max_lines > 0,
            "query.max_lines must be > 0, got {}",
            self.query.max_lines
        );
        Ok(())
    }
}
