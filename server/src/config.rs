use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// RecipeShare API server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "recipeshare-server", version, about = "RecipeShare API server")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "RECIPESHARE_PORT", default_value = "5000")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "RECIPESHARE_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./recipeshare.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "RECIPESHARE_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Data directory for persistent state (DB, JWT key)
    #[arg(long, env = "RECIPESHARE_DATA_DIR", default_value = "./data")]
    pub data_dir: String,

    /// Story retention configuration (loaded from [stories] section in TOML)
    #[arg(skip)]
    #[serde(default)]
    pub stories: Option<StoriesConfig>,
}

/// Configuration for ephemeral story cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoriesConfig {
    /// Interval in seconds between expired-story cleanup runs (default: 3600 = 1 hour)
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

impl Default for StoriesConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: 3600,
        }
    }
}

fn default_cleanup_interval() -> u64 {
    3600
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            bind_address: "0.0.0.0".to_string(),
            config: "./recipeshare.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            stories: None,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (RECIPESHARE_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("RECIPESHARE_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# RecipeShare Server Configuration
# Place this file at ./recipeshare.toml or specify with --config <path>
# All settings can be overridden via environment variables (RECIPESHARE_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 5000)
# port = 5000

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for SQLite database and JWT signing key
# data_dir = "./data"

# ---- Ephemeral Stories ----
# [stories]

# Interval in seconds between expired-story cleanup runs (default: 3600 = 1 hour)
# cleanup_interval_secs = 3600
"#
    .to_string()
}
