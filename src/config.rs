use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use serde_yaml;
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "launchpad")]
#[command(about = "Runs the launchpad product voting service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".launchpad")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    #[serde(default = "default_database")]
    database: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    pub turso_url: Option<String>,
    #[serde(default)]
    pub turso_auth_token: Option<String>,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_seconds: u64,
}

fn default_database() -> String {
    "launchpad.db".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_sync_interval() -> u64 {
    60
}

fn default_token_ttl_hours() -> i64 {
    168
}

impl Default for App {
    fn default() -> Self {
        App {
            database: default_database(),
            port: default_port(),
            turso_url: None,
            turso_auth_token: None,
            sync_interval_seconds: default_sync_interval(),
        }
    }
}

impl App {
    pub fn get_db(&self) -> &str {
        &self.database
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Auth {
    pub secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub app: App,
    pub auth: Auth,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Builds the config purely from environment variables, for deployments
    /// that ship no config file.
    pub fn from_env() -> Result<Self> {
        let mut app = App::default();
        if let Ok(database) = env::var("LAUNCHPAD_DATABASE") {
            app.database = database;
        }
        if let Ok(port) = env::var("LAUNCHPAD_PORT") {
            app.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid LAUNCHPAD_PORT {port:?}: {e}"))?;
        }
        app.turso_url = env::var("TURSO_DATABASE_URL").ok().filter(|s| !s.is_empty());
        app.turso_auth_token = env::var("TURSO_AUTH_TOKEN").ok().filter(|s| !s.is_empty());

        let token_ttl_hours = match env::var("TOKEN_TTL_HOURS") {
            Ok(hours) => hours
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid TOKEN_TTL_HOURS {hours:?}: {e}"))?,
            Err(_) => default_token_ttl_hours(),
        };

        let cfg = Config {
            app,
            auth: Auth {
                secret: env::var("ACCESS_TOKEN_SECRET").unwrap_or_default(),
                token_ttl_hours,
            },
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.auth.secret.trim().is_empty() {
            anyhow::bail!("auth.secret (ACCESS_TOKEN_SECRET) must not be empty");
        }
        if self.auth.token_ttl_hours <= 0 {
            anyhow::bail!("auth.token_ttl_hours must be positive");
        }
        Ok(())
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path)?;
        let yaml_with_env = Config::substitute_env_vars(&yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            if let Some(end) = result[actual_start..].find("}") {
                let var_name = &result[actual_start + 2..actual_start + end];

                // ${VAR:-default}
                let env_value = if let Some(default_start) = var_name.find(":-") {
                    let actual_var = &var_name[..default_start];
                    let default_val = &var_name[default_start + 2..];
                    env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
                } else {
                    env::var(var_name).unwrap_or_else(|_| {
                        tracing::warn!(var = var_name, "environment variable not found");
                        String::new()
                    })
                };

                result.replace_range(actual_start..actual_start + end + 1, &env_value);
                offset = actual_start + env_value.len();
            } else {
                break;
            }
        }

        Ok(result)
    }
}
