use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::api::{ClientConfig, constants};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerProfile {
    pub host: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    pub current_server: Option<String>,
    pub servers: HashMap<String, ServerProfile>,
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
}

fn default_timeout_seconds() -> u64 {
    constants::DEFAULT_TIMEOUT_SECS
}

fn default_verify_ssl() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            verify_ssl: default_verify_ssl(),
        }
    }
}

impl Config {
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            // Use XDG config directory on Linux
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join("jamf-cli")
        } else {
            // Use home directory with dot prefix on Windows/Mac
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(".jamf-cli")
        };

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;
            info!("Created config directory: {:?}", config_dir);
        }

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        debug!("Loading config from: {:?}", config_path);

        if !config_path.exists() {
            info!("Config file doesn't exist, using defaults");
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        debug!("Loaded config with {} servers", config.servers.len());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        debug!("Saving config to: {:?}", config_path);

        let config_content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, config_content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        info!("Config saved successfully");
        Ok(())
    }

    pub fn add_server(&mut self, name: String, profile: ServerProfile) -> Result<()> {
        info!("Adding server profile: {}", name);
        self.servers.insert(name.clone(), profile);

        // First profile becomes the current one
        if self.current_server.is_none() {
            self.current_server = Some(name.clone());
            info!("Set {} as current server", name);
        }

        self.save()
    }

    pub fn get_current_profile(&self) -> Option<&ServerProfile> {
        let current = self.current_server.as_ref()?;
        self.servers.get(current)
    }

    pub fn set_current_server(&mut self, name: String) -> Result<()> {
        if !self.servers.contains_key(&name) {
            anyhow::bail!("Server '{}' not found", name);
        }

        info!("Setting current server to: {}", name);
        self.current_server = Some(name);
        self.save()
    }

    pub fn list_servers(&self) -> Vec<&String> {
        self.servers.keys().collect()
    }

    pub fn remove_server(&mut self, name: &str) -> Result<()> {
        if !self.servers.contains_key(name) {
            anyhow::bail!("Server '{}' not found", name);
        }

        info!("Removing server profile: {}", name);
        self.servers.remove(name);

        if self.current_server.as_deref() == Some(name) {
            warn!("Removed current server, clearing current selection");
            self.current_server = None;
        }

        self.save()
    }

    /// Connection settings for the currently selected server, if any.
    pub fn client_config(&self) -> Option<ClientConfig> {
        let profile = self.get_current_profile()?;
        let mut config = ClientConfig::new(&profile.host, &profile.username, &profile.password);
        config.timeout_secs = self.settings.timeout_seconds;
        config.verify_tls = self.settings.verify_ssl;
        Some(config)
    }
}
