use anyhow::Result;
use log::info;
use std::path::Path;

#[derive(Debug)]
pub struct Credentials {
    pub host: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn from_env() -> Result<Credentials> {
        info!("Importing from environment variables");

        // Pick up a .env file if one is present
        dotenvy::dotenv().ok();

        let host = std::env::var("JAMF_HOST")
            .map_err(|_| anyhow::anyhow!("JAMF_HOST environment variable not set"))?;
        let username = std::env::var("JAMF_USERNAME")
            .map_err(|_| anyhow::anyhow!("JAMF_USERNAME environment variable not set"))?;
        let password = std::env::var("JAMF_PASSWORD")
            .map_err(|_| anyhow::anyhow!("JAMF_PASSWORD environment variable not set"))?;

        Ok(Credentials {
            host,
            username,
            password,
        })
    }

    pub fn from_env_file(path: &str) -> Result<Credentials> {
        info!("Importing from .env file: {}", path);

        if !Path::new(path).exists() {
            anyhow::bail!("Environment file not found: {}", path);
        }

        dotenvy::from_path(path)
            .map_err(|e| anyhow::anyhow!("Failed to load .env file '{}': {}", path, e))?;

        let host = std::env::var("JAMF_HOST")
            .map_err(|_| anyhow::anyhow!("JAMF_HOST not found in .env file: {}", path))?;
        let username = std::env::var("JAMF_USERNAME")
            .map_err(|_| anyhow::anyhow!("JAMF_USERNAME not found in .env file: {}", path))?;
        let password = std::env::var("JAMF_PASSWORD")
            .map_err(|_| anyhow::anyhow!("JAMF_PASSWORD not found in .env file: {}", path))?;

        Ok(Credentials {
            host,
            username,
            password,
        })
    }

    pub fn from_command_line(host: String, username: String, password: String) -> Credentials {
        info!("Using command line parameters");

        Credentials {
            host,
            username,
            password,
        }
    }
}
