//! Command-line interface over the API clients.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::debug;

use crate::api::{ApiResponse, CallArgs, ClassicClient, ClientConfig, ProClient};
use crate::auth::Credentials;
use crate::config::{Config, ServerProfile};

#[derive(Parser)]
#[command(name = "jamf-cli", about = "Talk to the Jamf Pro classic and pro APIs", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage saved Jamf server profiles
    Server {
        #[command(subcommand)]
        command: ServerCommands,
    },
    /// List the operations synthesized from the server's schema
    Ops {
        #[arg(long, value_enum, default_value_t = ApiKind::Pro)]
        api: ApiKind,
    },
    /// Call a synthesized operation by name
    Call {
        name: String,
        /// Path parameter, NAME=VALUE, repeatable
        #[arg(long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,
        /// Query parameter, NAME=VALUE, repeatable
        #[arg(long = "query", value_name = "NAME=VALUE")]
        query: Vec<String>,
        /// JSON request body
        #[arg(long)]
        json: Option<String>,
        /// XML request body
        #[arg(long, conflicts_with = "json")]
        xml: Option<String>,
        #[arg(long, value_enum, default_value_t = ApiKind::Pro)]
        api: ApiKind,
    },
    /// Issue a raw GET against an API path
    Get {
        /// Path segments, e.g. `computers id 100`
        segments: Vec<String>,
        #[arg(long = "query", value_name = "NAME=VALUE")]
        query: Vec<String>,
        #[arg(long, value_enum, default_value_t = ApiKind::Pro)]
        api: ApiKind,
    },
}

#[derive(Subcommand)]
pub enum ServerCommands {
    /// Save a server profile
    Add {
        name: String,
        host: String,
        username: String,
        password: String,
    },
    /// List saved profiles
    List,
    /// Select the profile used by other commands
    Select { name: String },
    /// Remove a saved profile
    Remove { name: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ApiKind {
    Classic,
    Pro,
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Server { command } => server_command(command),
        Commands::Ops { api } => ops_command(api).await,
        Commands::Call {
            name,
            params,
            query,
            json,
            xml,
            api,
        } => call_command(api, &name, params, query, json, xml).await,
        Commands::Get {
            segments,
            query,
            api,
        } => get_command(api, segments, query).await,
    }
}

fn server_command(command: ServerCommands) -> Result<()> {
    let mut config = Config::load()?;
    match command {
        ServerCommands::Add {
            name,
            host,
            username,
            password,
        } => {
            let credentials = Credentials::from_command_line(host, username, password);
            config.add_server(
                name.clone(),
                ServerProfile {
                    host: credentials.host,
                    username: credentials.username,
                    password: credentials.password,
                },
            )?;
            println!("Saved server profile '{name}'");
        }
        ServerCommands::List => {
            let current = config.current_server.as_deref();
            let mut names = config.list_servers();
            names.sort();
            for name in names {
                let marker = if current == Some(name.as_str()) { "*" } else { " " };
                println!("{marker} {name}");
            }
        }
        ServerCommands::Select { name } => {
            config.set_current_server(name.clone())?;
            println!("Current server is now '{name}'");
        }
        ServerCommands::Remove { name } => {
            config.remove_server(&name)?;
            println!("Removed server profile '{name}'");
        }
    }
    Ok(())
}

async fn ops_command(api: ApiKind) -> Result<()> {
    let config = resolve_config()?;
    let names = match api {
        ApiKind::Classic => ClassicClient::connect(config).await?.operation_names(),
        ApiKind::Pro => ProClient::connect(config).await?.operation_names(),
    };
    for name in names {
        println!("{name}");
    }
    Ok(())
}

async fn call_command(
    api: ApiKind,
    name: &str,
    params: Vec<String>,
    query: Vec<String>,
    json: Option<String>,
    xml: Option<String>,
) -> Result<()> {
    let mut args = CallArgs::new();
    for pair in &params {
        let (key, value) = parse_pair(pair)?;
        args = args.path(key, value);
    }
    for pair in &query {
        let (key, value) = parse_pair(pair)?;
        args = args.query(key, value);
    }
    if let Some(text) = json {
        let body: serde_json::Value =
            serde_json::from_str(&text).context("Invalid JSON request body")?;
        args = args.json(body);
    } else if let Some(text) = xml {
        args = args.xml(text);
    }

    let config = resolve_config()?;
    let envelope = match api {
        ApiKind::Classic => ClassicClient::connect(config).await?.invoke(name, args).await?,
        ApiKind::Pro => ProClient::connect(config).await?.invoke(name, args).await?,
    };
    print_envelope(&envelope)
}

async fn get_command(api: ApiKind, segments: Vec<String>, query: Vec<String>) -> Result<()> {
    let segment_refs: Vec<&str> = segments.iter().map(String::as_str).collect();
    let pairs: Vec<(String, String)> = query
        .iter()
        .map(|pair| parse_pair(pair))
        .collect::<Result<_>>()?;
    let pair_refs: Vec<(&str, &str)> = pairs
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();

    let config = resolve_config()?;
    let envelope = match api {
        ApiKind::Classic => {
            ClassicClient::connect(config)
                .await?
                .get(&segment_refs, &pair_refs)
                .await
        }
        ApiKind::Pro => {
            ProClient::connect(config)
                .await?
                .get(&segment_refs, &pair_refs)
                .await
        }
    };
    print_envelope(&envelope)
}

/// Connection settings from the selected profile, falling back to the
/// JAMF_* environment variables.
fn resolve_config() -> Result<ClientConfig> {
    if let Ok(config) = Config::load() {
        if let Some(client_config) = config.client_config() {
            debug!("using server profile {:?}", config.current_server);
            return Ok(client_config);
        }
    }
    let credentials = Credentials::from_env()?;
    Ok(ClientConfig::new(
        credentials.host,
        credentials.username,
        credentials.password,
    ))
}

fn parse_pair(pair: &str) -> Result<(String, String)> {
    let (key, value) = pair
        .split_once('=')
        .with_context(|| format!("Expected NAME=VALUE, got '{pair}'"))?;
    Ok((key.to_string(), value.to_string()))
}

fn print_envelope(envelope: &ApiResponse) -> Result<()> {
    if let Some(data) = envelope.data() {
        println!("{}", serde_json::to_string_pretty(data)?);
    } else if let Some(raw) = envelope.raw_body() {
        println!("{raw}");
    }
    if !envelope.success() {
        anyhow::bail!(
            "{} (HTTP {})",
            envelope.error().unwrap_or("request failed"),
            envelope.http_code()
        );
    }
    Ok(())
}
