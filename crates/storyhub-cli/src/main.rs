//! storyhub - command line access to a storyhub account.
//!
//! Logs in against the storyhub backend, keeps the session between runs and
//! serves ads the way the web ad slot does.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storyhub_core::api::ads::DEFAULT_SLOT_LIMIT;
use storyhub_core::auth::{FileStorage, SessionStore};
use storyhub_core::{AdsService, ApiClient, AuthService, Config, RefreshMode};

#[derive(Parser)]
#[command(name = "storyhub", version, about = "Command line client for storyhub")]
struct Cli {
    /// Backend base URL (overrides config and STORYHUB_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Send the refresh credential as an HTTP-only cookie instead of in the body
    #[arg(long, global = true)]
    cookie_refresh: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and save the session
    Login {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Show the logged in user
    Whoami,
    /// Renew the access token now
    Refresh,
    /// Log out and revoke the refresh token
    Logout,
    /// Pick an ad the way an ad slot would
    Ads {
        /// Number of candidates to fetch
        #[arg(long, default_value_t = DEFAULT_SLOT_LIMIT)]
        limit: u32,
    },
    /// Delete an ad (superadmin accounts only)
    DeleteAd { id: String },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // RUST_LOG controls the level (e.g. RUST_LOG=storyhub_core=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load config")?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    if cli.cookie_refresh {
        config.refresh_mode = RefreshMode::Cookie;
    }

    let storage = FileStorage::new(config.data_dir()?).with_keychain();
    let session = SessionStore::with_storage(Arc::new(storage));
    if let Err(e) = session.restore() {
        warn!(error = %e, "Ignoring unreadable saved session");
    }

    let api = ApiClient::from_config(&config, session)?;
    info!(api = %config.api_base_url, mode = ?config.refresh_mode, "storyhub starting");

    match cli.command {
        Command::Login { username } => login(&api, &mut config, username).await,
        Command::Whoami => whoami(&api).await,
        Command::Refresh => refresh(&api).await,
        Command::Logout => {
            AuthService::new(api).logout().await;
            println!("Logged out");
            Ok(())
        }
        Command::Ads { limit } => show_ad(&api, limit).await,
        Command::DeleteAd { id } => delete_ad(&api, &id).await,
    }
}

async fn login(api: &ApiClient, config: &mut Config, username: Option<String>) -> Result<()> {
    let username = match username.or_else(|| config.last_username.clone()) {
        Some(username) => username,
        None => prompt("Username: ")?,
    };
    let password = rpassword::prompt_password(format!("Password for {}: ", username))
        .context("Failed to read password")?;

    let user = AuthService::new(api.clone())
        .login(&username, &password)
        .await?;

    config.last_username = Some(username.clone());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    match user {
        Some(user) => println!("Logged in as {}", user.username),
        None => println!("Logged in as {} (profile unavailable)", username),
    }
    Ok(())
}

async fn whoami(api: &ApiClient) -> Result<()> {
    if !AuthService::new(api.clone()).initialize_session().await {
        println!("Not logged in");
        return Ok(());
    }

    match api.session().user() {
        Some(user) => {
            println!("{}", user.username);
            if let Some(email) = user.email.as_deref() {
                println!("  email: {}", email);
            }
            if let Some(role) = user.role_name() {
                println!("  role:  {}", role);
            }
        }
        None => println!("Logged in"),
    }
    Ok(())
}

async fn refresh(api: &ApiClient) -> Result<()> {
    match api.refresh_access_token().await {
        Ok(_) => {
            println!("Access token renewed");
            Ok(())
        }
        Err(e) => {
            api.session().logout();
            Err(e).context("Session could not be renewed; please log in again")
        }
    }
}

async fn show_ad(api: &ApiClient, limit: u32) -> Result<()> {
    let ads = AdsService::new(api.clone());
    match ads.pick_slot_ad(limit).await {
        Some(ad) => {
            println!("{}", ad.display_name());
            if let Some(content) = ad.ad_content.as_deref() {
                println!("  {}", content);
            }
            println!("  -> {}", ad.destination_url);
            if let Some(end) = ad.end_at {
                println!("  until {}", end.format("%Y-%m-%d %H:%M UTC"));
            }
        }
        None => println!("No ad available"),
    }
    Ok(())
}

async fn delete_ad(api: &ApiClient, id: &str) -> Result<()> {
    if !AuthService::new(api.clone()).initialize_session().await {
        anyhow::bail!("Not logged in");
    }
    let is_admin = api.session().user().is_some_and(|user| user.is_admin());
    if !is_admin {
        anyhow::bail!("Deleting ads needs a superadmin account");
    }

    AdsService::new(api.clone()).admin_delete_ad(id).await?;
    println!("Deleted ad {}", id);
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_string();
    if input.is_empty() {
        anyhow::bail!("No username given");
    }
    Ok(input)
}
