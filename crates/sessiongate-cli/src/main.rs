//! sessiongate - drive the client session from a terminal.
//!
//! Durable sessions are written under the data directory; sessions saved
//! without "remember" live only for the current invocation, the way
//! tab-scoped storage dies with its tab.

mod config;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Method;
use sessiongate_core::auth::Clock;
use sessiongate_core::{
    ApiClient, FileStorage, NavigationGuard, RequestInit, RouteTable, Session, SessionStore,
};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::{CliConfig, APP_NAME};

type Client = ApiClient<FileStorage>;

#[derive(Parser)]
#[command(name = "sessiongate", version, about = "Inspect and use the stored client session")]
struct Cli {
    /// Write logs to a daily file in this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with email and password (prompted)
    Login {
        #[arg(long)]
        email: Option<String>,
        /// Keep the session for this invocation only
        #[arg(long)]
        no_remember: bool,
    },
    /// Create an account and log in
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Save a session from an existing token
    Token {
        token: String,
        #[arg(long)]
        token_type: Option<String>,
        /// Lifetime in seconds from now
        #[arg(long)]
        expires_in: Option<i64>,
        /// The server also issued a session cookie
        #[arg(long)]
        cookie: bool,
        #[arg(long)]
        no_remember: bool,
    },
    /// Show the stored session and whether it is still valid
    Status,
    /// Remove the stored session
    Logout,
    /// Run a location through the route table and navigation guard
    Navigate { location: String },
    /// Send an authenticated request and print the response
    Fetch {
        path: String,
        #[arg(long, default_value = "GET")]
        method: String,
        /// Request body, sent as JSON
        #[arg(long)]
        data: Option<String>,
    },
    /// Show the user the server associates with the session
    Me,
    /// Show or set the API base URL
    ApiBase { url: Option<String> },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, format!("{}.log", APP_NAME));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

/// Absolute expiry `secs` seconds after `now_ms`.
fn expiry_from_now(now_ms: i64, secs: i64) -> Result<i64> {
    secs.checked_mul(1000)
        .and_then(|ms| now_ms.checked_add(ms))
        .ok_or_else(|| anyhow::anyhow!("--expires-in {} is out of range", secs))
}

fn build_client(config: &CliConfig) -> Result<Client> {
    let client_config = config.client_config();
    let storage = FileStorage::new(config.data_dir()?);
    let store = SessionStore::new(storage);
    ApiClient::new(client_config, Arc::new(store)).context("Failed to create API client")
}

fn print_session(client: &Client) {
    let store = client.store();
    let Some(stored) = store.load_scoped() else {
        println!("No session");
        return;
    };

    let session = &stored.session;
    println!("Scope:          {}", stored.scope);
    if let Some(user) = &session.user {
        let id = user.id.as_ref().map(ToString::to_string).unwrap_or_default();
        println!(
            "User:           {} {} {}",
            id,
            user.name.as_deref().unwrap_or("-"),
            user.email.as_deref().unwrap_or("-")
        );
    }
    println!("Token:          {}", if session.token().is_some() { "yes" } else { "no" });
    println!("Session cookie: {}", session.has_session_cookie());
    match session.millis_until_expiry(store.clock().now_millis()) {
        Some(ms) => println!("Expires in:     {}s", ms / 1000),
        None => println!("Expires in:     never"),
    }
    // Evicts the session if it has expired.
    println!("Authenticated:  {}", store.is_authenticated());
}

async fn run(command: Command, mut config: CliConfig) -> Result<()> {
    let client = build_client(&config)?;

    match command {
        Command::Login { email, no_remember } => {
            let email = email
                .or_else(|| config.last_email.clone())
                .ok_or_else(|| anyhow::anyhow!("No email given and none remembered"))?;
            let password = rpassword::prompt_password(format!("Password for {}: ", email))
                .context("Failed to read password")?;
            client
                .login(&email, &password, !no_remember)
                .await
                .context("Login failed")?;
            config.last_email = Some(email);
            config.save()?;
            print_session(&client);
        }
        Command::Signup { name, email } => {
            let password = rpassword::prompt_password("Choose a password: ")
                .context("Failed to read password")?;
            client
                .signup(&name, &email, &password)
                .await
                .context("Signup failed")?;
            config.last_email = Some(email);
            config.save()?;
            print_session(&client);
        }
        Command::Token {
            token,
            token_type,
            expires_in,
            cookie,
            no_remember,
        } => {
            let now = client.store().clock().now_millis();
            let expires_at = expires_in
                .map(|secs| expiry_from_now(now, secs))
                .transpose()?;
            let session = Session {
                access_token: Some(token),
                token_type,
                expires_at,
                user: None,
                session_cookie: cookie.then_some(true),
            };
            client
                .store()
                .save(&session, !no_remember)
                .context("Failed to save session")?;
            print_session(&client);
        }
        Command::Status => print_session(&client),
        Command::Logout => {
            client.logout();
            println!("Logged out");
        }
        Command::Navigate { location } => {
            let routes = RouteTable::standard();
            let guard = NavigationGuard::new(client.store(), &routes);
            let navigation = guard.navigate(&location)?;
            for hop in &navigation.redirects {
                println!("-> {}", hop);
            }
            let name = navigation.target.name.as_deref().unwrap_or("-");
            println!("{} ({})", navigation.target.full_path, name);
        }
        Command::Fetch { path, method, data } => {
            let method: Method = method
                .to_uppercase()
                .parse()
                .with_context(|| format!("Invalid method {}", method))?;
            let mut init = RequestInit::new(method);
            if let Some(data) = data {
                let value: serde_json::Value =
                    serde_json::from_str(&data).context("Request body is not valid JSON")?;
                init = init.json(&value)?;
            }
            let response = client.fetch(&path, init).await?;
            println!("{}", response.status());
            println!("{}", response.text().await?);
        }
        Command::Me => {
            let user = client.current_user().await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Command::ApiBase { url } => match url {
            Some(url) => {
                config.api_base = Some(url);
                config.save()?;
                println!("{}", config.client_config().api_base());
            }
            None => println!("{}", config.client_config().api_base()),
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_ref());
    info!("sessiongate starting");

    let config = CliConfig::load()?;
    run(cli.command, config).await
}
