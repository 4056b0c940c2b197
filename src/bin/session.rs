use clap::{Parser, Subcommand};
use contenthub::client::guard::{self, GuardDecision};
use contenthub::client::{
    ApiClient, FileStore, LoginState, Navigator, SessionBootstrap, SessionManager,
};
use contenthub::{config::Config, logging};
use std::path::PathBuf;
use std::sync::Arc;

/// Content hub session client
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "CONTENTHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL (overrides configuration)
    #[arg(long)]
    backend_url: Option<String>,

    /// Session file (overrides configuration)
    #[arg(long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the URL that starts the provider login
    LoginUrl,
    /// Complete a login from the provider redirect query, e.g. "code=abc&state=xyz"
    Callback { query: String },
    /// Show the stored session
    Status,
    /// Clear the stored session
    Logout,
    /// Check whether a page may render
    Guard { path: String },
    /// Fetch the current user from the backend
    Me,
}

struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, path: &str) {
        println!("-> {}", path);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    logging::init(&config.logging);

    if let Some(backend_url) = args.backend_url {
        config.client.backend_url = Some(backend_url);
    }
    let store_path = args.store.unwrap_or(config.client.store_path.clone());
    let session = SessionManager::new(Arc::new(FileStore::new(store_path)));
    let http_client = reqwest::Client::new();

    match args.command {
        Command::LoginUrl => {
            let backend = config
                .client
                .backend_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("Backend URL not configured"))?;
            println!("{}", guard::login_url(backend, &config.client.provider));
        }
        Command::Callback { query } => {
            let mut bootstrap = SessionBootstrap::new(
                config.client.backend_url.clone(),
                &config.client.provider,
                session,
                http_client,
            );
            let outcome = bootstrap.handle_redirect(&query).await?;
            println!("{}", outcome.message);

            outcome.redirect.spawn(Arc::new(PrintNavigator)).await?;
            if outcome.state == LoginState::Error {
                std::process::exit(1);
            }
        }
        Command::Status => match session.get_user() {
            Some(user) if session.is_authenticated() => {
                println!(
                    "authenticated as {} <{}>",
                    user.username.as_deref().unwrap_or("-"),
                    user.email.as_deref().unwrap_or("-")
                );
            }
            _ if session.is_authenticated() => println!("authenticated"),
            _ => println!("anonymous"),
        },
        Command::Logout => {
            let route = session.logout()?;
            PrintNavigator.navigate(route);
        }
        Command::Guard { path } => match guard::check(&path, &session) {
            GuardDecision::Allow => println!("allow"),
            GuardDecision::Redirect(route) => PrintNavigator.navigate(route),
        },
        Command::Me => {
            let backend = config
                .client
                .backend_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("Backend URL not configured"))?;
            let api = ApiClient::new(backend, session, http_client);
            let user: serde_json::Value = api.get_json("/api/users/me").await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
    }

    Ok(())
}
