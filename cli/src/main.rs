use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use storefront::config::{ConfigError, StorefrontConfig, normalize_base_url};
use storefront::navigation::{Navigator, Route, Router, require_session, watch_session_expiry};
use storefront::services::auth::AuthService;
use storefront::services::clients::ClientService;
use storefront::services::products::ProductService;
use storefront::storage::{FileStore, StorageError};
use storefront::transport::{ReqwestTransport, TransportError};
use storefront::{ApiError, RequestBody, RequestGateway, RequestOptions, SessionStore};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),
    #[error("invalid header `{0}`; expected NAME:VALUE")]
    InvalidHeader(String),
    #[error("not logged in; run `storefront login`")]
    NotLoggedIn,
    #[error("watcher task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Parser, Debug)]
#[command(name = "storefront", about = "Storefront API client")]
struct Cli {
    /// API origin plus path prefix; overrides `STOREFRONT_API_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    /// Tenant sent as `X-Tenant`; overrides `STOREFRONT_TENANT_ID`.
    #[arg(long)]
    tenant: Option<String>,

    /// Directory holding the persisted session; overrides `STOREFRONT_STATE_DIR`.
    #[arg(long)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Drop the persisted session.
    Logout,
    /// Show the locally stored session.
    Whoami,
    /// Fetch the current user from the server.
    Me,
    /// List clients (dashboard).
    Clients,
    /// Show one product.
    Product { product_id: String },
    /// Send a raw request through the gateway.
    Request {
        method: String,
        endpoint: String,
        #[arg(long, help = "JSON request body")]
        data: Option<String>,
        #[arg(long = "header", help = "Extra header as NAME:VALUE; repeatable")]
        headers: Vec<String>,
    },
}

/// Prints the login hint when a session-bound command is bounced to login.
struct TerminalNavigator {
    router: Router,
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, route: Route) -> bool {
        let moved = self.router.navigate(route.clone());
        if moved && route == Route::Login {
            eprintln!("session expired or missing; run `storefront login` to sign in");
        }
        moved
    }
}

struct App {
    session: Arc<SessionStore>,
    gateway: Arc<RequestGateway>,
    navigator: Arc<TerminalNavigator>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("ignoring unreadable .env: {e}");
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    tracing::debug!(base_url = %config.api_base_url, tenant = %config.tenant_id, "config resolved");

    let session = Arc::new(SessionStore::new(Arc::new(FileStore::new(config.storage_path()))));
    session.load();

    let transport = Arc::new(ReqwestTransport::new(config.timeouts)?);
    let gateway = Arc::new(RequestGateway::from_config(&config, session.clone(), transport)?);
    let navigator = Arc::new(TerminalNavigator { router: Router::new(initial_route(&cli.command)) });
    let watcher = watch_session_expiry(gateway.subscribe(), navigator.clone());

    let app = App { session, gateway, navigator };
    let result = run(&app, cli.command).await;

    drop(app);
    watcher.await?;
    result
}

fn resolve_config(cli: &Cli) -> Result<StorefrontConfig, CliError> {
    let mut config = StorefrontConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config.api_base_url = normalize_base_url(base_url)?;
    }
    if let Some(tenant) = &cli.tenant {
        config.tenant_id.clone_from(tenant);
    }
    if let Some(state_dir) = &cli.state_dir {
        config.state_dir.clone_from(state_dir);
    }
    Ok(config)
}

fn initial_route(command: &Command) -> Route {
    match command {
        Command::Login { .. } => Route::Login,
        Command::Product { product_id } => Route::Product(product_id.clone()),
        _ => Route::Dashboard,
    }
}

async fn run(app: &App, command: Command) -> Result<(), CliError> {
    match command {
        Command::Login { email, password } => {
            let user = AuthService::new(app.gateway.clone())
                .login(&email, &password)
                .await?;
            app.navigator.navigate(Route::Dashboard);
            print_json(&user.into_value())
        }
        Command::Logout => {
            AuthService::new(app.gateway.clone()).logout()?;
            println!("logged out");
            Ok(())
        }
        Command::Whoami => {
            let user = app.session.user();
            print_json(&json!({
                "authenticated": app.session.is_authenticated(),
                "user": user.map(storefront::User::into_value),
            }))
        }
        Command::Me => {
            require_logged_in(app)?;
            let user = AuthService::new(app.gateway.clone()).current_user().await?;
            print_json(&user.map_or(Value::Null, storefront::User::into_value))
        }
        Command::Clients => {
            require_logged_in(app)?;
            let clients = ClientService::new(app.gateway.clone()).list().await?;
            print_json(&serde_json::to_value(clients)?)
        }
        Command::Product { product_id } => {
            let product = ProductService::new(app.gateway.clone())
                .get(&product_id)
                .await?;
            let mut rendered = product.as_value();
            if let Value::Object(map) = &mut rendered {
                map.insert("discountPercentage".to_owned(), json!(product.discount_percentage()));
            }
            print_json(&rendered)
        }
        Command::Request { method, endpoint, data, headers } => {
            let options = build_request_options(&method, data.as_deref(), &headers)?;
            let value = app.gateway.request(&endpoint, &options).await?;
            print_json(&value)
        }
    }
}

fn require_logged_in(app: &App) -> Result<(), CliError> {
    if require_session(&app.session, app.navigator.as_ref()) {
        Ok(())
    } else {
        Err(CliError::NotLoggedIn)
    }
}

fn build_request_options(method: &str, data: Option<&str>, headers: &[String]) -> Result<RequestOptions, CliError> {
    let method = reqwest::Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| CliError::InvalidMethod(method.to_owned()))?;
    let mut options = RequestOptions::default().with_method(method);
    for raw in headers {
        let (name, value) = parse_header(raw)?;
        options = options.with_header(name, value);
    }
    if let Some(data) = data {
        options = options.with_body(RequestBody::Json(serde_json::from_str(data)?));
    }
    Ok(options)
}

fn parse_header(raw: &str) -> Result<(String, String), CliError> {
    let Some((name, value)) = raw.split_once(':') else {
        return Err(CliError::InvalidHeader(raw.to_owned()));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::InvalidHeader(raw.to_owned()));
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
