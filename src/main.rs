use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use flecto::auth::PasswordManager;
use flecto::config::Config;
use flecto::error::Error;
use flecto::server::{AppState, create_router};
use flecto::service::{NewUserRequest, RoleService, UserService};
use flecto::store::{Ctx, SqliteStore};
use flecto::types::{AdminPermission, ResourcePermission, Scope, SubjectPermissions};

const ADMIN_ROLE: &str = "admin";

#[derive(Parser)]
#[command(name = "flecto")]
#[command(about = "Redirect and page management server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Path to a TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Create the schema and an administrator account
    Init {
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,

        /// Path to a TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn open_store(config: &Config) -> anyhow::Result<Arc<SqliteStore>> {
    let store = SqliteStore::open(&config.db)
        .with_context(|| format!("failed to open database at {}", config.db.path.display()))?;
    store.initialize()?;
    Ok(Arc::new(store))
}

fn run_init(config: &Config, username: &str, password: &str) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let ctx = Ctx::new();
    let users = UserService::new(store.clone(), PasswordManager::new());
    let roles = RoleService::new(store);

    match roles.get(&ctx, ADMIN_ROLE) {
        Ok(_) => info!("Role '{ADMIN_ROLE}' already exists"),
        Err(Error::RoleNotFound(_)) => {
            let everything = SubjectPermissions::new(
                vec![ResourcePermission::all()],
                vec![AdminPermission::new(Scope::Any, Scope::Any)],
            );
            roles.create(&ctx, ADMIN_ROLE, &everything)?;
        }
        Err(e) => return Err(e.into()),
    }

    let user = users.create(
        &ctx,
        &NewUserRequest {
            username: username.to_string(),
            password: Some(password.to_string()),
            active: true,
            ..NewUserRequest::default()
        },
    )?;
    users.update_roles(&ctx, user.id, &[ADMIN_ROLE.to_string()])?;

    println!();
    println!("Created administrator '{}' (id {})", user.username, user.id);
    println!();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("flecto=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                username,
                password,
                config,
            } => {
                let config = Config::load(config.as_deref())?;
                run_init(&config, &username, &password)?;
            }
        },
        Commands::Serve { config } => {
            let config = Config::load(config.as_deref())?;
            if config.jwt.secret.is_empty() {
                anyhow::bail!("jwt.secret is not set; provide it in the config file or FLECTO_JWT_SECRET");
            }
            let store = open_store(&config)?;
            let addr = config.server.socket_addr()?;

            let state = Arc::new(AppState::new(store, config)?);
            let app = create_router(state);

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
