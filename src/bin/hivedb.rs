//! HiveDB server binary.
//!
//! Command-line interface for HiveDB with support for:
//! - Server management (serve)
//! - Namespace operations (create, drop, list)
//! - API key management (generate, list, revoke)
//!
//! # Examples
//!
//! ```bash
//! # Start server
//! hivedb serve --bind 0.0.0.0 --port 8080
//!
//! # Create a namespace
//! hivedb db create myapp
//!
//! # Issue an API key
//! hivedb auth generate --name ci
//! ```

use clap::{Args, Parser, Subcommand};
use hivedb::server::{start_server, AdminConfig, ServerConfig};
use hivedb::{FileStore, Store};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// HiveDB - namespaced document and file store
#[derive(Parser, Debug)]
#[command(name = "hivedb")]
#[command(version = hivedb::VERSION)]
#[command(about = "HiveDB - namespaced document and file store", long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Data directory path
    #[arg(long, global = true, default_value = "data/hivedb", env = "HIVEDB_DATA")]
    data_dir: PathBuf,

    /// Log directory path
    #[arg(long, global = true, default_value = "logs", env = "HIVEDB_LOG_DIR")]
    log_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HiveDB server
    Serve(ServeArgs),

    /// Namespace operations
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },

    /// API key operations
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Show server version
    Version,
}

/// Server configuration arguments
#[derive(Args, Debug)]
struct ServeArgs {
    /// HTTP bind address
    #[arg(short, long, default_value = "0.0.0.0", env = "HIVEDB_BIND")]
    bind: String,

    /// HTTP port
    #[arg(short, long, default_value = "8080", env = "HIVEDB_PORT")]
    port: u16,

    /// Enable CORS
    #[arg(long, default_value = "true")]
    cors: bool,

    /// Maximum request body size (MB)
    #[arg(long, default_value = "10")]
    max_body_size: usize,
}

/// Namespace commands
#[derive(Subcommand, Debug)]
enum DbCommands {
    /// Create a new namespace
    Create {
        /// Namespace name
        name: String,
    },

    /// Drop a namespace and all its documents
    Drop {
        /// Namespace name
        name: String,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// List all namespaces
    List,
}

/// API key commands
#[derive(Subcommand, Debug)]
enum AuthCommands {
    /// Generate a new API key (the secret is printed once)
    Generate {
        /// Human-readable label
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List API key metadata
    List,

    /// Revoke an API key by id
    Revoke {
        /// Key id
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli)?;

    match cli.command {
        Commands::Serve(args) => serve_command(cli.data_dir, args).await,
        Commands::Db { command } => db_command(cli.data_dir, command),
        Commands::Auth { command } => auth_command(cli.data_dir, command),
        Commands::Version => {
            println!("HiveDB {}", hivedb::VERSION);
            Ok(())
        }
    }
}

/// Setup logging with rolling files and console output
fn setup_logging(cli: &Cli) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cli.log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &cli.log_dir, "hivedb.log");

    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_ansi(!cli.no_color)
                .pretty(),
        )
        .with(fmt::layer().with_writer(file_appender).with_ansi(false))
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    Ok(())
}

fn open_store(data_dir: &PathBuf) -> anyhow::Result<Store> {
    Ok(Store::open(&data_dir.join("hive.redb"))?)
}

/// Builds the admin surface configuration from the environment, if present.
///
/// `HIVEDB_ADMIN_PASSWORD_HASH` takes a precomputed bcrypt hash;
/// `HIVEDB_ADMIN_PASSWORD` takes a plaintext password hashed at startup.
/// Either form also needs `HIVEDB_JWT_SECRET`.
fn admin_config_from_env() -> anyhow::Result<Option<AdminConfig>> {
    let password_hash = match std::env::var("HIVEDB_ADMIN_PASSWORD_HASH") {
        Ok(hash) => Some(hash),
        Err(_) => match std::env::var("HIVEDB_ADMIN_PASSWORD") {
            Ok(password) => Some(bcrypt::hash(&password, bcrypt::DEFAULT_COST)?),
            Err(_) => None,
        },
    };

    let password_hash = match password_hash {
        Some(hash) => hash,
        None => return Ok(None),
    };

    let jwt_secret = match std::env::var("HIVEDB_JWT_SECRET") {
        Ok(secret) if !secret.is_empty() => secret,
        _ => {
            warn!("⚠️  Admin password set but HIVEDB_JWT_SECRET missing; admin surface disabled");
            return Ok(None);
        }
    };

    let token_ttl_secs = std::env::var("HIVEDB_ADMIN_TOKEN_TTL")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3600);

    Ok(Some(AdminConfig::new(
        password_hash,
        jwt_secret,
        token_ttl_secs,
    )))
}

/// Serve command - start the HiveDB server
async fn serve_command(data_dir: PathBuf, args: ServeArgs) -> anyhow::Result<()> {
    info!("🚀 HiveDB starting...");
    info!(version = %hivedb::VERSION, "Version information");

    let store = Arc::new(open_store(&data_dir)?);
    let files = Arc::new(FileStore::open(&data_dir.join("files"))?);
    info!("✅ Storage initialized at {}", data_dir.display());

    let admin = admin_config_from_env()?;

    let server_config = ServerConfig {
        http_addr: args.bind.clone(),
        http_port: args.port,
        enable_cors: args.cors,
        max_body_size: args.max_body_size * 1024 * 1024,
    };

    info!("🌐 HTTP API starting on {}:{}", args.bind, args.port);

    start_server(server_config, store, files, admin).await
}

/// Namespace commands
fn db_command(data_dir: PathBuf, command: DbCommands) -> anyhow::Result<()> {
    let store = open_store(&data_dir)?;

    match command {
        DbCommands::Create { name } => {
            store.create_namespace(&name)?;
            println!("✅ Created namespace '{}'", name);
            Ok(())
        }
        DbCommands::Drop { name, force } => {
            if !force {
                print!("Drop namespace '{}' and all its documents? (yes/no): ", name);
                use std::io::{self, Write};
                io::stdout().flush()?;
                let mut input = String::new();
                io::stdin().read_line(&mut input)?;
                if input.trim().to_lowercase() != "yes" {
                    println!("Aborted.");
                    return Ok(());
                }
            }
            store.delete_namespace(&name)?;
            println!("✅ Dropped namespace '{}'", name);
            Ok(())
        }
        DbCommands::List => {
            let dbs = store.list_namespaces();
            if dbs.is_empty() {
                println!("No namespaces.");
            } else {
                for db in dbs {
                    println!("{}", db);
                }
            }
            Ok(())
        }
    }
}

/// API key commands
fn auth_command(data_dir: PathBuf, command: AuthCommands) -> anyhow::Result<()> {
    let store = open_store(&data_dir)?;

    match command {
        AuthCommands::Generate { name } => {
            let generated = store.generate_key(name)?;
            println!("✅ API key generated");
            println!("ID:  {}", generated.id);
            println!("Key: {}", generated.key);
            println!("Store the key now; it cannot be retrieved again.");
            Ok(())
        }
        AuthCommands::List => {
            let keys = store.list_keys()?;
            if keys.is_empty() {
                println!("No API keys.");
            } else {
                println!("API keys ({})", keys.len());
                println!("───────────────────────────────");
                for key in keys {
                    println!(
                        "  • {}  {}  {}",
                        key.id,
                        key.name.as_deref().unwrap_or("-"),
                        key.created.to_rfc3339()
                    );
                }
            }
            Ok(())
        }
        AuthCommands::Revoke { id } => {
            store.revoke_key(&id)?;
            println!("✅ Revoked API key '{}'", id);
            Ok(())
        }
    }
}
