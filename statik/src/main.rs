//! Statik - static file server

mod chain;
mod server;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use statik_core::config::{ConfigLoader, LogFormat, LoggingConfig, MountConfig, StatikConfig};

use crate::chain::Chain;

/// Statik - serve a directory over HTTP
#[derive(Parser)]
#[command(name = "statik")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server with a configuration file
    Run {
        /// Path to the config file (.toml or .json)
        #[arg(default_value = "statik.toml")]
        config: String,
    },

    /// Serve a single directory
    #[command(name = "file-server")]
    FileServer {
        /// Address to listen on
        #[arg(long, default_value = ":8080")]
        listen: String,

        /// Root directory to serve
        #[arg(long, default_value = ".")]
        root: String,

        /// Answer 404/405 instead of passing requests on
        #[arg(long)]
        no_fallthrough: bool,

        /// Don't redirect directories to their trailing-slash URL
        #[arg(long)]
        no_redirect: bool,

        /// Cache-Control max-age in milliseconds
        #[arg(long, default_value_t = 0)]
        max_age: u64,

        /// Serve .br/.gz siblings when the client accepts them
        #[arg(long)]
        precompressed: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the config file
        #[arg(default_value = "statik.toml")]
        config: String,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config: config_path } => {
            let config = match ConfigLoader::load(&config_path) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("❌ Failed to load config: {}", e);
                    std::process::exit(1);
                }
            };
            init_tracing(&config.logging, cli.verbose);
            tracing::info!("Starting Statik with config: {}", config_path);
            run_server(config)?;
        }

        Commands::FileServer {
            listen,
            root,
            no_fallthrough,
            no_redirect,
            max_age,
            precompressed,
        } => {
            let mut mount = MountConfig::new(root);
            mount.fallthrough = !no_fallthrough;
            mount.redirect = !no_redirect;
            mount.max_age = max_age;
            mount.prefer_precompressed = precompressed;

            let mut config = StatikConfig::default();
            config.server.listen = listen;
            config.mounts.push(mount);

            init_tracing(&config.logging, cli.verbose);
            tracing::info!(
                "Starting file server on {} serving {}",
                config.server.listen,
                config.mounts[0].root
            );
            run_server(config)?;
        }

        Commands::Validate { config } => match ConfigLoader::load(&config) {
            Ok(c) => {
                println!(
                    "✅ Configuration '{}' is valid! ({} mount(s))",
                    config,
                    c.mounts.len()
                );
            }
            Err(e) => {
                eprintln!("❌ Configuration Error: {}", e);
                std::process::exit(1);
            }
        },

        Commands::Version => {
            println!("Statik v{}", statik_core::VERSION);
        }
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match logging.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

fn run_server(config: StatikConfig) -> anyhow::Result<()> {
    config.validate()?;
    let chain = Arc::new(Chain::from_config(&config)?);
    if chain.is_empty() {
        anyhow::bail!("no mounts configured");
    }
    tracing::info!("✅ {} mount(s) ready", chain.len());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        tokio::select! {
            result = server::run(&config.server.listen, chain) => result.map_err(anyhow::Error::from),
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("👋 Shutting down");
                Ok(())
            }
        }
    })
}
