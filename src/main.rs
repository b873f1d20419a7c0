//! kvbridge server
//!
//! Entry point: reads the configuration, sets up logging, builds the shared
//! store and policies, and serves client connections until Ctrl+C.

use anyhow::Context as _;
use clap::Parser;
use kvbridge::config::Config;
use kvbridge::connection::{handle_connection, ConnectionStats};
use kvbridge::context::Context;
use kvbridge::store::{MemoryStore, Policies};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

/// kvbridge - Redis sorted-set and hash commands over a record store
#[derive(Parser, Debug)]
#[command(name = "kvbridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE", env = "KVBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind to (overrides config file)
    #[arg(short = 'H', long = "host", value_name = "ADDR", env = "KVBRIDGE_HOST")]
    host: Option<String>,

    /// Port to listen on (overrides config file)
    #[arg(short = 'p', long = "port", value_name = "PORT", env = "KVBRIDGE_PORT")]
    port: Option<u16>,

    /// Namespace records are written to (overrides config file)
    #[arg(long = "namespace", value_name = "NAME", env = "KVBRIDGE_NAMESPACE")]
    namespace: Option<String>,

    /// Set records are written to (overrides config file)
    #[arg(long = "set", value_name = "NAME", env = "KVBRIDGE_SET")]
    set: Option<String>,

    /// Log level: trace, debug, info, warn, error (overrides config file)
    #[arg(
        short = 'l',
        long = "log-level",
        value_name = "LEVEL",
        env = "KVBRIDGE_LOG_LEVEL"
    )]
    log_level: Option<String>,

    /// Print the effective configuration and exit
    #[arg(long = "dump-config")]
    dump_config: bool,
}

impl Cli {
    fn apply_to_config(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(namespace) = &self.namespace {
            config.store.namespace = namespace.clone();
        }
        if let Some(set) = &self.set {
            config.store.set = set.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::default(),
    };

    cli.apply_to_config(&mut config);
    config.validate().context("validating configuration")?;
    Ok(config)
}

fn init_logging(config: &Config) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();
}

fn print_banner(config: &Config) {
    println!(
        r#"
kvbridge v{} - Redis commands over a record store
──────────────────────────────────────────────────
Server started on {}
Records in namespace '{}', set '{}'
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        kvbridge::VERSION,
        config.bind_address(),
        config.store.namespace,
        config.store.set,
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if cli.dump_config {
        print!(
            "{}",
            toml::to_string_pretty(&config).context("serializing configuration")?
        );
        return Ok(());
    }

    init_logging(&config);

    // Shared by every connection
    let store = Arc::new(MemoryStore::new());
    let context = Context::new(&config.store, store, Arc::new(Policies::new()));
    info!(
        namespace = %context.namespace,
        set = %context.set,
        "In-memory store initialized with 64 shards"
    );

    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("binding to {}", config.bind_address()))?;
    info!("Listening on {}", config.bind_address());

    print_banner(&config);

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping server...");
    };

    tokio::select! {
        _ = accept_loop(listener, context, stats) => {}
        _ = shutdown => {}
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(listener: TcpListener, context: Context, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let context = context.clone();
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, context, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
