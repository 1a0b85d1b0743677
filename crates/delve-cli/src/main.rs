mod config;
mod render;
mod repl;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use delve_core::Session;
use delve_net::{AnthropicModel, Explorer, ImageLookup, LanguageModel};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "delve", version, about = "Branching topic explorer backed by a language model")]
struct Cli {
    /// Config file (default: $DELVE_CONFIG or ~/.delve/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP proxy server
    Serve {
        /// Listen address, overrides the config
        #[arg(long)]
        addr: Option<String>,
    },

    /// Look up an encyclopedia image for a query
    Lookup {
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// Generate one node and print it
    Ask {
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// Interactive exploration session
    Explore,

    /// Print the effective configuration
    Config,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Serve { addr } => cmd_serve(config, addr.as_deref()).await,
        Commands::Lookup { query } => cmd_lookup(config, &query.join(" ")).await,
        Commands::Ask { query } => cmd_ask(config, &query.join(" ")).await,
        Commands::Explore => cmd_explore(config).await,
        Commands::Config => cmd_config(&config),
    }
}

fn build_lookup(config: &Config) -> Result<ImageLookup> {
    ImageLookup::new(config.lookup.clone()).context("failed to build image lookup client")
}

fn build_explorer(config: &Config) -> Result<Explorer> {
    let model = AnthropicModel::from_env(config.model.clone())
        .context("failed to build language model client")?;
    if !model.has_credentials() {
        tracing::warn!(
            "{} is not set; every generation will return the fallback page",
            config.model.api_key_env
        );
    }
    tracing::debug!(model = model.model_id(), "language model ready");
    let model: Arc<dyn LanguageModel> = Arc::new(model);
    Ok(Explorer::new(model, Arc::new(build_lookup(config)?)))
}

/// Cancel `token` on Ctrl-C or SIGTERM. Handlers are registered before
/// this returns.
fn spawn_signal_handler(token: CancellationToken) -> Result<()> {
    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("failed to install SIGTERM handler")?;

    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for ctrl-c: {e}");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async move {
            sigterm.recv().await;
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }
        tracing::info!("shutdown requested");
        token.cancel();
    });
    Ok(())
}

async fn cmd_serve(config: Config, addr: Option<&str>) -> Result<()> {
    let explorer = build_explorer(&config)?;
    let token = CancellationToken::new();
    spawn_signal_handler(token.clone())?;

    let addr = addr.unwrap_or(&config.server.addr);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    server::serve(listener, server::AppState::new(explorer), token).await
}

async fn cmd_lookup(config: Config, query: &str) -> Result<()> {
    let outcome = build_lookup(&config)?.lookup(query).await;
    match outcome.url() {
        Some(url) => println!("{url}"),
        None => println!("(no image: {outcome})"),
    }
    Ok(())
}

async fn cmd_ask(config: Config, query: &str) -> Result<()> {
    let explorer = build_explorer(&config)?;
    let mut session = Session::new();
    let (node, image) = explorer.explore(&mut session, query).await;
    print!("{}", render::render_node(node, Some(&image)));
    Ok(())
}

async fn cmd_explore(config: Config) -> Result<()> {
    let explorer = build_explorer(&config)?;
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let session = repl::run(&explorer, stdin, &mut stdout).await?;
    tracing::info!(nodes = session.len(), "session ended");
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
