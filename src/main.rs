//! Readmark - background synchronization core.
//!
//! Main entry point for the readmark CLI.

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use readmark_channel::ConnectionManager;
use readmark_config::{Config, ConfigLoader};
use readmark_locator::Locator;
use readmark_net::ApiClient;
use readmark_protocols::SessionUser;
use readmark_runtime::{
    DetachedBadge, DetachedPanel, DetachedTabs, ExtensionContext, LocalPageHost, Surfaces,
};
use readmark_store::{BookmarkCache, FileBookmarkStore, SessionStore};

use cli::{Cli, Commands};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => ConfigLoader::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        None => serve(config, None).await,
        Some(Commands::Serve { uid }) => serve(config, uid).await,
        Some(Commands::Ping) => ping(config).await,
        Some(Commands::Locate { file, verbatim }) => locate(config, file, &verbatim),
    }
}

/// Run the background core until interrupted.
async fn serve(config: Config, uid: Option<String>) -> anyhow::Result<()> {
    info!("Starting readmark v{}", env!("CARGO_PKG_VERSION"));
    info!("Backend: {}", config.backend.base_url);

    let storage_dir = PathBuf::from(ConfigLoader::expand_path(&config.storage.path));
    let store = FileBookmarkStore::new(storage_dir)
        .await
        .context("failed to open bookmark store")?;
    let cache = BookmarkCache::new(Arc::new(store));

    let api = ApiClient::new(&config.backend, config.retry.clone())?;
    let connection = ConnectionManager::new(config.backend.clone(), config.channel.clone());
    let session = Arc::new(SessionStore::new());

    let surfaces = Surfaces {
        tabs: Arc::new(DetachedTabs),
        scripting: Arc::new(LocalPageHost::new(config.highlight.clone())),
        badge: Arc::new(DetachedBadge),
        panel: Arc::new(DetachedPanel),
    };

    let ctx = Arc::new(ExtensionContext::new(
        config,
        session.clone(),
        cache,
        api,
        connection,
        surfaces,
    ));
    let _bus = readmark_runtime::start(ctx.clone());
    info!("Background core running");

    if let Some(uid) = uid {
        session.login(SessionUser::new(uid));
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutting down");
    session.logout();
    ctx.connection.shutdown().await;
    Ok(())
}

/// Probe backend health.
async fn ping(config: Config) -> anyhow::Result<()> {
    let api = ApiClient::new(&config.backend, config.retry.clone())?;
    match api.ping().await {
        Ok(body) => {
            println!("backend is up: {body}");
            Ok(())
        }
        Err(e) => {
            warn!("Ping failed: {e}");
            anyhow::bail!("backend is down: {e}");
        }
    }
}

/// Locate a citation inside a page text dump and print the planned spans.
fn locate(config: Config, file: PathBuf, verbatim: &str) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let nodes: Vec<String> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.to_string())
        .collect();

    let locator = Locator::new(config.highlight.clone());
    let spans = locator.find(&nodes, verbatim);
    if spans.is_empty() {
        println!("no match");
        anyhow::bail!("citation not found");
    }
    for span in spans {
        let text = &nodes[span.node_index][span.start..span.end];
        println!("node {} [{}..{}]: {}", span.node_index, span.start, span.end, text);
    }
    Ok(())
}
