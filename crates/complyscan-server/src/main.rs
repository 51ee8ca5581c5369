//! ComplyScan Server
//!
//! Classifies Chinese descriptions of business situations into compliance
//! issue categories and returns the related regulations and recommendations.

use anyhow::Result;
use clap::Parser;
use complyscan_classifiers::CategoryClassifier;
use complyscan_core::KnowledgeBase;
use complyscan_server::{create_router, AppConfig, AppState, Analyzer};
use complyscan_store::{MemoryStore, ResultStore, SqliteStore};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "complyscan-server")]
#[command(about = "Compliance issue analysis service", long_about = None)]
struct Cli {
    /// Configuration file path (YAML or TOML)
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Listen address
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// Durable store location (sqlite://path)
    #[arg(short, long)]
    database_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("Starting ComplyScan server");

    let config = AppConfig::load(Some(cli.config.as_str()))?.with_overrides(
        cli.listen.clone(),
        cli.port,
        cli.database_url.clone(),
    );
    config.validate()?;
    info!("Configuration loaded successfully");

    let metrics_handle = init_metrics()?;

    let knowledge = Arc::new(config.knowledge_base()?);
    info!("Knowledge base: {} issue categories", knowledge.len());

    let classifier = load_classifier(&config, &knowledge).await?;
    info!("Classifier '{}' ready", classifier.name());

    let database = match config.database.url.as_deref() {
        Some(url) => Some(SqliteStore::open(url).await?),
        None => None,
    };

    let store: Arc<dyn ResultStore> = match &database {
        Some(database) => Arc::new(database.clone()),
        None => {
            warn!(
                "No database configured, using in-memory store ({} entries)",
                config.analysis.cache_capacity
            );
            Arc::new(MemoryStore::new(config.analysis.cache_capacity))
        }
    };
    info!("Result store backend: {}", store.backend());

    let analyzer = Analyzer::new(classifier, store, knowledge)
        .with_timeout(config.timeout())
        .with_max_input_chars(config.analysis.max_input_chars);

    let mut state = AppState::new(Arc::new(analyzer)).with_metrics(metrics_handle);
    if let Some(database) = database {
        state = state.with_database(database);
    }

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.listen, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Load the BERT classifier off the async runtime
#[cfg(feature = "ml-models")]
async fn load_classifier(
    config: &AppConfig,
    knowledge: &KnowledgeBase,
) -> Result<Arc<dyn CategoryClassifier>> {
    use complyscan_classifiers::BertCategoryClassifier;

    let settings = config.classifier.clone();
    let labels = knowledge.labels();

    let classifier =
        tokio::task::spawn_blocking(move || BertCategoryClassifier::load(&settings, labels))
            .await??;

    Ok(Arc::new(classifier))
}

#[cfg(not(feature = "ml-models"))]
async fn load_classifier(
    _config: &AppConfig,
    _knowledge: &KnowledgeBase,
) -> Result<Arc<dyn CategoryClassifier>> {
    anyhow::bail!("complyscan-server was built without the `ml-models` feature")
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("complyscan=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("complyscan=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "complyscan_requests_total",
        "Total number of analysis requests received"
    );
    metrics::describe_counter!(
        "complyscan_cache_hits_total",
        "Analyses answered from the result store"
    );
    metrics::describe_counter!(
        "complyscan_inference_failures_total",
        "Classifier failures during inference"
    );
    metrics::describe_histogram!(
        "complyscan_inference_latency_us",
        metrics::Unit::Microseconds,
        "Classification latency in microseconds"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
