pub mod api;
pub mod config;
pub mod content;
pub mod models;
pub mod pipeline;
pub mod services;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use api::{gateway_router, start_server, ApiContext, ServerError};
use config::{Config, ConfigError};
use content::{groups_channel, ContentDirectory, ContentRefresher};
use pipeline::ClusterResolver;
use services::{AggregatorClient, HttpMembershipClient, MembershipService};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("cannot listen for shutdown signal: {0}")]
    Signal(std::io::Error),
}

/// Start the gateway and serve until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = Config::load()?;

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()?;

    let aggregator = AggregatorClient::new(http.clone(), config.aggregator_url()?);
    let membership = config.membership_url()?.map(|url| {
        tracing::info!(%url, "Membership service configured");
        Arc::new(HttpMembershipClient::new(http.clone(), url)) as Arc<dyn MembershipService>
    });
    if membership.is_none() {
        tracing::warn!("No membership service configured, clusters come from the aggregator");
    }
    let resolver = ClusterResolver::new(
        aggregator.clone(),
        membership,
        config.server.use_org_clusters_fallback,
    );

    let content_url = config.content_url()?;
    let directory = Arc::new(ContentDirectory::new());
    let (publisher, snapshot) = groups_channel();
    let mut refresher = ContentRefresher::new(
        http.clone(),
        content_url.clone(),
        config.groups_poll_interval(),
        directory.clone(),
        publisher,
    )
    .spawn();

    let ctx = ApiContext {
        aggregator,
        resolver,
        content: directory,
        groups: snapshot,
        internal_rules: Arc::new(config.internal_rules_access()),
        http,
        content_base_url: content_url,
    };

    let app = gateway_router(ctx, &config.server);
    let mut server = start_server(app, config.server.socket_addr()?).await?;
    tracing::info!(addr = %server.session.server_addr, prefix = config.route_prefix(), "Gateway listening");

    let signal = tokio::signal::ctrl_c().await;

    server.shutdown();
    refresher.shutdown();
    server.wait().await;

    signal.map_err(StartupError::Signal)
}
