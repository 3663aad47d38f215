use anyhow::Context;
use booking_producer::supervisor::BrokerConnection;
use booking_producer::{producer_router, AppState, BusType, Config, Dispatcher, Metrics, Publisher};
use event_bus::{BrokerChannel, InMemoryBus};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };
    tracing::info!("Configuration loaded: {:?}", config.bus_type);

    if let Err(e) = run(config).await {
        tracing::error!(error = ?e, "Booking producer failed");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let metrics = Metrics::new();

    let (channel, connection): (Arc<dyn BrokerChannel>, Option<BrokerConnection>) =
        match config.bus_type {
            BusType::Amqp => {
                let connection =
                    BrokerConnection::open(&config.amqp_url, &config.retry_config()).await?;
                (connection.channel(), Some(connection))
            }
            BusType::InMemory => {
                tracing::info!("Using in-memory broker");
                let channel: Arc<dyn BrokerChannel> = Arc::new(InMemoryBus::new());
                (channel, None)
            }
        };
    metrics
        .dep_up
        .with_label_values(&["amqp"])
        .set(i64::from(channel.is_connected()));

    let publisher = Publisher::new(channel.clone(), metrics.clone());
    let dispatcher = Dispatcher::new(publisher, metrics.clone(), config.timeouts());

    let app = producer_router(AppState {
        dispatcher,
        channel,
        metrics,
        expose_topology: !config.is_production(),
    })
    .layer(TraceLayer::new_for_http())
    .layer(
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    );

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Booking producer listening on {}", addr);

    // In-flight requests drain before serve returns
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("HTTP server stopped");

    if let Some(connection) = connection {
        connection.close().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining in-flight requests");
}
