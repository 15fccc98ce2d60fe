use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinerank::{
    api::{create_router, AppState},
    cache::{CacheBackend, MemoryCacheBackend, RecommendationCache},
    config::{CacheBackendKind, Config, EventBackendKind},
    db::{create_pool, create_redis_client, load_snapshot, RedisCacheBackend},
    services::{
        publishers::{EventPublisher, LogPublisher, RedisStreamPublisher},
        EventNotifier, RecommendationEngine,
    },
    store::RatingStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinerank=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Ratings are immutable for the lifetime of the process
    let pool = create_pool(&config.database_url).await?;
    let store = load_snapshot(&pool).await?;
    tracing::info!(
        users = store.user_count(),
        movies = store.movies().len(),
        "Rating snapshot loaded"
    );
    pool.close().await;

    let backend: Arc<dyn CacheBackend> = match config.cache_backend {
        CacheBackendKind::Redis => {
            Arc::new(RedisCacheBackend::new(create_redis_client(&config.redis_url)?))
        }
        CacheBackendKind::Memory => {
            let memory = MemoryCacheBackend::new();
            memory.spawn_purge_task(config.cache_purge_interval());
            Arc::new(memory)
        }
    };
    tracing::info!(backend = backend.name(), "Cache backend ready");

    let publisher = create_publisher(&config)?;
    tracing::info!(
        publisher = publisher.name(),
        topic = %config.event_topic,
        "Event publisher ready"
    );
    let (notifier, notifier_handle) = EventNotifier::new(
        publisher,
        config.event_topic.clone(),
        config.event_queue_capacity,
    );

    let engine = RecommendationEngine::new(
        Arc::new(store),
        RecommendationCache::new(backend).with_backend_timeout(config.cache_op_timeout()),
        notifier,
        config.engine_settings(),
    );
    let app = create_router(AppState::new(engine));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    notifier_handle.shutdown().await?;
    tracing::info!("Server stopped");

    Ok(())
}

fn create_publisher(config: &Config) -> anyhow::Result<Arc<dyn EventPublisher>> {
    let publisher: Arc<dyn EventPublisher> = match config.event_backend {
        EventBackendKind::Redis => Arc::new(RedisStreamPublisher::new(create_redis_client(
            &config.redis_url,
        )?)),
        #[cfg(feature = "kafka")]
        EventBackendKind::Kafka => Arc::new(
            cinerank::services::publishers::KafkaPublisher::new(&config.kafka_brokers)?,
        ),
        #[cfg(not(feature = "kafka"))]
        EventBackendKind::Kafka => {
            anyhow::bail!("EVENT_BACKEND=kafka requires building with the `kafka` feature")
        }
        EventBackendKind::Log => Arc::new(LogPublisher),
    };
    Ok(publisher)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
