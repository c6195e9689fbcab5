mod api;
mod middleware;

use std::sync::Arc;

use finrag_answer::{GeminiClient, RagPipeline};
use finrag_retrieval::{QdrantClient, Retriever, TeiClient};
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(finrag_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let embedder = Arc::new(TeiClient::new(
        &config.tei_url,
        config.embed_dim,
        config.request_timeout_secs,
    )?);
    let store = Arc::new(QdrantClient::new(
        &config.qdrant_url,
        config.qdrant_api_key.as_deref(),
        config.request_timeout_secs,
    )?);
    let retriever = Retriever::new(embedder, store, config.collection_name.clone());
    retriever.init().await?;

    let generator = Arc::new(GeminiClient::from_config(&config)?);
    tracing::info!(
        env = %config.env,
        collection = %config.collection_name,
        embed_model = %config.embed_model,
        llm_model = generator.model(),
        "finrag components ready"
    );

    let state = AppState::new(
        RagPipeline::new(retriever, generator),
        config.data_path.clone(),
    );
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
