use std::sync::Arc;

use anyhow::Context;
use flowpiper::config::AppConfig;
use flowpiper::generator::Generator;
use flowpiper::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flowpiper=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    if config.api_key.is_none() {
        tracing::warn!(
            "GROQ_API_KEY is not set; every /generate/ call will fail with the provider's auth error"
        );
    }

    let generator = Arc::new(Generator::from_config(&config));
    let app = server::router(generator, config.index_path.clone());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        model = %config.model,
        base_url = %config.base_url,
        "flowpiper listening on {}",
        listener.local_addr()?
    );

    axum::serve(listener, app).await?;
    Ok(())
}
