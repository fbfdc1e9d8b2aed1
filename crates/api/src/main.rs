use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    paydesk_observability::init();

    let config = paydesk_bff::config::BffConfig::from_env()?;
    let app = paydesk_bff::app::build_app(&config)?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        upstream = %config.upstream.base_url,
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
