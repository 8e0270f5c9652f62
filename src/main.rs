use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

use loyalty_vault::{
    config::AppConfig,
    db::{connection, migrate},
    logging::init_tracing,
    middleware::{catch_panic_layer, json_error_middleware},
    notify::{Notifier, RetryPolicy, mailer_from_config},
    routes::router,
    state::AppState,
};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!("server failed: {err:?}");
        eprintln!("loyalty_vault: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env().context("failed to load config")?;
    init_tracing(&cfg.logging);

    let db = connection::connect(&cfg.database)
        .await
        .context("failed to connect to database")?;

    if std::env::args().nth(1).as_deref() == Some("migrate") {
        migrate::sync_schema(&db).await?;
        tracing::info!("schema is up to date");
        return Ok(());
    }

    if cfg.database.sync_schema {
        migrate::sync_schema(&db).await?;
    }

    let mailer = mailer_from_config(&cfg.mail).context("failed to build mail transport")?;
    let notifier = Notifier::spawn(
        mailer,
        RetryPolicy::from_config(&cfg.mail),
        cfg.mail.queue_size,
    );

    let addr: SocketAddr = format!("{}:{}", cfg.general.host, cfg.general.port)
        .parse()
        .context("invalid host/port")?;
    let state = AppState::new(cfg, db, notifier);

    let app = Router::new()
        .merge(router(Arc::clone(&state)))
        .layer(middleware::from_fn(json_error_middleware))
        .layer(catch_panic_layer())
        .layer(TraceLayer::new_for_http());

    tracing::info!("listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
