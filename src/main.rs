use folio::bootstrap;
use folio::config::{self, AppConfig};
use folio::db::init_pool;
use folio::error::AppError;
use folio::routes::create_router;
use folio::state::AppState;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;
    let db = init_pool(&config.database_url).await?;

    bootstrap::ensure_schema(&db).await?;
    bootstrap::seed(&db).await?;

    let state = AppState::new(config.clone(), db);
    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    // DEBUG is read here directly so config parsing itself gets logged.
    let debug = std::env::var("DEBUG")
        .map(|v| config::is_truthy(&v))
        .unwrap_or(false);
    let default_filter = if debug {
        "debug,sqlx=info"
    } else {
        "info,folio=debug"
    };

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
