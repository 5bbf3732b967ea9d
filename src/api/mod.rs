//! Read-only HTTP/JSON API over the relational page store
//!
//! The API never touches the crawl pipeline; it only queries what the
//! SQLite backend has already recorded.

mod handlers;

pub use handlers::{ErrorBody, PageAnalysis, PageList};

use crate::storage::SqliteStorage;
use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Builds the API router over `storage`
pub fn router(storage: SqliteStorage) -> Router {
    Router::new()
        .route("/api/pages", get(handlers::list_pages))
        .route("/api/search", get(handlers::search_pages))
        .route("/api/analyze", get(handlers::analyze_page))
        .route("/api/stats", get(handlers::page_stats))
        .with_state(storage)
}

/// Serves the API on `listen` until `cancel` fires
pub async fn serve(
    listen: &str,
    storage: SqliteStorage,
    cancel: CancellationToken,
) -> crate::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!("Read API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(storage))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    info!("Read API stopped");
    Ok(())
}
