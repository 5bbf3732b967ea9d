//! Request handlers for the read API
//!
//! Every handler runs its SQLite query on the blocking pool. Errors are
//! returned as `{"error": "..."}` with the matching status code.

use crate::crawler::parse_html;
use crate::storage::{PageStats, PageSummary, SqliteStorage, StorageResult};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

pub type ApiError = (StatusCode, Json<ErrorBody>);

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeParams {
    url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PageList {
    pub total: usize,
    pub pages: Vec<PageSummary>,
}

impl From<Vec<PageSummary>> for PageList {
    fn from(pages: Vec<PageSummary>) -> Self {
        Self {
            total: pages.len(),
            pages,
        }
    }
}

/// Content analysis of one stored page
#[derive(Debug, Serialize)]
pub struct PageAnalysis {
    pub url: String,
    pub title: String,
    pub description: String,
    pub heading_count: usize,
    pub paragraph_count: usize,
    pub image_count: usize,
    pub internal_links: usize,
    pub external_links: usize,
    pub word_count: usize,
    pub text_content: String,
    pub heading_titles: Vec<String>,
    pub crawled_at: String,
}

fn error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
}

fn database_error(err: impl std::fmt::Display) -> ApiError {
    warn!("Read API query failed: {}", err);
    error(StatusCode::INTERNAL_SERVER_ERROR, "database error")
}

/// Runs a storage query on the blocking pool
async fn query<T, F>(storage: SqliteStorage, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&SqliteStorage) -> StorageResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&storage))
        .await
        .map_err(database_error)?
        .map_err(database_error)
}

/// `GET /api/pages`
pub async fn list_pages(State(storage): State<SqliteStorage>) -> Result<Json<PageList>, ApiError> {
    let pages = query(storage, |s| s.list_pages()).await?;
    Ok(Json(pages.into()))
}

/// `GET /api/search?q=<term>`
pub async fn search_pages(
    State(storage): State<SqliteStorage>,
    Query(params): Query<SearchParams>,
) -> Result<Json<PageList>, ApiError> {
    let term = match params.q {
        Some(q) if !q.is_empty() => q,
        _ => return Err(error(StatusCode::BAD_REQUEST, "q parameter required")),
    };

    let pages = query(storage, move |s| s.search_pages(&term)).await?;
    Ok(Json(pages.into()))
}

/// `GET /api/analyze?url=<url>`
///
/// Re-parses the stored bytes. The title comes from the stored row, falling
/// back to the parsed one for rows stored without a title.
pub async fn analyze_page(
    State(storage): State<SqliteStorage>,
    Query(params): Query<AnalyzeParams>,
) -> Result<Json<PageAnalysis>, ApiError> {
    let url = match params.url {
        Some(url) if !url.is_empty() => url,
        _ => return Err(error(StatusCode::BAD_REQUEST, "url parameter required")),
    };

    let lookup = url.clone();
    let page = query(storage, move |s| s.get_page_by_url(&lookup))
        .await?
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "page not found"))?;

    let base = Url::parse(&page.url).map_err(database_error)?;
    let parsed = parse_html(&page.content, &base);

    Ok(Json(PageAnalysis {
        url,
        title: page.title.or(parsed.title).unwrap_or_default(),
        description: parsed.description.unwrap_or_default(),
        heading_count: parsed.heading_count,
        paragraph_count: parsed.paragraph_count,
        image_count: parsed.image_count,
        internal_links: parsed.internal_links,
        external_links: parsed.external_links,
        word_count: parsed.word_count,
        text_content: parsed.text_excerpt,
        heading_titles: parsed.heading_titles,
        crawled_at: page.crawled_at,
    }))
}

/// `GET /api/stats`
pub async fn page_stats(State(storage): State<SqliteStorage>) -> Result<Json<PageStats>, ApiError> {
    let stats = query(storage, |s| s.page_stats()).await?;
    Ok(Json(stats))
}
