use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::{Forum, ForumUpdate};
use crate::search::{ForumResult, IndexStats, ReconcileReport, ServiceState, SyncOperation};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        search: state.search.state(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub search: ServiceState,
}

/// Prometheus metrics endpoint
///
/// Returns metrics in Prometheus text exposition format
pub async fn metrics() -> (StatusCode, String) {
    let metrics = crate::metrics::gather_metrics();
    (StatusCode::OK, metrics)
}

/// Search forums
pub async fn search_forums(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let query = params.q.unwrap_or_default();
    let results = state.search.search_forums(&query).await?;

    Ok(Json(SearchResponse {
        total: results.len(),
        query,
        results,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total: usize,
    pub results: Vec<ForumResult>,
}

/// Create the search index if missing, or rebuild it
pub async fn setup_index(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SetupIndexResponse>> {
    // An empty body selects the defaults
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        SetupIndexRequest::default()
    } else {
        serde_json::from_slice::<SetupIndexRequest>(&body)
            .map_err(|e| AppError::Validation(format!("Invalid setup request: {}", e)))?
    };

    state.search.setup_index(request.delete_existing).await?;
    let stats = state.search.stats().await?;

    Ok(Json(SetupIndexResponse {
        status: "ok".to_string(),
        stats,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetupIndexRequest {
    #[serde(default)]
    pub delete_existing: bool,
}

#[derive(Debug, Serialize)]
pub struct SetupIndexResponse {
    pub status: String,
    pub stats: IndexStats,
}

/// Repair drift between the forum store and the index
pub async fn reconcile_index(State(state): State<AppState>) -> Result<Json<ReconcileReport>> {
    Ok(Json(state.search.reconcile().await?))
}

/// Index statistics
pub async fn index_stats(State(state): State<AppState>) -> Result<Json<IndexStats>> {
    Ok(Json(state.search.stats().await?))
}

/// Create a forum
pub async fn create_forum(
    State(state): State<AppState>,
    Json(request): Json<CreateForumRequest>,
) -> Result<(StatusCode, Json<Forum>)> {
    request.validate()?;

    let mut forum = Forum::new(request.title, request.description);
    forum.image = request.image;

    state.search.store().await?.save_forum(&forum).await?;
    state
        .search
        .sync_document(&forum, SyncOperation::Index)
        .await?;

    Ok((StatusCode::CREATED, Json(forum)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateForumRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    pub image: Option<String>,
}

/// Get a forum by ID
pub async fn get_forum(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Forum>> {
    let forum = state
        .search
        .store()
        .await?
        .get_forum(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Forum {} not found", id)))?;

    Ok(Json(forum))
}

/// List forums, newest first
pub async fn list_forums(
    State(state): State<AppState>,
    Query(params): Query<ListForumsQuery>,
) -> Result<Json<ListForumsResponse>> {
    let page = params.page.unwrap_or(0);
    let page_size = params.page_size.unwrap_or(20).min(100); // Max 100 per page

    let store = state.search.store().await?;
    let forums = store.list_forums(page, page_size).await?;
    let total = store.count_forums().await?;

    Ok(Json(ListForumsResponse {
        forums,
        total,
        page,
        page_size,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListForumsQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ListForumsResponse {
    pub forums: Vec<Forum>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Update a forum
pub async fn update_forum(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateForumRequest>,
) -> Result<Json<Forum>> {
    request.validate()?;

    let store = state.search.store().await?;
    let mut forum = store
        .get_forum(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Forum {} not found", id)))?;

    forum.apply(request.into());
    store.update_forum(&forum).await?;
    state
        .search
        .sync_document(&forum, SyncOperation::Index)
        .await?;

    Ok(Json(forum))
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateForumRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub description: Option<String>,
    pub posts: Option<u64>,
    pub replies: Option<u64>,
    pub image: Option<String>,
}

impl From<UpdateForumRequest> for ForumUpdate {
    fn from(request: UpdateForumRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            posts: request.posts,
            replies: request.replies,
            image: request.image,
            ..Default::default()
        }
    }
}

/// Delete a forum
pub async fn delete_forum(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let store = state.search.store().await?;
    let forum = store
        .get_forum(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Forum {} not found", id)))?;

    store.delete_forum(&id).await?;
    state
        .search
        .sync_document(&forum, SyncOperation::Delete)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
