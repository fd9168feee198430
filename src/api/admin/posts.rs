use axum::{
    Router,
    extract::State,
    routing::{get, patch},
};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    api::{
        extract::{ApiJson, ApiPath, ApiQuery},
        response::{ApiResponse, Done},
    },
    content::{PostInput, create_post, post_detail, update_post},
    error::{Error, Result},
    state::AppState,
    storage::{DBPool, Post, PostDetail, PostFilter, PostQuerier, PostSummary},
};

/// 文章管理路由
///
/// - `GET/POST /posts`
/// - `GET/PUT/DELETE /posts/{id}`
/// - `PATCH /posts/{id}/toggle`
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list).post(create))
        .route("/posts/{id}", get(detail).put(update).delete(remove))
        .route("/posts/{id}/toggle", patch(toggle))
}

/// 后台列表默认包含草稿
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListQuery {
    limit: Option<i64>,
    offset: i64,
    category: Option<String>,
    search: Option<String>,
    featured: Option<bool>,
    published: Option<bool>,
}

impl From<ListQuery> for PostFilter {
    fn from(q: ListQuery) -> Self {
        PostFilter {
            limit: q.limit,
            offset: q.offset,
            category: q.category,
            search: q.search,
            featured: q.featured,
            published: q.published,
        }
    }
}

async fn list(
    State(pool): State<DBPool>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<ApiResponse<Vec<PostSummary>>> {
    let filter = PostFilter::from(query);
    filter.check()?;

    Ok(ApiResponse::ok(pool.list_posts(&filter).await?))
}

async fn load(pool: &DBPool, id: i64) -> Result<PostDetail> {
    let summary = pool.post(id).await?.ok_or(Error::NotFound)?;
    post_detail(pool, summary).await
}

async fn detail(
    ApiPath(id): ApiPath<i64>,
    State(pool): State<DBPool>,
) -> Result<ApiResponse<PostDetail>> {
    Ok(ApiResponse::ok(load(&pool, id).await?))
}

async fn create(
    State(pool): State<DBPool>,
    ApiJson(input): ApiJson<PostInput>,
) -> Result<ApiResponse<PostDetail>> {
    let id = create_post(&pool, input).await?;
    Ok(ApiResponse::created(load(&pool, id).await?))
}

async fn update(
    ApiPath(id): ApiPath<i64>,
    State(pool): State<DBPool>,
    ApiJson(input): ApiJson<PostInput>,
) -> Result<ApiResponse<PostDetail>> {
    update_post(&pool, id, input).await?;
    Ok(ApiResponse::ok(load(&pool, id).await?))
}

#[instrument(skip(pool))]
async fn remove(
    ApiPath(id): ApiPath<i64>,
    State(pool): State<DBPool>,
) -> Result<ApiResponse<Done>> {
    if !pool.delete_post(id).await? {
        return Err(Error::NotFound);
    }

    tracing::info!("post deleted");
    Ok(ApiResponse::ok(Done {
        message: "Post deleted",
    }))
}

#[derive(Debug, Deserialize)]
struct ToggleRequest {
    is_published: bool,
}

#[instrument(skip(pool))]
async fn toggle(
    ApiPath(id): ApiPath<i64>,
    State(pool): State<DBPool>,
    ApiJson(req): ApiJson<ToggleRequest>,
) -> Result<ApiResponse<Post>> {
    let post = pool
        .set_published(id, req.is_published)
        .await?
        .ok_or(Error::NotFound)?;

    Ok(ApiResponse::ok(post))
}
