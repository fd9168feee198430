use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use super::{
    extract::{ApiJson, ApiPath, ApiQuery, ClientMeta},
    response::ApiResponse,
};
use crate::{
    content::{ReactionKind, post_detail},
    error::{Error, Result},
    state::AppState,
    storage::{DBPool, PostDetail, PostFilter, PostQuerier, PostSummary, Reactions},
};

/// 公开文章路由
///
/// - `GET /posts`：已发布文章列表
/// - `GET /posts/{id}`：文章详情，浏览量加一
/// - `POST /posts/{id}/like`：点赞或点踩
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list))
        .route("/posts/{id}", get(detail))
        .route("/posts/{id}/like", post(react))
}

/// 公开列表只返回已发布文章，忽略 `published` 参数
async fn list(
    State(pool): State<DBPool>,
    ApiQuery(mut filter): ApiQuery<PostFilter>,
) -> Result<ApiResponse<Vec<PostSummary>>> {
    filter.published = Some(true);
    filter.check()?;

    Ok(ApiResponse::ok(pool.list_posts(&filter).await?))
}

/// 文章详情
///
/// 浏览量在读取前加一；浏览日志写入失败只记录警告。
#[instrument(skip(pool, meta))]
async fn detail(
    ApiPath(id): ApiPath<i64>,
    State(pool): State<DBPool>,
    meta: ClientMeta,
) -> Result<ApiResponse<PostDetail>> {
    pool.increment_views(id).await?.ok_or(Error::NotFound)?;

    if let Err(e) = pool
        .log_page_view(
            id,
            meta.ip.as_deref(),
            meta.user_agent.as_deref(),
            meta.referrer.as_deref(),
        )
        .await
    {
        tracing::warn!(%e, "failed to log page view");
    }

    let summary = pool.published_post(id).await?.ok_or(Error::NotFound)?;
    Ok(ApiResponse::ok(post_detail(&pool, summary).await?))
}

#[derive(Debug, Deserialize)]
struct ReactionRequest {
    #[serde(rename = "type")]
    kind: ReactionKind,
}

#[instrument(skip(pool))]
async fn react(
    ApiPath(id): ApiPath<i64>,
    State(pool): State<DBPool>,
    ApiJson(req): ApiJson<ReactionRequest>,
) -> Result<ApiResponse<Reactions>> {
    let reactions = pool.react(id, req.kind).await?.ok_or(Error::NotFound)?;
    Ok(ApiResponse::ok(reactions))
}
