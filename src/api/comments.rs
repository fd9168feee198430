use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{
    extract::{ApiJson, ApiPath, ApiQuery, ClientMeta},
    response::ApiResponse,
};
use crate::{
    content::{CommentInput, create_comment, list_comments},
    error::{Error, Result},
    state::AppState,
    storage::{Comment, CommentQuerier, CommentThread, DBPool},
};

/// 公开评论路由
///
/// - `GET /comments?post_id=`：已审核评论及回复
/// - `POST /comments`：发表评论
/// - `POST /comments/{id}`：评论操作，目前只有点赞
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/comments", get(list).post(create))
        .route("/comments/{id}", post(act))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListQuery {
    post_id: Option<i64>,
}

async fn list(
    State(pool): State<DBPool>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<ApiResponse<Vec<CommentThread>>> {
    let post_id = query
        .post_id
        .ok_or_else(|| Error::MissingFields(vec!["post_id"]))?;

    Ok(ApiResponse::ok(list_comments(&pool, post_id).await?))
}

async fn create(
    State(pool): State<DBPool>,
    meta: ClientMeta,
    ApiJson(input): ApiJson<CommentInput>,
) -> Result<ApiResponse<Comment>> {
    let comment = create_comment(
        &pool,
        input,
        meta.ip.as_deref(),
        meta.user_agent.as_deref(),
    )
    .await?;

    Ok(ApiResponse::created(comment))
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum CommentAction {
    Like,
}

#[derive(Debug, Deserialize)]
struct ActionRequest {
    action: CommentAction,
}

#[derive(Debug, Serialize)]
struct Liked {
    likes: i64,
}

#[instrument(skip(pool))]
async fn act(
    ApiPath(id): ApiPath<i64>,
    State(pool): State<DBPool>,
    ApiJson(req): ApiJson<ActionRequest>,
) -> Result<ApiResponse<Liked>> {
    match req.action {
        CommentAction::Like => {
            let likes = pool.like_comment(id).await?.ok_or(Error::NotFound)?;
            Ok(ApiResponse::ok(Liked { likes }))
        }
    }
}
