use axum::{
    Router,
    extract::State,
    routing::{delete, get, patch},
};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    api::{
        extract::{ApiPath, ApiQuery},
        response::{ApiResponse, Done},
    },
    error::{Error, Result},
    state::AppState,
    storage::{AdminComment, CommentQuerier, DBPool, ModerationStatus},
};

/// 评论审核路由
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/comments", get(list))
        .route("/comments/{id}/approve", patch(approve))
        .route("/comments/{id}", delete(remove))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListQuery {
    status: Option<ModerationStatus>,
}

async fn list(
    State(pool): State<DBPool>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<ApiResponse<Vec<AdminComment>>> {
    Ok(ApiResponse::ok(pool.all_comments(query.status).await?))
}

#[instrument(skip(pool))]
async fn approve(
    ApiPath(id): ApiPath<i64>,
    State(pool): State<DBPool>,
) -> Result<ApiResponse<Done>> {
    if !pool.approve_comment(id).await? {
        return Err(Error::NotFound);
    }

    Ok(ApiResponse::ok(Done {
        message: "Comment approved",
    }))
}

/// 回复随父评论一并删除
#[instrument(skip(pool))]
async fn remove(
    ApiPath(id): ApiPath<i64>,
    State(pool): State<DBPool>,
) -> Result<ApiResponse<Done>> {
    if !pool.delete_comment(id).await? {
        return Err(Error::NotFound);
    }

    Ok(ApiResponse::ok(Done {
        message: "Comment deleted",
    }))
}
