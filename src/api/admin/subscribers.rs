use axum::{
    Router,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::{
    api::{extract::ApiQuery, response::ApiResponse},
    content::subscribers_csv,
    error::Result,
    state::AppState,
    storage::{DBPool, NewsletterQuerier},
};

pub fn setup_route() -> Router<AppState> {
    Router::new().route("/subscribers", get(list))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Format {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListQuery {
    format: Format,
}

/// 订阅者列表，`?format=csv` 时以附件形式导出
async fn list(
    State(pool): State<DBPool>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Response> {
    let subscribers = pool.subscribers().await?;

    Ok(match query.format {
        Format::Json => ApiResponse::ok(subscribers).into_response(),
        Format::Csv => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"subscribers.csv\"",
                ),
            ],
            subscribers_csv(&subscribers),
        )
            .into_response(),
    })
}
