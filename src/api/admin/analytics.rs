use axum::{Router, extract::State, routing::get};
use serde::Deserialize;

use crate::{
    analytics::{AnalyticsReport, Range, compute_analytics},
    api::{extract::ApiQuery, response::ApiResponse},
    error::Result,
    state::AppState,
    storage::DBPool,
};

pub fn setup_route() -> Router<AppState> {
    Router::new().route("/analytics", get(report))
}

/// 不支持的 `range` 在解析查询参数时即返回 400
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReportQuery {
    range: Range,
}

async fn report(
    State(pool): State<DBPool>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> Result<ApiResponse<AnalyticsReport>> {
    Ok(ApiResponse::ok(compute_analytics(&pool, query.range).await?))
}
