use axum::{Router, extract::State, routing::get};
use serde::Deserialize;

use super::{extract::ApiQuery, response::ApiResponse};
use crate::{
    error::{Error, Result},
    state::AppState,
    storage::{CatalogQuerier, Category, DBPool, SearchHit},
};

const DEFAULT_SEARCH_LIMIT: i64 = 10;
const MAX_SEARCH_LIMIT: i64 = 50;

/// 分类与搜索路由
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/categories", get(categories))
        .route("/search", get(search))
}

async fn categories(State(pool): State<DBPool>) -> Result<ApiResponse<Vec<Category>>> {
    Ok(ApiResponse::ok(pool.categories().await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchQuery {
    q: Option<String>,
    limit: Option<i64>,
}

impl SearchQuery {
    fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT)
    }
}

async fn search(
    State(pool): State<DBPool>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<ApiResponse<Vec<SearchHit>>> {
    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| Error::MissingFields(vec!["q"]))?;

    Ok(ApiResponse::ok(pool.search(q, query.limit()).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_limit_bounds() {
        let limit = |limit| SearchQuery { q: None, limit }.limit();

        assert_eq!(limit(None), 10);
        assert_eq!(limit(Some(500)), 50);
        assert_eq!(limit(Some(0)), 1);
    }
}
