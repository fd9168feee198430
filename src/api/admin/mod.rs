//! 管理后台接口，挂载在 `/api/admin` 下
//!
//! 除登录与退出外的路由都经过 [`require_admin_api`]。

mod analytics;
mod auth;
mod comments;
mod posts;
mod subscribers;
mod uploads;

use axum::{Router, middleware};

use crate::{auth::require_admin_api, state::AppState};

pub fn setup_route(app: &AppState) -> Router<AppState> {
    let guarded = Router::new()
        .merge(auth::guarded_route())
        .merge(posts::setup_route())
        .merge(comments::setup_route())
        .merge(subscribers::setup_route())
        .merge(analytics::setup_route())
        .merge(uploads::setup_route(app.limits()))
        .route_layer(middleware::from_fn_with_state(
            app.sessions().clone(),
            require_admin_api,
        ));

    Router::new().merge(auth::public_route()).merge(guarded)
}
