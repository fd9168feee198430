mod admin;
mod catalog;
mod comments;
pub mod extract;
mod newsletter;
mod posts;
pub mod response;

use std::{net::SocketAddr, path::Path};

use axum::{Router, middleware};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::instrument;

use crate::{
    auth::{SessionKeys, require_admin_page},
    config::Config,
    state::AppState,
};

/// 设置应用的路由。
///
/// `/api` 下为公开接口与 `/api/admin` 管理接口；使用本地上传存储时同时托管上传目录。
pub fn setup_route(app: AppState) -> Router {
    let api = Router::new()
        .merge(posts::setup_route())
        .merge(comments::setup_route())
        .merge(catalog::setup_route())
        .merge(newsletter::setup_route())
        .nest("/admin", admin::setup_route(&app));

    let mut router = Router::new().nest("/api", api);

    if let Some((dir, public_url)) = app.uploader().local_mount() {
        let prefix = public_url.trim_end_matches('/');
        if !prefix.is_empty() {
            router = router.nest_service(prefix, ServeDir::new(dir));
        }
    }

    router.with_state(app)
}

/// 托管前端构建产物
///
/// 未匹配的路径交给静态目录处理；`/admin` 下的页面需要登录。
pub fn serve_frontend(router: Router, static_dir: &Path, sessions: SessionKeys) -> Router {
    router
        .fallback_service(ServeDir::new(static_dir).append_index_html_on_directories(true))
        .layer(middleware::from_fn_with_state(sessions, require_admin_page))
}

/// 启动 HTTP 服务，自动设置路由和中间件。
///
/// 1. 生成路由
/// 2. 按需托管前端
/// 3. 添加日志和追踪中间件
/// 4. 在配置的地址上监听
#[instrument(name = "http server", skip_all)]
pub async fn run_server(app: AppState, config: &Config) -> std::io::Result<()> {
    let sessions = app.sessions().clone();
    let mut router = setup_route(app);
    if let Some(dir) = &config.static_dir {
        router = serve_frontend(router, dir, sessions);
    }
    let router = add_middlewares(router);

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    tracing::info!("listening on {}", config.listen);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

/// 为路由添加中间件，包括请求追踪和失败日志记录。
///
/// 日志记录会在请求失败时输出错误信息。
fn add_middlewares(router: Router) -> Router {
    fn log_failure(
        err: tower_http::classify::ServerErrorsFailureClass,
        _latency: std::time::Duration,
        _span: &tracing::Span,
    ) {
        tracing::error!(error = %err, "request failed");
    }

    router.layer(
        TraceLayer::new_for_http()
            .on_failure(log_failure)
            .on_request(|_req: &_, _span: &tracing::Span| {
                // 关闭请求日志
            }),
    )
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use tower::ServiceExt;

    use super::*;

    fn frontend(dir: &Path) -> Router {
        serve_frontend(
            Router::new(),
            dir,
            SessionKeys::new("0123456789abcdef0123456789abcdef", false),
        )
    }

    #[tokio::test]
    async fn test_frontend_public_and_gated_pages() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("index.html"), "home").unwrap();
        std::fs::create_dir_all(dir.path().join("admin/login")).unwrap();
        std::fs::write(dir.path().join("about.html"), "about").unwrap();
        std::fs::write(dir.path().join("admin/login/index.html"), "login").unwrap();
        std::fs::write(dir.path().join("admin/index.html"), "dashboard").unwrap();

        let resp = frontend(dir.path())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"home");

        let resp = frontend(dir.path())
            .oneshot(Request::get("/about.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = frontend(dir.path())
            .oneshot(Request::get("/admin/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/admin/login");

        let resp = frontend(dir.path())
            .oneshot(Request::get("/admin/login/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
