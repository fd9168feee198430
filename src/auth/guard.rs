use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::session::{AdminSession, SESSION_COOKIE, SessionKeys};
use crate::error::Error;

/// 管理后台登录页
pub const LOGIN_PAGE: &str = "/admin/login";

fn session_from(keys: &SessionKeys, jar: &CookieJar) -> Option<AdminSession> {
    let token = jar.get(SESSION_COOKIE)?.value();
    match keys.verify(token) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::debug!(%e, "session rejected");
            None
        }
    }
}

/// 管理接口守卫
///
/// 令牌缺失、无效或过期时返回 401 并清除 cookie。
pub async fn require_admin_api(
    State(keys): State<SessionKeys>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    match session_from(&keys, &jar) {
        Some(session) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        None => (jar.remove(SessionKeys::removal_cookie()), Error::Unauthorized).into_response(),
    }
}

/// 管理页面守卫，未登录时跳转登录页
///
/// 只拦截 `/admin` 下的页面，登录页本身不拦截。
pub async fn require_admin_page(
    State(keys): State<SessionKeys>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if !is_admin_page(path) || is_login_page(path) {
        return next.run(req).await;
    }

    match session_from(&keys, &jar) {
        Some(session) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        None => (
            jar.remove(SessionKeys::removal_cookie()),
            Redirect::to(LOGIN_PAGE),
        )
            .into_response(),
    }
}

fn is_admin_page(path: &str) -> bool {
    path == "/admin" || path.starts_with("/admin/")
}

fn is_login_page(path: &str) -> bool {
    matches!(
        path.trim_end_matches('/'),
        "/admin/login" | "/admin/login.html"
    )
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{StatusCode, header},
        middleware,
        routing::get,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::storage::AdminUser;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn keys() -> SessionKeys {
        SessionKeys::new(SECRET, false)
    }

    fn token() -> String {
        keys()
            .issue(&AdminUser {
                id: 1,
                email: "admin@qalam.uz".into(),
                password_hash: String::new(),
                full_name: "Admin".into(),
                role: "admin".into(),
            })
            .unwrap()
    }

    async fn whoami(session: AdminSession) -> String {
        session.email
    }

    fn api() -> Router {
        Router::new()
            .route("/me", get(whoami))
            .layer(middleware::from_fn_with_state(keys(), require_admin_api))
    }

    fn pages() -> Router {
        Router::new()
            .route("/admin/dashboard", get(|| async { "dashboard" }))
            .route("/admin/login", get(|| async { "login" }))
            .route("/about", get(|| async { "about" }))
            .layer(middleware::from_fn_with_state(keys(), require_admin_page))
    }

    fn get_with_cookie(uri: &str, cookie: Option<String>) -> Request {
        let mut req = axum::http::Request::get(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, format!("{SESSION_COOKIE}={cookie}"));
        }
        req.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_api_without_cookie_is_unauthorized() {
        let resp = api().oneshot(get_with_cookie("/me", None)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let data = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&data).unwrap();
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_api_with_bad_token_clears_cookie() {
        let resp = api()
            .oneshot(get_with_cookie("/me", Some("forged".into())))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let cleared = resp
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .any(|v| v.to_str().unwrap_or_default().starts_with(SESSION_COOKIE));
        assert!(cleared);
    }

    #[tokio::test]
    async fn test_api_with_valid_token_passes_session() {
        let resp = api()
            .oneshot(get_with_cookie("/me", Some(token())))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let data = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&data[..], b"admin@qalam.uz");
    }

    #[tokio::test]
    async fn test_page_redirects_to_login() {
        let resp = pages()
            .oneshot(get_with_cookie("/admin/dashboard", None))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], LOGIN_PAGE);
    }

    #[tokio::test]
    async fn test_login_page_is_never_gated() {
        let resp = pages()
            .oneshot(get_with_cookie("/admin/login", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = pages()
            .oneshot(get_with_cookie("/admin/dashboard", Some(token())))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_public_pages_pass_through() {
        let resp = pages().oneshot(get_with_cookie("/about", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_page_paths() {
        assert!(is_login_page("/admin/login"));
        assert!(is_login_page("/admin/login/"));
        assert!(is_login_page("/admin/login.html"));
        assert!(!is_login_page("/admin/posts"));

        assert!(is_admin_page("/admin"));
        assert!(is_admin_page("/admin/posts"));
        assert!(!is_admin_page("/administrator"));
        assert!(!is_admin_page("/api/admin/posts"));
    }
}
