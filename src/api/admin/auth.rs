use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    api::{
        extract::ApiJson,
        response::{ApiResponse, Done},
    },
    auth::{AdminSession, SessionKeys, verify_password_async},
    error::{Error, Result},
    state::AppState,
    storage::{AdminQuerier, DBPool},
};

/// 登录与退出，不经过会话守卫
pub fn public_route() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// 需要会话的账户接口
pub fn guarded_route() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct AdminProfile {
    id: i64,
    email: String,
    full_name: String,
    role: String,
}

/// 邮箱不存在与密码错误返回相同的 401
#[instrument(skip_all)]
async fn login(
    State(pool): State<DBPool>,
    State(keys): State<SessionKeys>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<AdminProfile>)> {
    let mut missing = Vec::new();
    if req.email.trim().is_empty() {
        missing.push("email");
    }
    if req.password.is_empty() {
        missing.push("password");
    }
    if !missing.is_empty() {
        return Err(Error::MissingFields(missing));
    }

    let admin = pool
        .admin_by_email(req.email.trim())
        .await?
        .ok_or(Error::Unauthorized)?;

    if !verify_password_async(req.password, admin.password_hash.clone()).await {
        tracing::warn!(id = admin.id, "wrong password");
        return Err(Error::Unauthorized);
    }

    let token = keys.issue(&admin)?;
    tracing::info!(id = admin.id, "admin logged in");

    Ok((
        jar.add(keys.cookie(token)),
        ApiResponse::ok(AdminProfile {
            id: admin.id,
            email: admin.email,
            full_name: admin.full_name,
            role: admin.role,
        }),
    ))
}

async fn logout(jar: CookieJar) -> (CookieJar, ApiResponse<Done>) {
    (
        jar.remove(SessionKeys::removal_cookie()),
        ApiResponse::ok(Done {
            message: "Logged out",
        }),
    )
}

async fn me(session: AdminSession) -> ApiResponse<AdminSession> {
    ApiResponse::ok(session)
}
