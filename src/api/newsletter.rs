use axum::{Router, extract::State, routing::post};
use serde::Deserialize;
use tracing::instrument;

use super::{
    extract::ApiJson,
    response::{ApiResponse, Done},
};
use crate::{
    content::normalize_email,
    error::{Error, Result},
    state::AppState,
    storage::{DBPool, NewsletterQuerier, Subscriber},
};

/// 邮件订阅路由
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/newsletter/subscribe", post(subscribe))
        .route("/newsletter/unsubscribe", post(unsubscribe))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EmailRequest {
    email: String,
}

#[instrument(skip_all)]
async fn subscribe(
    State(pool): State<DBPool>,
    ApiJson(req): ApiJson<EmailRequest>,
) -> Result<ApiResponse<Subscriber>> {
    let email = normalize_email(&req.email)?;
    let subscriber = pool
        .subscribe(&email)
        .await?
        .ok_or(Error::Conflict("Already subscribed"))?;

    tracing::info!(id = subscriber.id, "subscribed");
    Ok(ApiResponse::created(subscriber))
}

#[instrument(skip_all)]
async fn unsubscribe(
    State(pool): State<DBPool>,
    ApiJson(req): ApiJson<EmailRequest>,
) -> Result<ApiResponse<Done>> {
    let email = normalize_email(&req.email)?;
    pool.unsubscribe(&email).await?.ok_or(Error::NotFound)?;

    Ok(ApiResponse::ok(Done {
        message: "Unsubscribed",
    }))
}
