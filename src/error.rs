use std::io;

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::IntoResponse,
};

use crate::api::response::ApiResponse;

pub type Result<T> = core::result::Result<T, Error>;

/// 应用统一错误类型
///
/// 路由处理函数是唯一的错误转换边界：所有错误都经由 [`IntoResponse`]
/// 转换为 `{success: false, error}` 信封，存储层错误只记录日志，不向调用方透出。
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 必填字段缺失或为空，按声明顺序列出字段名
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// 其他格式错误（邮箱格式、请求体解析失败等）
    #[error("{0}")]
    Invalid(String),

    #[error("Not Found")]
    NotFound,

    /// 唯一性冲突（slug 重复、重复订阅）
    #[error("{0}")]
    Conflict(&'static str),

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    /// 上传服务调用失败
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    /// 会话令牌校验失败
    #[error(transparent)]
    Token(#[from] jsonwebtoken::errors::Error),

    /// 会话令牌签发失败
    #[error(transparent)]
    Signing(jsonwebtoken::errors::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::Invalid(msg.into())
    }

    /// 对应的 HTTP 状态码
    pub fn status(&self) -> StatusCode {
        match self {
            Error::MissingFields(_) | Error::Invalid(_) => StatusCode::BAD_REQUEST,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Unauthorized | Error::Token(_) => StatusCode::UNAUTHORIZED,
            Error::Reqwest(_) => StatusCode::BAD_GATEWAY,
            Error::Sqlx(_) | Error::Io(_) | Error::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = self.to_string();
        let body = match self {
            Error::Sqlx(e) => {
                tracing::error!(%e, "sqlx error");
                ApiResponse::failure("Internal Server Error")
            }
            Error::Io(e) => {
                tracing::error!(%e, "file io error");
                ApiResponse::failure("Internal Server Error")
            }
            Error::Reqwest(e) => {
                tracing::error!(%e, "upload provider error");
                ApiResponse::failure("Bad Gateway")
            }
            Error::Signing(e) => {
                tracing::error!(%e, "failed to sign session token");
                ApiResponse::failure("Internal Server Error")
            }
            Error::Token(e) => {
                tracing::debug!(%e, "rejected session token");
                ApiResponse::failure("Unauthorized")
            }
            Error::MissingFields(fields) => ApiResponse::failure(message).with_fields(fields),
            _ => ApiResponse::failure(message),
        };

        body.with_status(status).into_response()
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Invalid(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::Invalid(rejection.body_text())
    }
}

impl From<axum_extra::extract::QueryRejection> for Error {
    fn from(rejection: axum_extra::extract::QueryRejection) -> Self {
        Error::Invalid(rejection.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for Error {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        Error::Invalid(e.body_text())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_json(err: Error) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let data = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("读取数据失败");
        (status, serde_json::from_slice(&data).expect("反序列化失败"))
    }

    #[tokio::test]
    async fn test_missing_fields_lists_fields() {
        let (status, json) = body_json(Error::MissingFields(vec!["title_en", "slug"])).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Missing required fields: title_en, slug");
        assert_eq!(json["fields"], serde_json::json!(["title_en", "slug"]));
    }

    #[tokio::test]
    async fn test_store_error_is_not_leaked() {
        let (status, json) = body_json(Error::Sqlx(sqlx::Error::PoolTimedOut)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Internal Server Error");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(Error::Conflict("dup").status(), StatusCode::CONFLICT);
        assert_eq!(Error::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::invalid("bad").status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_token_signing_failure_is_server_error() {
        use jsonwebtoken::errors::ErrorKind;

        let (status, json) = body_json(Error::Signing(ErrorKind::InvalidKeyFormat.into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Internal Server Error");

        let (status, json) = body_json(Error::Token(ErrorKind::InvalidSignature.into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "Unauthorized");
    }
}
