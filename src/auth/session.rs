use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{error::Error, storage::AdminUser};

/// 会话 cookie 名
pub const SESSION_COOKIE: &str = "admin_token";

/// 会话有效期（天）
pub const SESSION_DAYS: i64 = 7;

/// 会话令牌中的声明，校验通过后放入请求扩展
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminSession {
    /// 管理员 id
    pub sub: String,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// 会话令牌的签发与校验
///
/// 使用 HS256 对称签名，密钥来自配置。
#[derive(Clone)]
pub struct SessionKeys {
    inner: Arc<Keys>,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    secure_cookie: bool,
}

impl SessionKeys {
    pub fn new(secret: &str, secure_cookie: bool) -> Self {
        Self {
            inner: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                validation: Validation::new(Algorithm::HS256),
                secure_cookie,
            }),
        }
    }

    /// 为管理员签发令牌
    pub fn issue(&self, admin: &AdminUser) -> Result<String, Error> {
        let now = Utc::now().timestamp();
        let claims = AdminSession {
            sub: admin.id.to_string(),
            email: admin.email.clone(),
            role: admin.role.clone(),
            iat: now,
            exp: now + SESSION_DAYS * 24 * 3600,
        };

        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.inner.encoding,
        )
        .map_err(Error::Signing)
    }

    /// 校验令牌签名与有效期
    pub fn verify(&self, token: &str) -> Result<AdminSession, Error> {
        let data = jsonwebtoken::decode::<AdminSession>(
            token,
            &self.inner.decoding,
            &self.inner.validation,
        )?;
        Ok(data.claims)
    }

    /// 登录成功后写入的 cookie
    pub fn cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.inner.secure_cookie)
            .max_age(time::Duration::days(SESSION_DAYS))
            .build()
    }

    /// 用于清除会话的 cookie，路径需与写入时一致
    pub fn removal_cookie() -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, "")).path("/").build()
    }
}

impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminSession>()
            .cloned()
            .ok_or(Error::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn admin() -> AdminUser {
        AdminUser {
            id: 42,
            email: "admin@qalam.uz".into(),
            password_hash: String::new(),
            full_name: "Admin".into(),
            role: "admin".into(),
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let keys = SessionKeys::new(SECRET, false);
        let token = keys.issue(&admin()).expect("Failed to issue");
        let session = keys.verify(&token).expect("Failed to verify");

        assert_eq!(session.sub, "42");
        assert_eq!(session.email, "admin@qalam.uz");
        assert_eq!(session.exp - session.iat, SESSION_DAYS * 24 * 3600);
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let token = SessionKeys::new(SECRET, false).issue(&admin()).unwrap();
        let other = SessionKeys::new("ffffffffffffffffffffffffffffffff", false);

        assert!(matches!(other.verify(&token), Err(Error::Token(_))));
        assert!(other.verify("garbage").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let keys = SessionKeys::new(SECRET, false);
        let now = Utc::now().timestamp();
        let expired = AdminSession {
            sub: "1".into(),
            email: "a@b.uz".into(),
            role: "admin".into(),
            iat: now - 10 * 24 * 3600,
            exp: now - 3 * 24 * 3600,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &expired,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = SessionKeys::new(SECRET, true).cookie("t".into());

        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));
    }
}
