use std::{convert::Infallible, net::SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequest, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};

use crate::error::Error;

/// JSON 请求体，解析失败时返回统一信封
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

/// 查询参数，解析失败时返回统一信封
#[derive(FromRequestParts)]
#[from_request(via(axum_extra::extract::Query), rejection(Error))]
pub struct ApiQuery<T>(pub T);

/// 路径参数，解析失败时返回统一信封
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct ApiPath<T>(pub T);

/// 请求方信息，用于评论记录和浏览日志
#[derive(Debug, Default, Clone)]
pub struct ClientMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

impl ClientMeta {
    fn from_headers(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let header_str = |name| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };

        // 反向代理优先
        let ip = header_str(header::HeaderName::from_static("x-forwarded-for"))
            .and_then(|v| v.split(',').next().map(|s| s.trim().to_owned()))
            .or_else(|| header_str(header::HeaderName::from_static("x-real-ip")))
            .or_else(|| peer.map(|addr| addr.ip().to_string()));

        Self {
            ip,
            user_agent: header_str(header::USER_AGENT),
            referrer: header_str(header::REFERER),
        }
    }
}

impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(Self::from_headers(&parts.headers, peer))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_forwarded_for_wins_over_peer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8"));

        let meta = ClientMeta::from_headers(&headers, Some(([127, 0, 0, 1], 80).into()));

        assert_eq!(meta.ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8"));
        assert!(meta.referrer.is_none());
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let meta = ClientMeta::from_headers(&HeaderMap::new(), Some(([192, 0, 2, 1], 80).into()));
        assert_eq!(meta.ip.as_deref(), Some("192.0.2.1"));
    }
}
