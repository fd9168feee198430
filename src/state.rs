use axum::extract::FromRef;

use crate::{auth::SessionKeys, config::Config, storage::DBPool, upload::Uploader};

/// 应用程序上下文
///
/// [`AppState`] 封装数据库连接池、会话密钥和上传后端，处理函数按需通过 `State<T>` 取用。
#[derive(Clone, FromRef)]
pub struct AppState {
    pool: DBPool,
    sessions: SessionKeys,
    uploader: Uploader,
    limits: Limits,
}

/// 请求相关的限制
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pool: DBPool, sessions: SessionKeys, uploader: Uploader, limits: Limits) -> Self {
        Self {
            pool,
            sessions,
            uploader,
            limits,
        }
    }

    /// 由已校验的配置构造
    pub fn from_config(pool: DBPool, config: &Config) -> Self {
        Self::new(
            pool,
            SessionKeys::new(config.session_secret(), config.cookie_secure),
            Uploader::from_config(&config.upload),
            Limits {
                max_upload_bytes: config.upload.max_bytes,
            },
        )
    }

    pub fn sessions(&self) -> &SessionKeys {
        &self.sessions
    }

    pub fn uploader(&self) -> &Uploader {
        &self.uploader
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }
}
