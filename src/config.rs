use std::{env, net::SocketAddr, path::PathBuf};

use serde::Deserialize;

/// 配置加载错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("`{0}` not set")]
    Missing(&'static str),

    #[error("`{key}` is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// 应用配置
///
/// 先读取 `QALAM_CONFIG` 指向的 TOML 文件（可选），再由环境变量覆盖。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_url: Option<String>,
    pub listen: SocketAddr,
    pub session_secret: Option<String>,
    /// 是否为会话 cookie 加上 `Secure`
    pub cookie_secure: bool,
    /// 前端构建产物目录，设置后由本服务托管
    pub static_dir: Option<PathBuf>,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// 本地存储目录
    pub dir: PathBuf,
    /// 本地文件对外访问前缀
    pub public_url: String,
    /// 远程对象存储接口，设置后优先使用远程存储
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub max_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            listen: SocketAddr::from(([0, 0, 0, 0], 3000)),
            session_secret: None,
            cookie_secure: false,
            static_dir: None,
            upload: UploadConfig::default(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./uploads"),
            public_url: "/uploads".to_string(),
            endpoint: None,
            token: None,
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// 会话密钥最小长度（字节）
const MIN_SECRET_LEN: usize = 32;

impl Config {
    /// 从 `QALAM_CONFIG` 与环境变量加载配置
    pub fn load() -> Result<Self, ConfigError> {
        let config = match env::var("QALAM_CONFIG") {
            Ok(path) => Self::from_toml(&std::fs::read_to_string(path)?)?,
            Err(_) => Self::default(),
        };

        config.with_env(|key| env::var(key).ok())?.validated()
    }

    /// 数据库连接串，[`Config::load`] 保证其存在
    pub fn database_url(&self) -> &str {
        self.database_url.as_deref().unwrap_or_default()
    }

    /// 会话签名密钥，[`Config::load`] 保证其存在且长度足够
    pub fn session_secret(&self) -> &str {
        self.session_secret.as_deref().unwrap_or_default()
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// 用环境变量覆盖配置项
    ///
    /// `lookup` 便于测试时注入变量。
    pub fn with_env(
        mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(listen) = lookup("QALAM_LISTEN") {
            self.listen = listen.parse().map_err(|e| ConfigError::Invalid {
                key: "QALAM_LISTEN",
                reason: format!("{e}"),
            })?;
        }
        if let Some(secret) = lookup("QALAM_SESSION_SECRET") {
            self.session_secret = Some(secret);
        }
        if let Some(secure) = lookup("QALAM_COOKIE_SECURE") {
            self.cookie_secure = parse_bool("QALAM_COOKIE_SECURE", &secure)?;
        }
        if let Some(dir) = lookup("QALAM_STATIC_DIR") {
            self.static_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = lookup("QALAM_UPLOAD_DIR") {
            self.upload.dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("QALAM_UPLOAD_PUBLIC_URL") {
            self.upload.public_url = url;
        }
        if let Some(endpoint) = lookup("QALAM_UPLOAD_ENDPOINT") {
            self.upload.endpoint = Some(endpoint);
        }
        if let Some(token) = lookup("QALAM_UPLOAD_TOKEN") {
            self.upload.token = Some(token);
        }
        if let Some(max) = lookup("QALAM_UPLOAD_MAX_BYTES") {
            self.upload.max_bytes = max.parse().map_err(|e| ConfigError::Invalid {
                key: "QALAM_UPLOAD_MAX_BYTES",
                reason: format!("{e}"),
            })?;
        }
        Ok(self)
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        match &self.session_secret {
            None => return Err(ConfigError::Missing("QALAM_SESSION_SECRET")),
            Some(s) if s.len() < MIN_SECRET_LEN => {
                return Err(ConfigError::Invalid {
                    key: "QALAM_SESSION_SECRET",
                    reason: format!("must be at least {MIN_SECRET_LEN} bytes"),
                });
            }
            Some(_) => {}
        }
        if !self.upload.public_url.starts_with('/') && self.upload.endpoint.is_none() {
            return Err(ConfigError::Invalid {
                key: "QALAM_UPLOAD_PUBLIC_URL",
                reason: "local uploads must be served from an absolute path".to_string(),
            });
        }
        Ok(self)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            key,
            reason: format!("`{other}` is not a boolean"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn env_of(pairs: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let map: HashMap<&'static str, String> =
            pairs.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_toml_then_env_override() {
        let config = Config::from_toml(
            r#"
            database_url = "postgres://file/db"
            listen = "127.0.0.1:8080"
            session_secret = "0123456789abcdef0123456789abcdef"

            [upload]
            max_bytes = 1024
            "#,
        )
        .expect("Failed to parse config");

        let config = config
            .with_env(env_of(&[
                ("DATABASE_URL", "postgres://env/db"),
                ("QALAM_COOKIE_SECURE", "true"),
            ]))
            .and_then(Config::validated)
            .expect("Failed to apply env");

        assert_eq!(config.database_url.as_deref(), Some("postgres://env/db"));
        assert_eq!(config.listen, "127.0.0.1:8080".parse().unwrap());
        assert!(config.cookie_secure);
        assert_eq!(config.upload.max_bytes, 1024);
        assert_eq!(config.upload.public_url, "/uploads");
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let err = Config::default()
            .with_env(env_of(&[("DATABASE_URL", "postgres://x/db")]))
            .and_then(Config::validated)
            .unwrap_err();

        assert!(matches!(err, ConfigError::Missing("QALAM_SESSION_SECRET")));
    }

    #[test]
    fn test_short_secret_is_rejected() {
        let err = Config::default()
            .with_env(env_of(&[
                ("DATABASE_URL", "postgres://x/db"),
                ("QALAM_SESSION_SECRET", "short"),
            ]))
            .and_then(Config::validated)
            .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default()
            .with_env(env_of(&[
                ("DATABASE_URL", "postgres://x/db"),
                ("QALAM_SESSION_SECRET", SECRET),
            ]))
            .and_then(Config::validated)
            .expect("defaults should validate");

        assert_eq!(config.listen.port(), 3000);
        assert!(!config.cookie_secure);
        assert!(config.static_dir.is_none());
        assert_eq!(config.upload.max_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_bad_bool() {
        assert!(parse_bool("K", "maybe").is_err());
        assert!(parse_bool("K", " ON ").unwrap());
    }
}
