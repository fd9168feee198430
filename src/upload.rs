//! 上传文件存储
//!
//! 本地目录或远程对象存储二选一，返回可公开访问的 URL。

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    config::UploadConfig,
    error::{Error, Result},
};

/// 允许上传的内容类型及其存储扩展名
///
/// 扩展名决定本地托管时的响应类型，只由校验过的内容类型决定。
const UPLOAD_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/avif", "avif"),
    ("image/bmp", "bmp"),
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
    ("video/ogg", "ogv"),
    ("video/quicktime", "mov"),
    ("application/pdf", "pdf"),
];

/// 内容类型对应的扩展名，不在白名单内时为 `None`
pub fn upload_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    UPLOAD_TYPES
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
}

/// 允许上传的内容类型：常见图片、视频、PDF
pub fn allowed_type(content_type: &str) -> bool {
    upload_extension(content_type).is_some()
}

/// 校验上传内容，返回存储用的扩展名
pub fn check_upload(content_type: &str, size: usize, max_bytes: usize) -> Result<&'static str> {
    if size == 0 {
        return Err(Error::invalid("File is empty"));
    }
    if size > max_bytes {
        return Err(Error::Invalid(format!(
            "File is too large (max {max_bytes} bytes)"
        )));
    }
    upload_extension(content_type)
        .ok_or_else(|| Error::Invalid(format!("Unsupported file type: {content_type}")))
}

/// 生成存储键 `yyyy/mm/<uuid>.<ext>`
///
/// 原文件名只记录在媒体表里，不参与存储路径。
pub fn object_key(ext: &str, now: DateTime<Utc>, id: Uuid) -> String {
    format!("{}/{id}.{ext}", now.format("%Y/%m"))
}

/// 远程存储的响应，兼容 `url` 与 `secure_url`
#[derive(Debug, Deserialize)]
struct RemoteUpload {
    #[serde(alias = "secure_url")]
    url: String,
}

/// 上传存储后端
#[derive(Debug, Clone)]
pub enum Uploader {
    /// 写入本地目录，由本服务在 `public_url` 下托管
    Local { dir: PathBuf, public_url: String },
    /// 以 multipart 方式 POST 到远程存储接口
    Remote {
        client: reqwest::Client,
        endpoint: String,
        token: Option<String>,
    },
}

impl Uploader {
    pub fn from_config(config: &UploadConfig) -> Self {
        match &config.endpoint {
            Some(endpoint) => Uploader::Remote {
                client: reqwest::Client::new(),
                endpoint: endpoint.clone(),
                token: config.token.clone(),
            },
            None => Uploader::Local {
                dir: config.dir.clone(),
                public_url: config.public_url.clone(),
            },
        }
    }

    /// 本地存储时返回目录与对外前缀，用于挂载静态文件服务
    pub fn local_mount(&self) -> Option<(&Path, &str)> {
        match self {
            Uploader::Local { dir, public_url } => Some((dir.as_path(), public_url.as_str())),
            Uploader::Remote { .. } => None,
        }
    }

    /// 保存文件并返回公开 URL
    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    pub async fn store(
        &self,
        key: &str,
        file_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<String> {
        match self {
            Uploader::Local { dir, public_url } => {
                let path = dir.join(key);
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&path, &data).await?;

                Ok(format!("{}/{}", public_url.trim_end_matches('/'), key))
            }
            Uploader::Remote {
                client,
                endpoint,
                token,
            } => {
                let part = reqwest::multipart::Part::bytes(data.to_vec())
                    .file_name(file_name.to_string())
                    .mime_str(content_type)?;
                let form = reqwest::multipart::Form::new()
                    .text("key", key.to_string())
                    .part("file", part);

                let mut req = client.post(endpoint).multipart(form);
                if let Some(token) = token {
                    req = req.bearer_auth(token);
                }

                let uploaded: RemoteUpload = req.send().await?.error_for_status()?.json().await?;
                Ok(uploaded.url)
            }
        }
    }
}
