use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
};
use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    api::response::ApiResponse,
    error::{Error, Result},
    state::{AppState, Limits},
    storage::{AdminQuerier, DBPool, Media, NewMedia, PostQuerier},
    upload::{Uploader, check_upload, object_key},
};

/// multipart 边界与其他字段的余量
const FORM_OVERHEAD: usize = 64 * 1024;

pub fn setup_route(limits: Limits) -> Router<AppState> {
    Router::new()
        .route("/uploads", post(upload))
        .layer(DefaultBodyLimit::max(limits.max_upload_bytes + FORM_OVERHEAD))
}

/// 上传文件
///
/// 表单字段：`file`（必填）、`post_id`（可选，关联文章）。
#[instrument(skip_all)]
async fn upload(
    State(pool): State<DBPool>,
    State(uploader): State<Uploader>,
    State(limits): State<Limits>,
    mut multipart: Multipart,
) -> Result<ApiResponse<Media>> {
    let mut file = None;
    let mut post_id = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .unwrap_or("upload")
                    .to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await?;
                file = Some((file_name, content_type, data));
            }
            "post_id" => {
                let text = field.text().await?;
                let text = text.trim();
                if !text.is_empty() && text != "null" {
                    post_id = Some(
                        text.parse::<i64>()
                            .map_err(|_| Error::invalid("post_id must be an integer"))?,
                    );
                }
            }
            _ => {}
        }
    }

    let (file_name, content_type, data) = file.ok_or_else(|| Error::MissingFields(vec!["file"]))?;
    let ext = check_upload(&content_type, data.len(), limits.max_upload_bytes)?;

    if let Some(id) = post_id {
        pool.post(id).await?.ok_or(Error::NotFound)?;
    }

    let size = data.len() as i64;
    let key = object_key(ext, Utc::now(), Uuid::new_v4());
    let url = uploader.store(&key, &file_name, &content_type, data).await?;

    let media = pool
        .insert_media(&NewMedia {
            post_id,
            file_url: &url,
            file_name: &file_name,
            file_type: &content_type,
            file_size: size,
        })
        .await?;

    tracing::info!(id = media.id, %url, "file uploaded");
    Ok(ApiResponse::created(media))
}
