use std::future::Future;

use super::{AdminUser, DBPool, Media};

/// 新的媒体文件记录
#[derive(Debug)]
pub struct NewMedia<'a> {
    pub post_id: Option<i64>,
    pub file_url: &'a str,
    pub file_name: &'a str,
    pub file_type: &'a str,
    pub file_size: i64,
}

/// 管理员与媒体存储
pub trait AdminQuerier: Send + Sync {
    /// 按邮箱（不区分大小写）查找管理员
    fn admin_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<AdminUser>, sqlx::Error>> + Send;

    fn insert_media(
        &self,
        media: &NewMedia<'_>,
    ) -> impl Future<Output = Result<Media, sqlx::Error>> + Send;
}

impl AdminQuerier for DBPool {
    async fn admin_by_email(&self, email: &str) -> Result<Option<AdminUser>, sqlx::Error> {
        sqlx::query_as::<_, AdminUser>(
            r#"
            SELECT id, email, password_hash, full_name, role
            FROM admin_users
            WHERE LOWER(email) = LOWER($1)
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(self)
        .await
    }

    async fn insert_media(&self, media: &NewMedia<'_>) -> Result<Media, sqlx::Error> {
        sqlx::query_as::<_, Media>(
            r#"
            INSERT INTO media (post_id, file_url, file_name, file_type, file_size)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, post_id, file_url, file_name, file_type, file_size, created_at
            "#,
        )
        .bind(media.post_id)
        .bind(media.file_url)
        .bind(media.file_name)
        .bind(media.file_type)
        .bind(media.file_size)
        .fetch_one(self)
        .await
    }
}
