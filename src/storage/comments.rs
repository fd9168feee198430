use std::future::Future;

use serde::Deserialize;

use super::{AdminComment, Comment, DBPool};

/// 新评论
#[derive(Debug)]
pub struct NewComment<'a> {
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_name: &'a str,
    pub author_email: Option<&'a str>,
    pub content: &'a str,
    pub content_en: Option<&'a str>,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

/// 管理后台的审核状态筛选
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
}

const COMMENT_COLUMNS: &str =
    "c.id, c.post_id, c.parent_id, c.author_name, c.content, c.content_en, c.likes, c.is_approved, c.created_at";

/// 评论查询与写入接口
pub trait CommentQuerier: Send + Sync {
    /// 已审核的顶层评论，新的在前
    fn approved_top_level(
        &self,
        post_id: i64,
    ) -> impl Future<Output = Result<Vec<Comment>, sqlx::Error>> + Send;

    /// 给定顶层评论的已审核回复，旧的在前
    fn approved_replies(
        &self,
        parent_ids: &[i64],
    ) -> impl Future<Output = Result<Vec<Comment>, sqlx::Error>> + Send;

    /// 查询评论所属文章及其父评论
    fn comment_position(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<(i64, Option<i64>)>, sqlx::Error>> + Send;

    /// 写入评论，公开渠道的评论直接通过审核
    fn insert_comment(
        &self,
        comment: &NewComment<'_>,
    ) -> impl Future<Output = Result<Comment, sqlx::Error>> + Send;

    /// 点赞数加一并返回新值
    fn like_comment(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<i64>, sqlx::Error>> + Send;

    /// 管理后台的全部评论
    fn all_comments(
        &self,
        status: Option<ModerationStatus>,
    ) -> impl Future<Output = Result<Vec<AdminComment>, sqlx::Error>> + Send;

    /// 审核通过，重复调用无副作用
    fn approve_comment(&self, id: i64) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;

    /// 删除评论，回复随父评论级联删除
    fn delete_comment(&self, id: i64) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

impl CommentQuerier for DBPool {
    async fn approved_top_level(&self, post_id: i64) -> Result<Vec<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments c
            WHERE c.post_id = $1 AND c.parent_id IS NULL AND c.is_approved = TRUE
            ORDER BY c.created_at DESC, c.id DESC
            "#
        ))
        .bind(post_id)
        .fetch_all(self)
        .await
    }

    async fn approved_replies(&self, parent_ids: &[i64]) -> Result<Vec<Comment>, sqlx::Error> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments c
            WHERE c.parent_id = ANY($1) AND c.is_approved = TRUE
            ORDER BY c.created_at ASC, c.id ASC
            "#
        ))
        .bind(parent_ids)
        .fetch_all(self)
        .await
    }

    async fn comment_position(&self, id: i64) -> Result<Option<(i64, Option<i64>)>, sqlx::Error> {
        sqlx::query_as("SELECT post_id, parent_id FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(self)
            .await
    }

    async fn insert_comment(&self, comment: &NewComment<'_>) -> Result<Comment, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments
                (post_id, parent_id, author_name, author_email, content, content_en,
                 is_approved, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $8)
            RETURNING id, post_id, parent_id, author_name, content, content_en, likes, is_approved, created_at
            "#,
        )
        .bind(comment.post_id)
        .bind(comment.parent_id)
        .bind(comment.author_name)
        .bind(comment.author_email)
        .bind(comment.content)
        .bind(comment.content_en)
        .bind(comment.ip_address)
        .bind(comment.user_agent)
        .fetch_one(self)
        .await
    }

    async fn like_comment(&self, id: i64) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar("UPDATE comments SET likes = likes + 1 WHERE id = $1 RETURNING likes")
            .bind(id)
            .fetch_optional(self)
            .await
    }

    async fn all_comments(
        &self,
        status: Option<ModerationStatus>,
    ) -> Result<Vec<AdminComment>, sqlx::Error> {
        let approved = status.map(|s| s == ModerationStatus::Approved);

        sqlx::query_as::<_, AdminComment>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS},
                   c.author_email, c.ip_address,
                   p.title AS post_title, p.title_en AS post_title_en, p.slug AS post_slug
            FROM comments c
            INNER JOIN posts p ON p.id = c.post_id
            WHERE ($1::BOOLEAN IS NULL OR c.is_approved = $1)
            ORDER BY c.created_at DESC, c.id DESC
            "#
        ))
        .bind(approved)
        .fetch_all(self)
        .await
    }

    async fn approve_comment(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE comments SET is_approved = TRUE WHERE id = $1")
            .bind(id)
            .execute(self)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(self)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
