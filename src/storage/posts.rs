use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgConnection;

use super::{DBPool, Media, Post, PostSummary, Reactions, Tag, escape_like};
use crate::{
    content::{PostInput, ReactionKind},
    error::Error,
};

/// 单次列表查询的最大条数
pub const MAX_PAGE_SIZE: i64 = 100;

/// 文章列表筛选条件
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostFilter {
    pub limit: Option<i64>,
    pub offset: i64,
    /// 分类名（任一语言，不区分大小写）
    pub category: Option<String>,
    /// 标题或正文子串（任一语言，不区分大小写）
    pub search: Option<String>,
    pub featured: Option<bool>,
    pub published: Option<bool>,
}

impl Default for PostFilter {
    fn default() -> Self {
        Self {
            limit: None,
            offset: 0,
            category: None,
            search: None,
            featured: None,
            published: Some(true),
        }
    }
}

impl PostFilter {
    pub fn check(&self) -> crate::error::Result<()> {
        if matches!(self.limit, Some(l) if l < 1) {
            return Err(Error::invalid("limit must be a positive integer"));
        }
        if self.offset < 0 {
            return Err(Error::invalid("offset must not be negative"));
        }
        Ok(())
    }
}

const SUMMARY_SELECT: &str = r#"
    SELECT p.*,
           c.name AS category_name,
           c.name_en AS category_name_en,
           (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id AND cm.is_approved) AS comment_count
    FROM posts p
    LEFT JOIN categories c ON c.id = p.category_id
"#;

/// 文章读取与计数接口
pub trait PostQuerier: Send + Sync {
    /// 按筛选条件分页查询，按发布时间、创建时间倒序
    fn list_posts(
        &self,
        filter: &PostFilter,
    ) -> impl Future<Output = Result<Vec<PostSummary>, sqlx::Error>> + Send;

    /// 查询已发布的文章，草稿返回 `None`
    fn published_post(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<PostSummary>, sqlx::Error>> + Send;

    /// 查询任意状态的文章（管理后台）
    fn post(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<PostSummary>, sqlx::Error>> + Send;

    fn post_tags(&self, id: i64) -> impl Future<Output = Result<Vec<Tag>, sqlx::Error>> + Send;

    fn post_media(&self, id: i64) -> impl Future<Output = Result<Vec<Media>, sqlx::Error>> + Send;

    /// 浏览量加一，返回新的浏览量；文章不存在或未发布时返回 `None`
    fn increment_views(&self, id: i64)
    -> impl Future<Output = Result<Option<i64>, sqlx::Error>> + Send;

    /// 追加一条浏览日志
    fn log_page_view(
        &self,
        id: i64,
        ip: Option<&str>,
        user_agent: Option<&str>,
        referrer: Option<&str>,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// 对已发布文章点赞或点踩
    fn react(
        &self,
        id: i64,
        kind: ReactionKind,
    ) -> impl Future<Output = Result<Option<Reactions>, sqlx::Error>> + Send;

    /// 切换发布状态，首次发布时写入发布时间
    fn set_published(
        &self,
        id: i64,
        published: bool,
    ) -> impl Future<Output = Result<Option<Post>, sqlx::Error>> + Send;

    /// 删除文章，返回是否存在
    fn delete_post(&self, id: i64) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

impl PostQuerier for DBPool {
    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<PostSummary>, sqlx::Error> {
        let mut builder = sqlx::QueryBuilder::new(SUMMARY_SELECT);
        builder.push(" WHERE TRUE");

        if let Some(published) = filter.published {
            builder.push(" AND p.is_published = ").push_bind(published);
        }
        if let Some(featured) = filter.featured {
            builder.push(" AND p.is_featured = ").push_bind(featured);
        }
        if let Some(category) = filter
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            builder
                .push(" AND (LOWER(c.name) = LOWER(")
                .push_bind(category.to_string())
                .push(") OR LOWER(c.name_en) = LOWER(")
                .push_bind(category.to_string())
                .push("))");
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            builder.push(" AND (");
            let mut columns = builder.separated(" OR ");
            for column in ["p.title", "p.title_en", "p.content", "p.content_en"] {
                columns
                    .push(format!("{column} ILIKE "))
                    .push_bind_unseparated(pattern.clone());
            }
            builder.push(")");
        }

        builder.push(" ORDER BY p.published_at DESC NULLS LAST, p.created_at DESC");
        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(limit.clamp(1, MAX_PAGE_SIZE));
        }
        builder.push(" OFFSET ").push_bind(filter.offset.max(0));

        builder.build_query_as::<PostSummary>().fetch_all(self).await
    }

    async fn published_post(&self, id: i64) -> Result<Option<PostSummary>, sqlx::Error> {
        sqlx::query_as::<_, PostSummary>(&format!(
            "{SUMMARY_SELECT} WHERE p.id = $1 AND p.is_published = TRUE"
        ))
        .bind(id)
        .fetch_optional(self)
        .await
    }

    async fn post(&self, id: i64) -> Result<Option<PostSummary>, sqlx::Error> {
        sqlx::query_as::<_, PostSummary>(&format!("{SUMMARY_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self)
            .await
    }

    async fn post_tags(&self, id: i64) -> Result<Vec<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.name, t.name_en
            FROM tags t
            INNER JOIN post_tags pt ON pt.tag_id = t.id
            WHERE pt.post_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(id)
        .fetch_all(self)
        .await
    }

    async fn post_media(&self, id: i64) -> Result<Vec<Media>, sqlx::Error> {
        sqlx::query_as::<_, Media>(
            r#"
            SELECT id, post_id, file_url, file_name, file_type, file_size, created_at
            FROM media
            WHERE post_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(id)
        .fetch_all(self)
        .await
    }

    async fn increment_views(&self, id: i64) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE posts SET views = views + 1 WHERE id = $1 AND is_published = TRUE RETURNING views",
        )
        .bind(id)
        .fetch_optional(self)
        .await
    }

    async fn log_page_view(
        &self,
        id: i64,
        ip: Option<&str>,
        user_agent: Option<&str>,
        referrer: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO page_views (post_id, ip_address, user_agent, referrer)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(ip)
        .bind(user_agent)
        .bind(referrer)
        .execute(self)
        .await?;
        Ok(())
    }

    async fn react(&self, id: i64, kind: ReactionKind) -> Result<Option<Reactions>, sqlx::Error> {
        let sql = match kind {
            ReactionKind::Like => {
                "UPDATE posts SET likes = likes + 1 WHERE id = $1 AND is_published = TRUE RETURNING likes, dislikes"
            }
            ReactionKind::Dislike => {
                "UPDATE posts SET dislikes = dislikes + 1 WHERE id = $1 AND is_published = TRUE RETURNING likes, dislikes"
            }
        };

        sqlx::query_as::<_, Reactions>(sql)
            .bind(id)
            .fetch_optional(self)
            .await
    }

    async fn set_published(&self, id: i64, published: bool) -> Result<Option<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET is_published = $2,
                published_at = CASE WHEN $2 THEN COALESCE(published_at, NOW()) ELSE published_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(published)
        .fetch_optional(self)
        .await
    }

    async fn delete_post(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// 文章写入接口
///
/// 为 [`PgConnection`] 实现，事务与保存点经由解引用直接调用。
pub trait PostStorage: Send {
    /// slug 是否已被其他文章占用
    fn slug_taken(
        &mut self,
        slug: &str,
        except: Option<i64>,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;

    fn insert_post(
        &mut self,
        input: &PostInput,
        published_at: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;

    /// 读取并锁定发布状态
    fn publish_state(
        &mut self,
        id: i64,
    ) -> impl Future<Output = Result<Option<(bool, Option<DateTime<Utc>>)>, sqlx::Error>> + Send;

    fn update_post(
        &mut self,
        id: i64,
        input: &PostInput,
        published_at: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// 删除文章的全部标签关联
    fn clear_tags(&mut self, post_id: i64) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// 按名称插入标签，已存在时返回已有 id
    fn upsert_tag(&mut self, name: &str) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;

    /// 关联文章与标签，重复关联被忽略
    fn link_tag(
        &mut self,
        post_id: i64,
        tag_id: i64,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

impl PostStorage for PgConnection {
    async fn slug_taken(&mut self, slug: &str, except: Option<i64>) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM posts WHERE slug = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(except)
        .fetch_one(&mut *self)
        .await
    }

    async fn insert_post(
        &mut self,
        input: &PostInput,
        published_at: Option<DateTime<Utc>>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            INSERT INTO posts
                (title, title_en, content, content_en, excerpt, excerpt_en, slug, category_id,
                 featured_image, youtube_url, is_published, is_featured, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            "#,
        )
        .bind(&input.title)
        .bind(&input.title_en)
        .bind(&input.content)
        .bind(&input.content_en)
        .bind(&input.excerpt)
        .bind(&input.excerpt_en)
        .bind(&input.slug)
        .bind(input.category_id)
        .bind(&input.featured_image)
        .bind(&input.youtube_url)
        .bind(input.is_published)
        .bind(input.is_featured)
        .bind(published_at)
        .fetch_one(&mut *self)
        .await
    }

    async fn publish_state(
        &mut self,
        id: i64,
    ) -> Result<Option<(bool, Option<DateTime<Utc>>)>, sqlx::Error> {
        sqlx::query_as("SELECT is_published, published_at FROM posts WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self)
            .await
    }

    async fn update_post(
        &mut self,
        id: i64,
        input: &PostInput,
        published_at: Option<DateTime<Utc>>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE posts
            SET title = $2,
                title_en = $3,
                content = $4,
                content_en = $5,
                excerpt = $6,
                excerpt_en = $7,
                slug = $8,
                category_id = $9,
                featured_image = $10,
                youtube_url = $11,
                is_published = $12,
                is_featured = $13,
                published_at = $14,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.title_en)
        .bind(&input.content)
        .bind(&input.content_en)
        .bind(&input.excerpt)
        .bind(&input.excerpt_en)
        .bind(&input.slug)
        .bind(input.category_id)
        .bind(&input.featured_image)
        .bind(&input.youtube_url)
        .bind(input.is_published)
        .bind(input.is_featured)
        .bind(published_at)
        .execute(&mut *self)
        .await?;
        Ok(())
    }

    async fn clear_tags(&mut self, post_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *self)
            .await?;
        Ok(())
    }

    async fn upsert_tag(&mut self, name: &str) -> Result<i64, sqlx::Error> {
        // DO UPDATE 保证冲突时也能 RETURNING 已有 id
        sqlx::query_scalar(
            r#"
            INSERT INTO tags (name, name_en)
            VALUES ($1, $1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(name)
        .fetch_one(&mut *self)
        .await
    }

    async fn link_tag(&mut self, post_id: i64, tag_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(post_id)
        .bind(tag_id)
        .execute(&mut *self)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_is_published_only() {
        let filter = PostFilter::default();
        assert_eq!(filter.published, Some(true));
        assert_eq!(filter.offset, 0);
        assert!(filter.check().is_ok());
    }

    #[test]
    fn test_filter_rejects_bad_paging() {
        let zero = PostFilter {
            limit: Some(0),
            ..Default::default()
        };
        assert!(zero.check().is_err());

        let negative = PostFilter {
            offset: -1,
            ..Default::default()
        };
        assert!(negative.check().is_err());
    }
}
