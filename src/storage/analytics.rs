use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::DBPool;

/// 统计所需的原始计数
///
/// `*_current` 为最近一个窗口内的数量，`*_previous` 为其前一个等长窗口。
#[derive(Debug, Default, Clone, sqlx::FromRow)]
pub struct AnalyticsCounts {
    pub total_posts: i64,
    pub published_posts: i64,
    pub draft_posts: i64,
    pub total_views: i64,
    pub total_likes: i64,
    pub total_dislikes: i64,
    pub total_comments: i64,
    pub comment_likes: i64,
    pub active_subscribers: i64,
    pub total_subscribers: i64,
    pub posts_current: i64,
    pub posts_previous: i64,
    pub views_current: i64,
    pub views_previous: i64,
    pub comments_current: i64,
    pub comments_previous: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopPost {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub title_en: String,
    pub views: i64,
    pub likes: i64,
    pub comment_count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecentPost {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub title_en: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecentComment {
    pub id: i64,
    pub post_id: i64,
    pub author_name: String,
    pub content: String,
    pub post_title: String,
    pub post_title_en: String,
    pub created_at: DateTime<Utc>,
}

/// 管理后台统计查询
pub trait AnalyticsQuerier: Send + Sync {
    /// 汇总计数，窗口长度为 `days` 天
    fn counts(&self, days: i32)
    -> impl Future<Output = Result<AnalyticsCounts, sqlx::Error>> + Send;

    /// 浏览量最高的已发布文章
    fn top_posts(&self, limit: i64)
    -> impl Future<Output = Result<Vec<TopPost>, sqlx::Error>> + Send;

    fn recent_posts(
        &self,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<RecentPost>, sqlx::Error>> + Send;

    fn recent_comments(
        &self,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<RecentComment>, sqlx::Error>> + Send;
}

impl AnalyticsQuerier for DBPool {
    async fn counts(&self, days: i32) -> Result<AnalyticsCounts, sqlx::Error> {
        // SUM(BIGINT) 返回 NUMERIC，统一转回 BIGINT
        sqlx::query_as::<_, AnalyticsCounts>(
            r#"
            WITH bounds AS (
                SELECT NOW() - make_interval(days => $1) AS current_start,
                       NOW() - make_interval(days => $1 * 2) AS previous_start
            )
            SELECT
                (SELECT COUNT(*) FROM posts) AS total_posts,
                (SELECT COUNT(*) FROM posts WHERE is_published) AS published_posts,
                (SELECT COUNT(*) FROM posts WHERE NOT is_published) AS draft_posts,
                (SELECT COALESCE(SUM(views), 0)::BIGINT FROM posts WHERE is_published) AS total_views,
                (SELECT COALESCE(SUM(likes), 0)::BIGINT FROM posts WHERE is_published) AS total_likes,
                (SELECT COALESCE(SUM(dislikes), 0)::BIGINT FROM posts WHERE is_published) AS total_dislikes,
                (SELECT COUNT(*) FROM comments WHERE is_approved) AS total_comments,
                (SELECT COALESCE(SUM(likes), 0)::BIGINT FROM comments WHERE is_approved) AS comment_likes,
                (SELECT COUNT(*) FROM newsletter_subscribers WHERE is_active) AS active_subscribers,
                (SELECT COUNT(*) FROM newsletter_subscribers) AS total_subscribers,
                (SELECT COUNT(*) FROM posts, bounds
                    WHERE created_at >= bounds.current_start) AS posts_current,
                (SELECT COUNT(*) FROM posts, bounds
                    WHERE created_at >= bounds.previous_start
                      AND created_at < bounds.current_start) AS posts_previous,
                (SELECT COALESCE(SUM(views), 0)::BIGINT FROM posts, bounds
                    WHERE is_published AND published_at >= bounds.current_start) AS views_current,
                (SELECT COALESCE(SUM(views), 0)::BIGINT FROM posts, bounds
                    WHERE is_published
                      AND published_at >= bounds.previous_start
                      AND published_at < bounds.current_start) AS views_previous,
                (SELECT COUNT(*) FROM comments, bounds
                    WHERE is_approved AND created_at >= bounds.current_start) AS comments_current,
                (SELECT COUNT(*) FROM comments, bounds
                    WHERE is_approved
                      AND created_at >= bounds.previous_start
                      AND created_at < bounds.current_start) AS comments_previous
            "#,
        )
        .bind(days)
        .fetch_one(self)
        .await
    }

    async fn top_posts(&self, limit: i64) -> Result<Vec<TopPost>, sqlx::Error> {
        sqlx::query_as::<_, TopPost>(
            r#"
            SELECT p.id, p.slug, p.title, p.title_en, p.views, p.likes,
                   (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id AND cm.is_approved) AS comment_count
            FROM posts p
            WHERE p.is_published
            ORDER BY p.views DESC, p.id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self)
        .await
    }

    async fn recent_posts(&self, limit: i64) -> Result<Vec<RecentPost>, sqlx::Error> {
        sqlx::query_as::<_, RecentPost>(
            r#"
            SELECT id, slug, title, title_en, COALESCE(published_at, created_at) AS published_at
            FROM posts
            WHERE is_published
            ORDER BY COALESCE(published_at, created_at) DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self)
        .await
    }

    async fn recent_comments(&self, limit: i64) -> Result<Vec<RecentComment>, sqlx::Error> {
        sqlx::query_as::<_, RecentComment>(
            r#"
            SELECT c.id, c.post_id, c.author_name, c.content,
                   p.title AS post_title, p.title_en AS post_title_en, c.created_at
            FROM comments c
            INNER JOIN posts p ON p.id = c.post_id
            WHERE c.is_approved
            ORDER BY c.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self)
        .await
    }
}
