use std::future::Future;

use super::{Category, DBPool, SearchHit, escape_like};

/// 分类与搜索查询
pub trait CatalogQuerier: Send + Sync {
    /// 全部分类及各自已发布文章数
    fn categories(&self) -> impl Future<Output = Result<Vec<Category>, sqlx::Error>> + Send;

    /// 在已发布文章的标题、摘要、正文（任一语言）中做子串搜索
    fn search(
        &self,
        query: &str,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<SearchHit>, sqlx::Error>> + Send;
}

impl CatalogQuerier for DBPool {
    async fn categories(&self) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT c.id, c.name, c.name_en, c.description, c.description_en, c.color, c.icon,
                   COUNT(p.id) FILTER (WHERE p.is_published) AS post_count
            FROM categories c
            LEFT JOIN posts p ON p.category_id = c.id
            GROUP BY c.id
            ORDER BY c.name
            "#,
        )
        .fetch_all(self)
        .await
    }

    async fn search(&self, query: &str, limit: i64) -> Result<Vec<SearchHit>, sqlx::Error> {
        let pattern = format!("%{}%", escape_like(query));

        sqlx::query_as::<_, SearchHit>(
            r#"
            SELECT p.id, p.slug, p.title, p.title_en, p.excerpt, p.excerpt_en, p.featured_image,
                   c.name AS category_name, c.name_en AS category_name_en, p.published_at
            FROM posts p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.is_published = TRUE
              AND (p.title ILIKE $1 OR p.title_en ILIKE $1
                   OR p.excerpt ILIKE $1 OR p.excerpt_en ILIKE $1
                   OR p.content ILIKE $1 OR p.content_en ILIKE $1)
            ORDER BY p.published_at DESC NULLS LAST, p.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(self)
        .await
    }
}
