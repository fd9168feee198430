use std::future::Future;

use super::{DBPool, Subscriber};

/// 邮件订阅存储
pub trait NewsletterQuerier: Send + Sync {
    /// 订阅；已处于订阅状态时返回 `None`，已退订的邮箱会被重新激活
    fn subscribe(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<Subscriber>, sqlx::Error>> + Send;

    /// 退订；邮箱不存在或已退订时返回 `None`
    fn unsubscribe(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<Subscriber>, sqlx::Error>> + Send;

    fn subscribers(&self) -> impl Future<Output = Result<Vec<Subscriber>, sqlx::Error>> + Send;
}

impl NewsletterQuerier for DBPool {
    async fn subscribe(&self, email: &str) -> Result<Option<Subscriber>, sqlx::Error> {
        // 冲突且仍处于订阅状态时 WHERE 不成立，不返回行
        sqlx::query_as::<_, Subscriber>(
            r#"
            INSERT INTO newsletter_subscribers (email, is_active, subscribed_at)
            VALUES ($1, TRUE, NOW())
            ON CONFLICT (email) DO UPDATE
            SET is_active = TRUE,
                subscribed_at = NOW(),
                unsubscribed_at = NULL
            WHERE newsletter_subscribers.is_active = FALSE
            RETURNING id, email, is_active, subscribed_at, unsubscribed_at
            "#,
        )
        .bind(email)
        .fetch_optional(self)
        .await
    }

    async fn unsubscribe(&self, email: &str) -> Result<Option<Subscriber>, sqlx::Error> {
        sqlx::query_as::<_, Subscriber>(
            r#"
            UPDATE newsletter_subscribers
            SET is_active = FALSE, unsubscribed_at = NOW()
            WHERE email = $1 AND is_active = TRUE
            RETURNING id, email, is_active, subscribed_at, unsubscribed_at
            "#,
        )
        .bind(email)
        .fetch_optional(self)
        .await
    }

    async fn subscribers(&self) -> Result<Vec<Subscriber>, sqlx::Error> {
        sqlx::query_as::<_, Subscriber>(
            r#"
            SELECT id, email, is_active, subscribed_at, unsubscribed_at
            FROM newsletter_subscribers
            ORDER BY subscribed_at DESC, id DESC
            "#,
        )
        .fetch_all(self)
        .await
    }
}
