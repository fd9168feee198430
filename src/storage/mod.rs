mod admin;
mod analytics;
mod catalog;
mod comments;
mod models;
mod newsletter;
mod posts;
mod postgres;

pub use self::{
    admin::{AdminQuerier, NewMedia},
    analytics::{AnalyticsCounts, AnalyticsQuerier, RecentComment, RecentPost, TopPost},
    catalog::CatalogQuerier,
    comments::{CommentQuerier, ModerationStatus, NewComment},
    models::{
        AdminComment, AdminUser, Category, Comment, CommentThread, Media, Post, PostDetail,
        PostSummary, Reactions, SearchHit, Subscriber, Tag,
    },
    newsletter::NewsletterQuerier,
    posts::{MAX_PAGE_SIZE, PostFilter, PostQuerier, PostStorage},
    postgres::{DBPool, SCHEMA, migrate, new_db_pool},
};

/// 转义 LIKE/ILIKE 模式中的通配符，使用户输入按字面匹配
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_off\\"), "100\\%\\_off\\\\");
        assert_eq!(escape_like("salom"), "salom");
    }
}
