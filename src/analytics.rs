//! 管理后台统计
//!
//! 数据库只提供原始计数，增长率、互动率、平均浏览量和最近动态在这里计算。

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    storage::{AnalyticsCounts, AnalyticsQuerier, DBPool, RecentComment, RecentPost, TopPost},
};

/// 排行与最近动态的条数
const TOP_LIMIT: i64 = 5;

/// 展示日期所用时区（塔什干，UTC+5，无夏令时）
const DISPLAY_OFFSET_SECS: i32 = 5 * 3600;

/// 统计窗口
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Range {
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
}

impl Range {
    pub fn days(self) -> i32 {
        match self {
            Range::Week => 7,
            Range::Month => 30,
            Range::Quarter => 90,
        }
    }
}

/// 增长百分比
///
/// 前一窗口为 0 时返回 0；下降按 0 展示。
pub fn growth(current: i64, previous: i64) -> i64 {
    if previous <= 0 {
        return 0;
    }
    let pct = ((current - previous) as f64 / previous as f64 * 100.0).round() as i64;
    pct.max(0)
}

/// 互动率：评论数 / 浏览量，百分比，上限 100
pub fn engagement_rate(comments: i64, views: i64) -> i64 {
    if views <= 0 {
        return 0;
    }
    ((comments as f64 / views as f64 * 100.0).round() as i64).clamp(0, 100)
}

/// 平均每篇文章浏览量
pub fn average_views(views: i64, posts: i64) -> i64 {
    if posts <= 0 {
        return 0;
    }
    (views as f64 / posts as f64).round() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Post,
    Comment,
}

/// 最近动态条目
#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub kind: ActivityKind,
    pub id: i64,
    pub post_id: i64,
    /// 文章标题，评论时为所属文章标题
    pub title: String,
    pub title_en: String,
    /// 评论作者，文章动态为空
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub at: DateTime<Utc>,
    /// 本地化日期字符串，如 `19.10.2026 14:05`
    pub date: String,
}

fn display_date(at: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(DISPLAY_OFFSET_SECS) {
        Some(offset) => at.with_timezone(&offset).format("%d.%m.%Y %H:%M").to_string(),
        None => at.format("%d.%m.%Y %H:%M").to_string(),
    }
}

/// 合并最近发布的文章与评论，新的在前
pub fn recent_activity(posts: Vec<RecentPost>, comments: Vec<RecentComment>) -> Vec<Activity> {
    let mut feed: Vec<Activity> = posts
        .into_iter()
        .map(|p| Activity {
            kind: ActivityKind::Post,
            id: p.id,
            post_id: p.id,
            title: p.title,
            title_en: p.title_en,
            author: None,
            date: display_date(p.published_at),
            at: p.published_at,
        })
        .chain(comments.into_iter().map(|c| Activity {
            kind: ActivityKind::Comment,
            id: c.id,
            post_id: c.post_id,
            title: c.post_title,
            title_en: c.post_title_en,
            author: Some(c.author_name),
            date: display_date(c.created_at),
            at: c.created_at,
        }))
        .collect();

    feed.sort_by(|a, b| b.at.cmp(&a.at));
    feed
}

#[derive(Debug, Serialize)]
pub struct Overview {
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
}

#[derive(Debug, Serialize)]
pub struct Growth {
    pub posts: i64,
    pub views: i64,
    pub comments: i64,
}

/// 统计报告
#[derive(Debug, Serialize)]
pub struct AnalyticsReport {
    pub range: Range,
    pub overview: Overview,
    pub growth: Growth,
    pub average_views_per_post: i64,
    pub engagement_rate: i64,
    pub top_posts: Vec<TopPost>,
    pub recent_activity: Vec<Activity>,
}

impl AnalyticsReport {
    pub fn build(
        range: Range,
        counts: AnalyticsCounts,
        top_posts: Vec<TopPost>,
        recent_posts: Vec<RecentPost>,
        recent_comments: Vec<RecentComment>,
    ) -> Self {
        Self {
            range,
            growth: Growth {
                posts: growth(counts.posts_current, counts.posts_previous),
                views: growth(counts.views_current, counts.views_previous),
                comments: growth(counts.comments_current, counts.comments_previous),
            },
            average_views_per_post: average_views(counts.total_views, counts.total_posts),
            engagement_rate: engagement_rate(counts.total_comments, counts.total_views),
            overview: Overview {
                total_posts: counts.total_posts,
                published_posts: counts.published_posts,
                draft_posts: counts.draft_posts,
                total_views: counts.total_views,
                total_likes: counts.total_likes,
                total_dislikes: counts.total_dislikes,
                total_comments: counts.total_comments,
                comment_likes: counts.comment_likes,
                active_subscribers: counts.active_subscribers,
                total_subscribers: counts.total_subscribers,
            },
            top_posts,
            recent_activity: recent_activity(recent_posts, recent_comments),
        }
    }
}

/// 汇总统计数据
#[tracing::instrument(skip(pool))]
pub async fn compute_analytics(pool: &DBPool, range: Range) -> Result<AnalyticsReport> {
    let counts = pool.counts(range.days()).await?;
    let top_posts = pool.top_posts(TOP_LIMIT).await?;
    let recent_posts = pool.recent_posts(TOP_LIMIT).await?;
    let recent_comments = pool.recent_comments(TOP_LIMIT).await?;

    Ok(AnalyticsReport::build(
        range,
        counts,
        top_posts,
        recent_posts,
        recent_comments,
    ))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_growth_guards_zero_previous() {
        assert_eq!(growth(5, 0), 0);
        assert_eq!(growth(0, 0), 0);
    }

    #[test]
    fn test_growth_rounds_and_floors_at_zero() {
        assert_eq!(growth(15, 10), 50);
        assert_eq!(growth(4, 3), 33);
        assert_eq!(growth(2, 3), 0);
        assert_eq!(growth(10, 10), 0);
    }

    #[test]
    fn test_engagement_rate_clamped() {
        assert_eq!(engagement_rate(5, 0), 0);
        assert_eq!(engagement_rate(1, 3), 33);
        assert_eq!(engagement_rate(50, 10), 100);
        assert_eq!(engagement_rate(0, 10), 0);
    }

    #[test]
    fn test_average_views() {
        assert_eq!(average_views(100, 0), 0);
        assert_eq!(average_views(10, 4), 3);
        assert_eq!(average_views(10, 3), 3);
    }

    #[test]
    fn test_range_from_query_value() {
        let range: Range = serde_json::from_str("\"7d\"").unwrap();
        assert_eq!(range.days(), 7);
        assert_eq!(Range::default().days(), 30);
        assert!(serde_json::from_str::<Range>("\"1y\"").is_err());
    }

    #[test]
    fn test_recent_activity_merged_newest_first() {
        let at = |h| Utc.with_ymd_and_hms(2026, 10, 19, h, 0, 0).unwrap();
        let feed = recent_activity(
            vec![
                RecentPost {
                    id: 1,
                    slug: "a".into(),
                    title: "A".into(),
                    title_en: "A".into(),
                    published_at: at(9),
                },
                RecentPost {
                    id: 2,
                    slug: "b".into(),
                    title: "B".into(),
                    title_en: "B".into(),
                    published_at: at(7),
                },
            ],
            vec![RecentComment {
                id: 10,
                post_id: 1,
                author_name: "Ali".into(),
                content: "zo'r".into(),
                post_title: "A".into(),
                post_title_en: "A".into(),
                created_at: at(8),
            }],
        );

        let order: Vec<(ActivityKind, i64)> = feed.iter().map(|a| (a.kind, a.id)).collect();
        assert_eq!(
            order,
            vec![
                (ActivityKind::Post, 1),
                (ActivityKind::Comment, 10),
                (ActivityKind::Post, 2)
            ]
        );
        // 09:00 UTC 在塔什干为 14:00
        assert_eq!(feed[0].date, "19.10.2026 14:00");
        assert_eq!(feed[1].author.as_deref(), Some("Ali"));
    }

    #[test]
    fn test_report_from_counts() {
        let counts = AnalyticsCounts {
            total_posts: 4,
            published_posts: 3,
            draft_posts: 1,
            total_views: 10,
            total_comments: 20,
            posts_current: 5,
            posts_previous: 0,
            views_current: 6,
            views_previous: 4,
            ..Default::default()
        };

        let report = AnalyticsReport::build(Range::Week, counts, vec![], vec![], vec![]);

        assert_eq!(report.growth.posts, 0);
        assert_eq!(report.growth.views, 50);
        assert_eq!(report.average_views_per_post, 3);
        assert_eq!(report.engagement_rate, 100);
        assert!(report.recent_activity.is_empty());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["range"], "7d");
        assert_eq!(json["overview"]["draft_posts"], 1);
    }
}
