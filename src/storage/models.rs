use chrono::{DateTime, Utc};
use serde::Serialize;

/// 文章行
///
/// 标题、正文、摘要按语言分列存储：无后缀为乌兹别克语，`_en` 为英语。
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub title_en: String,
    pub content: String,
    pub content_en: String,
    pub excerpt: Option<String>,
    pub excerpt_en: Option<String>,
    pub slug: String,
    pub category_id: Option<i64>,
    pub featured_image: Option<String>,
    pub youtube_url: Option<String>,
    pub views: i64,
    pub likes: i64,
    pub dislikes: i64,
    pub is_published: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// 仅在首次发布时写入
    pub published_at: Option<DateTime<Utc>>,
}

/// 文章列表项，附带分类名称与已审核评论数
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PostSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub post: Post,
    pub category_name: Option<String>,
    pub category_name_en: Option<String>,
    pub comment_count: i64,
}

/// 文章详情，附带标签和媒体文件
#[derive(Debug, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub summary: PostSummary,
    pub tags: Vec<Tag>,
    pub media: Vec<Media>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub name_en: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Media {
    pub id: i64,
    pub post_id: Option<i64>,
    pub file_url: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// 点赞/点踩后的计数
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Reactions {
    pub likes: i64,
    pub dislikes: i64,
}

/// 分类及其已发布文章数
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub name_en: String,
    pub description: Option<String>,
    pub description_en: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub post_count: i64,
}

/// 搜索结果，不含正文
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SearchHit {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub title_en: String,
    pub excerpt: Option<String>,
    pub excerpt_en: Option<String>,
    pub featured_image: Option<String>,
    pub category_name: Option<String>,
    pub category_name_en: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// 公开评论，不包含邮箱与请求方信息
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_name: String,
    pub content: String,
    pub content_en: Option<String>,
    pub likes: i64,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

/// 顶层评论及其回复
#[derive(Debug, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

/// 管理后台的评论视图
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AdminComment {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub comment: Comment,
    pub author_email: Option<String>,
    pub ip_address: Option<String>,
    pub post_title: String,
    pub post_title_en: String,
    pub post_slug: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct AdminUser {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
}
