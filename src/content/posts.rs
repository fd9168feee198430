use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    storage::{DBPool, PostDetail, PostQuerier, PostStorage, PostSummary},
};

use super::tags::{link_tags, parse_tags};

/// 新建或整体更新文章时的输入
///
/// 字符串在 [`PostInput::normalized`] 中去除首尾空白，空的可选字段视为未填写。
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PostInput {
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
    pub is_published: bool,
    pub is_featured: bool,
    /// 逗号分隔的标签串
    pub tags: Option<String>,
}

impl PostInput {
    pub fn normalized(mut self) -> Self {
        fn trim(s: &mut String) {
            *s = s.trim().to_string();
        }
        fn blank_to_none(s: Option<String>) -> Option<String> {
            s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        }

        trim(&mut self.title);
        trim(&mut self.title_en);
        trim(&mut self.slug);
        self.excerpt = blank_to_none(self.excerpt);
        self.excerpt_en = blank_to_none(self.excerpt_en);
        self.featured_image = blank_to_none(self.featured_image);
        self.youtube_url = blank_to_none(self.youtube_url);
        self
    }

    /// 校验必填字段，返回全部缺失的字段名
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&'static str> = [
            ("title", &self.title),
            ("title_en", &self.title_en),
            ("content", &self.content),
            ("content_en", &self.content_en),
            ("slug", &self.slug),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingFields(missing))
        }
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.tags.as_deref().map(parse_tags).unwrap_or_default()
    }
}

/// 文章互动类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Dislike,
}

/// 计算更新后的发布时间
///
/// 只有从未发布变为发布、且此前没有发布时间时才写入当前时间，其余情况保持原值。
pub fn next_published_at(
    was_published: bool,
    publishing: bool,
    previous: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match previous {
        None if !was_published && publishing => Some(now),
        _ => previous,
    }
}

/// slug 唯一约束
const SLUG_CONSTRAINT: &str = "posts_slug_key";

/// 并发写入同一 slug 时，输掉的一方在唯一约束上失败，同样按冲突处理
fn slug_conflict(e: sqlx::Error) -> Error {
    match &e {
        sqlx::Error::Database(db)
            if db.is_unique_violation() && db.constraint() == Some(SLUG_CONSTRAINT) =>
        {
            Error::Conflict("Slug already exists")
        }
        _ => Error::Sqlx(e),
    }
}

/// 创建文章
///
/// 文章写入与标签关联处于同一事务；标签逐个使用保存点，失败的标签被跳过。
#[tracing::instrument(skip_all, fields(slug = %input.slug))]
pub async fn create_post(pool: &DBPool, input: PostInput) -> Result<i64> {
    let input = input.normalized();
    input.validate()?;

    let mut tx = pool.begin().await?;

    if tx.slug_taken(&input.slug, None).await? {
        return Err(Error::Conflict("Slug already exists"));
    }

    let published_at = input.is_published.then(Utc::now);
    let id = tx
        .insert_post(&input, published_at)
        .await
        .map_err(slug_conflict)?;

    let names = input.tag_names();
    let linked = link_tags(&mut tx, id, &names).await;

    tx.commit().await?;
    tracing::info!(id, tags = linked, "post created");
    Ok(id)
}

/// 整体更新文章
///
/// 原有标签关联被全部删除后按新的标签串重建，空标签串意味着没有标签。
#[tracing::instrument(skip(pool, input))]
pub async fn update_post(pool: &DBPool, id: i64, input: PostInput) -> Result<()> {
    let input = input.normalized();
    input.validate()?;

    let mut tx = pool.begin().await?;

    let (was_published, previous) = tx.publish_state(id).await?.ok_or(Error::NotFound)?;

    if tx.slug_taken(&input.slug, Some(id)).await? {
        return Err(Error::Conflict("Slug already exists"));
    }

    let published_at = next_published_at(was_published, input.is_published, previous, Utc::now());
    tx.update_post(id, &input, published_at)
        .await
        .map_err(slug_conflict)?;

    tx.clear_tags(id).await?;
    let names = input.tag_names();
    let linked = link_tags(&mut tx, id, &names).await;

    tx.commit().await?;
    tracing::info!(tags = linked, "post updated");
    Ok(())
}

/// 补全文章的标签与媒体
pub async fn post_detail(pool: &DBPool, summary: PostSummary) -> Result<PostDetail> {
    let id = summary.post.id;
    let tags = pool.post_tags(id).await?;
    let media = pool.post_media(id).await?;

    Ok(PostDetail {
        summary,
        tags,
        media,
    })
}

#[cfg(test)]
mod tests {
    use std::{borrow::Cow, error::Error as StdError, fmt};

    use chrono::TimeZone;
    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    /// 模拟数据库返回的约束错误
    #[derive(Debug)]
    struct ConstraintError {
        unique: bool,
        constraint: &'static str,
    }

    impl fmt::Display for ConstraintError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "violates constraint {}", self.constraint)
        }
    }

    impl StdError for ConstraintError {}

    impl DatabaseError for ConstraintError {
        fn message(&self) -> &str {
            "constraint violation"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(if self.unique { "23505" } else { "23503" }))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            Some(self.constraint)
        }

        fn kind(&self) -> ErrorKind {
            if self.unique {
                ErrorKind::UniqueViolation
            } else {
                ErrorKind::ForeignKeyViolation
            }
        }
    }

    fn db_error(unique: bool, constraint: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(ConstraintError { unique, constraint }))
    }

    #[test]
    fn test_slug_unique_violation_is_conflict() {
        let err = slug_conflict(db_error(true, SLUG_CONSTRAINT));
        assert!(matches!(err, Error::Conflict("Slug already exists")));

        let err = slug_conflict(db_error(true, "tags_name_key"));
        assert!(matches!(err, Error::Sqlx(_)));

        let err = slug_conflict(db_error(false, SLUG_CONSTRAINT));
        assert!(matches!(err, Error::Sqlx(_)));

        assert!(matches!(slug_conflict(sqlx::Error::PoolTimedOut), Error::Sqlx(_)));
    }

    fn complete() -> PostInput {
        PostInput {
            title: "Salom".into(),
            title_en: "Hello".into(),
            content: "Matn".into(),
            content_en: "Text".into(),
            slug: "hello".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_complete_input() {
        assert!(complete().validate().is_ok());
    }

    #[test]
    fn test_validate_lists_exactly_missing_fields() {
        let input = PostInput {
            title_en: "   ".into(),
            slug: String::new(),
            ..complete()
        };

        match input.validate() {
            Err(Error::MissingFields(fields)) => assert_eq!(fields, vec!["title_en", "slug"]),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_validate_everything_missing() {
        match PostInput::default().validate() {
            Err(Error::MissingFields(fields)) => {
                assert_eq!(fields, vec!["title", "title_en", "content", "content_en", "slug"])
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_normalized_blanks_optional_fields() {
        let input = PostInput {
            slug: "  hello ".into(),
            excerpt: Some("  ".into()),
            youtube_url: Some(" https://youtu.be/x ".into()),
            ..complete()
        }
        .normalized();

        assert_eq!(input.slug, "hello");
        assert!(input.excerpt.is_none());
        assert_eq!(input.youtube_url.as_deref(), Some("https://youtu.be/x"));
    }

    #[test]
    fn test_tag_names() {
        let input = PostInput {
            tags: Some("IT, Travel, IT".into()),
            ..complete()
        };
        assert_eq!(input.tag_names(), vec!["IT", "Travel"]);
        assert!(complete().tag_names().is_empty());
    }

    #[test]
    fn test_published_at_set_on_first_publish() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(next_published_at(false, true, None, now), Some(now));
    }

    #[test]
    fn test_published_at_preserved_otherwise() {
        let then = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();

        // 重新发布不覆盖首次发布时间
        assert_eq!(next_published_at(false, true, Some(then), now), Some(then));
        // 保持发布
        assert_eq!(next_published_at(true, true, Some(then), now), Some(then));
        // 撤回发布不清空
        assert_eq!(next_published_at(true, false, Some(then), now), Some(then));
        // 草稿保持草稿
        assert_eq!(next_published_at(false, false, None, now), None);
    }

    #[test]
    fn test_reaction_kind_from_json() {
        let kind: ReactionKind = serde_json::from_str("\"dislike\"").unwrap();
        assert_eq!(kind, ReactionKind::Dislike);
        assert!(serde_json::from_str::<ReactionKind>("\"love\"").is_err());
    }
}
