use std::collections::HashMap;

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    storage::{Comment, CommentQuerier, CommentThread, DBPool, NewComment, PostQuerier},
};

use super::newsletter::normalize_email;

/// 公开渠道提交的评论
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentInput {
    pub post_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub author_name: String,
    pub author_email: Option<String>,
    pub content: String,
    pub content_en: Option<String>,
}

impl CommentInput {
    /// 校验必填字段 `post_id`、`author_name`、`content`
    pub fn validate(&self) -> Result<i64> {
        let mut missing = Vec::new();
        if self.post_id.is_none() {
            missing.push("post_id");
        }
        if self.author_name.trim().is_empty() {
            missing.push("author_name");
        }
        if self.content.trim().is_empty() {
            missing.push("content");
        }

        match self.post_id {
            Some(post_id) if missing.is_empty() => Ok(post_id),
            _ => Err(Error::MissingFields(missing)),
        }
    }
}

/// 将顶层评论与回复组装为线程
///
/// 顶层评论保持传入顺序，回复按传入顺序挂到对应父评论下，找不到父评论的回复被丢弃。
pub fn thread_comments(top_level: Vec<Comment>, replies: Vec<Comment>) -> Vec<CommentThread> {
    let mut by_parent: HashMap<i64, Vec<Comment>> = HashMap::new();
    for reply in replies {
        if let Some(parent_id) = reply.parent_id {
            by_parent.entry(parent_id).or_default().push(reply);
        }
    }

    top_level
        .into_iter()
        .map(|comment| {
            let replies = by_parent.remove(&comment.id).unwrap_or_default();
            CommentThread { comment, replies }
        })
        .collect()
}

/// 查询文章的已审核评论线程
///
/// 文章不存在或未发布时返回 404。
pub async fn list_comments(pool: &DBPool, post_id: i64) -> Result<Vec<CommentThread>> {
    if pool.published_post(post_id).await?.is_none() {
        return Err(Error::NotFound);
    }

    let top_level = pool.approved_top_level(post_id).await?;
    let ids: Vec<i64> = top_level.iter().map(|c| c.id).collect();
    let replies = pool.approved_replies(&ids).await?;

    Ok(thread_comments(top_level, replies))
}

/// 创建评论
///
/// 文章必须已发布；回复只能挂在同一文章的顶层评论下。
#[tracing::instrument(skip_all, fields(post_id = ?input.post_id))]
pub async fn create_comment(
    pool: &DBPool,
    input: CommentInput,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> Result<Comment> {
    let post_id = input.validate()?;

    let author_email = match input.author_email.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(email) => Some(normalize_email(email)?),
    };

    if pool.published_post(post_id).await?.is_none() {
        return Err(Error::NotFound);
    }

    if let Some(parent_id) = input.parent_id {
        match pool.comment_position(parent_id).await? {
            Some((parent_post, None)) if parent_post == post_id => {}
            Some(_) => {
                return Err(Error::invalid(
                    "Replies must target a top-level comment of the same post",
                ));
            }
            None => return Err(Error::invalid("Parent comment does not exist")),
        }
    }

    let content_en = input
        .content_en
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let comment = pool
        .insert_comment(&NewComment {
            post_id,
            parent_id: input.parent_id,
            author_name: input.author_name.trim(),
            author_email: author_email.as_deref(),
            content: input.content.trim(),
            content_en,
            ip_address: ip,
            user_agent,
        })
        .await?;

    tracing::info!(id = comment.id, "comment created");
    Ok(comment)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn comment(id: i64, parent_id: Option<i64>) -> Comment {
        Comment {
            id,
            post_id: 1,
            parent_id,
            author_name: format!("author-{id}"),
            content: "salom".into(),
            content_en: None,
            likes: 0,
            is_approved: true,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, id as u32).unwrap(),
        }
    }

    #[test]
    fn test_thread_comments_attaches_replies_in_order() {
        let threads = thread_comments(
            vec![comment(3, None), comment(1, None)],
            vec![comment(4, Some(1)), comment(5, Some(3)), comment(6, Some(1))],
        );

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment.id, 3);
        assert_eq!(
            threads[0].replies.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![5]
        );
        assert_eq!(threads[1].comment.id, 1);
        assert_eq!(
            threads[1].replies.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![4, 6]
        );
    }

    #[test]
    fn test_thread_comments_without_replies() {
        let threads = thread_comments(vec![comment(1, None)], vec![]);
        assert!(threads[0].replies.is_empty());
        assert!(thread_comments(vec![], vec![comment(2, Some(1))]).is_empty());
    }

    #[test]
    fn test_thread_serializes_flat() {
        let threads = thread_comments(vec![comment(1, None)], vec![comment(2, Some(1))]);
        let json = serde_json::to_value(&threads[0]).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["replies"][0]["parent_id"], 1);
    }

    #[test]
    fn test_comment_input_validation() {
        let input = CommentInput {
            post_id: None,
            author_name: " ".into(),
            content: "ok".into(),
            ..Default::default()
        };
        match input.validate() {
            Err(Error::MissingFields(fields)) => assert_eq!(fields, vec!["post_id", "author_name"]),
            other => panic!("unexpected: {other:?}"),
        }

        let input = CommentInput {
            post_id: Some(7),
            author_name: "Ali".into(),
            content: "Zo'r".into(),
            ..Default::default()
        };
        assert_eq!(input.validate().unwrap(), 7);
    }
}
