use sqlx::{Connection, PgConnection};

use crate::storage::PostStorage;

/// 解析逗号分隔的标签串
///
/// 去除首尾空白、丢弃空项，重复的名称只保留第一次出现。
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// 为文章写入标签关联
///
/// 每个标签在独立的保存点中执行“插入或取回 + 关联”，单个标签失败只回滚该保存点并记录日志，
/// 不影响文章本身的写入。返回成功关联的标签数。
pub async fn link_tags(conn: &mut PgConnection, post_id: i64, names: &[String]) -> usize {
    let mut linked = 0;
    for name in names {
        match link_one(conn, post_id, name).await {
            Ok(()) => linked += 1,
            Err(e) => tracing::warn!(%e, post_id, tag = %name, "skip tag"),
        }
    }
    linked
}

async fn link_one(conn: &mut PgConnection, post_id: i64, name: &str) -> Result<(), sqlx::Error> {
    let mut savepoint = conn.begin().await?;

    let result = async {
        let tag_id = savepoint.upsert_tag(name).await?;
        savepoint.link_tag(post_id, tag_id).await
    }
    .await;

    match result {
        Ok(()) => savepoint.commit().await,
        Err(e) => {
            savepoint.rollback().await.ok();
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags_dedupes_and_trims() {
        assert_eq!(parse_tags("IT, Travel, IT"), vec!["IT", "Travel"]);
    }

    #[test]
    fn test_parse_tags_drops_empty_items() {
        assert_eq!(parse_tags(" , rust,, ,web , "), vec!["rust", "web"]);
        assert!(parse_tags("").is_empty());
        assert!(parse_tags(" ,, ").is_empty());
    }

    #[test]
    fn test_parse_tags_is_case_sensitive() {
        // 标签名唯一约束区分大小写
        assert_eq!(parse_tags("Rust, rust"), vec!["Rust", "rust"]);
    }
}
