use std::{fmt::Write, sync::LazyLock};

use chrono::SecondsFormat;
use regex::Regex;

use crate::{
    error::{Error, Result},
    storage::Subscriber,
};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// 校验邮箱格式并转为小写
pub fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(Error::MissingFields(vec!["email"]));
    }
    if !EMAIL.is_match(email) {
        return Err(Error::invalid("Invalid email address"));
    }
    Ok(email.to_lowercase())
}

/// 导出订阅者为 CSV
pub fn subscribers_csv(subscribers: &[Subscriber]) -> String {
    let mut out = String::from("email,is_active,subscribed_at,unsubscribed_at\n");
    for s in subscribers {
        let unsubscribed = s
            .unsubscribed_at
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default();
        // 写入 String 不会失败
        let _ = writeln!(
            out,
            "{},{},{},{}",
            csv_field(&s.email),
            s.is_active,
            s.subscribed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            unsubscribed
        );
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
