use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Seoul is UTC+9 with no daylight saving.
const KST_OFFSET_SECS: i32 = 9 * 3600;

fn kst() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECS).expect("valid KST offset")
}

/// Current calendar date in KST.
pub fn kst_today() -> NaiveDate {
    Utc::now().with_timezone(&kst()).date_naive()
}

/// Current KST timestamp as an RFC 3339 string, for record audit columns.
pub fn kst_now_iso() -> String {
    Utc::now().with_timezone(&kst()).to_rfc3339()
}

/// Parses the publish-date shapes the sources emit: RFC-2822-style
/// (`Tue, 04 Aug 2026 09:30:00 +0900`), RFC 3339, or a `YYYY-MM-DD`
/// prefix. Returns `None` for anything else, including relative dates.
pub fn parse_publish_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_str(trimmed, "%a, %d %b %Y %H:%M:%S %z") {
        return Some(parsed.date_naive());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.date_naive());
    }
    if let Some(prefix) = trimmed.get(..10) {
        if let Ok(parsed) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(parsed);
        }
    }

    None
}
