use time::format_description::FormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Maximum number of characters kept by [`compact_snippet`].
pub const SNIPPET_LIMIT: usize = 160;

const ELLIPSIS: &str = "...";

static LOCAL_MINUTE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// Parse an RFC 3339 timestamp, with or without fractional seconds.
///
/// Returns `None` for empty or malformed input so callers can treat the value as
/// "no usable timestamp".
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    OffsetDateTime::parse(value, &Rfc3339).ok()
}

/// Render a timestamp as RFC 3339 for search keys and JSON output.
#[must_use]
pub fn format_rfc3339(ts: Option<OffsetDateTime>) -> Option<String> {
    ts.and_then(|value| value.format(&Rfc3339).ok())
}

/// Render a timestamp in the local offset at minute precision.
#[must_use]
pub fn format_local_minute(ts: Option<OffsetDateTime>) -> String {
    let Some(ts) = ts else {
        return "unknown".to_string();
    };
    let local = UtcOffset::current_local_offset()
        .map(|offset| ts.to_offset(offset))
        .unwrap_or(ts);
    local
        .format(LOCAL_MINUTE_FORMAT)
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Trim, collapse whitespace runs, and cap the result at [`SNIPPET_LIMIT`] characters.
#[must_use]
pub fn compact_snippet(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, SNIPPET_LIMIT)
}

/// Truncate text for a table cell, using `-` for empty input.
#[must_use]
pub fn truncate_text(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.is_empty() {
        return "-".to_string();
    }
    truncate_chars(text, max)
}

/// Keep the tail of a long path, prefixing it with `...`.
#[must_use]
pub fn abbreviate_path(path: &str, max: usize) -> String {
    let count = path.chars().count();
    if max == 0 || count <= max {
        return path.to_string();
    }
    if max <= ELLIPSIS.len() {
        return path.chars().take(max).collect();
    }
    let keep = max - ELLIPSIS.len();
    let tail: String = path.chars().skip(count - keep).collect();
    format!("{ELLIPSIS}{tail}")
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= ELLIPSIS.len() {
        return text.chars().take(max).collect();
    }
    let mut out: String = text.chars().take(max - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}
