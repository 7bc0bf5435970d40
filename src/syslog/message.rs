use chrono::{DateTime, Datelike, Duration, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Priority assumed for messages without a `<PRI>` part (user.notice)
pub const DEFAULT_PRIORITY: u8 = 13;

/// A decoded syslog message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub tag: Option<String>,
    /// Sender address as `host:port`
    pub client: Option<String>,
    pub priority: Option<u8>,
    pub facility: Option<u8>,
    pub severity: Option<u8>,
    pub hostname: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub content: String,
}

impl LogRecord {
    /// A record carrying only a message body
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            tag: None,
            client: None,
            priority: None,
            facility: None,
            severity: None,
            hostname: None,
            timestamp: None,
            content: content.into(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(client.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

fn header_regex() -> &'static Regex {
    static HEADER_REGEX: OnceLock<Regex> = OnceLock::new();
    HEADER_REGEX.get_or_init(|| {
        // Jan  1 00:00:00 hostname rest-of-message
        Regex::new(
            r"(?s)^(?P<timestamp>[A-Z][a-z]{2}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2})\s+(?P<hostname>\S+)\s+(?P<rest>.*)$",
        )
        .expect("valid regex")
    })
}

fn tag_regex() -> &'static Regex {
    static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    TAG_REGEX.get_or_init(|| {
        // process[pid]: message
        Regex::new(r"(?s)^(?P<tag>[^\s\[\]:]{1,48})(?:\[(?P<pid>[^\]]*)\])?:\s?(?P<content>.*)$")
            .expect("valid regex")
    })
}

/// Decode an RFC 3164 (BSD syslog) line.
///
/// Decoding is best effort and never fails: whatever part of the header is
/// missing is left unset and the remainder becomes the message content.
/// Header timestamps carry no year, so the year of `now` is assumed, rolled
/// back by one when that would place the message more than a day ahead.
pub fn parse_rfc3164(line: &str, client: Option<&str>, now: DateTime<Utc>) -> LogRecord {
    let line = line.trim_end_matches(['\r', '\n', '\0']);

    let (priority, rest) = split_priority(line);
    let mut record = LogRecord::from_content(rest);
    record.client = client.map(str::to_string);
    record.priority = Some(priority.unwrap_or(DEFAULT_PRIORITY));
    record.facility = record.priority.map(|p| p / 8);
    record.severity = record.priority.map(|p| p % 8);

    let body = match header_regex().captures(rest) {
        Some(caps) => {
            record.timestamp = parse_header_timestamp(&caps["timestamp"], now);
            record.hostname = Some(caps["hostname"].to_string());
            caps.name("rest").map_or("", |m| m.as_str())
        }
        None => rest,
    };

    match tag_regex().captures(body) {
        Some(caps) => {
            record.tag = Some(caps["tag"].to_string());
            record.content = caps["content"].to_string();
        }
        None => record.content = body.to_string(),
    }

    record
}

fn split_priority(line: &str) -> (Option<u8>, &str) {
    let Some(rest) = line.strip_prefix('<') else {
        return (None, line);
    };
    let Some((digits, rest)) = rest.split_once('>') else {
        return (None, line);
    };
    if digits.is_empty() || digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return (None, line);
    }
    match digits.parse::<u8>() {
        Ok(priority) if priority <= 191 => (Some(priority), rest),
        _ => (None, line),
    }
}

fn parse_header_timestamp(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let parse_in_year = |year: i32| {
        NaiveDateTime::parse_from_str(&format!("{} {}", year, normalized), "%Y %b %d %H:%M:%S")
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive))
    };

    let timestamp = parse_in_year(now.year())?;
    if timestamp - now > Duration::days(1) {
        return parse_in_year(now.year() - 1);
    }
    Some(timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_full_message() {
        let record = parse_rfc3164(
            "<34>Oct 11 22:14:15 mymachine su[231]: 'su root' failed for lonvick on /dev/pts/8",
            Some("10.0.0.1:514"),
            now(),
        );

        assert_eq!(record.priority, Some(34));
        assert_eq!(record.facility, Some(4));
        assert_eq!(record.severity, Some(2));
        assert_eq!(record.hostname.as_deref(), Some("mymachine"));
        assert_eq!(record.tag.as_deref(), Some("su"));
        assert_eq!(record.client.as_deref(), Some("10.0.0.1:514"));
        assert_eq!(
            record.content,
            "'su root' failed for lonvick on /dev/pts/8"
        );
        assert_eq!(
            record.timestamp,
            Some(Utc.with_ymd_and_hms(2026, 10, 11, 22, 14, 15).unwrap())
        );
    }

    #[test]
    fn test_space_padded_day() {
        let record = parse_rfc3164("<13>Feb  5 17:32:18 host app: hello", None, now());
        assert_eq!(
            record.timestamp,
            Some(Utc.with_ymd_and_hms(2026, 2, 5, 17, 32, 18).unwrap())
        );
        assert_eq!(record.tag.as_deref(), Some("app"));
        assert_eq!(record.content, "hello");
    }

    #[test]
    fn test_year_rollover() {
        let now = Utc.with_ymd_and_hms(2027, 1, 1, 0, 5, 0).unwrap();
        let record = parse_rfc3164("<13>Dec 31 23:59:59 host app: late", None, now);
        assert_eq!(
            record.timestamp,
            Some(Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap())
        );
    }

    #[test]
    fn test_multiline_content_preserved() {
        let record = parse_rfc3164(
            "<11>Oct 11 22:14:15 web01 app1[42]: panic: boom\n  at main.rs:10\n",
            None,
            now(),
        );
        assert_eq!(record.tag.as_deref(), Some("app1"));
        assert_eq!(record.hostname.as_deref(), Some("web01"));
        assert_eq!(record.content, "panic: boom\n  at main.rs:10");
    }

    #[test]
    fn test_missing_priority_defaults_to_user_notice() {
        let record = parse_rfc3164("Oct 11 22:14:15 host app: no pri", None, now());
        assert_eq!(record.priority, Some(DEFAULT_PRIORITY));
        assert_eq!(record.facility, Some(1));
        assert_eq!(record.severity, Some(5));
        assert_eq!(record.content, "no pri");
    }

    #[test]
    fn test_headerless_line_is_content_only() {
        let record = parse_rfc3164("<14>just some text without header", None, now());
        assert_eq!(record.priority, Some(14));
        assert_eq!(record.hostname, None);
        assert_eq!(record.timestamp, None);
        assert_eq!(record.tag, None);
        assert_eq!(record.content, "just some text without header");
    }

    #[test]
    fn test_message_without_tag() {
        let record = parse_rfc3164("<14>Oct 11 22:14:15 host free form text", None, now());
        assert_eq!(record.hostname.as_deref(), Some("host"));
        assert_eq!(record.tag, None);
        assert_eq!(record.content, "free form text");
    }

    #[test]
    fn test_invalid_priority_kept_in_content() {
        let record = parse_rfc3164("<999>text", None, now());
        assert_eq!(record.priority, Some(DEFAULT_PRIORITY));
        assert_eq!(record.content, "<999>text");
    }

    #[test]
    fn test_trailing_newline_stripped() {
        let record = parse_rfc3164("<13>Oct 11 22:14:15 host app: hi\n", None, now());
        assert_eq!(record.content, "hi");
    }
}
