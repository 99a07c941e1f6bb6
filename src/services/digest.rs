//! Digest rendering.
//!
//! Output uses Slack's mrkdwn link syntax (`<url|label>`).

use crate::models::{MergeRequest, TimestampField};
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Render the reminder text for `requests`.
///
/// `now` is taken explicitly so identical input renders identical bytes.
pub fn render_digest<'a, I>(requests: I, field: TimestampField, now: DateTime<Utc>) -> String
where
    I: IntoIterator<Item = &'a MergeRequest>,
    I::IntoIter: ExactSizeIterator,
{
    let requests = requests.into_iter();
    let mut out = format!("{} merge requests waiting for your approval\n", requests.len());

    for mr in requests {
        let age = mr
            .age_in_days(field, now)
            .map_or_else(|| "n/a".to_string(), |d| d.to_string());
        // Writing to a String cannot fail.
        let _ = write!(
            out,
            "\n<{}|{}> ({}) - {} days",
            mr.web_url,
            escape_mrkdwn(&mr.title),
            escape_mrkdwn(&mr.author_username),
            age
        );
    }

    out
}

/// Escape the three characters Slack treats as control sequences.
pub fn escape_mrkdwn(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn mr(iid: i64, title: &str, author: &str, hours_ago: i64) -> MergeRequest {
        MergeRequest {
            id: iid,
            iid,
            project_id: 1,
            title: title.to_string(),
            web_url: format!("https://gitlab.com/g/p/-/merge_requests/{}", iid),
            author_username: author.to_string(),
            created_at: Some(now() - Duration::hours(hours_ago * 2)),
            updated_at: Some(now() - Duration::hours(hours_ago)),
            reviewers: vec![],
            draft: false,
        }
    }

    #[test]
    fn test_render_digest() {
        let requests = vec![mr(1, "Add login", "carol", 100), mr(2, "Fix typo", "dave", 47)];
        let text = render_digest(&requests, TimestampField::Updated, now());

        assert_eq!(
            text,
            "2 merge requests waiting for your approval\n\
             \n<https://gitlab.com/g/p/-/merge_requests/1|Add login> (carol) - 4 days\
             \n<https://gitlab.com/g/p/-/merge_requests/2|Fix typo> (dave) - 1 days"
        );
    }

    #[test]
    fn test_uses_selected_field() {
        let requests = vec![mr(1, "Add login", "carol", 100)];
        let text = render_digest(&requests, TimestampField::Created, now());
        // created 200h ago
        assert!(text.ends_with("(carol) - 8 days"));
    }

    #[test]
    fn test_deterministic() {
        let requests = vec![mr(1, "A", "carol", 80), mr(2, "B", "dave", 90)];
        let first = render_digest(&requests, TimestampField::Updated, now());
        let second = render_digest(&requests, TimestampField::Updated, now());
        assert_eq!(first, second);
    }

    #[test]
    fn test_escapes_title() {
        let requests = vec![mr(1, "Use <T> & friends", "carol", 80)];
        let text = render_digest(&requests, TimestampField::Updated, now());
        assert!(text.contains("|Use &lt;T&gt; &amp; friends>"));
    }

    #[test]
    fn test_missing_timestamp_renders_na() {
        let mut request = mr(1, "A", "carol", 80);
        request.updated_at = None;
        let text = render_digest(std::slice::from_ref(&request), TimestampField::Updated, now());
        assert!(text.ends_with("(carol) - n/a days"));
    }

    #[test]
    fn test_empty_digest() {
        let text = render_digest(&Vec::<MergeRequest>::new(), TimestampField::Updated, now());
        assert_eq!(text, "0 merge requests waiting for your approval\n");
    }
}
