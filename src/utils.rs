// utils.rs - Duration parsing, display formatting and video classification helpers

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ISO_DURATION: Regex = Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$").unwrap();
    static ref STATISTIC_PATTERN: Regex =
        Regex::new(r"\d+%|\d+\s*(million|billion|thousand|percent)").unwrap();
    static ref HOOK_SECTION: Regex =
        Regex::new(r"(?is)\[HOOK\](.*?)(?:\[INTRO\]|\[BODY\]|\[SECTION|\[CONCLUSION\]|$)").unwrap();
    static ref SENTENCE_SPLIT: Regex = Regex::new(r"[.!?]+").unwrap();
}

/// Parse an ISO-8601 duration such as `PT1H5M30S` into whole seconds.
/// Anything that doesn't match, or doesn't fit in an `i64`, returns 0.
pub fn parse_duration(iso: &str) -> i64 {
    let Some(caps) = ISO_DURATION.captures(iso.trim()) else {
        return 0;
    };

    let part = |i: usize| -> Option<i64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse::<i64>().ok(),
            None => Some(0),
        }
    };

    let (Some(hours), Some(minutes), Some(secs)) = (part(1), part(2), part(3)) else {
        return 0;
    };

    hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .and_then(|total| total.checked_add(secs))
        .unwrap_or(0)
}

/// `M:SS` under an hour, `H:MM:SS` otherwise
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

pub fn format_view_count(views: Option<i64>) -> String {
    match views {
        None => "0 views".to_string(),
        Some(v) if v >= 1_000_000 => format!("{:.1}M views", v as f64 / 1_000_000.0),
        Some(v) if v >= 1_000 => format!("{:.0}K views", v as f64 / 1_000.0),
        Some(v) => format!("{} views", v),
    }
}

/// Relative publish time ("3 days ago"). Months are 30 days and years 365.
pub fn format_time_ago(published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(published_at) = published_at else {
        return "Recently".to_string();
    };

    let diff = now.signed_duration_since(published_at);
    let days = diff.num_days();

    let (amount, unit) = if days >= 365 {
        (days / 365, "year")
    } else if days >= 30 {
        (days / 30, "month")
    } else if days > 0 {
        (days, "day")
    } else if diff.num_hours() > 0 {
        (diff.num_hours(), "hour")
    } else {
        (diff.num_minutes().max(0), "minute")
    };

    format!("{} {}{} ago", amount, unit, if amount == 1 { "" } else { "s" })
}

/// A video is short-form only when its duration is known and under the threshold.
pub fn is_short(duration_seconds: Option<i64>, threshold: i64) -> bool {
    matches!(duration_seconds, Some(d) if d < threshold)
}

/// Tier label used by the viral researcher. Lower bounds are inclusive.
pub fn view_bucket(views: i64) -> &'static str {
    match views {
        v if v >= 1_000_000 => "1M+",
        v if v >= 100_000 => "100k-1M",
        v if v >= 50_000 => "50-100k",
        v if v >= 10_000 => "10-50k",
        v if v >= 5_000 => "5-10k",
        _ => "under-5k",
    }
}

pub const VIEW_BUCKETS: [&str; 6] = ["under-5k", "5-10k", "10-50k", "50-100k", "100k-1M", "1M+"];

// ============================================================================
// Hook classification
// ============================================================================

const QUESTION_OPENERS: [&str; 5] = ["what if", "have you", "did you", "why do", "how do"];

const KEYWORD_CATEGORIES: [(&str, &[&str]); 6] = [
    ("shock", &["shocking", "unbelievable", "insane", "crazy", "mind-blowing", "never believe"]),
    ("challenge", &["challenge", "tried", "attempted", "tested", "experiment"]),
    ("promise", &["will show", "going to reveal", "learn how", "discover", "secret"]),
    ("story", &["story", "when i", "one day", "happened", "remember when"]),
    ("controversy", &["wrong", "lie", "truth", "nobody tells", "controversial", "unpopular"]),
    ("curiosity", &["curious", "wonder", "mystery", "strange", "weird", "hidden"]),
];

/// Rule-based category for an opening hook. First matching rule wins.
pub fn detect_hook_category(hook: &str) -> &'static str {
    let text = hook.trim().to_lowercase();

    if text.contains('?') || QUESTION_OPENERS.iter().any(|q| text.starts_with(q)) {
        return "question";
    }
    if STATISTIC_PATTERN.is_match(&text) {
        return "statistic";
    }

    KEYWORD_CATEGORIES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or("other")
}

/// Pull the `[HOOK]` section out of a generated script, falling back to its
/// first two sentences.
pub fn extract_hook(script: &str) -> Option<String> {
    if let Some(section) = HOOK_SECTION.captures(script).and_then(|c| c.get(1)) {
        let hook = section.as_str().trim();
        if hook.chars().count() > 10 {
            return Some(hook.to_string());
        }
    }

    let sentences: Vec<&str> = SENTENCE_SPLIT
        .split(script)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    match sentences.len() {
        0 => None,
        1 => Some(format!("{}.", sentences[0])),
        _ => Some(format!("{}. {}.", sentences[0], sentences[1])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("PT1H5M30S"), 3930);
        assert_eq!(parse_duration("PT45S"), 45);
        assert_eq!(parse_duration("PT10M"), 600);
        assert_eq!(parse_duration("PT2H"), 7200);
        assert_eq!(parse_duration("PT0S"), 0);
        assert_eq!(parse_duration(""), 0);
        // Day-level durations are not produced by the video API
        assert_eq!(parse_duration("P1DT2H"), 0);
        assert_eq!(parse_duration("garbage"), 0);
    }

    #[test]
    fn test_parse_duration_out_of_range_is_zero() {
        assert_eq!(parse_duration("PT9999999999999999H"), 0);
        assert_eq!(parse_duration("PT99999999999999999999S"), 0);
        assert_eq!(parse_duration("PT1H9223372036854775807S"), 0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(45), "0:45");
        assert_eq!(format_duration(600), "10:00");
        assert_eq!(format_duration(3930), "1:05:30");
    }

    #[test]
    fn test_format_view_count() {
        assert_eq!(format_view_count(None), "0 views");
        assert_eq!(format_view_count(Some(12)), "12 views");
        assert_eq!(format_view_count(Some(450_000)), "450K views");
        assert_eq!(format_view_count(Some(1_200_000)), "1.2M views");
    }

    #[test]
    fn test_format_time_ago() {
        let now = Utc::now();
        assert_eq!(format_time_ago(None, now), "Recently");
        assert_eq!(format_time_ago(Some(now - Duration::days(400)), now), "1 year ago");
        assert_eq!(format_time_ago(Some(now - Duration::days(65)), now), "2 months ago");
        assert_eq!(format_time_ago(Some(now - Duration::days(1)), now), "1 day ago");
        assert_eq!(format_time_ago(Some(now - Duration::hours(5)), now), "5 hours ago");
        assert_eq!(format_time_ago(Some(now - Duration::minutes(1)), now), "1 minute ago");
    }

    #[test]
    fn test_is_short() {
        assert!(is_short(Some(30), 60));
        assert!(!is_short(Some(60), 60));
        assert!(!is_short(Some(500), 60));
        // Unknown duration is never treated as short
        assert!(!is_short(None, 60));
    }

    #[test]
    fn test_view_bucket_boundaries() {
        assert_eq!(view_bucket(0), "under-5k");
        assert_eq!(view_bucket(4_999), "under-5k");
        assert_eq!(view_bucket(5_000), "5-10k");
        assert_eq!(view_bucket(10_000), "10-50k");
        assert_eq!(view_bucket(50_000), "50-100k");
        assert_eq!(view_bucket(99_999), "50-100k");
        assert_eq!(view_bucket(100_000), "100k-1M");
        assert_eq!(view_bucket(999_999), "100k-1M");
        assert_eq!(view_bucket(1_000_000), "1M+");
    }

    #[test]
    fn test_detect_hook_category() {
        assert_eq!(detect_hook_category("What if everything you knew was fake"), "question");
        assert_eq!(detect_hook_category("Is this the end of coding?"), "question");
        assert_eq!(detect_hook_category("90% of creators get this wrong"), "statistic");
        assert_eq!(detect_hook_category("This is absolutely insane"), "shock");
        assert_eq!(detect_hook_category("I tried living on $1 a day"), "challenge");
        assert_eq!(detect_hook_category("Today you'll discover the method"), "promise");
        assert_eq!(detect_hook_category("One day my laptop caught fire"), "story");
        assert_eq!(detect_hook_category("Here is the truth about diets"), "controversy");
        assert_eq!(detect_hook_category("A strange signal from space"), "curiosity");
        assert_eq!(detect_hook_category("Let's build a table"), "other");
    }

    #[test]
    fn test_extract_hook() {
        let script = "[HOOK]\nThis one mistake cost me a million views.\n[INTRO]\nWelcome back.";
        assert_eq!(
            extract_hook(script).as_deref(),
            Some("This one mistake cost me a million views.")
        );

        // No marker: first two sentences
        let plain = "First line here. Second line here! Third line.";
        assert_eq!(extract_hook(plain).as_deref(), Some("First line here. Second line here."));

        assert_eq!(extract_hook(""), None);
    }
}
