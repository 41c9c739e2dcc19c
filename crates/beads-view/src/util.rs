//! Timestamp parsing and snapshot fingerprinting.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sha2::{Digest, Sha256};

use crate::model::Issue;

// ============================================================================
// Timestamps
// ============================================================================

/// Parse a timestamp as written by either store.
///
/// Accepts RFC 3339 (JSONL export) and SQLite `DATETIME` text
/// (`YYYY-MM-DD HH:MM:SS[.fff]`, assumed UTC). Returns `None` for
/// anything else.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Most recent `updated_at` across `issues`, if any parsed.
#[must_use]
pub fn newest_update(issues: &[Issue]) -> Option<DateTime<Utc>> {
    issues.iter().filter_map(|i| i.updated_at).max()
}

// ============================================================================
// Fingerprint
// ============================================================================

/// Order-independent fingerprint of a snapshot.
///
/// SHA256 over the sorted `id:updated_at` pairs. Changes whenever the id
/// set or any issue's last-update value changes, including values that do
/// not parse as timestamps.
#[must_use]
pub fn snapshot_fingerprint(issues: &[Issue]) -> String {
    let mut pairs: Vec<String> = issues
        .iter()
        .map(|issue| format!("{}:{}", issue.id, issue.updated_at_text()))
        .collect();
    pairs.sort_unstable();

    let mut hasher = Sha256::new();
    for pair in &pairs {
        hasher.update(pair.as_bytes());
        hasher.update(b"\x00");
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    fn issue(id: &str, updated: &str) -> Issue {
        Issue {
            id: id.to_string(),
            updated_at: parse_timestamp(updated),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_rfc3339() {
        let ts = parse_timestamp("2024-03-01T10:20:30+02:00").unwrap();
        assert_eq!(ts.hour(), 8);
    }

    #[test]
    fn test_parse_sqlite_datetime() {
        let ts = parse_timestamp("2024-03-01 10:20:30").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 10, 20, 30).unwrap());
        let frac = parse_timestamp("2024-03-01 10:20:30.125").unwrap();
        assert_eq!(frac.timestamp_subsec_millis(), 125);
    }

    #[test]
    fn test_parse_date_only_and_garbage() {
        assert_eq!(parse_timestamp("2024-03-01").unwrap().day(), 1);
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("   ").is_none());
    }

    #[test]
    fn test_newest_update() {
        let issues = vec![
            issue("a", "2024-01-01T00:00:00Z"),
            issue("b", "2024-06-01T00:00:00Z"),
            issue("c", "bogus"),
        ];
        assert_eq!(
            newest_update(&issues),
            parse_timestamp("2024-06-01T00:00:00Z")
        );
        assert!(newest_update(&[issue("x", "")]).is_none());
    }

    #[test]
    fn test_fingerprint_order_independent() {
        let a = vec![
            issue("bd-1", "2024-01-01T00:00:00Z"),
            issue("bd-2", "2024-01-02T00:00:00Z"),
        ];
        let b = vec![a[1].clone(), a[0].clone()];
        assert_eq!(snapshot_fingerprint(&a), snapshot_fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_tracks_ids_and_updates() {
        let base = vec![issue("bd-1", "2024-01-01T00:00:00Z")];
        let touched = vec![issue("bd-1", "2024-01-01T00:00:01Z")];
        let grown = vec![
            issue("bd-1", "2024-01-01T00:00:00Z"),
            issue("bd-2", "2024-01-01T00:00:00Z"),
        ];
        let fp = snapshot_fingerprint(&base);
        assert_ne!(fp, snapshot_fingerprint(&touched));
        assert_ne!(fp, snapshot_fingerprint(&grown));
        assert_eq!(fp.len(), 64);
    }

    #[test]
    fn test_fingerprint_tracks_unparsed_updates() {
        let mut a = issue("bd-1", "");
        a.unparsed_updated_at = Some("rev 1".to_string());
        let mut b = a.clone();
        b.unparsed_updated_at = Some("rev 2".to_string());
        assert_ne!(snapshot_fingerprint(&[a.clone()]), snapshot_fingerprint(&[b]));
        assert_ne!(snapshot_fingerprint(&[a]), snapshot_fingerprint(&[issue("bd-1", "")]));
    }

    #[test]
    fn test_fingerprint_ignores_other_fields() {
        let a = issue("bd-1", "2024-01-01T00:00:00Z");
        let mut b = a.clone();
        b.title = "renamed".to_string();
        assert_eq!(snapshot_fingerprint(&[a]), snapshot_fingerprint(&[b]));
    }
}
