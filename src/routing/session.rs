//! Session identifier extraction.
//!
//! Paths shaped like `/<sessionId>/<room>?...` address an existing logical
//! session living on one specific backend. Everything else is balanced by
//! pure rotation.
//!
//! # Design Decisions
//! - Exactly two slug segments plus a query string; no regex in the hot path
//! - Slug alphabet is alphanumeric, `-`, `_` for both segments

use axum::http::Uri;

/// Extract the session identifier from a session-addressed path, if any.
pub fn extract_session_id(uri: &Uri) -> Option<&str> {
    uri.query()?;

    let mut segments = uri.path().strip_prefix('/')?.split('/');
    let session_id = segments.next()?;
    let room = segments.next()?;
    if segments.next().is_some() {
        return None;
    }
    if !is_slug(session_id) || !is_slug(room) {
        return None;
    }
    Some(session_id)
}

fn is_slug(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_session_addressed_path() {
        assert_eq!(
            extract_session_id(&uri("/abc123/game?token=t")),
            Some("abc123")
        );
        assert_eq!(extract_session_id(&uri("/abc123/game?")), Some("abc123"));
        assert_eq!(
            extract_session_id(&uri("/se_ss-1/ro-om_2?x=1")),
            Some("se_ss-1")
        );
    }

    #[test]
    fn test_query_is_required() {
        assert_eq!(extract_session_id(&uri("/abc123/game")), None);
    }

    #[test]
    fn test_segment_count_must_be_two() {
        assert_eq!(extract_session_id(&uri("/abc123?x=1")), None);
        assert_eq!(extract_session_id(&uri("/a/b/c?x=1")), None);
        assert_eq!(extract_session_id(&uri("/?x=1")), None);
    }

    #[test]
    fn test_slug_alphabet() {
        assert_eq!(extract_session_id(&uri("/abc.123/game?x=1")), None);
        assert_eq!(extract_session_id(&uri("/abc123/ga%20me?x=1")), None);
    }
}
