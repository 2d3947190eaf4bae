//! Whole-request suspicious signature scanning.

use serde_json::Value;

use crate::detect::patterns::match_suspicious;

/// Test the full request URI plus the serialized body and query against
/// the suspicious signature set. No per-path exclusions: this detector
/// looks at the payload as one serialized blob.
pub fn scan_request(uri: &str, body: &Value, query: &Value) -> Option<&'static str> {
    if let Some(reason) = match_suspicious(uri) {
        return Some(reason);
    }
    let serialized = format!("{body} {query}");
    match_suspicious(&serialized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flags_traversal_in_uri() {
        let empty = json!({});
        assert_eq!(
            scan_request("/files?path=../../etc/passwd", &empty, &empty),
            Some("path_traversal")
        );
    }

    #[test]
    fn flags_script_tag_in_body() {
        let body = json!({"comment": "<script>alert(1)</script>"});
        assert_eq!(
            scan_request("/api/comments", &body, &json!({})),
            Some("script_tag")
        );
    }

    #[test]
    fn flags_union_select_in_query() {
        let query = json!({"q": "1 union select password from users"});
        assert_eq!(
            scan_request("/search", &json!({}), &query),
            Some("union_select")
        );
    }

    #[test]
    fn no_exclusions_apply_here() {
        // Even a prose field is flagged: this detector has no notion of
        // field paths.
        let body = json!({"content": "see ../../notes"});
        assert_eq!(
            scan_request("/api/posts", &body, &json!({})),
            Some("path_traversal")
        );
    }

    #[test]
    fn clean_request_passes() {
        let body = json!({"title": "hello"});
        assert_eq!(scan_request("/api/posts", &body, &json!({"page": "2"})), None);
    }
}
