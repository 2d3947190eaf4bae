//! Field-by-field injection scanning.

use serde_json::Value;
use std::collections::HashSet;

use crate::detect::patterns::match_injection;

/// Location and cause of an injection match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionFinding {
    /// Dotted/bracketed payload path, e.g. `body.items[2].name`.
    pub path: String,
    pub reason: &'static str,
}

/// Scan payload sections for injection signatures, honoring the
/// exclusion list. Returns the first finding, if any.
///
/// Exclusions are exact paths; an excluded path skips its entire
/// subtree — those fields carry generated prose that legitimately
/// contains pattern-matching substrings.
pub fn scan_sections(
    sections: &[(&str, &Value)],
    exclusions: &HashSet<String>,
) -> Option<InjectionFinding> {
    for (name, value) in sections {
        if let Some(finding) = walk(value, name, exclusions) {
            return Some(finding);
        }
    }
    None
}

fn walk(value: &Value, path: &str, exclusions: &HashSet<String>) -> Option<InjectionFinding> {
    if exclusions.contains(path) {
        return None;
    }
    match value {
        Value::String(s) => match_injection(s).map(|reason| InjectionFinding {
            path: path.to_string(),
            reason,
        }),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, v)| walk(v, &format!("{path}[{i}]"), exclusions)),
        Value::Object(fields) => fields
            .iter()
            .find_map(|(key, v)| walk(v, &format!("{path}.{key}"), exclusions)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exclusions(paths: &[&str]) -> HashSet<String> {
        paths.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn finds_match_with_nested_path() {
        let body = json!({"items": [{"name": "ok"}, {"name": "1' OR '1'='1"}]});
        let finding = scan_sections(&[("body", &body)], &HashSet::new()).unwrap();
        assert_eq!(finding.path, "body.items[1].name");
    }

    #[test]
    fn excluded_path_never_matches() {
        let body = json!({"content": "SELECT * FROM users; DROP TABLE users"});
        let excluded = exclusions(&["body.content"]);
        assert_eq!(scan_sections(&[("body", &body)], &excluded), None);
    }

    #[test]
    fn same_substring_matches_outside_exclusions() {
        let payload = "SELECT * FROM users";
        let excluded = exclusions(&["body.content"]);

        let clean = json!({"content": payload});
        assert_eq!(scan_sections(&[("body", &clean)], &excluded), None);

        let dirty = json!({"summary": payload});
        let finding = scan_sections(&[("body", &dirty)], &excluded).unwrap();
        assert_eq!(finding.path, "body.summary");
        assert_eq!(finding.reason, "sql_keyword");
    }

    #[test]
    fn exclusion_covers_subtrees() {
        let body = json!({"content": {"blocks": ["DROP TABLE x"]}});
        let excluded = exclusions(&["body.content"]);
        assert_eq!(scan_sections(&[("body", &body)], &excluded), None);
    }

    #[test]
    fn scans_multiple_sections() {
        let body = json!({"a": "fine"});
        let query = json!({"q": "1; DELETE FROM t"});
        let finding = scan_sections(&[("body", &body), ("query", &query)], &HashSet::new()).unwrap();
        assert_eq!(finding.path, "query.q");
    }

    #[test]
    fn non_string_leaves_are_ignored() {
        let body = json!({"n": 7, "b": true, "x": null});
        assert_eq!(scan_sections(&[("body", &body)], &HashSet::new()), None);
    }
}
