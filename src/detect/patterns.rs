//! Compiled detection pattern tables.

use once_cell::sync::Lazy;
use regex::Regex;

/// One named signature.
pub struct Pattern {
    /// Stable identifier carried into event metadata.
    pub reason: &'static str,
    pub regex: Regex,
}

fn pattern(reason: &'static str, source: &str) -> Pattern {
    Pattern {
        reason,
        regex: Regex::new(source).expect("detection pattern is valid"),
    }
}

/// Signatures applied to every non-excluded string leaf of the payload.
pub static INJECTION_PATTERNS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    vec![
        pattern(
            "sql_keyword",
            r"(?i)\b(select|insert|update|delete|drop|create|alter|exec|union|script)\b",
        ),
        pattern("sql_metacharacter", r#"(--|/\*|\*/|;|'|")"#),
        pattern("boolean_injection", r#"(?i)\b(or|and)\b\s*['"\w]{0,20}\s*(=|<|>)"#),
        pattern("time_based_injection", r"(?i)\b(waitfor|delay)\b"),
        pattern("extended_procedure", r"(?i)\b(xp|sp)_\w+"),
    ]
});

/// Signatures applied to the full request URI plus the serialized
/// body and query.
pub static SUSPICIOUS_PATTERNS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    vec![
        pattern("path_traversal", r"\.\.[/\\]"),
        pattern("script_tag", r"(?i)<script"),
        pattern("union_select", r"(?i)union\s+select"),
        pattern("code_execution", r"(?i)\bexec\s*\("),
    ]
});

/// First injection signature matching `text`, if any.
pub fn match_injection(text: &str) -> Option<&'static str> {
    INJECTION_PATTERNS
        .iter()
        .find(|p| p.regex.is_match(text))
        .map(|p| p.reason)
}

/// First suspicious signature matching `text`, if any.
pub fn match_suspicious(text: &str) -> Option<&'static str> {
    SUSPICIOUS_PATTERNS
        .iter()
        .find(|p| p.regex.is_match(text))
        .map(|p| p.reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_keywords_match_case_insensitively() {
        assert_eq!(match_injection("select * from users"), Some("sql_keyword"));
        assert_eq!(match_injection("DROP TABLE users"), Some("sql_keyword"));
        assert_eq!(match_injection("a selection of goods"), None);
    }

    #[test]
    fn metacharacters_match() {
        assert_eq!(match_injection("a -- comment"), Some("sql_metacharacter"));
        assert_eq!(match_injection("x; y"), Some("sql_metacharacter"));
        assert_eq!(match_injection("it's"), Some("sql_metacharacter"));
    }

    #[test]
    fn boolean_shapes_match() {
        assert_eq!(match_injection("1 OR 1=1"), Some("boolean_injection"));
        assert_eq!(match_injection("x AND y > 2"), Some("boolean_injection"));
        assert_eq!(match_injection("either or neither"), None);
    }

    #[test]
    fn time_based_and_procedures_match() {
        assert_eq!(match_injection("WAITFOR x"), Some("time_based_injection"));
        assert_eq!(match_injection("xp_cmdshell"), Some("extended_procedure"));
        assert_eq!(match_injection("sp_help"), Some("extended_procedure"));
    }

    #[test]
    fn suspicious_signatures_match() {
        assert_eq!(match_suspicious("../../etc/passwd"), Some("path_traversal"));
        assert_eq!(match_suspicious("<SCRIPT>x"), Some("script_tag"));
        assert_eq!(match_suspicious("1 UNION  SELECT 2"), Some("union_select"));
        assert_eq!(match_suspicious("exec (cmd)"), Some("code_execution"));
        assert_eq!(match_suspicious("/api/v1/posts"), None);
    }

    #[test]
    fn benign_prose_is_clean() {
        assert_eq!(match_injection("hello world"), None);
        assert_eq!(match_suspicious("a perfectly normal sentence."), None);
    }
}
