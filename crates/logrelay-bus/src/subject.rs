//! NATS-style subject matching
//!
//! Subjects are dot separated tokens. In a pattern `*` matches exactly one
//! token and a trailing `>` matches one or more tokens.

pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut pattern_tokens = pattern.split('.');
    let mut subject_tokens = subject.split('.');

    loop {
        match (pattern_tokens.next(), subject_tokens.next()) {
            (Some(">"), Some(_)) => return true,
            (Some("*"), Some(_)) => continue,
            (Some(p), Some(s)) if p == s => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        assert!(subject_matches("logger.set", "logger.set"));
        assert!(!subject_matches("logger.set", "logger.del"));
        assert!(!subject_matches("logger", "logger.set"));
    }

    #[test]
    fn test_single_token_wildcard() {
        assert!(subject_matches("*", "service"));
        assert!(!subject_matches("*", "service.create"));
        assert!(subject_matches("*.*", "service.create"));
        assert!(subject_matches("*.*.*.*", "a.b.c.d"));
        assert!(!subject_matches("*.*.*.*", "a.b.c.d.e"));
    }

    #[test]
    fn test_full_wildcard() {
        assert!(subject_matches(">", "a"));
        assert!(subject_matches(">", "a.b.c.d.e"));
        assert!(subject_matches("logger.>", "logger.set"));
        assert!(!subject_matches("logger.>", "logger"));
    }

    #[test]
    fn test_wildcard_depths_are_disjoint() {
        let patterns = ["*", "*.*", "*.*.*", "*.*.*.*"];
        for subject in ["a", "a.b", "a.b.c", "a.b.c.d"] {
            let hits = patterns
                .iter()
                .filter(|p| subject_matches(p, subject))
                .count();
            assert_eq!(hits, 1, "subject {subject} matched {hits} patterns");
        }
    }
}
