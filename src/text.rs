//! Text handler: the single place that decides how ids are compared and how
//! lengths are measured.

/// Comparison + length rules used by the catalog, resolver and processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextHandler {
    case_sensitive: bool,
}

impl Default for TextHandler {
    fn default() -> Self {
        Self::new(false)
    }
}

impl TextHandler {
    pub fn new(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn equals(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
        }
    }

    /// Lookup key for hash tables keyed by command/option id.
    pub fn normalize(&self, s: &str) -> String {
        if self.case_sensitive {
            s.to_string()
        } else {
            s.to_lowercase()
        }
    }

    /// Length in characters (not bytes).
    pub fn len(&self, s: &str) -> usize {
        s.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::TextHandler;

    #[test]
    fn insensitive_by_default() {
        let text = TextHandler::default();
        assert!(text.equals("Root1", "root1"));
        assert_eq!(text.normalize("GRP1"), "grp1");
    }

    #[test]
    fn sensitive_mode() {
        let text = TextHandler::new(true);
        assert!(!text.equals("Root1", "root1"));
        assert_eq!(text.normalize("GRP1"), "GRP1");
    }

    #[test]
    fn length_counts_chars() {
        let text = TextHandler::default();
        assert_eq!(text.len("héllo"), 5);
    }
}
