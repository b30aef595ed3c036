/// Decides whether a device's command output reports a failure.
///
/// Devices often exit 0 while still printing an error banner, so output is
/// inspected regardless of exit status.
pub trait ResponseClassifier: Send + Sync {
    /// `Err` carries the reason the output was judged a failure
    fn check(&self, output: &str) -> Result<(), String>;
}

/// Flags output containing any of a set of literal, case-sensitive keywords.
///
/// Known limitation: benign output that happens to contain a keyword (an
/// interface called `error-handler`, say) is reported as a failure.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl KeywordClassifier {
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(&["error", "invalid"])
    }
}

impl ResponseClassifier for KeywordClassifier {
    fn check(&self, output: &str) -> Result<(), String> {
        match self.keywords.iter().find(|k| output.contains(k.as_str())) {
            Some(keyword) => Err(format!("output contains '{}': {}", keyword, output.trim())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_output_passes() {
        let classifier = KeywordClassifier::default();
        assert!(classifier.check("configuration check succeeds\n").is_ok());
        assert!(classifier.check("").is_ok());
    }

    #[test]
    fn test_keywords_flag_failure() {
        let classifier = KeywordClassifier::default();
        let err = classifier.check("syntax error, expecting <command>").unwrap_err();
        assert!(err.contains("'error'"));
        assert!(classifier.check("invalid value for mtu").is_err());
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let classifier = KeywordClassifier::default();
        assert!(classifier.check("ERROR: commit failed").is_ok());
        assert!(classifier.check("Invalid input").is_ok());
    }

    #[test]
    fn test_known_false_positive() {
        let classifier = KeywordClassifier::default();
        assert!(classifier.check("interface error-handler is up").is_err());
    }

    #[test]
    fn test_custom_keywords() {
        let classifier = KeywordClassifier::new(&["% "]);
        assert!(classifier.check("% Invalid input detected").is_err());
        assert!(classifier.check("syntax error").is_ok());
    }
}
