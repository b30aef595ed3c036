//! Critical-line comparison between a device's running config and the config
//! that was pushed to it.
//!
//! The expected text is reduced to its critical lines (hostname, interfaces,
//! addressing, routing) and each is looked for inside the current text. One
//! critical line found is enough to call it a match.

use crate::models::vendor;

/// Line prefixes considered load-bearing for correctness
pub const CRITICAL_PREFIXES: &[&str] = &["hostname", "interface", "ip address", "router", "network"];

/// Comment marker used by IOS-style configs
pub const DEFAULT_COMMENT_MARKER: &str = "!";

/// Split into trimmed lines, dropping blanks and comment lines
pub fn normalize_config(config: &str, comment_marker: &str) -> Vec<String> {
    config
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(comment_marker))
        .map(str::to_string)
        .collect()
}

pub fn is_critical_line(line: &str) -> bool {
    CRITICAL_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
}

/// True if `target` appears inside any of `lines`
pub fn contains_line(lines: &[String], target: &str) -> bool {
    lines.iter().any(|line| line.contains(target))
}

/// How many of the expected critical lines were found in the current config
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchReport {
    pub critical: usize,
    pub found: usize,
    pub missing: Vec<String>,
}

impl MatchReport {
    /// An expected config with no critical lines never matches.
    pub fn is_match(&self) -> bool {
        self.found > 0
    }
}

#[derive(Debug, Clone)]
pub struct ConfigComparator {
    comment_marker: String,
}

impl Default for ConfigComparator {
    fn default() -> Self {
        Self::new(DEFAULT_COMMENT_MARKER)
    }
}

impl ConfigComparator {
    pub fn new(comment_marker: &str) -> Self {
        Self {
            comment_marker: comment_marker.to_string(),
        }
    }

    /// Comparator using the comment marker of the vendor's config syntax
    pub fn for_vendor(vendor_tag: &str) -> Self {
        match vendor_tag {
            vendor::JUNIPER => Self::new("#"),
            _ => Self::default(),
        }
    }

    pub fn normalize(&self, config: &str) -> Vec<String> {
        normalize_config(config, &self.comment_marker)
    }

    pub fn compare(&self, current: &str, expected: &str) -> MatchReport {
        let current_lines = self.normalize(current);
        let mut report = MatchReport::default();

        for line in self.normalize(expected).into_iter().filter(|l| is_critical_line(l)) {
            report.critical += 1;
            if contains_line(&current_lines, &line) {
                report.found += 1;
            } else {
                report.missing.push(line);
            }
        }

        report
    }

    pub fn matches(&self, current: &str, expected: &str) -> bool {
        self.compare(current, expected).is_match()
    }
}

/// `ConfigComparator::default().matches(current, expected)`
pub fn config_matches(current: &str, expected: &str) -> bool {
    ConfigComparator::default().matches(current, expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_config() {
        let config = "\n! comment\nhostname r1\n   \n  interface Gi0/0/0  \n!\n description test\n";
        let lines = normalize_config(config, "!");
        assert_eq!(lines, vec!["hostname r1", "interface Gi0/0/0", "description test"]);
    }

    #[test]
    fn test_normalize_never_yields_blank_or_comment() {
        let inputs = [
            "",
            "\n\n\n",
            "!\n!!\n ! indented comment\n",
            "\t\r\n  \r\n",
            "hostname a\r\n!\r\n\r\ninterface b\r\n",
            "x\n \n!y\nz !\n",
        ];
        for input in inputs {
            for line in normalize_config(input, "!") {
                assert!(!line.is_empty(), "blank line from {:?}", input);
                assert!(!line.starts_with('!'), "comment line from {:?}", input);
            }
        }
    }

    #[test]
    fn test_is_critical_line() {
        assert!(is_critical_line("hostname X"));
        assert!(is_critical_line("interface X"));
        assert!(is_critical_line("ip address 10.0.0.1 255.255.255.0"));
        assert!(is_critical_line("router ospf 1"));
        assert!(is_critical_line("network 10.0.0.0 area 0"));

        assert!(!is_critical_line("description X"));
        assert!(!is_critical_line("shutdown"));
        assert!(!is_critical_line("mtu 1500"));
        assert!(!is_critical_line(""));
    }

    #[test]
    fn test_contains_line_is_substring_match() {
        let lines = vec!["ip address 10.0.0.1 255.255.255.0 secondary".to_string()];
        assert!(contains_line(&lines, "ip address 10.0.0.1 255.255.255.0"));
        assert!(!contains_line(&lines, "ip address 10.0.0.2"));
        assert!(!contains_line(&[], "hostname"));
    }

    #[test]
    fn test_config_matches_with_critical_lines() {
        let current = "hostname r1\ninterface Gi0/0/0\n";
        let expected = "hostname r1\ninterface Gi0/0/0\n description test\n";
        assert!(config_matches(current, expected));
    }

    #[test]
    fn test_config_mismatch_without_critical_lines() {
        let current = "description test\nshutdown\n";
        let expected = "hostname r1\n";
        assert!(!config_matches(current, expected));
    }

    #[test]
    fn test_expected_without_critical_lines_is_no_match() {
        let report = ConfigComparator::default().compare("hostname r1\n", "description only\nmtu 9000\n");
        assert_eq!(report.critical, 0);
        assert!(!report.is_match());
    }

    #[test]
    fn test_partial_match_is_still_a_match() {
        let comparator = ConfigComparator::default();
        let report = comparator.compare(
            "hostname r1\nversion 17.3\n",
            "hostname r1\ninterface Gi0/0/1\n ip address 10.1.1.1 255.255.255.0\n",
        );
        assert_eq!(report.critical, 3);
        assert_eq!(report.found, 1);
        assert_eq!(report.missing, vec!["interface Gi0/0/1", "ip address 10.1.1.1 255.255.255.0"]);
        assert!(report.is_match());
    }

    #[test]
    fn test_juniper_comment_marker() {
        let comparator = ConfigComparator::for_vendor(vendor::JUNIPER);
        let lines = comparator.normalize("## Last commit: 2024-01-01\nhostname sw1;\n# note\n");
        assert_eq!(lines, vec!["hostname sw1;"]);
    }
}
