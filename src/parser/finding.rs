use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One lint or security finding, normalized across tools.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Finding {
    pub file: PathBuf,

    #[serde(default)]
    pub line: u32, // 0 means no specific line

    pub severity: Severity,

    /// Tool rule identifier, e.g. "F821" or "B602". Absent for syntax
    /// errors reported without a rule.
    #[serde(default)]
    pub code: Option<String>,

    pub message: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// Stable report ordering: file ascending, then line ascending.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));
}

/// Drop findings below the given severity floor.
pub fn at_or_above(findings: &[Finding], floor: Severity) -> Vec<Finding> {
    findings
        .iter()
        .filter(|f| f.severity >= floor)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(file: &str, line: u32, severity: Severity) -> Finding {
        Finding {
            file: PathBuf::from(file),
            line,
            severity,
            code: None,
            message: "m".to_string(),
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::Info);
    }

    #[test]
    fn test_severity_parse_case_insensitive() {
        assert_eq!("MEDIUM".parse::<Severity>().unwrap(), Severity::Medium);
        assert_eq!("High".parse::<Severity>().unwrap(), Severity::High);
        assert!("UNDEFINED".parse::<Severity>().is_err());
    }

    #[test]
    fn test_sort_by_file_then_line() {
        let mut findings = vec![
            finding("src/b.py", 10, Severity::Low),
            finding("src/a.py", 30, Severity::High),
            finding("src/b.py", 2, Severity::Medium),
            finding("src/a.py", 5, Severity::Info),
        ];
        sort_findings(&mut findings);

        let order: Vec<(String, u32)> = findings
            .iter()
            .map(|f| (f.file.display().to_string(), f.line))
            .collect();
        assert_eq!(
            order,
            vec![
                ("src/a.py".to_string(), 5),
                ("src/a.py".to_string(), 30),
                ("src/b.py".to_string(), 2),
                ("src/b.py".to_string(), 10),
            ]
        );
    }

    #[test]
    fn test_severity_floor_filters_below_medium() {
        let findings = vec![
            finding("a.py", 1, Severity::Info),
            finding("a.py", 2, Severity::Low),
            finding("a.py", 3, Severity::Medium),
            finding("a.py", 4, Severity::High),
        ];
        let kept = at_or_above(&findings, Severity::Medium);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|f| f.severity >= Severity::Medium));
    }
}
