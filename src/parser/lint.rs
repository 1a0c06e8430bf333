use super::{relativize, Finding, Severity};
use crate::error::ParserError;
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
struct RuffRow {
    /// Null for syntax errors.
    code: Option<String>,
    filename: String,
    location: RuffLocation,
    message: String,
}

#[derive(Deserialize)]
struct RuffLocation {
    row: u32,
}

/// Parse `ruff check --output-format=json` output into findings.
///
/// `root` is the directory the tool ran against; reported paths are made
/// relative to it so findings refer to repository paths.
pub fn parse_ruff_findings(raw: &str, root: &Path) -> Result<Vec<Finding>, ParserError> {
    let rows: Vec<RuffRow> = serde_json::from_str(raw)?;

    Ok(rows
        .into_iter()
        .map(|row| Finding {
            file: relativize(&row.filename, root),
            line: row.location.row,
            severity: severity_for_rule(row.code.as_deref()),
            code: row.code,
            message: row.message,
        })
        .collect())
}

/// Ruff has no severity field; derive one from the rule family.
/// Pyflakes (F) and flake8-bandit (S) rules point at real defects, style
/// families (E/W) are advisory. Syntax errors arrive with no rule code.
fn severity_for_rule(code: Option<&str>) -> Severity {
    match code {
        None => Severity::Medium,
        Some(c) if c.starts_with('F') || c.starts_with('S') => Severity::Medium,
        Some(c) if c.starts_with('E') || c.starts_with('W') => Severity::Low,
        Some(_) => Severity::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_ruff_rows() {
        let raw = r#"[
            {"code": "F821", "filename": "/work/mirror/src/db.py", "location": {"column": 5, "row": 12}, "message": "Undefined name `cursor`"},
            {"code": "E501", "filename": "/work/mirror/app.py", "location": {"column": 89, "row": 3}, "message": "Line too long (104 > 88)"}
        ]"#;
        let findings = parse_ruff_findings(raw, Path::new("/work/mirror")).unwrap();

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].file, PathBuf::from("src/db.py"));
        assert_eq!(findings[0].line, 12);
        assert_eq!(findings[0].severity, Severity::Medium);
        assert_eq!(findings[0].code.as_deref(), Some("F821"));
        assert_eq!(findings[1].severity, Severity::Low);
    }

    #[test]
    fn test_syntax_error_row_without_code() {
        let raw = r#"[
            {"code": null, "filename": "bad.py", "location": {"column": 1, "row": 7}, "message": "SyntaxError: invalid syntax"}
        ]"#;
        let findings = parse_ruff_findings(raw, Path::new("/tmp/x")).unwrap();

        assert_eq!(findings[0].severity, Severity::Medium);
        assert!(findings[0].code.is_none());
        assert_eq!(findings[0].file, PathBuf::from("bad.py"));
    }

    #[test]
    fn test_rule_family_mapping() {
        assert_eq!(severity_for_rule(Some("S602")), Severity::Medium);
        assert_eq!(severity_for_rule(Some("W291")), Severity::Low);
        assert_eq!(severity_for_rule(Some("N801")), Severity::Info);
    }

    #[test]
    fn test_garbage_output_is_an_error() {
        assert!(parse_ruff_findings("ruff: command exploded", Path::new(".")).is_err());
    }
}
