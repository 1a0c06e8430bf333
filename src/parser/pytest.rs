use crate::error::ParserError;
use regex::Regex;

/// Counts and coverage pulled out of a pytest run's stdout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestSummary {
    pub passed: u32,
    pub failed: u32,
    /// Percentage from the coverage TOTAL row, when coverage ran.
    pub coverage: Option<f32>,
}

/// Parse the tail of a pytest run, e.g.
/// `==== 3 passed, 1 failed in 0.21s ====` plus an optional coverage table.
///
/// Collection errors count as failures; they mean a test never ran.
pub fn parse_pytest_output(stdout: &str) -> Result<TestSummary, ParserError> {
    let passed = count_for(stdout, "passed");
    let failed = count_for(stdout, "failed");
    let errors = count_for(stdout, "error");

    if passed.is_none() && failed.is_none() && errors.is_none() && !no_tests_ran(stdout) {
        return Err(ParserError::InvalidFormat(
            "no pytest summary line found".to_string(),
        ));
    }

    Ok(TestSummary {
        passed: passed.unwrap_or(0),
        failed: failed.unwrap_or(0) + errors.unwrap_or(0),
        coverage: parse_coverage(stdout),
    })
}

fn count_for(stdout: &str, label: &str) -> Option<u32> {
    let re = Regex::new(&format!(r"(\d+) {}s?\b", label)).ok()?;
    re.captures_iter(stdout)
        .last()
        .and_then(|cap| cap.get(1)?.as_str().parse().ok())
}

fn no_tests_ran(stdout: &str) -> bool {
    stdout.contains("no tests ran") || stdout.contains("collected 0 items")
}

fn parse_coverage(stdout: &str) -> Option<f32> {
    let re = Regex::new(r"(?m)^TOTAL\s+.*?(\d+(?:\.\d+)?)%\s*$").ok()?;
    re.captures(stdout)
        .and_then(|cap| cap.get(1)?.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_outcome() {
        let stdout = "\
test_db.py::test_query_builds PASSED
test_db.py::test_injection_guard FAILED
========================= 3 passed, 1 failed in 0.21s =========================
";
        let summary = parse_pytest_output(stdout).unwrap();
        assert_eq!(summary.passed, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.coverage, None);
    }

    #[test]
    fn test_parse_all_passed_with_coverage() {
        let stdout = "\
..... [100%]

---------- coverage: platform linux, python 3.12.1-final-0 ----------
Name                Stmts   Miss  Cover
---------------------------------------
test_app.py            41      4    90%
test_db.py             16      2    88%
---------------------------------------
TOTAL                  57      6    89%

============================== 5 passed in 0.34s ===============================
";
        let summary = parse_pytest_output(stdout).unwrap();
        assert_eq!(summary.passed, 5);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.coverage, Some(89.0));
    }

    #[test]
    fn test_collection_errors_count_as_failures() {
        let stdout = "=================== 2 passed, 1 error in 0.10s ===================";
        let summary = parse_pytest_output(stdout).unwrap();
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_no_tests_ran() {
        let stdout = "============================ no tests ran in 0.01s ============================";
        let summary = parse_pytest_output(stdout).unwrap();
        assert_eq!(summary.passed, 0);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn test_unrecognizable_output_is_an_error() {
        assert!(parse_pytest_output("Segmentation fault").is_err());
    }
}
