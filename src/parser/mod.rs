mod code;
mod finding;
mod lint;
mod pytest;
mod security;

pub use code::extract_code_block;
pub use finding::{at_or_above, sort_findings, Finding, Severity};
pub use lint::parse_ruff_findings;
pub use pytest::{parse_pytest_output, TestSummary};
pub use security::parse_bandit_findings;

use std::path::{Path, PathBuf};

/// Map a path reported by a tool back to a repository-relative path.
///
/// Tools run against a temporary mirror of the changed files, so their
/// output carries mirror-absolute or `./`-prefixed paths.
pub(crate) fn relativize(reported: &str, root: &Path) -> PathBuf {
    let path = Path::new(reported);
    if let Ok(stripped) = path.strip_prefix(root) {
        return stripped.to_path_buf();
    }
    match path.strip_prefix("./") {
        Ok(stripped) => stripped.to_path_buf(),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relativize_mirror_absolute() {
        assert_eq!(
            relativize("/tmp/autorev-x1/src/db.py", Path::new("/tmp/autorev-x1")),
            PathBuf::from("src/db.py")
        );
    }

    #[test]
    fn test_relativize_dot_slash() {
        assert_eq!(
            relativize("./src/db.py", Path::new("/tmp/other")),
            PathBuf::from("src/db.py")
        );
    }

    #[test]
    fn test_relativize_already_relative() {
        assert_eq!(
            relativize("src/db.py", Path::new("/tmp/mirror")),
            PathBuf::from("src/db.py")
        );
    }
}
