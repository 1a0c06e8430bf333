use super::GeneratedTest;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

/// Module names a generated test must not import: every path component
/// of the files under review can resolve to a project module or package.
pub fn forbidden_modules<'a>(paths: impl IntoIterator<Item = &'a Path>) -> HashSet<String> {
    let mut modules = HashSet::new();
    for path in paths {
        for component in path.components() {
            let name = component.as_os_str().to_string_lossy();
            let stem = name.strip_suffix(".py").unwrap_or(&name);
            if !stem.is_empty() {
                modules.insert(stem.to_string());
            }
        }
    }
    modules
}

/// Reject a generated test that imports project code. Tests must embed
/// the code under test and lean only on stdlib and test tooling, so the
/// suite can run in an empty scratch directory.
pub fn check_self_contained(
    test: &GeneratedTest,
    forbidden: &HashSet<String>,
) -> Result<(), String> {
    let import_line = match Regex::new(r"^\s*(from|import)\s+(.+)$") {
        Ok(re) => re,
        Err(_) => return Ok(()),
    };

    for (idx, line) in test.source.lines().enumerate() {
        let Some(cap) = import_line.captures(line) else {
            continue;
        };
        let keyword = &cap[1];
        let rest = cap[2].trim();

        if keyword == "from" {
            if rest.starts_with('.') {
                return Err(format!("relative import on line {}", idx + 1));
            }
            let root = root_module(rest);
            if forbidden.contains(root) {
                return Err(format!("disallowed import '{}' on line {}", root, idx + 1));
            }
        } else {
            // `import a.b as c, d` names several modules on one line
            for target in rest.split(',') {
                let target = target.trim();
                let name = target.split_whitespace().next().unwrap_or(target);
                let root = root_module(name);
                if forbidden.contains(root) {
                    return Err(format!("disallowed import '{}' on line {}", root, idx + 1));
                }
            }
        }
    }

    Ok(())
}

fn root_module(name: &str) -> &str {
    let end = name
        .find(|c: char| c == '.' || c.is_whitespace())
        .unwrap_or(name.len());
    &name[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_with(source: &str) -> GeneratedTest {
        GeneratedTest {
            target: PathBuf::from("src/db.py"),
            source: source.to_string(),
        }
    }

    fn forbidden() -> HashSet<String> {
        forbidden_modules([Path::new("src/db.py"), Path::new("app.py")])
    }

    #[test]
    fn test_forbidden_covers_packages_and_stems() {
        let modules = forbidden();
        assert!(modules.contains("src"));
        assert!(modules.contains("db"));
        assert!(modules.contains("app"));
        assert!(!modules.contains("pytest"));
    }

    #[test]
    fn test_clean_test_accepted() {
        let test = test_with(
            "import pytest\nfrom unittest.mock import patch\n\ndef add(a, b):\n    return a + b\n\ndef test_add():\n    assert add(1, 2) == 3\n",
        );
        assert!(check_self_contained(&test, &forbidden()).is_ok());
    }

    #[test]
    fn test_project_import_rejected() {
        let test = test_with("import pytest\nimport db\n\ndef test_x():\n    pass\n");
        let err = check_self_contained(&test, &forbidden()).unwrap_err();
        assert!(err.contains("'db'"));
        assert!(err.contains("line 2"));
    }

    #[test]
    fn test_from_package_import_rejected() {
        let test = test_with("from src.db import connect\n");
        let err = check_self_contained(&test, &forbidden()).unwrap_err();
        assert!(err.contains("'src'"));
    }

    #[test]
    fn test_relative_import_rejected() {
        let test = test_with("from . import helpers\n");
        assert!(check_self_contained(&test, &forbidden()).is_err());
    }

    #[test]
    fn test_multi_import_line_scanned() {
        let test = test_with("import os, app\n");
        let err = check_self_contained(&test, &forbidden()).unwrap_err();
        assert!(err.contains("'app'"));
    }

    #[test]
    fn test_commented_import_ignored() {
        let test = test_with("# import db  (kept for reference)\nimport pytest\n");
        assert!(check_self_contained(&test, &forbidden()).is_ok());
    }

    #[test]
    fn test_import_as_alias_checked() {
        let test = test_with("import db as database\n");
        assert!(check_self_contained(&test, &forbidden()).is_err());
    }
}
