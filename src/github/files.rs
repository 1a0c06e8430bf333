use crate::config::FileFilter;
use crate::error::ConfigError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Compiled include/exclude matcher applied to changed-file paths.
pub struct FileSelector {
    include: GlobSet,
    exclude: GlobSet,
}

impl FileSelector {
    pub fn new(filter: &FileFilter) -> Result<Self, ConfigError> {
        Ok(Self {
            include: build_globset(&filter.include)?,
            exclude: build_globset(&filter.exclude)?,
        })
    }

    pub fn selects(&self, path: &Path) -> bool {
        self.include.is_match(path) && !self.exclude.is_match(path)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ConfigError::GlobPattern {
            pattern: pattern.clone(),
            source: e,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ConfigError::GlobPattern {
        pattern: patterns.join(", "),
        source: e,
    })
}
