mod gemini;
mod prompt;
mod validate;

pub use gemini::GeminiCli;
pub use validate::{check_self_contained, forbidden_modules};

use crate::error::LlmError;
use crate::github::FileUnit;
use async_trait::async_trait;
use std::path::PathBuf;

/// Free-form review text produced by the model. The pipeline treats it
/// as opaque content and renders it as-is.
#[derive(Debug, Clone, Default)]
pub struct ReviewNote {
    pub text: String,
}

impl ReviewNote {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One generated test module, keyed by the file it exercises.
#[derive(Debug, Clone)]
pub struct GeneratedTest {
    pub target: PathBuf,
    pub source: String,
}

/// The AI collaborator: one call per review, one call per generated
/// test file. Callers own retry and timeout policy.
#[async_trait]
pub trait LlmService: Send + Sync {
    fn name(&self) -> &'static str;

    async fn review(&self, files: &[FileUnit]) -> Result<ReviewNote, LlmError>;

    async fn generate_tests(
        &self,
        file: &FileUnit,
        note: &ReviewNote,
    ) -> Result<GeneratedTest, LlmError>;
}
