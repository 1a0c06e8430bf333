use super::ReviewNote;
use crate::github::FileUnit;

/// Prompt for the whole-PR review pass.
pub fn review_prompt(files: &[FileUnit], per_file_cap: usize) -> String {
    let mut prompt = String::new();
    prompt.push_str("You are a senior Python engineer reviewing a pull request.\n\n");
    prompt.push_str(
        "Review every changed file below. Call out bugs, risky patterns, missing error \
         handling, and anything that would not survive code review. Be concrete: name the \
         file and line you are talking about. Reply in markdown.\n",
    );

    for file in files {
        prompt.push_str(&format!("\n## {}\n\n```python\n", file.path.display()));
        prompt.push_str(&capped(&file.content, per_file_cap));
        prompt.push_str("\n```\n");
        if let Some(patch) = &file.patch {
            prompt.push_str("\nChanged hunks:\n\n```diff\n");
            prompt.push_str(&capped(patch, per_file_cap));
            prompt.push_str("\n```\n");
        }
    }

    prompt
}

/// Prompt for generating a self-contained test file for one changed file.
pub fn test_prompt(file: &FileUnit, note: &ReviewNote, per_file_cap: usize) -> String {
    let mut prompt = String::new();
    prompt.push_str("You are writing unit tests for one file from a pull request.\n\n");
    prompt.push_str("Rules:\n");
    prompt.push_str("1. Reply with exactly one fenced ```python block containing a complete pytest file.\n");
    prompt.push_str(
        "2. The tests must be fully self-contained: copy the code under test into the test \
         file instead of importing it. Never import the project's own modules.\n",
    );
    prompt.push_str("3. Use only pytest, unittest.mock, and the Python standard library.\n");
    prompt.push_str("4. Exercise the behaviors the review notes below flag as risky.\n");

    prompt.push_str(&format!("\n## File under test: {}\n\n```python\n", file.path.display()));
    prompt.push_str(&capped(&file.content, per_file_cap));
    prompt.push_str("\n```\n");

    if !note.is_empty() {
        prompt.push_str("\n## Review notes\n\n");
        prompt.push_str(&capped(&note.text, per_file_cap));
        prompt.push('\n');
    }

    prompt
}

fn capped(content: &str, cap: usize) -> String {
    if content.len() <= cap {
        return content.to_string();
    }
    let mut end = cap;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n# ... truncated ...", &content[..end])
}
