use regex::Regex;

/// Pull the first fenced code block out of an LLM reply.
///
/// Prefers a block tagged with `lang`, falls back to any fence, and as a
/// last resort accepts an unfenced reply that already looks like test code.
pub fn extract_code_block(text: &str, lang: &str) -> Option<String> {
    let tagged = Regex::new(&format!(r"```{}\s*\n([\s\S]*?)\n?```", lang)).ok()?;
    if let Some(cap) = tagged.captures(text) {
        return Some(cap.get(1)?.as_str().trim_end().to_string());
    }

    let any = Regex::new(r"```[a-zA-Z0-9_]*\s*\n([\s\S]*?)\n?```").ok()?;
    if let Some(cap) = any.captures(text) {
        return Some(cap.get(1)?.as_str().trim_end().to_string());
    }

    // Some replies skip the fence entirely
    let trimmed = text.trim();
    if trimmed.contains("def test_") || trimmed.starts_with("import ") {
        return Some(trimmed.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tagged_block() {
        let reply = "Here is the test file:\n\n```python\nimport pytest\n\ndef test_add():\n    assert 1 + 1 == 2\n```\n\nLet me know if you need more.";
        let code = extract_code_block(reply, "python").unwrap();
        assert!(code.starts_with("import pytest"));
        assert!(code.ends_with("assert 1 + 1 == 2"));
        assert!(!code.contains("```"));
    }

    #[test]
    fn test_extract_untagged_block() {
        let reply = "```\ndef test_noop():\n    pass\n```";
        let code = extract_code_block(reply, "python").unwrap();
        assert_eq!(code, "def test_noop():\n    pass");
    }

    #[test]
    fn test_tagged_block_preferred_over_untagged() {
        let reply = "```text\nnot code\n```\n```python\ndef test_real():\n    pass\n```";
        let code = extract_code_block(reply, "python").unwrap();
        assert!(code.contains("test_real"));
    }

    #[test]
    fn test_bare_code_accepted() {
        let reply = "import pytest\n\ndef test_bare():\n    assert True";
        assert!(extract_code_block(reply, "python").is_some());
    }

    #[test]
    fn test_prose_rejected() {
        assert!(extract_code_block("I cannot generate tests for this file.", "python").is_none());
    }
}
