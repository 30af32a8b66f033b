//! Source-code extraction from model replies

/// Pull a test file out of a reply
///
/// Prefers a ```python fence, then the first fenced block of any kind
/// (its language tag line dropped), then the whole reply trimmed.
pub fn extract_code(text: &str) -> String {
    if let Some(start) = text.find("```python") {
        let body = &text[start + "```python".len()..];
        return until_fence(body).trim().to_string();
    }

    if let Some(start) = text.find("```") {
        let body = &text[start + 3..];
        let body = match body.find('\n') {
            Some(newline) if is_language_tag(&body[..newline]) => &body[newline + 1..],
            _ => body,
        };
        return until_fence(body).trim().to_string();
    }

    text.trim().to_string()
}

fn until_fence(body: &str) -> &str {
    match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    }
}

fn is_language_tag(line: &str) -> bool {
    let tag = line.trim();
    !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_fence() {
        let reply = "Here is the file:\n```python\nimport pytest\n\ndef test_a():\n    assert True\n```\nGood luck.";
        assert_eq!(
            extract_code(reply),
            "import pytest\n\ndef test_a():\n    assert True"
        );
    }

    #[test]
    fn test_python_fence_preferred_over_earlier_fence() {
        let reply = "```bash\npip install pytest\n```\n```python\ndef test_x():\n    pass\n```";
        assert_eq!(extract_code(reply), "def test_x():\n    pass");
    }

    #[test]
    fn test_generic_fence_drops_language_tag() {
        let reply = "```py\ndef test_y():\n    pass\n```";
        assert_eq!(extract_code(reply), "def test_y():\n    pass");
    }

    #[test]
    fn test_generic_fence_without_tag() {
        let reply = "```\ndef test_z():\n    pass\n```";
        assert_eq!(extract_code(reply), "def test_z():\n    pass");
    }

    #[test]
    fn test_no_fence_returns_trimmed_text() {
        assert_eq!(extract_code("\n  def test_q(): pass \n"), "def test_q(): pass");
    }

    #[test]
    fn test_unterminated_fence() {
        assert_eq!(extract_code("```python\nx = 1\n"), "x = 1");
    }
}
