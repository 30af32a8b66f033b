//! DOM extraction
//!
//! The script collects every input, button/link and form on the page. It
//! returns a JSON string rather than an object so the result survives the
//! DevTools round trip by value.

use pagepilot_core::{DomSnapshot, PilotError, Result};
use serde_json::Value;
use tracing::debug;

use crate::driver::BrowserDriver;

pub const DOM_EXTRACTION_SCRIPT: &str = r#"JSON.stringify((() => {
    const elements = [];

    document.querySelectorAll('input, textarea, select').forEach(el => {
        elements.push({
            type: 'input',
            tagName: el.tagName,
            id: el.id,
            name: el.name,
            placeholder: el.placeholder,
            inputType: el.type,
            className: el.className,
            text: el.value
        });
    });

    document.querySelectorAll('button, [type="submit"], a[href]').forEach(el => {
        elements.push({
            type: 'button',
            tagName: el.tagName,
            id: el.id,
            className: el.className,
            text: el.textContent.trim().substring(0, 100),
            href: el.href
        });
    });

    document.querySelectorAll('form').forEach(el => {
        elements.push({
            type: 'form',
            id: el.id,
            action: el.action,
            method: el.method,
            className: el.className
        });
    });

    return elements;
})())"#;

/// Collect the raw DOM snapshot of the current page
pub async fn extract_dom(driver: &dyn BrowserDriver) -> Result<DomSnapshot> {
    let title = driver.title().await?;
    let url = driver.current_url().await?;
    let raw = driver.evaluate(DOM_EXTRACTION_SCRIPT).await?;
    let elements = parse_elements(raw)?;

    debug!("Extracted {} DOM elements from {}", elements.len(), url);

    Ok(DomSnapshot {
        title,
        url,
        element_count: elements.len(),
        elements,
    })
}

fn parse_elements(raw: Value) -> Result<Vec<Value>> {
    match raw {
        Value::String(json) => match serde_json::from_str(&json)? {
            Value::Array(items) => Ok(items),
            other => Err(PilotError::Browser(format!(
                "DOM script returned {} instead of a list",
                kind_of(&other)
            ))),
        },
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(PilotError::Browser(format!(
            "DOM script returned {} instead of a list",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBrowser;
    use serde_json::json;

    #[test]
    fn test_parse_stringified_list() {
        let raw = Value::String("[{\"type\": \"input\"}, {\"type\": \"form\"}]".to_string());
        let elements = parse_elements(raw).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1]["type"], "form");
    }

    #[test]
    fn test_parse_rejects_object() {
        let err = parse_elements(json!({"type": "input"})).unwrap_err();
        assert!(matches!(err, PilotError::Browser(_)));
    }

    #[test]
    fn test_script_covers_element_kinds() {
        assert!(DOM_EXTRACTION_SCRIPT.contains("input, textarea, select"));
        assert!(DOM_EXTRACTION_SCRIPT.contains("a[href]"));
        assert!(DOM_EXTRACTION_SCRIPT.contains("querySelectorAll('form')"));
    }

    #[tokio::test]
    async fn test_extract_dom_from_mock() {
        let browser = MockBrowser::new("Login", "https://example.com/login")
            .with_elements(vec![
                json!({"type": "input", "id": "user"}),
                json!({"type": "button", "text": "Sign in"}),
            ]);
        browser.navigate("https://example.com/login").await.unwrap();

        let snapshot = extract_dom(&browser).await.unwrap();
        assert_eq!(snapshot.title, "Login");
        assert_eq!(snapshot.url, "https://example.com/login");
        assert_eq!(snapshot.element_count, 2);
        assert_eq!(snapshot.elements[0]["id"], "user");
    }
}
