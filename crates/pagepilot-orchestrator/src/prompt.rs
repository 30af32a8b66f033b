//! Prompt builders for each phase
//!
//! Every prompt is self-contained. Nothing from earlier calls is carried
//! over except what is written into the prompt text itself.

use pagepilot_core::{DomSnapshot, PageKnowledge, TestCases};
use serde::Serialize;

/// DOM elements shown to the model during exploration
pub const EXPLORATION_ELEMENT_LIMIT: usize = 20;
/// Knowledge elements shown during design
pub const DESIGN_ELEMENT_LIMIT: usize = 15;
/// Knowledge interactions shown during design
pub const DESIGN_INTERACTION_LIMIT: usize = 10;
/// Elements listed in the generation summary
pub const GENERATION_ELEMENT_LIMIT: usize = 20;

pub fn build_exploration_prompt(url: &str, dom: &DomSnapshot) -> String {
    let shown = &dom.elements[..dom.elements.len().min(EXPLORATION_ELEMENT_LIMIT)];

    format!(
        r#"Analyze this web page and build a structured knowledge base for testing it.

URL: {url}
Title: {title}
Element count: {count}

Elements found:
{elements}

Respond with a JSON object containing:
1. "elements": testable elements, each with
   - id: unique identifier
   - type: input, button, form or link
   - locator: the most stable selector (prefer id, then name, then CSS)
   - description: what the element does
2. "interactions": possible user interactions, each with
   - action: click, type, select or submit
   - target: element id
   - description: what happens
3. "structure": the page as a whole
   - purpose: what the page is for
   - main_flow: the primary user journey
   - test_priorities: what to test first

Keep descriptions short and locators precise."#,
        url = url,
        title = dom.title,
        count = dom.element_count,
        elements = pretty(shown),
    )
}

pub fn build_design_prompt(knowledge: &PageKnowledge) -> String {
    let elements = &knowledge.elements[..knowledge.elements.len().min(DESIGN_ELEMENT_LIMIT)];
    let interactions =
        &knowledge.interactions[..knowledge.interactions.len().min(DESIGN_INTERACTION_LIMIT)];
    let purpose = if knowledge.structure.purpose.is_empty() {
        "Unknown"
    } else {
        knowledge.structure.purpose.as_str()
    };

    format!(
        r#"Design test cases for this page from what is known about it.

URL: {url}
Purpose: {purpose}

Available elements:
{elements}

Possible interactions:
{interactions}

Respond with a JSON object containing:
1. "test_cases": an array where each case has
   - id: a test id such as "TC001"
   - name: a descriptive name
   - priority: high, medium or low
   - category: UI, Functional, Integration or Negative
   - steps: an array of steps, each with action, target, data (optional) and expected
2. "coverage":
   - elements_covered: how many elements the cases exercise
   - interaction_types: which kinds of interaction are covered
   - edge_cases: the edge cases identified

Cover the happy path, edge cases such as empty or invalid input, multi-step
user workflows and error handling. Every case must be specific and executable."#,
        url = knowledge.url,
        purpose = purpose,
        elements = pretty(elements),
        interactions = pretty(interactions),
    )
}

pub fn build_design_refinement_prompt(current: &TestCases, feedback: &str) -> String {
    format!(
        r#"Current test cases:
{current}

User feedback: {feedback}

Update the test cases to address the feedback. Respond with the same JSON
structure ("test_cases" and "coverage")."#,
        current = pretty(current),
        feedback = feedback,
    )
}

pub fn build_generation_prompt(knowledge: &PageKnowledge, cases: &TestCases) -> String {
    let element_summary = knowledge
        .elements
        .iter()
        .take(GENERATION_ELEMENT_LIMIT)
        .map(|el| {
            format!(
                "- {}: {} ({})",
                or_placeholder(&el.id, "unknown"),
                or_placeholder(&el.locator, "N/A"),
                or_placeholder(&el.kind, "unknown")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let case_summary = cases
        .cases
        .iter()
        .map(|tc| format!("- {}: {}", or_placeholder(&tc.id, "N/A"), or_placeholder(&tc.name, "Unnamed test")))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Write a complete Playwright Python test file (pytest-playwright) for these test cases.

URL: {url}

Available elements:
{element_summary}

Test cases to implement:
{case_summary}

Detailed test cases:
{detailed}

Requirements:
1. Use the sync Playwright API with pytest fixtures
2. Choose resilient locators: data-testid, then id, then name, then CSS; use get_by_role() where it fits
3. Assert the expected result of every case
4. Wait for the page properly (wait_for_selector, wait_for_load_state)
5. One pytest test function per case

Start from this structure:
```python
import pytest
from playwright.sync_api import Page, expect

class TestWebPage:
    @pytest.fixture(autouse=True)
    def setup(self, page: Page):
        page.goto("{url}")
        page.wait_for_load_state("networkidle")
        yield page
```

Return the complete file with no placeholders."#,
        url = knowledge.url,
        element_summary = element_summary,
        case_summary = case_summary,
        detailed = pretty(&cases.cases),
    )
}

pub fn build_code_refinement_prompt(code: &str, issue: &str) -> String {
    format!(
        r#"This test code has a problem:
{issue}

Current code:
```python
{code}
```

Fix the problem and return the complete corrected file. Return only Python code."#,
        issue = issue,
        code = code,
    )
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() {
        placeholder
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pagepilot_core::{Coverage, PageElement, PageStructure, TestCase};
    use serde_json::json;

    fn knowledge(elements: usize) -> PageKnowledge {
        PageKnowledge {
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            elements: (0..elements)
                .map(|i| PageElement {
                    id: format!("el-{}", i),
                    kind: "button".to_string(),
                    locator: format!("#el-{}", i),
                    description: String::new(),
                })
                .collect(),
            interactions: Vec::new(),
            structure: PageStructure::default(),
            raw_dom: DomSnapshot::default(),
            screenshot: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_exploration_prompt_limits_elements() {
        let dom = DomSnapshot {
            title: "T".to_string(),
            url: "https://example.com".to_string(),
            elements: (0..30).map(|i| json!({"id": format!("dom-{}", i)})).collect(),
            element_count: 30,
        };
        let prompt = build_exploration_prompt("https://example.com", &dom);
        assert!(prompt.contains("dom-19"));
        assert!(!prompt.contains("dom-20"));
        assert!(prompt.contains("Element count: 30"));
    }

    #[test]
    fn test_design_prompt_limits_and_purpose() {
        let prompt = build_design_prompt(&knowledge(20));
        assert!(prompt.contains("el-14"));
        assert!(!prompt.contains("el-15"));
        assert!(prompt.contains("Purpose: Unknown"));
    }

    #[test]
    fn test_generation_prompt_lists_cases() {
        let cases = TestCases {
            cases: vec![TestCase {
                id: "TC001".to_string(),
                name: "Login works".to_string(),
                ..TestCase::default()
            }],
            coverage: Coverage::default(),
            timestamp: Utc::now(),
        };
        let prompt = build_generation_prompt(&knowledge(2), &cases);
        assert!(prompt.contains("- TC001: Login works"));
        assert!(prompt.contains("- el-1: #el-1 (button)"));
        assert!(prompt.contains("page.goto(\"https://example.com\")"));
    }

    #[test]
    fn test_code_refinement_prompt_embeds_issue_and_code() {
        let prompt = build_code_refinement_prompt("def test_a(): pass", "1 failed in 0.1s");
        assert!(prompt.contains("1 failed in 0.1s"));
        assert!(prompt.contains("```python\ndef test_a(): pass\n```"));
    }
}
