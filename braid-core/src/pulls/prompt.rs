//! Review prompt rendering
//!
//! The template uses `{{VARIABLE}}` placeholders; placeholders left unset
//! render as `(not specified)`.

use std::collections::HashMap;

const REVIEW_TEMPLATE: &str = include_str!("prompts/review.md");

/// Values substituted into the review template
#[derive(Debug, Clone, Default)]
pub struct ReviewPrompt {
    variables: HashMap<&'static str, String>,
}

impl ReviewPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Task title, copied from the issue
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.variables.insert("TITLE", title.into());
        self
    }

    /// The prompt the platform originally answered
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.variables.insert("DESCRIPTION", description.into());
        self
    }

    /// Unified diff of the work under review
    pub fn diff(mut self, diff: impl Into<String>) -> Self {
        self.variables.insert("DIFF", diff.into());
        self
    }

    pub fn render(&self) -> String {
        render_template(REVIEW_TEMPLATE, &self.variables)
    }
}

fn render_template(template: &str, variables: &HashMap<&'static str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    // Single pass so substituted text is never rescanned for placeholders
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        if !name.is_empty() && name.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
            match variables.get(name) {
                Some(value) => out.push_str(value),
                None => out.push_str("(not specified)"),
            }
        } else {
            out.push_str(&rest[start..start + 2 + end + 2]);
        }

        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_prompt_includes_all_parts() {
        let prompt = ReviewPrompt::new()
            .title("Write intro")
            .description("Draft a two-paragraph intro")
            .diff("+Hello")
            .render();

        assert!(prompt.starts_with("Please review the following work output."));
        assert!(prompt.contains("## Task: Write intro"));
        assert!(prompt.contains("## Original Request: Draft a two-paragraph intro"));
        assert!(prompt.contains("```\n+Hello\n```"));
        assert!(prompt.contains("APPROVE or REJECT"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_unset_placeholders_render_as_not_specified() {
        let prompt = ReviewPrompt::new().title("Only title").render();
        assert!(prompt.contains("## Original Request: (not specified)"));
    }

    #[test]
    fn test_substituted_text_is_not_rescanned() {
        let mut vars = HashMap::new();
        vars.insert("DIFF", "{{TITLE}} and {{ x }}".to_string());
        let rendered = render_template("[{{DIFF}}] {{lower}} {{TITLE}}", &vars);
        assert_eq!(rendered, "[{{TITLE}} and {{ x }}] {{lower}} (not specified)");
    }
}
