//! Prompt builder for rendering templates.

use crate::types::PromptVars;
use handlebars::Handlebars;
use ragchat_core::{AppError, AppResult};
use serde::Serialize;

/// Render an answer prompt, appending the optional extra instruction.
///
/// # Example
/// ```no_run
/// use ragchat_prompt::{build_prompt, PromptStore, PromptVars};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = PromptStore::builtin()?;
/// let template = store.get("cot")?;
/// let vars = PromptVars::new("How many players?").with_context("Two to four players.");
/// let prompt = build_prompt(&template, Some("Answer in one sentence."), &vars)?;
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    template: &str,
    instruction: Option<&str>,
    vars: &PromptVars,
) -> AppResult<String> {
    let mut rendered = render_template(template, vars)?;

    if let Some(instruction) = instruction.filter(|i| !i.trim().is_empty()) {
        rendered.push_str("\n\nInstruction: ");
        rendered.push_str(instruction);
    }

    Ok(rendered)
}

/// Render a Handlebars template with variables.
pub fn render_template<T: Serialize>(template: &str, variables: &T) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Hello, world!".to_string());

        let result = render_template("Question: {{question}}", &vars).unwrap();
        assert_eq!(result, "Question: Hello, world!");
    }

    #[test]
    fn test_no_html_escaping() {
        let vars = PromptVars::new("Is 3 < 4 & 5 > 2?");
        let result = render_template("{{question}}", &vars).unwrap();
        assert_eq!(result, "Is 3 < 4 & 5 > 2?");
    }

    #[test]
    fn test_build_prompt_with_instruction() {
        let vars = PromptVars::new("Who deals?").with_context("The youngest player deals.");
        let prompt = build_prompt(
            "Context: {{context}}\nQuestion: {{question}}",
            Some("Be brief."),
            &vars,
        )
        .unwrap();
        assert_eq!(
            prompt,
            "Context: The youngest player deals.\nQuestion: Who deals?\n\nInstruction: Be brief."
        );
    }

    #[test]
    fn test_build_prompt_without_instruction() {
        let vars = PromptVars::new("q");
        assert_eq!(build_prompt("{{question}}", None, &vars).unwrap(), "q");
        assert_eq!(build_prompt("{{question}}", Some(" "), &vars).unwrap(), "q");
    }

    #[test]
    fn test_role_is_substituted_literally() {
        let store = crate::PromptStore::builtin().unwrap();
        let template = store.get("zero_shot").unwrap();

        let default = build_prompt(&template, None, &PromptVars::new("q")).unwrap();
        assert!(default.starts_with("You are AI Assistant."));

        let vars = PromptVars::new("q").with_role("a {{referee}} of }} rules");
        let prompt = build_prompt(&template, None, &vars).unwrap();
        assert!(prompt.starts_with("You are a {{referee}} of }} rules."));
    }

    #[test]
    fn test_render_template_missing_variable() {
        let vars: HashMap<String, String> = HashMap::new();
        let result = render_template("Question: {{missing}}", &vars);
        assert_eq!(result.unwrap(), "Question: ");
    }

    #[test]
    fn test_render_invalid_template() {
        let vars = PromptVars::new("q");
        assert!(matches!(
            render_template("{{#if}}", &vars),
            Err(AppError::Prompt(_))
        ));
    }
}
