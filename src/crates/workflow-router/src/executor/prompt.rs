use super::RequestContext;

/// `key: value` lines in key order
pub fn render_context(context: &RequestContext) -> String {
    context
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// User input with any context appended under an "Additional Context" heading
pub fn build_turn_prompt(input: &str, context: Option<&RequestContext>) -> String {
    match context.filter(|c| !c.is_empty()) {
        Some(context) => format!(
            "{}\n\nAdditional Context:\n{}",
            input,
            render_context(context)
        ),
        None => input.to_string(),
    }
}

/// Message sent to the orchestrator for classification
pub fn build_classification_prompt(input: &str, context: Option<&RequestContext>) -> String {
    match context.filter(|c| !c.is_empty()) {
        Some(context) => format!("User input: {}\n\nContext:\n{}", input, render_context(context)),
        None => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RequestContext {
        [
            ("order_id".to_string(), "A-1001".to_string()),
            ("customer_tier".to_string(), "gold".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_turn_prompt_without_context() {
        assert_eq!(build_turn_prompt("Where is my order?", None), "Where is my order?");
        assert_eq!(
            build_turn_prompt("Where is my order?", Some(&RequestContext::new())),
            "Where is my order?"
        );
    }

    #[test]
    fn test_turn_prompt_appends_sorted_context() {
        assert_eq!(
            build_turn_prompt("Where is my order?", Some(&context())),
            "Where is my order?\n\nAdditional Context:\ncustomer_tier: gold\norder_id: A-1001"
        );
    }

    #[test]
    fn test_classification_prompt() {
        assert_eq!(
            build_classification_prompt("I want to return an item", Some(&context())),
            "User input: I want to return an item\n\nContext:\ncustomer_tier: gold\norder_id: A-1001"
        );
        assert_eq!(build_classification_prompt("hi", None), "hi");
    }
}
