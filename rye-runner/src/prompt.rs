//! System prompt assembly (§4.9 step 6).
//!
//! Builds the per-thread system prompt from the runner's base template
//! plus the directive's name, description, process body, declared
//! inputs, and available tool list, closing with a `<returns>` block
//! mirroring the directive's declared outputs.

use crate::directive::DirectiveSpec;
use rye_turn::ToolSchema;

/// Render the system prompt for one thread execution.
pub fn build_system_prompt(base: &str, directive: &DirectiveSpec, tools: &[ToolSchema]) -> String {
    let mut prompt = String::new();
    if !base.is_empty() {
        prompt.push_str(base);
        prompt.push_str("\n\n");
    }

    prompt.push_str(&format!("# Directive: {}\n", directive.name));
    if !directive.description.is_empty() {
        prompt.push_str(&format!("{}\n", directive.description));
    }
    prompt.push('\n');

    if !directive.process_body.is_empty() {
        prompt.push_str("## Process\n");
        prompt.push_str(&directive.process_body);
        prompt.push_str("\n\n");
    }

    if !directive.inputs.is_empty() {
        prompt.push_str("## Inputs\n");
        for input in &directive.inputs {
            let required = if input.required { "required" } else { "optional" };
            prompt.push_str(&format!("- {} ({required}): {}\n", input.name, input.description));
        }
        prompt.push('\n');
    }

    if !tools.is_empty() {
        prompt.push_str("## Available tools\n");
        for tool in tools {
            prompt.push_str(&format!("- {}: {}\n", tool.name, tool.description));
        }
        prompt.push('\n');
    }

    if !directive.outputs.is_empty() {
        prompt.push_str("<returns>\n");
        for (name, description) in &directive.outputs {
            prompt.push_str(&format!("{name}: {description}\n"));
        }
        prompt.push_str("</returns>\n");
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::InputSpec;

    #[test]
    fn prompt_includes_directive_name_and_process_body() {
        let directive = DirectiveSpec::minimal("greet", "Say hello to {input:name}.");
        let prompt = build_system_prompt("You are helpful.", &directive, &[]);
        assert!(prompt.contains("Directive: greet"));
        assert!(prompt.contains("Say hello to {input:name}."));
        assert!(prompt.contains("You are helpful."));
    }

    #[test]
    fn prompt_lists_inputs_and_outputs() {
        let mut directive = DirectiveSpec::minimal("greet", "body");
        directive.inputs.push(InputSpec {
            name: "name".into(),
            required: true,
            default: None,
            description: "who to greet".into(),
        });
        directive
            .outputs
            .insert("greeting".into(), "the rendered greeting".into());

        let prompt = build_system_prompt("", &directive, &[]);
        assert!(prompt.contains("name (required): who to greet"));
        assert!(prompt.contains("<returns>"));
        assert!(prompt.contains("greeting: the rendered greeting"));
    }
}
