// Per-row email generation
//
// One oracle call per eligible row. Failures are returned as values and only
// turned into cell text by the row processor.

use outreach_ai::{ChatMessage, ChatRequest, OracleError, TextOracle};

/// System message sent ahead of every prompt
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Prefix of the text written in place of a draft when generation fails
pub const FAILURE_PREFIX: &str = "Error generating email: ";

const INSTRUCTIONS: &str = "Please customize the email template for this specific company, \
incorporating relevant details from the company description.\n\
Keep the email professional and concise.\n\
You will only output the customized email content.";

/// Generation failed for one row. Recovered, never aborts the batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(transparent)]
pub struct GenerationFailure(#[from] pub OracleError);

impl GenerationFailure {
    /// The string written into the output cell for this failure
    pub fn placeholder(&self) -> String {
        format!("{}{}", FAILURE_PREFIX, self.0)
    }
}

/// Collapse a generation result into the text stored in the output cell.
pub fn flatten(result: Result<String, GenerationFailure>) -> String {
    match result {
        Ok(draft) => draft,
        Err(failure) => failure.placeholder(),
    }
}

/// Build the user prompt for one company.
///
/// Deterministic: the same inputs always produce the same prompt.
pub fn build_prompt(template: &str, name: Option<&str>, description: &str) -> String {
    let mut prompt = format!("Original email template:\n{}\n\n", template);
    if let Some(name) = name {
        prompt.push_str(&format!("Company name:\n{}\n\n", name));
    }
    prompt.push_str(&format!("Company description:\n{}\n\n", description));
    prompt.push_str(INSTRUCTIONS);
    prompt
}

/// Drafts one customized email per company from a shared template.
pub struct EmailGenerator<'a> {
    template: String,
    model: String,
    oracle: &'a dyn TextOracle,
}

impl<'a> EmailGenerator<'a> {
    pub fn new(template: impl Into<String>, model: impl Into<String>, oracle: &'a dyn TextOracle) -> Self {
        Self {
            template: template.into(),
            model: model.into(),
            oracle,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The prompt that [`generate`](Self::generate) would send
    pub fn prompt(&self, name: Option<&str>, description: &str) -> String {
        build_prompt(&self.template, name, description)
    }

    /// Ask the oracle for a customized email. Exactly one call per invocation.
    pub fn generate(&self, name: Option<&str>, description: &str) -> Result<String, GenerationFailure> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(self.prompt(name, description)),
            ],
        };

        let reply = self.oracle.complete(&request).and_then(|draft| {
            // A blank draft would be indistinguishable from a skipped row
            if draft.trim().is_empty() {
                Err(OracleError::InvalidResponse("Empty completion".to_string()))
            } else {
                Ok(draft)
            }
        });

        reply.map_err(|e| {
            log::error!("Error generating custom email: {}", e);
            GenerationFailure(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records requests and replies from a script
    struct ScriptedOracle {
        reply: Result<String, OracleError>,
        seen: RefCell<Vec<ChatRequest>>,
    }

    impl TextOracle for ScriptedOracle {
        fn complete(&self, request: &ChatRequest) -> Result<String, OracleError> {
            self.seen.borrow_mut().push(request.clone());
            self.reply.clone()
        }
    }

    #[test]
    fn test_prompt_with_name() {
        let prompt = build_prompt("Dear Team, ...", Some("Acme"), "Builds rockets");
        assert!(prompt.starts_with("Original email template:\nDear Team, ...\n\n"));
        assert!(prompt.contains("Company name:\nAcme\n\n"));
        assert!(prompt.contains("Company description:\nBuilds rockets\n\n"));
        assert!(prompt.ends_with("You will only output the customized email content."));
    }

    #[test]
    fn test_prompt_without_name() {
        let prompt = build_prompt("Hi", None, "Makes tea");
        assert!(!prompt.contains("Company name"));
        assert_eq!(prompt, build_prompt("Hi", None, "Makes tea"));
    }

    #[test]
    fn test_generate_sends_system_and_user_messages() {
        let oracle = ScriptedOracle {
            reply: Ok("Dear Acme".into()),
            seen: RefCell::new(Vec::new()),
        };
        let generator = EmailGenerator::new("Dear Team", "gpt-4o", &oracle);

        assert_eq!(generator.generate(Some("Acme"), "Builds rockets").unwrap(), "Dear Acme");

        let seen = oracle.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "gpt-4o");
        assert_eq!(seen[0].messages[0], ChatMessage::system(SYSTEM_PROMPT));
        assert_eq!(seen[0].messages[1].role, "user");
        assert_eq!(
            seen[0].messages[1].content,
            build_prompt("Dear Team", Some("Acme"), "Builds rockets")
        );
    }

    #[test]
    fn test_failure_flattens_to_placeholder() {
        let oracle = ScriptedOracle {
            reply: Err(OracleError::Api { status: 500, message: "boom".into() }),
            seen: RefCell::new(Vec::new()),
        };
        let generator = EmailGenerator::new("Dear Team", "gpt-4o", &oracle);

        let text = flatten(generator.generate(None, "Builds rockets"));
        assert_eq!(text, "Error generating email: API error (500): boom");
    }

    #[test]
    fn test_blank_reply_is_a_failure() {
        for blank in ["", "  \n\t"] {
            let oracle = ScriptedOracle {
                reply: Ok(blank.into()),
                seen: RefCell::new(Vec::new()),
            };
            let generator = EmailGenerator::new("Dear Team", "gpt-4o", &oracle);

            let err = generator.generate(None, "Builds rockets").unwrap_err();
            assert_eq!(err.0, OracleError::InvalidResponse("Empty completion".into()));
            assert_eq!(err.placeholder(), "Error generating email: Invalid response: Empty completion");
            assert_eq!(oracle.seen.borrow().len(), 1);
        }
    }

    #[test]
    fn test_flatten_success_is_verbatim() {
        assert_eq!(flatten(Ok("  exact text \n".into())), "  exact text \n");
    }
}
