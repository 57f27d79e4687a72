//! Prompts for LLM-based paragraph translation.
//!
//! Every client sends the same two messages: a fixed translator persona as
//! the system message and one user message wrapping the paragraph. Both
//! the OpenAI client and the edgequake-llm adapter build them from here.
//!
//! Callers can override the persona via
//! [`crate::config::TranslationConfig::system_prompt`].

use crate::config::TranslationConfig;

/// Default system prompt: the model acts as a professional translator.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional translator.";

/// The system/user message pair for one translation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationPrompt {
    system: String,
    target_language: String,
    domain: Option<String>,
}

impl TranslationPrompt {
    pub fn new(target_language: impl Into<String>) -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            target_language: target_language.into(),
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    /// Build the prompt pair from the run configuration.
    pub fn from_config(config: &TranslationConfig) -> Self {
        let mut prompt = Self::new(config.target_language.clone());
        if let Some(ref d) = config.domain {
            if !d.trim().is_empty() {
                prompt = prompt.with_domain(d.trim());
            }
        }
        if let Some(ref s) = config.system_prompt {
            prompt = prompt.with_system(s.clone());
        }
        prompt
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    /// The user message for one paragraph.
    ///
    /// Asks for a formal register, the original formatting, and nothing but
    /// the translated content.
    pub fn user(&self, text: &str) -> String {
        let scope = match self.domain {
            Some(ref d) => format!(" in the field of {d}"),
            None => String::new(),
        };
        format!(
            "Translate the following text into {lang}{scope}. Use a formal register \
and preserve the original formatting. Return only the translated content, nothing else:\n{text}",
            lang = self.target_language,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_embeds_text_and_language() {
        let p = TranslationPrompt::new("Chinese");
        let msg = p.user("Hello, world.");
        assert!(msg.contains("into Chinese."));
        assert!(msg.contains("formal register"));
        assert!(msg.contains("preserve the original formatting"));
        assert!(msg.ends_with("\nHello, world."));
    }

    #[test]
    fn domain_is_optional() {
        let p = TranslationPrompt::new("Chinese").with_domain("logistics and distribution");
        assert!(p
            .user("x")
            .contains("into Chinese in the field of logistics and distribution."));
    }

    #[test]
    fn from_config_honours_overrides() {
        let config = TranslationConfig::builder()
            .target_language("Japanese")
            .domain("  ")
            .system_prompt("Be terse.")
            .build()
            .unwrap();
        let p = TranslationPrompt::from_config(&config);
        assert_eq!(p.system(), "Be terse.");
        assert!(p.user("x").contains("into Japanese."));
    }

    #[test]
    fn default_system_prompt() {
        let p = TranslationPrompt::from_config(&TranslationConfig::default());
        assert_eq!(p.system(), DEFAULT_SYSTEM_PROMPT);
    }
}
