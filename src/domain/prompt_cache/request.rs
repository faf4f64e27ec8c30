//! Cache request and its canonical key

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::llm::{join_role, Message, MessageRole};
use crate::domain::DomainError;

/// A generative-model request as seen by the prompt cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRequest {
    pub prompt_text: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default = "default_usage_type")]
    pub usage_type: String,
    #[serde(default)]
    pub temperature: f32,
    pub model_name: String,
}

fn default_usage_type() -> String {
    "chat".to_string()
}

/// Fixed field order (alphabetical) so the serialized form is canonical
#[derive(Serialize)]
struct CanonicalRequest<'a> {
    model_name: &'a str,
    prompt_text: String,
    system_prompt: String,
    temperature: String,
    usage_type: &'a str,
}

impl CacheRequest {
    pub fn new(prompt_text: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            prompt_text: prompt_text.into(),
            system_prompt: String::new(),
            usage_type: default_usage_type(),
            temperature: 0.0,
            model_name: model_name.into(),
        }
    }

    /// Build from a conversation: system messages form the system prompt,
    /// user messages form the prompt text
    pub fn from_messages(messages: &[Message], model_name: impl Into<String>) -> Self {
        Self::new(join_role(messages, MessageRole::User), model_name)
            .with_system_prompt(join_role(messages, MessageRole::System))
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_usage_type(mut self, usage_type: impl Into<String>) -> Self {
        self.usage_type = usage_type.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Only temperature-zero requests are eligible for the template tier
    pub fn is_deterministic(&self) -> bool {
        self.temperature == 0.0
    }

    /// Text embedded for the semantic tier
    pub fn semantic_text(&self) -> String {
        format!("{}\n{}", self.prompt_text, self.system_prompt)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.prompt_text.trim().is_empty() {
            return Err(DomainError::validation("prompt_text cannot be empty"));
        }

        if self.model_name.trim().is_empty() {
            return Err(DomainError::validation("model_name cannot be empty"));
        }

        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(DomainError::validation(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            )));
        }

        Ok(())
    }

    /// SHA-256 of the canonical JSON form, hex encoded.
    ///
    /// Text fields have their whitespace collapsed; temperature is rendered
    /// with fixed precision.
    pub fn canonical_hash(&self) -> String {
        let canonical = CanonicalRequest {
            model_name: self.model_name.trim(),
            prompt_text: collapse_whitespace(&self.prompt_text),
            system_prompt: collapse_whitespace(&self.system_prompt),
            // Adding zero folds -0.0 into 0.0
            temperature: format!("{:.4}", self.temperature + 0.0),
            usage_type: self.usage_type.trim(),
        };

        // A struct of strings always serializes
        let json = serde_json::to_string(&canonical).unwrap_or_default();

        hex::encode(Sha256::digest(json.as_bytes()))
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
