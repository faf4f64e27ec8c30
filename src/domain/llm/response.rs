//! Normalized generative-model response

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DomainError;

/// Price per thousand tokens, used to derive `Response::cost`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl TokenPricing {
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1000.0) * self.input_per_1k
            + (output_tokens as f64 / 1000.0) * self.output_per_1k
    }
}

/// The single response shape stored by the prompt cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub content: String,
    pub tokens: u64,
    pub cost: f64,
}

impl Response {
    pub fn new(content: impl Into<String>, tokens: u64, cost: f64) -> Self {
        Self {
            content: content.into(),
            tokens,
            cost,
        }
    }

    /// The same content served from cache: nothing was spent
    pub fn served_from_cache(self) -> Self {
        Self {
            tokens: 0,
            cost: 0.0,
            ..self
        }
    }

    /// Normalize a provider payload.
    ///
    /// Accepts OpenAI chat completions (`choices[].message.content`),
    /// Anthropic messages (`content[]` text blocks) and already-normalized
    /// `{content, tokens, cost}` objects.
    pub fn from_provider_json(
        value: &Value,
        pricing: Option<&TokenPricing>,
    ) -> Result<Self, DomainError> {
        if let Some(choices) = value.get("choices").and_then(Value::as_array) {
            let content = choices
                .first()
                .and_then(|c| c.pointer("/message/content"))
                .and_then(Value::as_str)
                .ok_or_else(|| DomainError::validation("Chat completion has no message content"))?;

            let input = u64_at(value, "/usage/prompt_tokens");
            let output = u64_at(value, "/usage/completion_tokens");
            let tokens = value
                .pointer("/usage/total_tokens")
                .and_then(Value::as_u64)
                .unwrap_or(input + output);

            return Ok(Self::new(content, tokens, price(pricing, input, output)));
        }

        if let Some(blocks) = value.get("content").and_then(Value::as_array) {
            let content: String = blocks
                .iter()
                .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect();

            let input = u64_at(value, "/usage/input_tokens");
            let output = u64_at(value, "/usage/output_tokens");

            return Ok(Self::new(content, input + output, price(pricing, input, output)));
        }

        serde_json::from_value(value.clone())
            .map_err(|e| DomainError::validation(format!("Unrecognized response payload: {}", e)))
    }
}

fn u64_at(value: &Value, pointer: &str) -> u64 {
    value.pointer(pointer).and_then(Value::as_u64).unwrap_or(0)
}

fn price(pricing: Option<&TokenPricing>, input: u64, output: u64) -> f64 {
    pricing.map(|p| p.cost(input, output)).unwrap_or(0.0)
}
