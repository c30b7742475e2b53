use serde::{Deserialize, Serialize};

/// Default cap on generated tokens for a single response.
pub const DEFAULT_MAX_TOKENS_TO_SAMPLE: u32 = 1024;

/// The stop sequence that ends an assistant turn in the text-completion format.
pub const HUMAN_STOP_SEQUENCE: &str = "\n\nHuman:";

/// Request body for the Claude text-completion API on Bedrock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextCompletionParams {
    /// The prompt, already rendered in `Human:`/`Assistant:` form.
    pub prompt: String,

    /// Maximum number of tokens to generate.
    pub max_tokens_to_sample: u32,

    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling cutoff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Top-k sampling cutoff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    /// Sequences that stop generation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
}

impl TextCompletionParams {
    /// Create request parameters with the default token cap and stop sequence.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens_to_sample: DEFAULT_MAX_TOKENS_TO_SAMPLE,
            temperature: None,
            top_p: None,
            top_k: None,
            stop_sequences: vec![HUMAN_STOP_SEQUENCE.to_string()],
        }
    }

    /// Set the token cap.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens_to_sample = max_tokens;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the nucleus sampling cutoff.
    pub fn with_top_p(mut self, top_p: Option<f32>) -> Self {
        self.top_p = top_p;
        self
    }

    /// Set the top-k cutoff.
    pub fn with_top_k(mut self, top_k: Option<u32>) -> Self {
        self.top_k = top_k;
        self
    }
}

/// A complete text-completion response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextCompletion {
    /// The generated text.
    pub completion: String,

    /// Why generation stopped, e.g. `stop_sequence` or `max_tokens`.
    #[serde(default)]
    pub stop_reason: Option<String>,

    /// The stop sequence that matched, if any.
    #[serde(default)]
    pub stop: Option<String>,
}

/// One streamed piece of a text-completion response.
///
/// The final chunk carries the stop reason and may have an empty completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionChunk {
    /// The text generated since the previous chunk.
    #[serde(default)]
    pub completion: String,

    /// Set on the last chunk.
    #[serde(default)]
    pub stop_reason: Option<String>,

    /// The stop sequence that matched, if any.
    #[serde(default)]
    pub stop: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_serialize_without_unset_sampling() {
        let params = TextCompletionParams::new("\n\nHuman: Hi\n\nAssistant:");
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "prompt": "\n\nHuman: Hi\n\nAssistant:",
                "max_tokens_to_sample": 1024,
                "stop_sequences": ["\n\nHuman:"],
            })
        );
    }

    #[test]
    fn params_serialize_sampling_when_set() {
        let params = TextCompletionParams::new("p")
            .with_max_tokens(10)
            .with_temperature(Some(0.5))
            .with_top_k(Some(40));
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["max_tokens_to_sample"], 10);
        assert_eq!(json["temperature"], 0.5);
        assert_eq!(json["top_k"], 40);
        assert!(json.get("top_p").is_none());
    }

    #[test]
    fn completion_deserializes_with_nulls() {
        let chunk: CompletionChunk =
            serde_json::from_str(r#"{"completion":" Hi","stop_reason":null,"stop":null}"#)
                .unwrap();
        assert_eq!(chunk.completion, " Hi");
        assert!(chunk.stop_reason.is_none());

        let done: TextCompletion = serde_json::from_str(
            r#"{"completion":" Hi there","stop_reason":"stop_sequence","stop":"\n\nHuman:"}"#,
        )
        .unwrap();
        assert_eq!(done.stop_reason.as_deref(), Some("stop_sequence"));
    }
}
