//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use arrrg_derive::CommandLine;

use crate::client::DEFAULT_REGION;
use crate::memory::DEFAULT_WINDOW_TURNS;
use crate::types::{DEFAULT_MAX_TOKENS_TO_SAMPLE, Model};

/// System prompt used when none is given.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant chatbot designed to help the humans.";

/// Command-line arguments for the bedrock-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Bedrock model id (default: anthropic.claude-v2)", "MODEL")]
    pub model: Option<String>,

    /// AWS region hosting the model.
    #[arrrg(optional, "AWS region (default: us-west-2)", "REGION")]
    pub region: Option<String>,

    /// System prompt to set context for the conversation.
    #[arrrg(optional, "System prompt for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response (default: 1024)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Number of recent turns sent with each request.
    #[arrrg(optional, "Recent turns sent with each request (default: 4)", "TURNS")]
    pub window: Option<u32>,

    /// Sampling temperature.
    #[arrrg(optional, "Sampling temperature (default: model default)", "TEMP")]
    pub temperature: Option<f32>,

    /// Nucleus sampling cutoff.
    #[arrrg(optional, "Nucleus sampling cutoff (default: model default)", "P")]
    pub top_p: Option<f32>,

    /// Top-k sampling cutoff.
    #[arrrg(optional, "Top-k sampling cutoff (default: model default)", "K")]
    pub top_k: Option<u32>,

    /// Endpoint override.
    #[arrrg(optional, "Bedrock runtime endpoint URL", "URL")]
    pub endpoint: Option<String>,

    /// Start with streaming enabled.
    #[arrrg(flag, "Stream responses as they are generated")]
    pub stream: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Log every request and response to stderr.
    #[arrrg(flag, "Log requests and responses to stderr")]
    pub verbose: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// The AWS region requests are signed for.
    pub region: String,

    /// The system prompt that opens every session.
    pub system_prompt: String,

    /// Maximum tokens per response.
    pub max_tokens: u32,

    /// Number of recent turns sent alongside the system prompt.
    pub window_turns: usize,

    /// Optional sampling temperature.
    pub temperature: Option<f32>,

    /// Optional nucleus sampling cutoff.
    pub top_p: Option<f32>,

    /// Optional top-k cutoff.
    pub top_k: Option<u32>,

    /// Endpoint override; `None` uses the regional Bedrock endpoint.
    pub endpoint: Option<String>,

    /// Whether responses are streamed.
    pub streaming: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether client traffic is logged to stderr.
    pub verbose: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: anthropic.claude-v2
    /// - Region: us-west-2
    /// - Max tokens: 1024
    /// - Window: 4 turns
    /// - Streaming: disabled
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            region: DEFAULT_REGION.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS_TO_SAMPLE,
            window_turns: DEFAULT_WINDOW_TURNS,
            temperature: None,
            top_p: None,
            top_k: None,
            endpoint: None,
            streaming: false,
            use_color: true,
            verbose: false,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets how many recent turns are sent with each request.
    pub fn with_window_turns(mut self, turns: usize) -> Self {
        self.window_turns = turns;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the nucleus sampling cutoff.
    pub fn with_top_p(mut self, top_p: Option<f32>) -> Self {
        self.top_p = top_p;
        self
    }

    /// Sets the top-k cutoff.
    pub fn with_top_k(mut self, top_k: Option<u32>) -> Self {
        self.top_k = top_k;
        self
    }

    /// Sets the endpoint override.
    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Enables or disables streaming.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Enables request logging.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let defaults = ChatConfig::new();
        let model = args
            .model
            .map(|s| s.parse::<Model>().unwrap_or(Model::Custom(s)))
            .unwrap_or(defaults.model.clone());

        ChatConfig {
            model,
            region: args.region.unwrap_or(defaults.region.clone()),
            system_prompt: args.system.unwrap_or(defaults.system_prompt.clone()),
            max_tokens: args.max_tokens.unwrap_or(defaults.max_tokens),
            window_turns: args
                .window
                .map(|w| w as usize)
                .unwrap_or(defaults.window_turns),
            temperature: args.temperature,
            top_p: args.top_p,
            top_k: args.top_k,
            endpoint: args.endpoint,
            streaming: args.stream,
            use_color: !args.no_color,
            verbose: args.verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.model, Model::Known(KnownModel::ClaudeV2));
        assert_eq!(config.region, "us-west-2");
        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.window_turns, 4);
        assert!(config.temperature.is_none());
        assert!(config.top_p.is_none());
        assert!(config.top_k.is_none());
        assert!(config.endpoint.is_none());
        assert!(!config.streaming);
        assert!(config.use_color);
        assert!(!config.verbose);
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::from(ChatArgs::default());
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            model: Some("anthropic.claude-v2:1".to_string()),
            region: Some("eu-central-1".to_string()),
            system: Some("You are terse.".to_string()),
            max_tokens: Some(300),
            window: Some(8),
            temperature: Some(0.2),
            top_p: Some(0.95),
            top_k: Some(250),
            endpoint: Some("http://localhost:4566".to_string()),
            stream: true,
            no_color: true,
            verbose: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.model, Model::Known(KnownModel::ClaudeV21));
        assert_eq!(config.region, "eu-central-1");
        assert_eq!(config.system_prompt, "You are terse.");
        assert_eq!(config.max_tokens, 300);
        assert_eq!(config.window_turns, 8);
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.top_p, Some(0.95));
        assert_eq!(config.top_k, Some(250));
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:4566"));
        assert!(config.streaming);
        assert!(!config.use_color);
        assert!(config.verbose);
    }

    #[test]
    fn unknown_model_is_custom() {
        let args = ChatArgs {
            model: Some("anthropic.claude-v3-preview".to_string()),
            ..ChatArgs::default()
        };
        assert_eq!(
            ChatConfig::from(args).model,
            Model::Custom("anthropic.claude-v3-preview".to_string())
        );
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_model(Model::Known(KnownModel::ClaudeInstantV1))
            .with_region("us-east-1")
            .with_system_prompt("Test prompt")
            .with_max_tokens(2048)
            .with_window_turns(2)
            .with_temperature(Some(0.6))
            .with_top_p(Some(0.9))
            .with_top_k(Some(64))
            .with_endpoint(Some("http://127.0.0.1:8080".to_string()))
            .with_streaming(true)
            .without_color()
            .with_verbose(true);

        assert_eq!(config.model, Model::Known(KnownModel::ClaudeInstantV1));
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.system_prompt, "Test prompt");
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.window_turns, 2);
        assert_eq!(config.temperature, Some(0.6));
        assert_eq!(config.top_p, Some(0.9));
        assert_eq!(config.top_k, Some(64));
        assert_eq!(config.endpoint.as_deref(), Some("http://127.0.0.1:8080"));
        assert!(config.streaming);
        assert!(!config.use_color);
        assert!(config.verbose);
    }
}
