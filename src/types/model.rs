use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// A Bedrock model identifier.
///
/// This can be one of the Claude text-completion models known to this crate
/// or a custom string for models and inference profiles added later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier
    Custom(String),
}

/// Known Claude models that accept the text-completion request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModel {
    /// Claude 2.0
    #[serde(rename = "anthropic.claude-v2")]
    ClaudeV2,

    /// Claude 2.1
    #[serde(rename = "anthropic.claude-v2:1")]
    ClaudeV21,

    /// Claude Instant 1.x
    #[serde(rename = "anthropic.claude-instant-v1")]
    ClaudeInstantV1,
}

impl KnownModel {
    /// The Bedrock model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownModel::ClaudeV2 => "anthropic.claude-v2",
            KnownModel::ClaudeV21 => "anthropic.claude-v2:1",
            KnownModel::ClaudeInstantV1 => "anthropic.claude-instant-v1",
        }
    }

    /// All known models.
    pub fn all() -> &'static [KnownModel] {
        &[
            KnownModel::ClaudeV2,
            KnownModel::ClaudeV21,
            KnownModel::ClaudeInstantV1,
        ]
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::ClaudeV2)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Known(known_model) => write!(f, "{}", known_model),
            Model::Custom(custom) => write!(f, "{}", custom),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::validation(
                "model identifier must not be empty",
                Some("model".to_string()),
            ));
        }
        Ok(KnownModel::all()
            .iter()
            .find(|known| known.as_str() == s)
            .map(|known| Model::Known(*known))
            .unwrap_or_else(|| Model::Custom(s.to_string())))
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_claude_v2() {
        assert_eq!(Model::default().to_string(), "anthropic.claude-v2");
    }

    #[test]
    fn parse_known_and_custom() {
        assert_eq!(
            "anthropic.claude-v2:1".parse::<Model>().unwrap(),
            Model::Known(KnownModel::ClaudeV21)
        );
        assert_eq!(
            "us.anthropic.claude-v2".parse::<Model>().unwrap(),
            Model::Custom("us.anthropic.claude-v2".to_string())
        );
        assert!("  ".parse::<Model>().is_err());
    }

    #[test]
    fn serde_matches_display() {
        let model = Model::Known(KnownModel::ClaudeInstantV1);
        let json = serde_json::to_string(&model).unwrap();
        assert_eq!(json, r#""anthropic.claude-instant-v1""#);

        let model: Model = serde_json::from_str(r#""anthropic.claude-v2""#).unwrap();
        assert_eq!(model, Model::Known(KnownModel::ClaudeV2));

        let model: Model = serde_json::from_str(r#""my-profile""#).unwrap();
        assert_eq!(model, Model::Custom("my-profile".to_string()));
    }
}
