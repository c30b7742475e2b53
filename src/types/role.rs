use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// The author of a turn in the conversation.
///
/// Only these three roles exist.  Labels are parsed case-insensitively and
/// `user`/`ai` are accepted as aliases; anything else is rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The system prompt that frames the conversation.
    System,

    /// Input typed by the person using the chat.
    Human,

    /// Text produced by the model.
    Assistant,
}

impl Role {
    /// The label used when rendering a turn.
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "System",
            Role::Human => "Human",
            Role::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "system" => Ok(Role::System),
            "human" | "user" => Ok(Role::Human),
            "assistant" | "ai" => Ok(Role::Assistant),
            _ => Err(Error::validation(
                format!("unrecognized role label: {s:?}"),
                Some("role".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_canonical_labels() {
        assert_eq!("system".parse::<Role>().unwrap(), Role::System);
        assert_eq!("Human".parse::<Role>().unwrap(), Role::Human);
        assert_eq!("ASSISTANT".parse::<Role>().unwrap(), Role::Assistant);
    }

    #[test]
    fn parse_aliases() {
        assert_eq!("user".parse::<Role>().unwrap(), Role::Human);
        assert_eq!(" ai ".parse::<Role>().unwrap(), Role::Assistant);
    }

    #[test]
    fn reject_unrecognized_labels() {
        let err = "Asistant".parse::<Role>().unwrap_err();
        assert!(err.is_validation());
        assert!("".parse::<Role>().is_err());
        assert!("tool".parse::<Role>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for role in [Role::System, Role::Human, Role::Assistant] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn serde_uses_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Human).unwrap(), r#""human""#);
        let role: Role = serde_json::from_str(r#""assistant""#).unwrap();
        assert_eq!(role, Role::Assistant);
    }
}
