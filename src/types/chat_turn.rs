use serde::{Deserialize, Serialize};

use crate::types::Role;

/// One message in the conversation, tagged with its author.
///
/// Fields are private so a turn cannot change once it is in session memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    role: Role,
    content: String,
}

impl ChatTurn {
    /// Create a new turn.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a human turn.
    pub fn human(content: impl Into<String>) -> Self {
        Self::new(Role::Human, content)
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// The author of this turn.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The text of this turn.
    pub fn content(&self) -> &str {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_role() {
        assert_eq!(ChatTurn::system("s").role(), Role::System);
        assert_eq!(ChatTurn::human("h").role(), Role::Human);
        assert_eq!(ChatTurn::assistant("a").role(), Role::Assistant);
        assert_eq!(ChatTurn::human("Hello").content(), "Hello");
    }
}
