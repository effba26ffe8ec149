//! Translation of transcript turns into the model's role vocabulary

use super::{Message, Role};

/// Role names understood by the completion service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalRole {
    User,
    Model,
}

impl ExternalRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ExternalRole::User => "user",
            ExternalRole::Model => "model",
        }
    }
}

impl From<Role> for ExternalRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => ExternalRole::User,
            Role::Assistant => ExternalRole::Model,
        }
    }
}

/// A transcript message as sent over the wire. Rebuilt for every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedTurn {
    pub role: ExternalRole,
    pub parts: String,
}

impl From<&Message> for MappedTurn {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role().into(),
            parts: message.content().to_string(),
        }
    }
}

/// Map history turns one-to-one, preserving order and content.
///
/// Callers pass the transcript without its newest message.
pub fn map_history(history: &[Message]) -> Vec<MappedTurn> {
    history.iter().map(MappedTurn::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_translation() {
        assert_eq!(ExternalRole::from(Role::User), ExternalRole::User);
        assert_eq!(ExternalRole::from(Role::Assistant), ExternalRole::Model);
        assert_eq!(ExternalRole::Model.as_str(), "model");
    }

    #[test]
    fn test_content_passes_through() {
        let history = vec![
            Message::user("¿Qué inversor necesito para 5 kW?"),
            Message::assistant("  Un inversor de 5 kW...\n"),
        ];
        let mapped = map_history(&history);
        assert_eq!(
            mapped,
            vec![
                MappedTurn {
                    role: ExternalRole::User,
                    parts: "¿Qué inversor necesito para 5 kW?".to_string(),
                },
                MappedTurn {
                    role: ExternalRole::Model,
                    parts: "  Un inversor de 5 kW...\n".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_empty_history() {
        assert!(map_history(&[]).is_empty());
    }
}
