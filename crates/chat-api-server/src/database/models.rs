use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::chat::{ChatRole, ChatTurn, MemberId, ProductId};
use crate::utils::error::ChatError;

/// Role column of `query_history`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchivedRole {
    User,
    Assistant,
}

impl ArchivedRole {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ArchivedRole::User => "user",
            ArchivedRole::Assistant => "assistant",
        }
    }
}

impl From<ChatRole> for ArchivedRole {
    fn from(role: ChatRole) -> Self {
        match role {
            ChatRole::User => ArchivedRole::User,
            ChatRole::Assistant => ArchivedRole::Assistant,
        }
    }
}

impl From<ArchivedRole> for ChatRole {
    fn from(role: ArchivedRole) -> Self {
        match role {
            ArchivedRole::User => ChatRole::User,
            ArchivedRole::Assistant => ChatRole::Assistant,
        }
    }
}

impl TryFrom<&str> for ArchivedRole {
    type Error = ChatError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(ArchivedRole::User),
            // rows written before the rename
            "assistant" | "bot" => Ok(ArchivedRole::Assistant),
            other => Err(ChatError::RoleMapping(other.to_string())),
        }
    }
}

/// Raw `query_history` row
#[derive(Debug, Clone, FromRow)]
pub struct ArchivedTurnRow {
    pub history_id: i32,
    pub member_id: MemberId,
    pub product_id: ProductId,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// One archived turn of a finished conversation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedTurn {
    pub id: i32,
    pub member_id: MemberId,
    pub product_id: ProductId,
    pub role: ArchivedRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ArchivedTurnRow> for ArchivedTurn {
    type Error = ChatError;

    fn try_from(row: ArchivedTurnRow) -> Result<Self, Self::Error> {
        Ok(ArchivedTurn {
            id: row.history_id,
            member_id: row.member_id,
            product_id: row.product_id,
            role: ArchivedRole::try_from(row.role.as_str())?,
            content: row.content,
            created_at: row.created_at,
        })
    }
}

/// Turn waiting to be inserted into the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArchivedTurn {
    pub role: ArchivedRole,
    pub content: String,
}

impl From<&ChatTurn> for NewArchivedTurn {
    fn from(turn: &ChatTurn) -> Self {
        Self {
            role: turn.role.into(),
            content: turn.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: &str) -> ArchivedTurnRow {
        ArchivedTurnRow {
            history_id: 1,
            member_id: 7,
            product_id: 42,
            role: role.to_string(),
            content: "How do I reset this?".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_rows_with_known_roles_convert() {
        let turn = ArchivedTurn::try_from(row("user")).unwrap();
        assert_eq!(turn.role, ArchivedRole::User);
        let turn = ArchivedTurn::try_from(row("bot")).unwrap();
        assert_eq!(turn.role, ArchivedRole::Assistant);
    }

    #[test]
    fn test_rows_with_unknown_roles_fail_loudly() {
        let err = ArchivedTurn::try_from(row("system")).unwrap_err();
        assert!(matches!(err, ChatError::RoleMapping(role) if role == "system"));
    }

    #[test]
    fn test_chat_turn_maps_to_archived_turn() {
        let new_turn = NewArchivedTurn::from(&ChatTurn::assistant("Press and hold"));
        assert_eq!(new_turn.role, ArchivedRole::Assistant);
        assert_eq!(new_turn.role.as_db_str(), "assistant");
        assert_eq!(ChatRole::from(new_turn.role), ChatRole::Assistant);
    }
}
