use crate::error::{Error, ErrorKind, Result};
use derive_more::Display;
use std::str::FromStr;
use time::UtcDateTime;

/// Who wrote a reply.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    System,
    Assistant,
}
impl FromStr for Role {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "User" => Ok(Self::User),
            "System" => Ok(Self::System),
            "Assistant" => Ok(Self::Assistant),
            _ => exn::bail!(ErrorKind::InvalidData("role")),
        }
    }
}

/// One message in the discussion thread hanging off an annotation.
///
/// Replies form a forest per annotation: top-level replies have no parent,
/// and a parent is always a reply on the same annotation. Deleting a reply
/// deletes everything beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub id: String,
    pub annotation_id: String,
    pub parent_id: Option<String>,
    pub content: String,
    pub role: Role,
    /// Marks a reply that summarises the thread above it.
    pub is_synthesis: bool,
    pub created_at: UtcDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReply {
    pub annotation_id: String,
    pub parent_id: Option<String>,
    pub content: String,
    pub role: Role,
    pub is_synthesis: bool,
}

#[derive(sqlx::FromRow)]
pub(crate) struct ReplyRow {
    id: String,
    parent_id: Option<String>,
    annotation_id: String,
    content: String,
    role: String,
    is_synthesis: bool,
    created_at: i64,
}
impl TryFrom<ReplyRow> for Reply {
    type Error = Error;
    fn try_from(row: ReplyRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            annotation_id: row.annotation_id,
            parent_id: row.parent_id,
            content: row.content,
            role: row.role.parse()?,
            is_synthesis: row.is_synthesis,
            created_at: super::timestamp(row.created_at, "created at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Role::User)]
    #[case(Role::System)]
    #[case(Role::Assistant)]
    fn test_role_matches_schema(#[case] role: Role) {
        assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
    }

    #[test]
    fn test_unknown_role() {
        let err = "user".parse::<Role>().unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidData("role"));
    }
}
