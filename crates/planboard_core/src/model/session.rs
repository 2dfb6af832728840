//! Authenticated identity handed to the planning studio.
//!
//! # Invariants
//! - `user_id` is non-blank and trimmed.
//! - Every store query and mutation is scoped by `user_id`.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Session identity resolved by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: String,
    display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    BlankUserId,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankUserId => write!(f, "session user id must not be blank"),
        }
    }
}

impl Error for SessionError {}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Result<Self, SessionError> {
        let user_id = user_id.into().trim().to_string();
        if user_id.is_empty() {
            return Err(SessionError::BlankUserId);
        }
        Ok(Self {
            user_id,
            display_name: None,
        })
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        let trimmed = display_name.trim();
        self.display_name = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::{Session, SessionError};

    #[test]
    fn rejects_blank_user_id() {
        assert_eq!(Session::new("   "), Err(SessionError::BlankUserId));
    }

    #[test]
    fn trims_user_id_and_display_name() {
        let session = Session::new(" user_1 ")
            .unwrap()
            .with_display_name(" Ada ");
        assert_eq!(session.user_id(), "user_1");
        assert_eq!(session.display_name(), Some("Ada"));
    }
}
