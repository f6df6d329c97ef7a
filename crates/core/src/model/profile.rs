use thiserror::Error;

use crate::model::ids::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("display name cannot be empty")]
    EmptyDisplayName,
}

/// The learner-facing identity attached to an account: what the
/// leaderboard and chat show instead of a raw id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    user_id: UserId,
    display_name: String,
    grade_level: Option<u8>,
}

impl Profile {
    /// Creates a profile with a trimmed, non-empty display name.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::EmptyDisplayName` when the name is blank.
    pub fn new(
        user_id: UserId,
        display_name: &str,
        grade_level: Option<u8>,
    ) -> Result<Self, ProfileError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(ProfileError::EmptyDisplayName);
        }
        Ok(Self {
            user_id,
            display_name: display_name.to_string(),
            grade_level,
        })
    }

    /// Rehydrate from persisted storage.
    ///
    /// # Errors
    ///
    /// Same validation as [`Profile::new`].
    pub fn from_persisted(
        user_id: UserId,
        display_name: &str,
        grade_level: Option<u8>,
    ) -> Result<Self, ProfileError> {
        Self::new(user_id, display_name, grade_level)
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn grade_level(&self) -> Option<u8> {
        self.grade_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_is_trimmed() {
        let profile = Profile::new(UserId::new(), "  Ada  ", Some(7)).unwrap();
        assert_eq!(profile.display_name(), "Ada");
        assert_eq!(profile.grade_level(), Some(7));
    }

    #[test]
    fn blank_display_name_is_rejected() {
        let err = Profile::new(UserId::new(), "   ", None).unwrap_err();
        assert_eq!(err, ProfileError::EmptyDisplayName);
    }
}
