use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AchievementError {
    #[error("achievement code cannot be empty")]
    EmptyCode,
}

/// The stable string key of an unlocked achievement, e.g. `first-quiz`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AchievementCode(String);

impl AchievementCode {
    /// Creates a code from a trimmed, non-empty string.
    ///
    /// # Errors
    ///
    /// Returns `AchievementError::EmptyCode` when the code is blank.
    pub fn new(code: &str) -> Result<Self, AchievementError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AchievementError::EmptyCode);
        }
        Ok(Self(code.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AchievementCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_trimmed() {
        let code = AchievementCode::new(" first-quiz ").unwrap();
        assert_eq!(code.as_str(), "first-quiz");
    }

    #[test]
    fn blank_code_is_rejected() {
        assert_eq!(
            AchievementCode::new("").unwrap_err(),
            AchievementError::EmptyCode
        );
    }
}
