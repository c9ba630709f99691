use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Natural key of a course. Rendered as `{semester}-{name}`, which is also
/// the org name on the git host and the team name on the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseId {
    name: String,
    semester: String,
}

#[derive(Debug, Error)]
#[error("malformed course id")]
pub struct ParseCourseIdError;

impl CourseId {
    pub fn new(name: impl Into<String>, semester: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            semester: semester.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn semester(&self) -> &str {
        &self.semester
    }

    /// A course id is valid when the name has no spaces and the semester is
    /// exactly six characters ending in `SS` or `WS` (e.g. `2024SS`).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        if self.name.contains(' ') {
            return false;
        }

        self.semester.len() == 6 && (self.semester.ends_with("SS") || self.semester.ends_with("WS"))
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.semester, self.name)
    }
}

impl FromStr for CourseId {
    type Err = ParseCourseIdError;

    /// Splits `{semester}-{name}` on the first dash. Course names may
    /// themselves contain dashes. Validity is checked separately so that
    /// case-insensitive resolution can still see the raw parts.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() < 6 {
            return Err(ParseCourseIdError);
        }

        let (semester, name) = s.split_once('-').ok_or(ParseCourseIdError)?;

        Ok(Self::new(name, semester))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trips_through_parse() {
        let id = CourseId::new("algo-basics", "2024SS");
        assert_eq!(id.to_string(), "2024SS-algo-basics");

        let parsed: CourseId = "2024SS-algo-basics".parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn semester_must_be_six_chars_ending_in_term() {
        assert!(CourseId::new("algo", "2024SS").is_valid());
        assert!(CourseId::new("algo", "2024WS").is_valid());
        assert!(!CourseId::new("algo", "2024ss").is_valid());
        assert!(!CourseId::new("algo", "24SS").is_valid());
        assert!(!CourseId::new("algo", "2024XX").is_valid());
    }

    #[test]
    fn name_must_not_contain_spaces() {
        assert!(!CourseId::new("algo basics", "2024SS").is_valid());
    }

    #[test]
    fn too_short_or_dashless_input_is_rejected() {
        assert!("2024".parse::<CourseId>().is_err());
        assert!("2024SSalgo".parse::<CourseId>().is_err());
    }
}
