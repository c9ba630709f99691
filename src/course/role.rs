use std::fmt;

use serde::{Deserialize, Serialize};

/// A user holds at most one of these per course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Tutor,
    Owner,
    Admin,
}

impl Role {
    /// Resolution order: the first role that matches wins, so a user who is
    /// both enrolled and admin-flagged is reported as a student.
    pub const PRECEDENCE: [Self; 4] = [Self::Student, Self::Tutor, Self::Owner, Self::Admin];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Tutor => "tutor",
            Self::Owner => "owner",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_outranks_everything() {
        assert_eq!(Role::PRECEDENCE[0], Role::Student);
        assert_eq!(Role::PRECEDENCE[3], Role::Admin);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Tutor).unwrap(), "\"tutor\"");
        assert_eq!(Role::Owner.to_string(), "owner");
    }
}
