//! Caller identity and role enforcement.
//!
//! Roles are opaque strings supplied by the upstream identity service. Only
//! `teacher` and `student` carry meaning here; anything else is kept as-is
//! and passes only routes open to every authenticated caller.

use crate::RollcallError;
use std::fmt;

/// Role attribute of an authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// Owns and operates class sessions.
    Teacher,
    /// Checks into class sessions.
    Student,
    /// Any other role string.
    Other(String),
}

impl Role {
    /// Interpret a role string, case-insensitively.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "teacher" => Self::Teacher,
            "student" => Self::Student,
            _ => Self::Other(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Teacher => f.write_str("teacher"),
            Self::Student => f.write_str("student"),
            Self::Other(other) => f.write_str(other),
        }
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Stable user id.
    pub user_id: String,
    /// Role attribute.
    pub role: Role,
}

impl Caller {
    /// Build a caller from the identity service's attributes.
    ///
    /// # Errors
    /// `Unauthenticated` if the user id is missing or blank. A missing role
    /// is kept as an empty `Other` role.
    pub fn from_attributes(user_id: Option<&str>, role: Option<&str>) -> Result<Self, RollcallError> {
        let user_id = user_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RollcallError::Unauthenticated("missing caller identity".to_string()))?;

        Ok(Self {
            user_id: user_id.to_string(),
            role: Role::parse(role.unwrap_or_default()),
        })
    }
}

/// Check that `caller` holds `required`.
///
/// # Errors
/// `Unauthorized` on a role mismatch.
pub fn require_role(caller: &Caller, required: &Role) -> Result<(), RollcallError> {
    if &caller.role != required {
        return Err(RollcallError::Unauthorized(format!(
            "{} access required",
            required
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("Teacher"), Role::Teacher);
        assert_eq!(Role::parse(" student "), Role::Student);
        assert_eq!(Role::parse("admin"), Role::Other("admin".to_string()));
    }

    #[test]
    fn test_missing_identity_is_unauthenticated() {
        assert!(matches!(
            Caller::from_attributes(None, Some("teacher")),
            Err(RollcallError::Unauthenticated(_))
        ));
        assert!(matches!(
            Caller::from_attributes(Some("  "), Some("teacher")),
            Err(RollcallError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_require_role() {
        let teacher = Caller::from_attributes(Some("t1"), Some("teacher")).unwrap();
        assert!(require_role(&teacher, &Role::Teacher).is_ok());
        assert!(matches!(
            require_role(&teacher, &Role::Student),
            Err(RollcallError::Unauthorized(msg)) if msg.contains("student")
        ));

        let unknown = Caller::from_attributes(Some("x"), None).unwrap();
        assert_eq!(unknown.role, Role::Other(String::new()));
        assert!(require_role(&unknown, &Role::Teacher).is_err());
    }
}
