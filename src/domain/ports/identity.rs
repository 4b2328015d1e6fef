//! Caller identity, attached to every request by the fronting gateway

use std::fmt;
use std::str::FromStr;

use crate::support::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Customer,
    Staff,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "staff" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            other => Err(DomainError::Unauthorized(format!("Unknown role '{}'", other))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is making the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// Staff and admins act on behalf of customers
    pub fn is_staff(&self) -> bool {
        self.role >= Role::Staff
    }

    pub fn require_staff(&self) -> Result<(), DomainError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(DomainError::Forbidden("Staff role required".to_string()))
        }
    }

    pub fn require_admin(&self) -> Result<(), DomainError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(DomainError::Forbidden("Admin role required".to_string()))
        }
    }

    /// A customer may only touch their own records
    pub fn require_self_or_staff(&self, user_id: &str) -> Result<(), DomainError> {
        if self.is_staff() || self.user_id == user_id {
            Ok(())
        } else {
            Err(DomainError::Forbidden(
                "Not allowed to act for another user".to_string(),
            ))
        }
    }
}
