//! User roles.

use serde::{Deserialize, Serialize};

/// The role a profile is assigned at sign-up.
///
/// Roles are immutable after sign-up; there is no promotion path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Lists products and fulfils orders containing them.
    Farmer,
    /// Browses and purchases products.
    Consumer,
    /// Platform staff: handles support tickets, may override order states.
    Admin,
}

impl Role {
    /// Returns true for platform staff.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Returns the wire name as stored in the `profiles` table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Farmer => "farmer",
            Role::Consumer => "consumer",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "farmer" => Ok(Role::Farmer),
            "consumer" => Ok(Role::Consumer),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}
