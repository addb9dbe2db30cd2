use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of an acting identity.
///
/// Privileged changes apply immediately and Privileged identities resolve
/// pending changes; Standard identities can only propose changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "identity_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Privileged,
    Standard,
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "privileged" | "admin" | "administrator" => Ok(Role::Privileged),
            "standard" | "user" => Ok(Role::Standard),
            _ => Err(anyhow::anyhow!("Invalid role: {}", s)),
        }
    }
}

/// An acting principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub credential: String,
    pub role: Role,
}

impl Identity {
    pub fn new(name: impl Into<String>, credential: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            credential: credential.into(),
            role,
        }
    }

    pub fn is_privileged(&self) -> bool {
        self.role == Role::Privileged
    }
}
