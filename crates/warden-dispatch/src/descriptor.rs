//! Function descriptors: the access-control metadata of a business function.

use serde::{Deserialize, Serialize};

/// Whether a function can be called without a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessRequirement {
    /// Callable with no session; never touches the session subsystem.
    Anonymous,
    /// Requires a valid session token.
    Authenticated,
}

/// Transport-level protection a function requires, independent of login.
///
/// Levels are ordered: a channel satisfies a requirement when its level is
/// at least the required one.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionLevel {
    /// No protection required.
    #[default]
    None,
    /// Messages must be signed.
    Sign,
    /// Messages must be encrypted and signed.
    EncryptAndSign,
}

impl ProtectionLevel {
    /// Whether a channel at this level satisfies `required`.
    pub fn satisfies(self, required: ProtectionLevel) -> bool {
        self >= required
    }

    /// Stable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Sign => "sign",
            Self::EncryptAndSign => "encrypt_and_sign",
        }
    }
}

impl std::fmt::Display for ProtectionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProtectionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "sign" => Ok(Self::Sign),
            "encrypt_and_sign" | "encrypt-and-sign" | "encrypted" => Ok(Self::EncryptAndSign),
            other => Err(format!("unknown protection level '{other}'")),
        }
    }
}

/// Access-control metadata for one registered function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionDescriptor {
    /// Function identifier, unique within the owner type.
    pub func_id: String,
    /// Business object type that owns the function.
    pub owner_type: &'static str,
    /// Login requirement.
    pub access: AccessRequirement,
    /// Required channel protection.
    pub protection: ProtectionLevel,
}

impl FunctionDescriptor {
    /// Whether calling this function requires a session.
    pub fn requires_session(&self) -> bool {
        self.access == AccessRequirement::Authenticated
    }
}
