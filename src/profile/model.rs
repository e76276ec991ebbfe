//! Account and profile data models.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level account category, chosen once during onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Freelancer,
    Contractor,
    Employee,
    Employer,
    Dao,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Freelancer,
        Role::Contractor,
        Role::Employee,
        Role::Employer,
        Role::Dao,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Freelancer => "freelancer",
            Self::Contractor => "contractor",
            Self::Employee => "employee",
            Self::Employer => "employer",
            Self::Dao => "dao",
        }
    }

    /// The subrole this role pins, if it is not user-selectable.
    pub fn forced_subrole(&self) -> Option<Subrole> {
        match self {
            Self::Employee => Some(Subrole::Receiver),
            Self::Employer => Some(Subrole::Sender),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive parse. Whitespace is not stripped.
impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "freelancer" => Ok(Self::Freelancer),
            "contractor" => Ok(Self::Contractor),
            "employee" => Ok(Self::Employee),
            "employer" => Ok(Self::Employer),
            "dao" => Ok(Self::Dao),
            _ => Err(()),
        }
    }
}

/// Direction of money flow: senders pay others, receivers get paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subrole {
    Sender,
    Receiver,
}

impl Subrole {
    pub const ALL: [Subrole; 2] = [Subrole::Sender, Subrole::Receiver];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Receiver => "receiver",
        }
    }
}

impl std::fmt::Display for Subrole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subrole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sender" => Ok(Self::Sender),
            "receiver" => Ok(Self::Receiver),
            _ => Err(()),
        }
    }
}

/// A registered account. Credentials are not modeled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Per-user onboarding record. Created empty alongside the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub role: Option<Role>,
    pub subrole: Option<Subrole>,
    pub profile_completed: bool,
    pub kyc_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// A freshly created profile with nothing selected.
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: None,
            subrole: None,
            profile_completed: false,
            kyc_verified: false,
            full_name: None,
            country: None,
            updated_at: Utc::now(),
        }
    }

    /// Apply a patch in place. `None` fields are left untouched.
    pub fn apply(&mut self, patch: &ProfilePatch) {
        if let Some(role) = patch.role {
            self.role = Some(role);
        }
        if let Some(subrole) = patch.subrole {
            self.subrole = Some(subrole);
        }
        if let Some(done) = patch.profile_completed {
            self.profile_completed = done;
        }
        if let Some(kyc) = patch.kyc_verified {
            self.kyc_verified = kyc;
        }
        if let Some(ref name) = patch.full_name {
            self.full_name = Some(name.clone());
        }
        if let Some(ref country) = patch.country {
            self.country = Some(country.clone());
        }
    }
}

/// Partial profile update merged onto the stored record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub role: Option<Role>,
    pub subrole: Option<Subrole>,
    pub profile_completed: Option<bool>,
    pub kyc_verified: Option<bool>,
    pub full_name: Option<String>,
    pub country: Option<String>,
}

/// Details collected on the profile-completion screen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileDetails {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub country: String,
}
