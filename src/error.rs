//! Error types for paydash.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Errors raised by the onboarding and profile-completion actions.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid role: {0:?}")]
    InvalidRole(String),

    #[error("Invalid subrole: {0:?}")]
    InvalidSubrole(String),

    #[error("Invalid profile details: {0}")]
    InvalidDetails(String),

    #[error("No role selected yet")]
    RoleNotSelected,

    #[error("Profile must be completed before KYC")]
    ProfileIncomplete,

    #[error("Profile not found for user {0}")]
    ProfileNotFound(String),

    #[error("Database error: {0}")]
    Database(DatabaseError),
}

impl From<DatabaseError> for OnboardingError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound { entity, id } if entity == "profile" => {
                Self::ProfileNotFound(id)
            }
            other => Self::Database(other),
        }
    }
}

impl OnboardingError {
    /// Whether this error should be rendered back on the form as a
    /// validation message.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidRole(_)
                | Self::InvalidSubrole(_)
                | Self::InvalidDetails(_)
                | Self::RoleNotSelected
                | Self::ProfileIncomplete
        )
    }
}

/// Mock account/session errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email address: {0:?}")]
    InvalidEmail(String),

    #[error("An account already exists for {0}")]
    EmailTaken(String),

    #[error("No account for {0}")]
    UnknownAccount(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
