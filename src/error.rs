use crate::db::error::DbError;
use crate::models::types::MemberId;
use thiserror::Error;

pub type AppResult<T> = Result<T, DomainError>;

#[derive(Debug, Error)]
pub enum DomainError {
    /// No catalog entry matches
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// No inventory stack matches the item, maker and temper
    #[error("item not found in inventory")]
    ItemNotFoundInInventory,

    /// Only weapons and armor can be equipped
    #[error("item cannot be equipped: {0}")]
    ItemIsNotEquippable(String),

    /// No equipment slot holds the item
    #[error("item not found in equipment")]
    ItemNotFoundInEquipment,

    #[error("character not found for member {0}")]
    CharacterNotFound(MemberId),

    #[error("member {0} already has a character")]
    CharacterAlreadyExists(MemberId),

    #[error("attribute not found: {0}")]
    AttributeNotFound(String),

    #[error("member {0} is already registering a character")]
    RegistrationInProgress(MemberId),

    #[error("member {0} is not registering a character")]
    NoRegistration(MemberId),

    #[error("validation failed: {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// Internal state no longer satisfies its invariants. Always a bug.
    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Infra(#[from] InfraError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl DomainError {
    /// Expected conditions that are reported back to the user rather than logged as failures.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            DomainError::InvariantViolated(_)
                | DomainError::Db(_)
                | DomainError::Infra(_)
                | DomainError::Io(_)
                | DomainError::Yaml(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigErrorKind {
    #[error("failed to read file: {0}")]
    Read(std::io::Error),

    #[error("failed to parse file: {0}")]
    Parse(toml::de::Error),

    #[error("invalid game configuration: {0}")]
    Invalid(String),

    #[error("invalid environment variable {0}: {1}")]
    InvalidEnv(String, String),
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("invalid configuration in {path}: {source}")]
    Config {
        path: std::path::PathBuf,
        #[source]
        source: ConfigErrorKind,
    },
}
