//! Catalog and tuning load errors

use thiserror::Error;

/// Failure while loading weapon/effect catalogs or tuning data.
///
/// Whole-file failures (`Io`, `Ron`) abort a load. Record-level failures are
/// collected per weapon or effect so the rest of the catalog stays usable.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("weapon `{weapon}` references unknown effect `{effect}`")]
    UnknownEffect { weapon: String, effect: String },

    #[error("`{record}`: `{field}` out of domain ({reason})")]
    OutOfDomain {
        record: String,
        field: &'static str,
        reason: String,
    },

    #[error("effect `{effect}`: kind {kind} does not belong to category {category}")]
    CategoryMismatch {
        effect: String,
        kind: &'static str,
        category: &'static str,
    },

    #[error("effect `{effect}`: missing parameter `{param}`")]
    MissingParameter { effect: String, param: &'static str },

    #[error("effect `{effect}`: unknown parameter `{param}`")]
    UnknownParameter { effect: String, param: String },

    #[error("effect `{effect}`: parameter `{param}` must be a {expected}")]
    ParameterType {
        effect: String,
        param: &'static str,
        expected: &'static str,
    },

    #[error("duplicate definition: {0}")]
    Duplicate(String),

    #[error("catalog contains no usable weapons")]
    Empty,
}

impl ConfigError {
    pub(crate) fn out_of_domain(
        record: &str,
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::OutOfDomain {
            record: record.to_string(),
            field,
            reason: reason.into(),
        }
    }
}

/// Why a weapon could not be added to an arsenal
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EquipError {
    #[error("unknown weapon `{0}`")]
    UnknownWeapon(String),

    #[error("weapon `{id}` requires a different alignment (faith {faith}, corruption {corruption})")]
    MoralityLocked {
        id: String,
        faith: f32,
        corruption: f32,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ConfigError>;
