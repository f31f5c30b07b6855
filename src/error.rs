//! Error kinds surfaced by the services.
//!
//! These are semantic errors. Mapping them to HTTP status codes is the job of
//! the [`api`](crate::api) layer.

use thiserror::Error;

use crate::breeds::BreedError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cat not found")]
    CatNotFound,

    #[error("mission not found")]
    MissionNotFound,

    #[error("target not found")]
    TargetNotFound,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid breed: {0}")]
    InvalidBreed(String),

    #[error("conflicting data: a unique value is already taken")]
    ConflictingData,

    #[error("a mission needs at least one target")]
    NoTargets,

    #[error("a mission cannot hold more than {} targets", crate::models::MISSION_TARGET_LIMIT)]
    TargetOverflow,

    #[error("mission is already completed")]
    MissionCompleted,

    #[error("target is already completed")]
    TargetCompleted,

    #[error("cat is assigned to a mission")]
    CatAlreadyAssigned,

    #[error("breed catalog unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<BreedError> for Error {
    fn from(e: BreedError) -> Self {
        match e {
            BreedError::Invalid(breed) => Self::InvalidBreed(breed),
            BreedError::Unavailable(reason) => Self::UpstreamUnavailable(reason),
        }
    }
}
