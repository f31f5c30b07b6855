//! Application services.
//!
//! [`MissionService`] owns every rule about missions, targets and assignments.
//! [`CatService`] handles operatives and gates them through the breed catalog.
//! Both receive their storage ports and a [`tracing::Span`] at construction.

mod cat;
mod mission;

pub use cat::CatService;
pub use mission::MissionService;

use crate::error::Error;
use crate::store::StoreError;

/// Translate a store failure into a service error.
///
/// `not_found` names the entity a missing row refers to. Backend failures keep
/// their cause and gain `context`.
fn translate(e: StoreError, not_found: Error, context: &'static str) -> Error {
    match e {
        StoreError::NotFound => not_found,
        StoreError::Conflict => Error::ConflictingData,
        StoreError::CapacityExceeded(_) => Error::TargetOverflow,
        StoreError::Assigned => Error::CatAlreadyAssigned,
        StoreError::Closed => Error::MissionCompleted,
        StoreError::Backend(source) => Error::Internal(source.context(context)),
    }
}

trait StoreResultExt<T> {
    fn or_error(self, not_found: Error, context: &'static str) -> Result<T, Error>;
}

impl<T> StoreResultExt<T> for Result<T, StoreError> {
    fn or_error(self, not_found: Error, context: &'static str) -> Result<T, Error> {
        self.map_err(|e| translate(e, not_found, context))
    }
}
