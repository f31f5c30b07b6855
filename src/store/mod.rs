//! Persistence ports.
//!
//! The services only ever talk to storage through these traits. Two backends
//! implement them: the SQLite [`Database`](crate::db::Database) and the
//! in-memory [`MemoryStore`].
//!
//! Every lookup of a single record reports a missing row as
//! [`StoreError::NotFound`], never as a generic failure. Operations that span
//! several rows (creating a mission with its targets, deleting a mission with
//! its targets, the capped target insert) are atomic in every backend.

pub mod memory;

use thiserror::Error;
use uuid::Uuid;

use crate::models::*;

pub use memory::MemoryStore;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated")]
    Conflict,

    /// A capped insert found the parent already holding `limit` children.
    #[error("capacity of {0} reached")]
    CapacityExceeded(usize),

    /// The mission still has a cat assigned.
    #[error("mission is assigned")]
    Assigned,

    /// The mission is completed and no longer takes new targets.
    #[error("mission is closed")]
    Closed,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub trait CatStore: Send + Sync {
    fn get_cat(&self, id: Uuid) -> StoreResult<Cat>;

    fn get_cat_by_name(&self, name: &str) -> StoreResult<Cat>;

    fn list_cats(&self) -> StoreResult<Vec<Cat>>;

    fn add_cat(&self, input: CreateCatInput) -> StoreResult<Cat>;

    /// Persist every mutable field of `cat` and return the stored record.
    fn update_cat(&self, cat: &Cat) -> StoreResult<Cat>;

    /// Remove a cat. Missions referencing it lose their assignment.
    fn delete_cat(&self, id: Uuid) -> StoreResult<()>;
}

pub trait MissionStore: Send + Sync {
    fn get_mission(&self, id: Uuid) -> StoreResult<Mission>;

    fn list_missions(&self) -> StoreResult<Vec<Mission>>;

    /// All missions currently referencing `cat_id`, whatever their state.
    fn find_missions_by_cat(&self, cat_id: Uuid) -> StoreResult<Vec<Mission>>;

    /// Insert a started mission together with its initial targets.
    fn add_mission(&self, targets: &[NewTarget]) -> StoreResult<Mission>;

    fn update_mission(&self, id: Uuid, input: UpdateMissionInput) -> StoreResult<Mission>;

    /// Remove an unassigned mission and all of its targets.
    ///
    /// The assignment is checked in the same atomic step as the delete; an
    /// assigned mission yields [`StoreError::Assigned`].
    fn delete_mission(&self, id: Uuid) -> StoreResult<()>;
}

pub trait TargetStore: Send + Sync {
    fn get_target(&self, id: Uuid) -> StoreResult<Target>;

    /// Targets of a mission in insertion order.
    fn list_targets(&self, mission_id: Uuid) -> StoreResult<Vec<Target>>;

    /// Insert a target unless the mission already holds `limit` targets.
    ///
    /// The count, the state check and the insert happen atomically. A full
    /// mission yields [`StoreError::CapacityExceeded`], a completed one
    /// [`StoreError::Closed`], an unknown one [`StoreError::NotFound`]. Capacity
    /// is checked first.
    fn add_target(&self, mission_id: Uuid, target: &NewTarget, limit: usize)
        -> StoreResult<Target>;

    fn update_target(&self, id: Uuid, input: UpdateTargetInput) -> StoreResult<Target>;

    fn delete_target(&self, id: Uuid) -> StoreResult<()>;
}

/// A backend providing all three ports.
pub trait Store: CatStore + MissionStore + TargetStore {}

impl<T: CatStore + MissionStore + TargetStore> Store for T {}
