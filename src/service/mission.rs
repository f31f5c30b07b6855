use std::sync::Arc;

use tracing::Span;
use uuid::Uuid;

use super::{translate, StoreResultExt};
use crate::error::{Error, Result};
use crate::models::*;
use crate::store::{CatStore, MissionStore, Store, StoreError, TargetStore};

/// Mission orchestration.
///
/// Every mutating operation checks its preconditions here, in a fixed order,
/// before touching storage. The policy is uniform: nothing about a completed
/// mission (its targets, their notes, its assignment) changes any more.
#[derive(Clone)]
pub struct MissionService {
    missions: Arc<dyn MissionStore>,
    targets: Arc<dyn TargetStore>,
    cats: Arc<dyn CatStore>,
    span: Span,
}

impl MissionService {
    /// Build the service over one backend providing all three ports.
    pub fn new<S: Store + 'static>(store: Arc<S>, span: Span) -> Self {
        Self {
            missions: store.clone(),
            targets: store.clone(),
            cats: store,
            span,
        }
    }

    /// Build the service over separate ports.
    pub fn from_parts(
        missions: Arc<dyn MissionStore>,
        targets: Arc<dyn TargetStore>,
        cats: Arc<dyn CatStore>,
        span: Span,
    ) -> Self {
        Self {
            missions,
            targets,
            cats,
            span,
        }
    }

    /// Create a mission with its initial targets and return its id.
    ///
    /// Targets are all validated first; the mission and its targets are then
    /// written in one atomic store call, so a failure leaves nothing behind.
    #[tracing::instrument(parent = &self.span, skip(self, targets), fields(targets = targets.len()), err)]
    pub fn create_mission(&self, targets: Vec<NewTarget>) -> Result<Uuid> {
        if targets.is_empty() {
            return Err(Error::NoTargets);
        }
        if targets.len() > MISSION_TARGET_LIMIT {
            return Err(Error::TargetOverflow);
        }
        for target in &targets {
            target.validate()?;
        }

        let mission = self
            .missions
            .add_mission(&targets)
            .or_error(Error::MissionNotFound, "creating mission")?;

        tracing::info!(mission_id = %mission.id, "mission created");
        Ok(mission.id)
    }

    /// Delete a mission together with its targets.
    ///
    /// A mission with an assigned cat must be unassigned first.
    #[tracing::instrument(parent = &self.span, skip(self), err)]
    pub fn delete_mission(&self, id: Uuid) -> Result<()> {
        let mission = self.load_mission(id)?;
        ensure_unassigned(&mission)?;

        self.missions
            .delete_mission(id)
            .or_error(Error::MissionNotFound, "deleting mission")?;

        tracing::info!(mission_id = %id, "mission deleted");
        Ok(())
    }

    /// Mark a mission completed. Completing it again is a no-op.
    #[tracing::instrument(parent = &self.span, skip(self), err)]
    pub fn update_mission_state(&self, id: Uuid) -> Result<Mission> {
        let mission = self
            .missions
            .update_mission(
                id,
                UpdateMissionInput {
                    state: Some(MissionState::Completed),
                    ..Default::default()
                },
            )
            .or_error(Error::MissionNotFound, "completing mission")?;

        tracing::info!(mission_id = %id, "mission completed");
        Ok(mission)
    }

    /// Mark one target of an open mission completed.
    #[tracing::instrument(parent = &self.span, skip(self), err)]
    pub fn set_mission_target_state(&self, mission_id: Uuid, target_id: Uuid) -> Result<()> {
        let mission = self.load_mission(mission_id)?;
        ensure_open(&mission)?;
        let target = self.load_target_of(&mission, target_id)?;

        if target.is_completed() {
            return Ok(());
        }

        self.targets
            .update_target(
                target.id,
                UpdateTargetInput {
                    state: Some(TargetState::Completed),
                    ..Default::default()
                },
            )
            .or_error(Error::TargetNotFound, "completing target")?;

        tracing::info!(%mission_id, %target_id, "target completed");
        Ok(())
    }

    /// Overwrite the notes of an open target on an open mission.
    #[tracing::instrument(parent = &self.span, skip(self, notes), err)]
    pub fn update_mission_target_notes(
        &self,
        mission_id: Uuid,
        target_id: Uuid,
        notes: String,
    ) -> Result<Target> {
        let mission = self.load_mission(mission_id)?;
        ensure_open(&mission)?;
        let target = self.load_target_of(&mission, target_id)?;
        ensure_target_open(&target)?;

        self.targets
            .update_target(
                target.id,
                UpdateTargetInput {
                    notes: Some(notes),
                    ..Default::default()
                },
            )
            .or_error(Error::TargetNotFound, "updating target notes")
    }

    /// Remove an open target from an open mission.
    ///
    /// The target's own state is checked before the mission's.
    #[tracing::instrument(parent = &self.span, skip(self), err)]
    pub fn delete_target_from_mission(&self, mission_id: Uuid, target_id: Uuid) -> Result<()> {
        let mission = self.load_mission(mission_id)?;
        let target = self.load_target_of(&mission, target_id)?;
        ensure_target_open(&target)?;
        ensure_open(&mission)?;

        self.targets
            .delete_target(target_id)
            .or_error(Error::TargetNotFound, "deleting target")?;

        tracing::info!(mission_id = %mission.id, %target_id, "target deleted");
        Ok(())
    }

    /// Add a target to a mission holding fewer than [`MISSION_TARGET_LIMIT`].
    ///
    /// The capacity check runs before the completion check. The store repeats
    /// the count inside its insert, so concurrent adds cannot overshoot.
    #[tracing::instrument(parent = &self.span, skip(self, target), err)]
    pub fn add_target_to_mission(&self, mission_id: Uuid, target: NewTarget) -> Result<Target> {
        let mission = self.load_mission(mission_id)?;
        let held = self
            .targets
            .list_targets(mission_id)
            .or_error(Error::MissionNotFound, "counting targets")?
            .len();
        ensure_capacity(held)?;
        ensure_open(&mission)?;
        target.validate()?;

        let created = self
            .targets
            .add_target(mission_id, &target, MISSION_TARGET_LIMIT)
            .or_error(Error::MissionNotFound, "adding target")?;

        tracing::info!(%mission_id, target_id = %created.id, "target added");
        Ok(created)
    }

    /// Assign a cat to an open mission.
    ///
    /// A cat works one open mission at a time. Re-assigning the cat already on
    /// the mission succeeds without changes; assigning another cat replaces it.
    #[tracing::instrument(parent = &self.span, skip(self), err)]
    pub fn assign_cat_to_mission(&self, mission_id: Uuid, cat_id: Uuid) -> Result<Mission> {
        let mission = self.load_mission(mission_id)?;
        ensure_open(&mission)?;
        if mission.cat_id == Some(cat_id) {
            return Ok(mission);
        }

        self.cats
            .get_cat(cat_id)
            .or_error(Error::CatNotFound, "loading cat")?;
        let engaged = self
            .missions
            .find_missions_by_cat(cat_id)
            .or_error(Error::CatNotFound, "loading cat missions")?;
        ensure_cat_available(mission_id, &engaged)?;

        let mission = self
            .missions
            .update_mission(
                mission_id,
                UpdateMissionInput {
                    cat_id: Some(Some(cat_id)),
                    ..Default::default()
                },
            )
            .or_error(Error::MissionNotFound, "assigning cat")?;

        tracing::info!(%mission_id, %cat_id, "cat assigned");
        Ok(mission)
    }

    /// Clear the assignment of an open mission.
    #[tracing::instrument(parent = &self.span, skip(self), err)]
    pub fn unassign_cat_from_mission(&self, mission_id: Uuid) -> Result<Mission> {
        let mission = self.load_mission(mission_id)?;
        ensure_open(&mission)?;
        if mission.cat_id.is_none() {
            return Ok(mission);
        }

        self.missions
            .update_mission(
                mission_id,
                UpdateMissionInput {
                    cat_id: Some(None),
                    ..Default::default()
                },
            )
            .or_error(Error::MissionNotFound, "unassigning cat")
    }

    #[tracing::instrument(parent = &self.span, skip(self), err)]
    pub fn list_missions(&self) -> Result<Vec<FullMission>> {
        let missions = self
            .missions
            .list_missions()
            .or_error(Error::MissionNotFound, "listing missions")?;

        missions
            .into_iter()
            .map(|mission| self.assemble(mission))
            .collect()
    }

    #[tracing::instrument(parent = &self.span, skip(self), err)]
    pub fn get_mission(&self, id: Uuid) -> Result<FullMission> {
        let mission = self.load_mission(id)?;
        self.assemble(mission)
    }

    fn assemble(&self, mission: Mission) -> Result<FullMission> {
        let targets = self
            .targets
            .list_targets(mission.id)
            .or_error(Error::MissionNotFound, "listing targets")?;

        let cat = match mission.cat_id {
            None => None,
            Some(cat_id) => match self.cats.get_cat(cat_id) {
                Ok(cat) => Some(cat),
                Err(StoreError::NotFound) => {
                    tracing::debug!(mission_id = %mission.id, %cat_id, "assigned cat is gone");
                    None
                }
                Err(e) => return Err(translate(e, Error::CatNotFound, "loading assigned cat")),
            },
        };

        Ok(FullMission {
            mission,
            targets,
            cat,
        })
    }

    fn load_mission(&self, id: Uuid) -> Result<Mission> {
        self.missions
            .get_mission(id)
            .or_error(Error::MissionNotFound, "loading mission")
    }

    fn load_target(&self, id: Uuid) -> Result<Target> {
        self.targets
            .get_target(id)
            .or_error(Error::TargetNotFound, "loading target")
    }

    /// Load a target and check it belongs to `mission`.
    fn load_target_of(&self, mission: &Mission, target_id: Uuid) -> Result<Target> {
        let target = self.load_target(target_id)?;
        if target.mission_id != mission.id {
            return Err(Error::TargetNotFound);
        }
        Ok(target)
    }
}

fn ensure_open(mission: &Mission) -> Result<()> {
    if mission.is_completed() {
        return Err(Error::MissionCompleted);
    }
    Ok(())
}

fn ensure_target_open(target: &Target) -> Result<()> {
    if target.is_completed() {
        return Err(Error::TargetCompleted);
    }
    Ok(())
}

/// `held` is the number of targets a mission has before one more is added.
fn ensure_capacity(held: usize) -> Result<()> {
    if held >= MISSION_TARGET_LIMIT {
        return Err(Error::TargetOverflow);
    }
    Ok(())
}

fn ensure_unassigned(mission: &Mission) -> Result<()> {
    if mission.cat_id.is_some() {
        return Err(Error::CatAlreadyAssigned);
    }
    Ok(())
}

/// `engaged` are the missions currently referencing the cat.
fn ensure_cat_available(mission_id: Uuid, engaged: &[Mission]) -> Result<()> {
    let busy = engaged
        .iter()
        .any(|m| m.id != mission_id && m.state == MissionState::Started);
    if busy {
        return Err(Error::CatAlreadyAssigned);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn mission(state: MissionState, cat_id: Option<Uuid>) -> Mission {
        let now = Utc::now();
        Mission {
            id: Uuid::new_v4(),
            state,
            cat_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn target(state: TargetState) -> Target {
        let now = Utc::now();
        Target {
            id: Uuid::new_v4(),
            mission_id: Uuid::new_v4(),
            name: "Mouse".to_string(),
            country: "France".to_string(),
            notes: String::new(),
            state,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn completed_mission_is_closed() {
        assert!(ensure_open(&mission(MissionState::Started, None)).is_ok());
        assert!(matches!(
            ensure_open(&mission(MissionState::Completed, None)),
            Err(Error::MissionCompleted)
        ));
    }

    #[test]
    fn completed_target_is_closed() {
        assert!(ensure_target_open(&target(TargetState::Started)).is_ok());
        assert!(matches!(
            ensure_target_open(&target(TargetState::Completed)),
            Err(Error::TargetCompleted)
        ));
    }

    #[test]
    fn capacity_allows_up_to_three() {
        assert!(ensure_capacity(0).is_ok());
        assert!(ensure_capacity(2).is_ok());
        assert!(matches!(ensure_capacity(3), Err(Error::TargetOverflow)));
    }

    #[test]
    fn assigned_mission_cannot_be_deleted() {
        assert!(ensure_unassigned(&mission(MissionState::Started, None)).is_ok());
        assert!(matches!(
            ensure_unassigned(&mission(MissionState::Started, Some(Uuid::new_v4()))),
            Err(Error::CatAlreadyAssigned)
        ));
    }

    #[test]
    fn cat_on_another_open_mission_is_busy() {
        let cat = Some(Uuid::new_v4());
        let target_mission = Uuid::new_v4();

        let open = mission(MissionState::Started, cat);
        assert!(matches!(
            ensure_cat_available(target_mission, &[open.clone()]),
            Err(Error::CatAlreadyAssigned)
        ));

        let finished = mission(MissionState::Completed, cat);
        assert!(ensure_cat_available(target_mission, &[finished]).is_ok());

        assert!(ensure_cat_available(open.id, &[open.clone()]).is_ok());
    }
}
