use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use chrono::Utc;
use uuid::Uuid;

use super::{CatStore, MissionStore, StoreError, StoreResult, TargetStore};
use crate::models::*;

/// In-memory backend.
///
/// All state sits behind one mutex, so every trait call (including the
/// multi-row ones) is atomic with respect to the others. Records are kept in
/// insertion order.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    cats: Vec<Cat>,
    missions: Vec<Mission>,
    targets: Vec<Target>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend(anyhow!("memory store lock poisoned")))
    }
}

impl MemoryState {
    fn insert_target(&mut self, mission_id: Uuid, input: &NewTarget) -> Target {
        let now = Utc::now();
        let target = Target {
            id: Uuid::new_v4(),
            mission_id,
            name: input.name.clone(),
            country: input.country.clone(),
            notes: input.notes.clone().unwrap_or_default(),
            state: TargetState::Started,
            created_at: now,
            updated_at: now,
        };
        self.targets.push(target.clone());
        target
    }
}

impl CatStore for MemoryStore {
    fn get_cat(&self, id: Uuid) -> StoreResult<Cat> {
        let state = self.lock()?;
        state
            .cats
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn get_cat_by_name(&self, name: &str) -> StoreResult<Cat> {
        let state = self.lock()?;
        state
            .cats
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn list_cats(&self) -> StoreResult<Vec<Cat>> {
        let state = self.lock()?;
        let mut cats = state.cats.clone();
        cats.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(cats)
    }

    fn add_cat(&self, input: CreateCatInput) -> StoreResult<Cat> {
        let mut state = self.lock()?;
        if state.cats.iter().any(|c| c.name == input.name) {
            return Err(StoreError::Conflict);
        }

        let now = Utc::now();
        let cat = Cat {
            id: Uuid::new_v4(),
            name: input.name,
            years_experience: input.years_experience,
            breed: input.breed,
            salary: input.salary,
            created_at: now,
            updated_at: now,
        };
        state.cats.push(cat.clone());
        Ok(cat)
    }

    fn update_cat(&self, cat: &Cat) -> StoreResult<Cat> {
        let mut state = self.lock()?;
        if state
            .cats
            .iter()
            .any(|c| c.id != cat.id && c.name == cat.name)
        {
            return Err(StoreError::Conflict);
        }

        let stored = state
            .cats
            .iter_mut()
            .find(|c| c.id == cat.id)
            .ok_or(StoreError::NotFound)?;
        stored.name = cat.name.clone();
        stored.years_experience = cat.years_experience;
        stored.breed = cat.breed.clone();
        stored.salary = cat.salary;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    fn delete_cat(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.lock()?;
        let before = state.cats.len();
        state.cats.retain(|c| c.id != id);
        if state.cats.len() == before {
            return Err(StoreError::NotFound);
        }

        for mission in state.missions.iter_mut().filter(|m| m.cat_id == Some(id)) {
            mission.cat_id = None;
        }
        Ok(())
    }
}

impl MissionStore for MemoryStore {
    fn get_mission(&self, id: Uuid) -> StoreResult<Mission> {
        let state = self.lock()?;
        state
            .missions
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn list_missions(&self) -> StoreResult<Vec<Mission>> {
        Ok(self.lock()?.missions.clone())
    }

    fn find_missions_by_cat(&self, cat_id: Uuid) -> StoreResult<Vec<Mission>> {
        let state = self.lock()?;
        Ok(state
            .missions
            .iter()
            .filter(|m| m.cat_id == Some(cat_id))
            .cloned()
            .collect())
    }

    fn add_mission(&self, targets: &[NewTarget]) -> StoreResult<Mission> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let mission = Mission {
            id: Uuid::new_v4(),
            state: MissionState::Started,
            cat_id: None,
            created_at: now,
            updated_at: now,
        };
        state.missions.push(mission.clone());
        for target in targets {
            state.insert_target(mission.id, target);
        }
        Ok(mission)
    }

    fn update_mission(&self, id: Uuid, input: UpdateMissionInput) -> StoreResult<Mission> {
        let mut state = self.lock()?;
        let mission = state
            .missions
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::NotFound)?;

        if let Some(mission_state) = input.state {
            mission.state = mission_state;
        }
        if let Some(cat_id) = input.cat_id {
            mission.cat_id = cat_id;
        }
        mission.updated_at = Utc::now();
        Ok(mission.clone())
    }

    fn delete_mission(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.lock()?;
        let mission = state
            .missions
            .iter()
            .find(|m| m.id == id)
            .ok_or(StoreError::NotFound)?;
        if mission.cat_id.is_some() {
            return Err(StoreError::Assigned);
        }

        state.missions.retain(|m| m.id != id);
        state.targets.retain(|t| t.mission_id != id);
        Ok(())
    }
}

impl TargetStore for MemoryStore {
    fn get_target(&self, id: Uuid) -> StoreResult<Target> {
        let state = self.lock()?;
        state
            .targets
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn list_targets(&self, mission_id: Uuid) -> StoreResult<Vec<Target>> {
        let state = self.lock()?;
        Ok(state
            .targets
            .iter()
            .filter(|t| t.mission_id == mission_id)
            .cloned()
            .collect())
    }

    fn add_target(
        &self,
        mission_id: Uuid,
        target: &NewTarget,
        limit: usize,
    ) -> StoreResult<Target> {
        let mut state = self.lock()?;
        let completed = state
            .missions
            .iter()
            .find(|m| m.id == mission_id)
            .ok_or(StoreError::NotFound)?
            .is_completed();

        let held = state
            .targets
            .iter()
            .filter(|t| t.mission_id == mission_id)
            .count();
        if held >= limit {
            return Err(StoreError::CapacityExceeded(limit));
        }
        if completed {
            return Err(StoreError::Closed);
        }

        Ok(state.insert_target(mission_id, target))
    }

    fn update_target(&self, id: Uuid, input: UpdateTargetInput) -> StoreResult<Target> {
        let mut state = self.lock()?;
        let target = state
            .targets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound)?;

        if let Some(notes) = input.notes {
            target.notes = notes;
        }
        if let Some(target_state) = input.state {
            target.state = target_state;
        }
        target.updated_at = Utc::now();
        Ok(target.clone())
    }

    fn delete_target(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.lock()?;
        let before = state.targets.len();
        state.targets.retain(|t| t.id != id);
        if state.targets.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
