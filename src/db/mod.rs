mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use crate::models::*;
use crate::store::{CatStore, MissionStore, StoreError, StoreResult, TargetStore};

const CAT_COLUMNS: &str = "id, name, years_experience, breed, salary, created_at, updated_at";
const MISSION_COLUMNS: &str = "id, state, cat_id, created_at, updated_at";
const TARGET_COLUMNS: &str =
    "id, mission_id, name, country, notes, state, created_at, updated_at";

/// SQLite backend for all three persistence ports.
///
/// A single connection is shared behind a mutex, so statements never
/// interleave. Multi-row operations additionally run in a transaction that is
/// rolled back when any step fails.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;
        schema::run_migrations(&conn)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("database lock poisoned")))
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

/// Location of the database file when none is configured.
pub fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "cat-agency")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("cat-agency.db"))
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                StoreError::Conflict
            }
            other => StoreError::Backend(other.into()),
        }
    }
}

// ============================================================
// Cats
// ============================================================

impl CatStore for Database {
    fn get_cat(&self, id: Uuid) -> StoreResult<Cat> {
        let conn = self.conn()?;
        let cat = conn.query_row(
            &format!("SELECT {CAT_COLUMNS} FROM cats WHERE id = ?"),
            [id.to_string()],
            cat_from_row,
        )?;
        Ok(cat)
    }

    fn get_cat_by_name(&self, name: &str) -> StoreResult<Cat> {
        let conn = self.conn()?;
        let cat = conn.query_row(
            &format!("SELECT {CAT_COLUMNS} FROM cats WHERE name = ?"),
            [name],
            cat_from_row,
        )?;
        Ok(cat)
    }

    fn list_cats(&self) -> StoreResult<Vec<Cat>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {CAT_COLUMNS} FROM cats ORDER BY name"))?;
        let cats = stmt
            .query_map([], cat_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cats)
    }

    fn add_cat(&self, input: CreateCatInput) -> StoreResult<Cat> {
        let conn = self.conn()?;
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO cats (id, name, years_experience, breed, salary, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.name,
                input.years_experience,
                &input.breed,
                input.salary,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Cat {
            id,
            name: input.name,
            years_experience: input.years_experience,
            breed: input.breed,
            salary: input.salary,
            created_at: now,
            updated_at: now,
        })
    }

    fn update_cat(&self, cat: &Cat) -> StoreResult<Cat> {
        let conn = self.conn()?;
        let now = Utc::now();

        let rows = conn.execute(
            "UPDATE cats SET name = ?, years_experience = ?, breed = ?, salary = ?, updated_at = ?
             WHERE id = ?",
            (
                &cat.name,
                cat.years_experience,
                &cat.breed,
                cat.salary,
                now.to_rfc3339(),
                cat.id.to_string(),
            ),
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(Cat {
            updated_at: now,
            ..cat.clone()
        })
    }

    fn delete_cat(&self, id: Uuid) -> StoreResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM cats WHERE id = ?", [id.to_string()])?;
        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ============================================================
// Missions
// ============================================================

impl MissionStore for Database {
    fn get_mission(&self, id: Uuid) -> StoreResult<Mission> {
        let conn = self.conn()?;
        query_mission(&conn, id)
    }

    fn list_missions(&self) -> StoreResult<Vec<Mission>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MISSION_COLUMNS} FROM missions ORDER BY created_at, rowid"
        ))?;
        let missions = stmt
            .query_map([], mission_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(missions)
    }

    fn find_missions_by_cat(&self, cat_id: Uuid) -> StoreResult<Vec<Mission>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MISSION_COLUMNS} FROM missions WHERE cat_id = ? ORDER BY created_at, rowid"
        ))?;
        let missions = stmt
            .query_map([cat_id.to_string()], mission_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(missions)
    }

    fn add_mission(&self, targets: &[NewTarget]) -> StoreResult<Mission> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let id = Uuid::new_v4();
        let now = Utc::now();

        tx.execute(
            "INSERT INTO missions (id, state, created_at, updated_at) VALUES (?, ?, ?, ?)",
            (
                id.to_string(),
                MissionState::Started.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;
        for target in targets {
            insert_target(&tx, id, target)?;
        }
        tx.commit()?;

        Ok(Mission {
            id,
            state: MissionState::Started,
            cat_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn update_mission(&self, id: Uuid, input: UpdateMissionInput) -> StoreResult<Mission> {
        let conn = self.conn()?;
        let existing = query_mission(&conn, id)?;
        let now = Utc::now();
        let state = input.state.unwrap_or(existing.state);
        let cat_id = input.cat_id.unwrap_or(existing.cat_id);

        conn.execute(
            "UPDATE missions SET state = ?, cat_id = ?, updated_at = ? WHERE id = ?",
            (
                state.as_str(),
                cat_id.map(|u| u.to_string()),
                now.to_rfc3339(),
                id.to_string(),
            ),
        )?;

        Ok(Mission {
            id,
            state,
            cat_id,
            created_at: existing.created_at,
            updated_at: now,
        })
    }

    fn delete_mission(&self, id: Uuid) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let cat_id: Option<String> = tx.query_row(
            "SELECT cat_id FROM missions WHERE id = ?",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if cat_id.is_some() {
            return Err(StoreError::Assigned);
        }

        tx.execute(
            "DELETE FROM targets WHERE mission_id = ?",
            [id.to_string()],
        )?;
        let rows = tx.execute(
            "DELETE FROM missions WHERE id = ? AND cat_id IS NULL",
            [id.to_string()],
        )?;
        if rows == 0 {
            return Err(StoreError::Assigned);
        }

        tx.commit()?;
        Ok(())
    }
}

// ============================================================
// Targets
// ============================================================

impl TargetStore for Database {
    fn get_target(&self, id: Uuid) -> StoreResult<Target> {
        let conn = self.conn()?;
        let target = conn.query_row(
            &format!("SELECT {TARGET_COLUMNS} FROM targets WHERE id = ?"),
            [id.to_string()],
            target_from_row,
        )?;
        Ok(target)
    }

    fn list_targets(&self, mission_id: Uuid) -> StoreResult<Vec<Target>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TARGET_COLUMNS} FROM targets WHERE mission_id = ? ORDER BY rowid"
        ))?;
        let targets = stmt
            .query_map([mission_id.to_string()], target_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(targets)
    }

    fn add_target(
        &self,
        mission_id: Uuid,
        target: &NewTarget,
        limit: usize,
    ) -> StoreResult<Target> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let state: String = tx.query_row(
            "SELECT state FROM missions WHERE id = ?",
            [mission_id.to_string()],
            |row| row.get(0),
        )?;

        let held: i64 = tx.query_row(
            "SELECT COUNT(*) FROM targets WHERE mission_id = ?",
            [mission_id.to_string()],
            |row| row.get(0),
        )?;
        if held >= limit as i64 {
            return Err(StoreError::CapacityExceeded(limit));
        }
        if MissionState::from_str(&state) == Some(MissionState::Completed) {
            return Err(StoreError::Closed);
        }

        let created = insert_target(&tx, mission_id, target)?;
        tx.commit()?;
        Ok(created)
    }

    fn update_target(&self, id: Uuid, input: UpdateTargetInput) -> StoreResult<Target> {
        let conn = self.conn()?;
        let existing = conn.query_row(
            &format!("SELECT {TARGET_COLUMNS} FROM targets WHERE id = ?"),
            [id.to_string()],
            target_from_row,
        )?;
        let now = Utc::now();
        let notes = input.notes.unwrap_or(existing.notes);
        let state = input.state.unwrap_or(existing.state);

        conn.execute(
            "UPDATE targets SET notes = ?, state = ?, updated_at = ? WHERE id = ?",
            (&notes, state.as_str(), now.to_rfc3339(), id.to_string()),
        )?;

        Ok(Target {
            notes,
            state,
            updated_at: now,
            ..existing
        })
    }

    fn delete_target(&self, id: Uuid) -> StoreResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM targets WHERE id = ?", [id.to_string()])?;
        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ============================================================
// Row helpers
// ============================================================

fn query_mission(conn: &Connection, id: Uuid) -> StoreResult<Mission> {
    let mission = conn.query_row(
        &format!("SELECT {MISSION_COLUMNS} FROM missions WHERE id = ?"),
        [id.to_string()],
        mission_from_row,
    )?;
    Ok(mission)
}

fn insert_target(conn: &Connection, mission_id: Uuid, input: &NewTarget) -> StoreResult<Target> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let notes = input.notes.clone().unwrap_or_default();

    conn.execute(
        "INSERT INTO targets (id, mission_id, name, country, notes, state, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        (
            id.to_string(),
            mission_id.to_string(),
            &input.name,
            &input.country,
            &notes,
            TargetState::Started.as_str(),
            now.to_rfc3339(),
            now.to_rfc3339(),
        ),
    )?;

    Ok(Target {
        id,
        mission_id,
        name: input.name.clone(),
        country: input.country.clone(),
        notes,
        state: TargetState::Started,
        created_at: now,
        updated_at: now,
    })
}

fn cat_from_row(row: &Row<'_>) -> rusqlite::Result<Cat> {
    Ok(Cat {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        years_experience: row.get(2)?,
        breed: row.get(3)?,
        salary: row.get(4)?,
        created_at: parse_datetime(row.get::<_, String>(5)?),
        updated_at: parse_datetime(row.get::<_, String>(6)?),
    })
}

fn mission_from_row(row: &Row<'_>) -> rusqlite::Result<Mission> {
    Ok(Mission {
        id: parse_uuid(row.get::<_, String>(0)?),
        state: MissionState::from_str(&row.get::<_, String>(1)?)
            .unwrap_or(MissionState::Started),
        cat_id: row.get::<_, Option<String>>(2)?.map(parse_uuid),
        created_at: parse_datetime(row.get::<_, String>(3)?),
        updated_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

fn target_from_row(row: &Row<'_>) -> rusqlite::Result<Target> {
    Ok(Target {
        id: parse_uuid(row.get::<_, String>(0)?),
        mission_id: parse_uuid(row.get::<_, String>(1)?),
        name: row.get(2)?,
        country: row.get(3)?,
        notes: row.get(4)?,
        state: TargetState::from_str(&row.get::<_, String>(5)?)
            .unwrap_or(TargetState::Started),
        created_at: parse_datetime(row.get::<_, String>(6)?),
        updated_at: parse_datetime(row.get::<_, String>(7)?),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
