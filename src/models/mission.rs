use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cat, Target};

/// Maximum number of targets a mission may hold at any time.
pub const MISSION_TARGET_LIMIT: usize = 3;

/// A unit of work for a single cat.
///
/// Missions are created together with their first targets and may later gain
/// targets up to [`MISSION_TARGET_LIMIT`]. Once a mission is completed it is
/// frozen: its targets and its assignment can no longer change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mission {
    pub id: Uuid,
    pub state: MissionState,
    /// The assigned cat, if any.
    pub cat_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Mission {
    pub fn is_completed(&self) -> bool {
        self.state == MissionState::Completed
    }
}

/// The lifecycle state of a mission.
///
/// - `Started`: Open for target changes and assignment
/// - `Completed`: Terminal, no further mutation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissionState {
    Started,
    Completed,
}

impl MissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "started" => Some(Self::Started),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Store-level patch for a mission. `None` leaves a field untouched.
///
/// `cat_id: Some(None)` clears the assignment.
#[derive(Debug, Clone, Default)]
pub struct UpdateMissionInput {
    pub state: Option<MissionState>,
    pub cat_id: Option<Option<Uuid>>,
}

/// A mission with its targets and assigned cat, used for read responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullMission {
    #[serde(flatten)]
    pub mission: Mission,
    pub targets: Vec<Target>,
    pub cat: Option<Cat>,
}
