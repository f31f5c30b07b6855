use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::require_text;
use crate::error::Result;

/// A single objective within a mission.
///
/// A target belongs to the same mission for its whole lifetime. Once completed
/// it can neither be edited nor deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Target {
    pub id: Uuid,
    pub mission_id: Uuid,
    pub name: String,
    pub country: String,
    /// Free-form field notes. Empty when none were taken.
    pub notes: String,
    pub state: TargetState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Target {
    pub fn is_completed(&self) -> bool {
        self.state == TargetState::Completed
    }
}

/// The lifecycle state of a target.
///
/// Older clients call the initial state `pending`; it is accepted as an alias
/// of `started`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    #[serde(alias = "pending")]
    Started,
    Completed,
}

impl TargetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "started" | "pending" => Some(Self::Started),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Input describing a target to create, either with a new mission or later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTarget {
    pub name: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewTarget {
    pub fn new(name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_text("target name", &self.name)?;
        require_text("target country", &self.country)
    }
}

/// Store-level patch for a target. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateTargetInput {
    pub notes: Option<String>,
    pub state: Option<TargetState>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn new_target_requires_name_and_country() {
        assert!(NewTarget::new("Mouse", "France").validate().is_ok());
        assert!(matches!(
            NewTarget::new("", "France").validate(),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            NewTarget::new("Mouse", " ").validate(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn pending_is_read_as_started() {
        assert_eq!(TargetState::from_str("pending"), Some(TargetState::Started));
        let state: TargetState = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(state, TargetState::Started);
        assert_eq!(serde_json::to_string(&state).unwrap(), "\"started\"");
    }
}
