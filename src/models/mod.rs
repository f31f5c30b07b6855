//! Domain models for the agency.
//!
//! # Core Concepts
//!
//! - [`Cat`]: A field operative. Exists independently of any mission.
//! - [`Mission`]: A unit of work holding up to [`MISSION_TARGET_LIMIT`] targets and
//!   at most one assigned cat.
//! - [`Target`]: A single objective within a mission, completed independently of
//!   its siblings.
//! - [`FullMission`]: Read model combining a mission, its targets and its cat.
//!
//! Both missions and targets move through `started → completed` exactly once.
//! Completion is terminal.

mod cat;
mod mission;
mod target;

pub use cat::*;
pub use mission::*;
pub use target::*;

use crate::error::{Error, Result};

/// Fails with [`Error::Validation`] when `value` is empty or only whitespace.
pub(crate) fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{field} is required")));
    }
    Ok(())
}
