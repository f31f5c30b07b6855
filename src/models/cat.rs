use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::require_text;
use crate::error::{Error, Result};

/// A field operative.
///
/// Cats are hired and fired independently of missions. A mission only holds a
/// reference to its cat, so deleting a cat clears that reference instead of
/// removing the mission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cat {
    pub id: Uuid,
    /// Unique across the agency.
    pub name: String,
    pub years_experience: u32,
    /// Must match an entry of the breed catalog.
    pub breed: String,
    /// Salary in the smallest currency unit.
    pub salary: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cat {
    /// Check the field-level rules. The breed catalog is consulted separately.
    pub fn validate(&self) -> Result<()> {
        validate_fields(&self.name, self.years_experience, &self.breed, self.salary)
    }

    /// Merge a partial update into this record. Fields left as `None` are kept.
    pub fn apply(&mut self, input: UpdateCatInput) {
        if let Some(name) = input.name {
            self.name = name;
        }
        if let Some(years_experience) = input.years_experience {
            self.years_experience = years_experience;
        }
        if let Some(breed) = input.breed {
            self.breed = breed;
        }
        if let Some(salary) = input.salary {
            self.salary = salary;
        }
    }
}

/// Input for hiring a new cat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCatInput {
    pub name: String,
    pub years_experience: u32,
    pub breed: String,
    pub salary: i64,
}

impl CreateCatInput {
    pub fn validate(&self) -> Result<()> {
        validate_fields(&self.name, self.years_experience, &self.breed, self.salary)
    }
}

/// Input for updating a cat. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCatInput {
    pub name: Option<String>,
    pub years_experience: Option<u32>,
    pub breed: Option<String>,
    pub salary: Option<i64>,
}

fn validate_fields(name: &str, years_experience: u32, breed: &str, salary: i64) -> Result<()> {
    require_text("name", name)?;
    require_text("breed", breed)?;
    if years_experience == 0 {
        return Err(Error::Validation(
            "years_experience must be greater than zero".to_string(),
        ));
    }
    if salary < 0 {
        return Err(Error::Validation("salary must not be negative".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> CreateCatInput {
        CreateCatInput {
            name: "Tom".to_string(),
            years_experience: 3,
            breed: "Siamese".to_string(),
            salary: 150_000,
        }
    }

    #[test]
    fn accepts_complete_input() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn rejects_blank_name() {
        let mut cat = input();
        cat.name = "   ".to_string();
        assert!(matches!(cat.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn rejects_zero_experience() {
        let mut cat = input();
        cat.years_experience = 0;
        assert!(matches!(cat.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn zero_salary_is_allowed_but_negative_is_not() {
        let mut cat = input();
        cat.salary = 0;
        assert!(cat.validate().is_ok());

        cat.salary = -1;
        assert!(matches!(cat.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn apply_only_touches_supplied_fields() {
        let now = Utc::now();
        let mut cat = Cat {
            id: Uuid::new_v4(),
            name: "Tom".to_string(),
            years_experience: 3,
            breed: "Siamese".to_string(),
            salary: 100,
            created_at: now,
            updated_at: now,
        };

        cat.apply(UpdateCatInput {
            salary: Some(250),
            ..Default::default()
        });

        assert_eq!(cat.salary, 250);
        assert_eq!(cat.name, "Tom");
        assert_eq!(cat.breed, "Siamese");
        assert_eq!(cat.years_experience, 3);
    }
}
