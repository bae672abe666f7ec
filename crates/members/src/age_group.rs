//! Age groups: named inclusive age ranges.

use serde::{Deserialize, Serialize};

use memberly_core::{DomainError, DomainResult};

use crate::age::ADULT_AGE;

/// A named inclusive `[min_age, max_age]` bracket.
///
/// Subjects may read the group their own computed age falls into; guests
/// may read any group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeGroup {
    pub name: String,
    pub min_age: u32,
    pub max_age: u32,
    pub description: String,
}

impl AgeGroup {
    pub fn new(
        name: impl Into<String>,
        min_age: u32,
        max_age: u32,
        description: impl Into<String>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("age group name cannot be empty"));
        }
        if max_age <= min_age {
            return Err(DomainError::validation(
                "age group max_age must be greater than min_age",
            ));
        }
        Ok(Self {
            name,
            min_age,
            max_age,
            description: description.into(),
        })
    }

    pub fn includes_age(&self, age: Option<u32>) -> bool {
        match age {
            Some(age) => age >= self.min_age && age <= self.max_age,
            None => false,
        }
    }

    /// Groups lying entirely below the adult boundary hold minors only.
    pub fn requires_parental_consent(&self) -> bool {
        self.max_age < ADULT_AGE
    }

    pub fn age_range(&self) -> String {
        format!("{}-{} years", self.min_age, self.max_age)
    }
}
