//! The animals that make up the population.
//!
//! An [`Animal`] carries only the state the simulation engine itself reads or writes. How an animal
//! moves, mates or progresses through infection is the business of a
//! [`WeeklyBehavior`](crate::behavior::WeeklyBehavior) implementation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cell::CellId;
use crate::time::WEEKS_PER_YEAR;

/// Number of age brackets. The last bracket holds every animal aged 7 years or more.
pub const AGE_BRACKETS: usize = 8;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimalId(pub u64);

impl fmt::Display for AnimalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    pub const ALL: [Sex; 2] = [Sex::Female, Sex::Male];
}

/// Age group in whole years, clipped at 7.
pub fn age_bracket(age_weeks: u32) -> usize {
    ((age_weeks / WEEKS_PER_YEAR) as usize).min(AGE_BRACKETS - 1)
}

/// A birth produced during an animal's weekly behaviour. The newborn receives its id when it is
/// merged into the population.
#[derive(Clone, Debug, PartialEq)]
pub struct Birth {
    pub mother: AnimalId,
    pub sex: Sex,
    pub cell: CellId,
    pub infected: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Animal {
    id: AnimalId,
    pub sex: Sex,
    pub age_weeks: u32,
    pub cell: CellId,
    /// Weeks remaining before this animal can give birth again.
    pub cannot_reproduce_weeks: u32,
    pub infected: bool,
    pub mother: Option<AnimalId>,
    alive: bool,
    will_die: bool,
}

impl Animal {
    pub fn new(id: AnimalId, sex: Sex, age_weeks: u32, cell: CellId) -> Animal {
        Animal {
            id,
            sex,
            age_weeks,
            cell,
            cannot_reproduce_weeks: 0,
            infected: false,
            mother: None,
            alive: true,
            will_die: false,
        }
    }

    pub(crate) fn from_birth(id: AnimalId, birth: &Birth) -> Animal {
        Animal {
            infected: birth.infected,
            mother: Some(birth.mother),
            ..Animal::new(id, birth.sex, 0, birth.cell)
        }
    }

    pub fn id(&self) -> AnimalId {
        self.id
    }

    pub fn age_bracket(&self) -> usize {
        age_bracket(self.age_weeks)
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// True once the animal has been selected to be removed at this tick's cleanup.
    pub fn will_die(&self) -> bool {
        self.will_die
    }

    /// Flags the animal for removal at cleanup. The flag cannot be cleared.
    pub fn mark_for_death(&mut self) {
        self.will_die = true;
    }

    /// Kills the animal outright. It stops taking part in weekly activities and is removed at
    /// cleanup.
    pub fn kill(&mut self) {
        self.alive = false;
        self.will_die = true;
    }

    pub fn can_reproduce(&self) -> bool {
        self.cannot_reproduce_weeks == 0
    }

    /// True when the animal is to be removed from the population at cleanup.
    pub fn is_deceased(&self) -> bool {
        !self.alive || self.will_die
    }
}
