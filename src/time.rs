//! Simulation time: a zero-based year index and a week within the year.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

pub const WEEKS_PER_YEAR: u32 = 52;

/// One (year, week) simulation step. Years are zero-based, weeks run from 1 to 52.
///
/// Ticks order lexicographically: by year, then by week.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tick {
    pub year: u32,
    pub week: u32,
}

impl Tick {
    pub fn new(year: u32, week: u32) -> Result<Tick, ModelError> {
        if !(1..=WEEKS_PER_YEAR).contains(&week) {
            return Err(ModelError::illegal(
                "week",
                format!("{week} is not in the range 1-{WEEKS_PER_YEAR}"),
            ));
        }
        Ok(Tick { year, week })
    }

    /// Number of ticks since (0, 1).
    pub fn ordinal(&self) -> u64 {
        u64::from(self.year) * u64::from(WEEKS_PER_YEAR) + u64::from(self.week - 1)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "year {} week {}", self.year, self.week)
    }
}

/// The model's clock. It starts at (0, 1) and never moves past week 52 of the last year.
#[derive(Debug, Clone)]
pub struct Timeline {
    n_years: u32,
    current: Tick,
}

impl Timeline {
    pub fn new(n_years: u32) -> Result<Timeline, ModelError> {
        if n_years == 0 {
            return Err(ModelError::illegal("years", "must be greater than 0"));
        }
        Ok(Timeline {
            n_years,
            current: Tick { year: 0, week: 1 },
        })
    }

    pub fn n_years(&self) -> u32 {
        self.n_years
    }

    pub fn current_tick(&self) -> Tick {
        self.current
    }

    pub fn current_year(&self) -> u32 {
        self.current.year
    }

    pub fn current_week(&self) -> u32 {
        self.current.week
    }

    pub fn is_last_year(&self) -> bool {
        self.current.year + 1 == self.n_years
    }

    /// True at week 52 of the last year.
    pub fn is_last_tick(&self) -> bool {
        self.is_last_year() && self.current.week == WEEKS_PER_YEAR
    }

    /// Moves to the next week, rolling over into the next year after week 52.
    ///
    /// Returns `false` and leaves the clock untouched when already at the last tick.
    #[must_use]
    pub fn advance(&mut self) -> bool {
        if self.is_last_tick() {
            return false;
        }
        if self.current.week == WEEKS_PER_YEAR {
            self.current = Tick {
                year: self.current.year + 1,
                week: 1,
            };
        } else {
            self.current.week += 1;
        }
        true
    }
}
