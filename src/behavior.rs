//! The seam between the simulation engine and an animal's own weekly rules.
//!
//! The engine calls [`WeeklyBehavior::do_weekly_behavior`] once per live animal per tick. An
//! implementation may change the animal it is handed (age, infection, fertility, death) and may
//! record births, but it never sees the population as a whole: the dispatcher may run it on
//! several threads at once, and newborns only join the population after every animal has acted.

use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::animal::{Animal, Birth, Sex};
use crate::error::ModelError;
use crate::random::UniformIntExt;
use crate::time::{Tick, WEEKS_PER_YEAR};

/// What an animal knows about the world when it acts.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WeekEnv {
    pub tick: Tick,
    pub prevent_incest: bool,
}

pub trait WeeklyBehavior: Send + Sync {
    /// Runs one week of `animal`'s life. Births are pushed onto `births`.
    fn do_weekly_behavior(
        &self,
        animal: &mut Animal,
        env: &WeekEnv,
        rng: &mut SmallRng,
        births: &mut Vec<Birth>,
    );
}

impl<F> WeeklyBehavior for F
where
    F: Fn(&mut Animal, &WeekEnv, &mut SmallRng, &mut Vec<Birth>) + Send + Sync,
{
    fn do_weekly_behavior(
        &self,
        animal: &mut Animal,
        env: &WeekEnv,
        rng: &mut SmallRng,
        births: &mut Vec<Birth>,
    ) {
        self(animal, env, rng, births);
    }
}

/// A minimal set of life-history rules: ageing, a single yearly breeding week, and an infection
/// that either kills or clears. There is no mate choice, so `prevent_incest` has no effect here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardBehavior {
    /// The week of the year in which litters are born.
    pub breeding_week: u32,
    pub min_breeding_age_weeks: u32,
    pub litter_min: u32,
    pub litter_max: u32,
    /// Weekly probability that an infected animal dies of the disease.
    pub infected_death_probability: f64,
    /// Weekly probability that an infected animal clears the infection.
    pub recovery_probability: f64,
}

impl Default for StandardBehavior {
    fn default() -> Self {
        StandardBehavior {
            breeding_week: 18,
            min_breeding_age_weeks: WEEKS_PER_YEAR,
            litter_min: 3,
            litter_max: 6,
            infected_death_probability: 0.0,
            recovery_probability: 0.0,
        }
    }
}

impl StandardBehavior {
    pub fn validate(&self) -> Result<(), ModelError> {
        if !(1..=WEEKS_PER_YEAR).contains(&self.breeding_week) {
            return Err(ModelError::illegal(
                "breeding_week",
                format!("{} is not in the range 1-{WEEKS_PER_YEAR}", self.breeding_week),
            ));
        }
        if self.litter_min > self.litter_max {
            return Err(ModelError::illegal(
                "litter_min",
                "must not be greater than litter_max",
            ));
        }
        for (name, p) in [
            ("infected_death_probability", self.infected_death_probability),
            ("recovery_probability", self.recovery_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ModelError::illegal(name, format!("{p} is not a probability")));
            }
        }
        Ok(())
    }
}

impl WeeklyBehavior for StandardBehavior {
    fn do_weekly_behavior(
        &self,
        animal: &mut Animal,
        env: &WeekEnv,
        rng: &mut SmallRng,
        births: &mut Vec<Birth>,
    ) {
        animal.age_weeks += 1;
        animal.cannot_reproduce_weeks = animal.cannot_reproduce_weeks.saturating_sub(1);

        if animal.infected {
            if rng.random_bool(self.infected_death_probability) {
                animal.kill();
                return;
            }
            if rng.random_bool(self.recovery_probability) {
                animal.infected = false;
            }
        }

        if animal.sex == Sex::Female
            && env.tick.week == self.breeding_week
            && animal.age_weeks >= self.min_breeding_age_weeks
            && animal.can_reproduce()
        {
            let litter = rng.int_value(i64::from(self.litter_min), i64::from(self.litter_max));
            for _ in 0..litter {
                let sex = if rng.random_bool(0.5) {
                    Sex::Female
                } else {
                    Sex::Male
                };
                births.push(Birth {
                    mother: animal.id(),
                    sex,
                    cell: animal.cell,
                    infected: false,
                });
            }
        }
    }
}
