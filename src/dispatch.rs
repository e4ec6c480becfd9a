//! Runs every live animal's weekly behaviour over an index range of the population.
//!
//! The range is cut into at most `workers` contiguous chunks which rayon runs in parallel. A
//! chunk only ever touches its own animals; births and newly observed infections are collected
//! per chunk and concatenated in chunk order once every chunk has finished. Each chunk draws
//! from its own substream, addressed by the tick and the chunk index, so results depend on the
//! configured worker count but never on how rayon schedules the chunks.

use std::ops::Range;

use log::trace;
use rand::rngs::SmallRng;
use rayon::prelude::*;

use crate::animal::{Animal, AnimalId, Birth};
use crate::behavior::{WeekEnv, WeeklyBehavior};
use crate::define_rng;
use crate::error::ModelError;
use crate::random::RandomStreams;

define_rng!(ActivityRng);

pub const MAX_WORKERS: usize = 1024;

/// Births and infections produced by one pass of weekly activities.
#[derive(Debug, Default, PartialEq)]
pub struct ActivityOutcome {
    pub births: Vec<Birth>,
    /// Animals that went from uninfected to infected during the pass, in population order.
    pub infections: Vec<AnimalId>,
}

impl ActivityOutcome {
    fn append(&mut self, mut other: ActivityOutcome) {
        self.births.append(&mut other.births);
        self.infections.append(&mut other.infections);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ActivityDispatcher {
    workers: usize,
}

impl ActivityDispatcher {
    pub fn new(workers: usize) -> Result<ActivityDispatcher, ModelError> {
        if !(1..=MAX_WORKERS).contains(&workers) {
            return Err(ModelError::illegal(
                "workers",
                format!("{workers} is not in the range 1-{MAX_WORKERS}"),
            ));
        }
        Ok(ActivityDispatcher { workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs the weekly behaviour of every live animal in `animals[range]`. The range is clipped to
    /// the slice.
    pub fn run_weekly_activities(
        &self,
        animals: &mut [Animal],
        range: Range<usize>,
        behavior: &dyn WeeklyBehavior,
        env: &WeekEnv,
        streams: &RandomStreams,
    ) -> ActivityOutcome {
        let end = range.end.min(animals.len());
        let start = range.start.min(end);
        let slice = &mut animals[start..end];
        if slice.is_empty() {
            return ActivityOutcome::default();
        }

        let chunk_len = slice.len().div_ceil(self.workers);
        let n_chunks = slice.len().div_ceil(chunk_len);
        let tick_base = env.tick.ordinal() * MAX_WORKERS as u64;
        trace!(
            "running weekly activities for {} animals in {} chunk(s)",
            slice.len(),
            n_chunks
        );

        if n_chunks == 1 {
            let mut rng = streams.substream(ActivityRng, tick_base);
            return run_chunk(slice, behavior, env, &mut rng);
        }

        let rngs: Vec<SmallRng> = (0..n_chunks)
            .map(|chunk| streams.substream(ActivityRng, tick_base + chunk as u64))
            .collect();
        let outcomes: Vec<ActivityOutcome> = slice
            .par_chunks_mut(chunk_len)
            .zip(rngs.into_par_iter())
            .map(|(chunk, mut rng)| run_chunk(chunk, behavior, env, &mut rng))
            .collect();

        let mut merged = ActivityOutcome::default();
        for outcome in outcomes {
            merged.append(outcome);
        }
        merged
    }
}

fn run_chunk(
    chunk: &mut [Animal],
    behavior: &dyn WeeklyBehavior,
    env: &WeekEnv,
    rng: &mut SmallRng,
) -> ActivityOutcome {
    let mut outcome = ActivityOutcome::default();
    for animal in chunk.iter_mut().filter(|animal| animal.is_alive()) {
        let was_infected = animal.infected;
        behavior.do_weekly_behavior(animal, env, rng, &mut outcome.births);
        if !was_infected && animal.infected {
            outcome.infections.push(animal.id());
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animal::Sex;
    use crate::cell::CellId;
    use crate::population::Population;
    use crate::time::Tick;
    use rand::Rng;

    fn env() -> WeekEnv {
        WeekEnv {
            tick: Tick { year: 0, week: 3 },
            prevent_incest: false,
        }
    }

    fn population_of(n: u32) -> Population {
        let mut population = Population::new();
        for i in 0..n {
            population.spawn(Sex::Female, 60, CellId(i));
        }
        population
    }

    fn age_one_week(animal: &mut Animal, _: &WeekEnv, _: &mut SmallRng, _: &mut Vec<Birth>) {
        animal.age_weeks += 1;
    }

    #[test]
    fn zero_workers_is_rejected() {
        assert!(ActivityDispatcher::new(0).is_err());
        assert!(ActivityDispatcher::new(MAX_WORKERS + 1).is_err());
    }

    #[test]
    fn every_live_animal_in_range_acts_once() {
        let mut population = population_of(10);
        population.get_mut(4).unwrap().kill();
        let dispatcher = ActivityDispatcher::new(3).unwrap();
        let streams = RandomStreams::new(1);
        dispatcher.run_weekly_activities(
            population.as_mut_slice(),
            2..8,
            &age_one_week,
            &env(),
            &streams,
        );
        let ages: Vec<_> = population.iter().map(|a| a.age_weeks).collect();
        assert_eq!(ages, vec![60, 60, 61, 61, 60, 61, 61, 61, 60, 60]);
    }

    #[test]
    fn range_is_clipped() {
        let mut population = population_of(3);
        let dispatcher = ActivityDispatcher::new(1).unwrap();
        let streams = RandomStreams::new(1);
        dispatcher.run_weekly_activities(
            population.as_mut_slice(),
            1..100,
            &age_one_week,
            &env(),
            &streams,
        );
        assert_eq!(population.iter().filter(|a| a.age_weeks == 61).count(), 2);
    }

    #[test]
    fn births_and_infections_come_back_in_population_order() {
        let mut population = population_of(8);
        let behavior = |animal: &mut Animal,
                        _: &WeekEnv,
                        _: &mut SmallRng,
                        births: &mut Vec<Birth>| {
            if animal.id().0 % 2 == 0 {
                animal.infected = true;
                births.push(Birth {
                    mother: animal.id(),
                    sex: Sex::Male,
                    cell: animal.cell,
                    infected: false,
                });
            }
        };
        let dispatcher = ActivityDispatcher::new(4).unwrap();
        let streams = RandomStreams::new(1);
        let outcome = dispatcher.run_weekly_activities(
            population.as_mut_slice(),
            0..8,
            &behavior,
            &env(),
            &streams,
        );
        let expected: Vec<_> = [0, 2, 4, 6].into_iter().map(AnimalId).collect();
        assert_eq!(outcome.infections, expected);
        let mothers: Vec<_> = outcome.births.iter().map(|b| b.mother).collect();
        assert_eq!(mothers, expected);
    }

    #[test]
    fn already_infected_animals_are_not_reported() {
        let mut population = population_of(2);
        population.get_mut(0).unwrap().infected = true;
        let infect = |animal: &mut Animal, _: &WeekEnv, _: &mut SmallRng, _: &mut Vec<Birth>| {
            animal.infected = true;
        };
        let outcome = ActivityDispatcher::new(1).unwrap().run_weekly_activities(
            population.as_mut_slice(),
            0..2,
            &infect,
            &env(),
            &RandomStreams::new(1),
        );
        assert_eq!(outcome.infections, vec![AnimalId(1)]);
    }

    #[test]
    fn draws_are_reproducible_across_runs() {
        let draw = |animal: &mut Animal, _: &WeekEnv, rng: &mut SmallRng, _: &mut Vec<Birth>| {
            animal.age_weeks = rng.random_range(0..1_000_000);
        };
        let run = || {
            let mut population = population_of(64);
            ActivityDispatcher::new(8).unwrap().run_weekly_activities(
                population.as_mut_slice(),
                0..64,
                &draw,
                &env(),
                &RandomStreams::new(99),
            );
            population.iter().map(|a| a.age_weeks).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
