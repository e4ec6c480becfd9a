//! A week-by-week simulation of an animal population spread over spatial cells.
//!
//! The central object is the [`Simulation`](simulation::Simulation), which drives the model one
//! week at a time from week 1 of year 0 to week 52 of its last year. Every week it:
//! * runs each live animal's weekly behaviour (ageing, breeding, infection), in parallel
//!   across a configurable number of workers
//! * adds the newborns to the population
//! * flags this week's deaths from an age-stratified annual mortality table
//! * applies the strategies (fertility control, culling) scheduled for that exact week
//! * tells observers the week is about to be cleaned up and, once the dead are removed, that
//!   it has been, letting either of them stop the run
//!
//! A run also stops early, at the start of a year, if the disease was seen at some point but
//! no animal is infected any more.
//!
//! Models are usually described by a JSON file (see [`config`]) and run with the
//! `rabies-model` binary (see [`runner`]), but every piece can be assembled from code:
//!
//! ```
//! use rabies_model::prelude::*;
//!
//! let mut sim = Simulation::new("example", 2, StandardBehavior::default()).unwrap();
//! sim.add_cell(CellId(1)).unwrap();
//! for _ in 0..20 {
//!     sim.spawn_animal(Sex::Female, 80, CellId(1)).unwrap();
//! }
//! let levels = CellLevels::new(sim.cells(), &[CellId(1)], 50.0, 1, 10).unwrap();
//! sim.add_strategy(FertilityStrategy::new(levels, 52).unwrap());
//! sim.init_random(42);
//!
//! assert_eq!(sim.run_model().unwrap(), RunOutcome::Completed);
//! ```
pub mod animal;
pub mod behavior;
pub mod cell;
pub mod config;
pub mod disease;
pub mod dispatch;
pub mod error;
pub mod execution_stats;
pub mod hashing;
pub mod log;
pub mod mortality;
pub mod notification;
pub mod population;
pub mod population_loader;
pub mod random;
pub mod runner;
pub mod simulation;
pub mod strategy;
pub mod time;

pub mod prelude;

// Re-exports for the macros
pub use paste;
pub use rand;

pub use hashing::{HashMap, HashSet};
