//! Scheduled interventions ("strategies") and the cursor that applies them.
//!
//! A strategy fires exactly once, at the tick whose (year, week) equals its schedule. The
//! [`StrategyList`] is sorted by schedule at the start of a run and then walked with a single
//! cursor that only ever moves forward: on every tick it applies, in list order, every strategy
//! scheduled for that tick and skips any scheduled for a tick already gone.
//!
//! Applying a strategy draws once per live animal in a targeted cell, walking the population
//! in its current order rather than cell by cell. With `scramble_order` set that order is
//! already random, and a single pass keeps the number of draws independent of how the
//! targeted cells are listed.

use std::fmt;

use indexmap::IndexMap;
use log::{debug, info};
use rand::rngs::SmallRng;

use crate::cell::{CellId, CellList};
use crate::error::ModelError;
use crate::population::Population;
use crate::random::UniformIntExt;
use crate::time::Tick;

/// What a strategy may touch when it is applied.
pub struct StrategyTarget<'a> {
    pub population: &'a mut Population,
    pub rng: &'a mut SmallRng,
    pub tick: Tick,
}

pub trait Strategy {
    /// The tick at which the strategy is applied.
    fn scheduled(&self) -> Tick;

    fn name(&self) -> &str;

    /// Applies the strategy. Returns the number of animals affected.
    fn apply(&mut self, target: &mut StrategyTarget<'_>) -> usize;
}

impl fmt::Debug for dyn Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.name(), self.scheduled())
    }
}

/// The schedule and the targeted cells of a strategy, with a level (0-100) per cell.
#[derive(Clone, Debug, PartialEq)]
pub struct CellLevels {
    tick: Tick,
    levels: IndexMap<CellId, f64>,
}

fn check_level(level: f64) -> Result<(), ModelError> {
    if !(0.0..=100.0).contains(&level) {
        return Err(ModelError::illegal(
            "level",
            format!("{level} is not in the range 0-100"),
        ));
    }
    Ok(())
}

impl CellLevels {
    /// Targets `targets` (which must be known to `cells`) at `level` from (`year`, `week`).
    pub fn new(
        cells: &CellList,
        targets: &[CellId],
        level: f64,
        year: u32,
        week: u32,
    ) -> Result<CellLevels, ModelError> {
        let tick = Tick::new(year, week)?;
        check_level(level)?;
        let levels = cells
            .resolve_targets(targets)?
            .into_iter()
            .map(|cell| (cell, level))
            .collect();
        Ok(CellLevels { tick, levels })
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn level(&self, cell: CellId) -> Option<f64> {
        self.levels.get(&cell).copied()
    }

    /// Overrides the level of one targeted cell.
    pub fn set_level(&mut self, cell: CellId, level: f64) -> Result<(), ModelError> {
        check_level(level)?;
        match self.levels.get_mut(&cell) {
            Some(current) => {
                *current = level;
                Ok(())
            }
            None => Err(ModelError::UnknownCell(cell)),
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.levels.keys().copied()
    }

    /// Walks the live animals in targeted cells in population order and calls `effect` on each
    /// one that wins its draw (a uniform integer in 1..=100 not above its cell's level).
    #[allow(clippy::cast_possible_truncation)]
    fn for_each_selected(
        &self,
        target: &mut StrategyTarget<'_>,
        mut effect: impl FnMut(&mut crate::animal::Animal) -> bool,
    ) -> usize {
        let mut affected = 0;
        for animal in target.population.iter_mut() {
            if !animal.is_alive() {
                continue;
            }
            let Some(level) = self.levels.get(&animal.cell) else {
                continue;
            };
            let applied_level = level.round() as i64;
            if target.rng.int_value(1, 100) <= applied_level && effect(animal) {
                affected += 1;
            }
        }
        affected
    }
}

/// Makes animals in the targeted cells unable to give birth for `effective_period` weeks.
#[derive(Clone, Debug, PartialEq)]
pub struct FertilityStrategy {
    cells: CellLevels,
    effective_period: u32,
}

impl FertilityStrategy {
    pub fn new(
        cells: CellLevels,
        effective_period: u32,
    ) -> Result<FertilityStrategy, ModelError> {
        if effective_period < 1 {
            return Err(ModelError::illegal(
                "effective_period",
                "must be greater than zero",
            ));
        }
        Ok(FertilityStrategy {
            cells,
            effective_period,
        })
    }

    pub fn effective_period(&self) -> u32 {
        self.effective_period
    }

    pub fn cells_mut(&mut self) -> &mut CellLevels {
        &mut self.cells
    }
}

impl Strategy for FertilityStrategy {
    fn scheduled(&self) -> Tick {
        self.cells.tick()
    }

    fn name(&self) -> &str {
        "Fertility Strategy"
    }

    fn apply(&mut self, target: &mut StrategyTarget<'_>) -> usize {
        let period = self.effective_period;
        self.cells.for_each_selected(target, |animal| {
            animal.cannot_reproduce_weeks = period;
            true
        })
    }
}

/// Removes animals in the targeted cells at this tick's cleanup.
#[derive(Clone, Debug, PartialEq)]
pub struct CullStrategy {
    cells: CellLevels,
}

impl CullStrategy {
    pub fn new(cells: CellLevels) -> CullStrategy {
        CullStrategy { cells }
    }

    pub fn cells_mut(&mut self) -> &mut CellLevels {
        &mut self.cells
    }
}

impl Strategy for CullStrategy {
    fn scheduled(&self) -> Tick {
        self.cells.tick()
    }

    fn name(&self) -> &str {
        "Cull Strategy"
    }

    fn apply(&mut self, target: &mut StrategyTarget<'_>) -> usize {
        self.cells.for_each_selected(target, |animal| {
            if animal.will_die() {
                return false;
            }
            animal.mark_for_death();
            true
        })
    }
}

/// Strategies in schedule order, with the cursor marking the next one to consider.
#[derive(Default)]
pub struct StrategyList {
    strategies: Vec<Box<dyn Strategy>>,
    cursor: usize,
}

impl StrategyList {
    pub fn new() -> StrategyList {
        StrategyList::default()
    }

    pub fn add(&mut self, strategy: impl Strategy + 'static) {
        self.strategies.push(Box::new(strategy));
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Strategy> {
        self.strategies.iter().map(AsRef::as_ref)
    }

    /// Stable sort by (year, week): strategies sharing a tick keep the order they were added in.
    pub fn sort(&mut self) {
        self.strategies.sort_by_key(|strategy| strategy.scheduled());
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Applies every strategy scheduled for `target.tick` and moves the cursor past them.
    /// Returns the number of strategies applied.
    pub fn apply_due(&mut self, target: &mut StrategyTarget<'_>) -> usize {
        let now = target.tick;
        let mut applied = 0;
        while let Some(strategy) = self.strategies.get_mut(self.cursor) {
            let scheduled = strategy.scheduled();
            if scheduled > now {
                break;
            }
            if scheduled == now {
                let affected = strategy.apply(target);
                info!("applied {} at {now}: {affected} animals affected", strategy.name());
                applied += 1;
            } else {
                debug!("skipping {} scheduled for past {scheduled}", strategy.name());
            }
            self.cursor += 1;
        }
        applied
    }
}
