//! Model parameters read from a JSON file.
//!
//! ```json
//! {
//!   "name": "baseline",
//!   "years": 10,
//!   "random_seed": 42,
//!   "workers": 4,
//!   "cells": [1, 2, 3],
//!   "population_file": "population.csv",
//!   "mortality": {
//!     "female": [0.6, 0.3, 0.3, 0.3, 0.4, 0.5, 0.7, 0.9],
//!     "male": [0.6, 0.35, 0.35, 0.35, 0.45, 0.55, 0.75, 0.95]
//!   },
//!   "strategies": [
//!     { "type": "fertility", "year": 2, "week": 10, "level": 60, "cells": [1, 2],
//!       "effective_period": 52 },
//!     { "type": "cull", "year": 3, "week": 20, "level": 25, "cells": [3],
//!       "cell_levels": [{ "cell": 3, "level": 40 }] }
//!   ]
//! }
//! ```
//!
//! Every field except `name`, `years` and `cells` has a default. A relative `population_file` is
//! resolved against the directory of the configuration file.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::behavior::StandardBehavior;
use crate::cell::CellId;
use crate::error::ModelError;
use crate::mortality::MortalityTable;
use crate::population_loader::load_population;
use crate::simulation::Simulation;
use crate::strategy::{CellLevels, CullStrategy, FertilityStrategy};

fn default_true() -> bool {
    true
}

fn default_workers() -> usize {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub years: u32,
    #[serde(default)]
    pub random_seed: u64,
    #[serde(default)]
    pub scramble_order: bool,
    #[serde(default = "default_true")]
    pub abort_on_disease_disappearance: bool,
    #[serde(default)]
    pub prevent_incest: bool,
    #[serde(default)]
    pub keep_dead: bool,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub mortality: Option<MortalityTable>,
    #[serde(default)]
    pub behavior: StandardBehavior,
    pub cells: Vec<CellId>,
    #[serde(default)]
    pub population_file: Option<PathBuf>,
    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellLevelOverride {
    pub cell: CellId,
    pub level: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    Fertility {
        year: u32,
        week: u32,
        level: f64,
        cells: Vec<CellId>,
        #[serde(default)]
        cell_levels: Vec<CellLevelOverride>,
        effective_period: u32,
    },
    Cull {
        year: u32,
        week: u32,
        level: f64,
        cells: Vec<CellId>,
        #[serde(default)]
        cell_levels: Vec<CellLevelOverride>,
    },
}

impl StrategyConfig {
    fn add_to(&self, sim: &mut Simulation) -> Result<(), ModelError> {
        match self {
            StrategyConfig::Fertility {
                year,
                week,
                level,
                cells,
                cell_levels,
                effective_period,
            } => {
                let levels = cell_levels_for(sim, cells, *level, *year, *week, cell_levels)?;
                sim.add_strategy(FertilityStrategy::new(levels, *effective_period)?);
            }
            StrategyConfig::Cull {
                year,
                week,
                level,
                cells,
                cell_levels,
            } => {
                let levels = cell_levels_for(sim, cells, *level, *year, *week, cell_levels)?;
                sim.add_strategy(CullStrategy::new(levels));
            }
        }
        Ok(())
    }
}

fn cell_levels_for(
    sim: &Simulation,
    cells: &[CellId],
    level: f64,
    year: u32,
    week: u32,
    overrides: &[CellLevelOverride],
) -> Result<CellLevels, ModelError> {
    let mut levels = CellLevels::new(sim.cells(), cells, level, year, week)?;
    for CellLevelOverride { cell, level } in overrides {
        levels.set_level(*cell, *level)?;
    }
    Ok(levels)
}

/// Reads a configuration file. A relative `population_file` is made relative to the file's
/// directory.
pub fn load_config(path: &Path) -> Result<ModelConfig, ModelError> {
    let file = File::open(path)?;
    let mut config: ModelConfig = serde_json::from_reader(BufReader::new(file))?;
    if let Some(population_file) = &config.population_file {
        if population_file.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            config.population_file = Some(base.join(population_file));
        }
    }
    debug!("loaded configuration `{}` from {}", config.name, path.display());
    Ok(config)
}

impl ModelConfig {
    /// Validates the configuration and builds an idle [`Simulation`] from it.
    pub fn build_simulation(&self) -> Result<Simulation, ModelError> {
        self.behavior.validate()?;
        let mut sim = Simulation::new(self.name.as_str(), self.years, self.behavior.clone())?;
        sim.init_random(self.random_seed);
        sim.set_scramble_order(self.scramble_order);
        sim.set_abort_on_disease_disappearance(self.abort_on_disease_disappearance);
        sim.set_prevent_incest(self.prevent_incest);
        sim.set_keep_dead(self.keep_dead);
        sim.set_workers(self.workers)?;

        if self.cells.is_empty() {
            return Err(ModelError::illegal("cells", "must not be empty"));
        }
        for cell in &self.cells {
            sim.add_cell(*cell)?;
        }

        if let Some(table) = &self.mortality {
            sim.set_mortality_table(table.clone())?;
        }

        if let Some(path) = &self.population_file {
            let records = load_population(path)?;
            for record in records {
                sim.add_animal(record.into_animal())?;
            }
        }

        for strategy in &self.strategies {
            strategy.add_to(&mut sim)?;
        }

        info!(
            "built model `{}`: {} cells, {} animals, {} strategies",
            self.name,
            sim.cells().len(),
            sim.population().len(),
            sim.strategies().len()
        );
        Ok(sim)
    }
}
