//! Reading an initial population from CSV.
//!
//! The file has a header row and one animal per line:
//!
//! ```text
//! id,sex,age_weeks,cell,infected
//! 0,female,120,3,false
//! 1,male,40,3,true
//! ```
//!
//! The `infected` column may be left out, in which case every animal starts uninfected.

use std::io::Read;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::animal::{Animal, AnimalId, Sex};
use crate::cell::CellId;
use crate::error::ModelError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimalRecord {
    pub id: AnimalId,
    pub sex: Sex,
    pub age_weeks: u32,
    pub cell: CellId,
    #[serde(default)]
    pub infected: bool,
}

impl AnimalRecord {
    pub fn into_animal(self) -> Animal {
        let mut animal = Animal::new(self.id, self.sex, self.age_weeks, self.cell);
        animal.infected = self.infected;
        animal
    }
}

pub fn read_population<R: Read>(reader: R) -> Result<Vec<AnimalRecord>, ModelError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: AnimalRecord = result?;
        records.push(record);
    }
    Ok(records)
}

pub fn load_population(path: &Path) -> Result<Vec<AnimalRecord>, ModelError> {
    let file = std::fs::File::open(path)?;
    let records = read_population(file)?;
    debug!("read {} animals from {}", records.len(), path.display());
    Ok(records)
}
