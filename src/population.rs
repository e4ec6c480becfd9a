//! The master list of animals.
//!
//! Order matters: the activity dispatcher visits animals by index range and the random draws of
//! every phase depend on it. Order changes in exactly three places, all of them between phases of
//! a tick: newborns are appended by [`Population::merge_newborns`], the dead are dropped by
//! [`Population::remove_deceased`], and [`Population::scramble_order`] shuffles the list.

use log::trace;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::animal::{Animal, AnimalId, Birth, Sex};
use crate::cell::CellId;
use crate::error::ModelError;
use crate::HashSet;

#[derive(Debug, Default)]
pub struct Population {
    animals: Vec<Animal>,
    ids: HashSet<AnimalId>,
    next_id: u64,
    keep_dead: bool,
    deceased: Vec<Animal>,
}

impl Population {
    pub fn new() -> Population {
        Population::default()
    }

    /// When set, removed animals are archived and available from [`Population::deceased`].
    pub fn set_keep_dead(&mut self, keep_dead: bool) {
        self.keep_dead = keep_dead;
    }

    pub fn len(&self) -> usize {
        self.animals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animals.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Animal> {
        self.animals.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Animal> {
        self.animals.get_mut(index)
    }

    pub fn find(&self, id: AnimalId) -> Option<&Animal> {
        self.animals.iter().find(|animal| animal.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Animal> {
        self.animals.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Animal> {
        self.animals.iter_mut()
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Animal] {
        &mut self.animals
    }

    /// Animals removed so far, oldest removal first. Empty unless `keep_dead` is set.
    pub fn deceased(&self) -> &[Animal] {
        &self.deceased
    }

    /// Indices of the live animals of the given sex, in population order.
    pub fn indices_by_sex(&self, sex: Sex) -> Vec<usize> {
        self.animals
            .iter()
            .enumerate()
            .filter(|(_, animal)| animal.is_alive() && animal.sex == sex)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn count_by_sex(&self, sex: Sex) -> usize {
        self.animals
            .iter()
            .filter(|animal| animal.is_alive() && animal.sex == sex)
            .count()
    }

    /// Number of animals waiting to be removed at cleanup.
    pub fn count_flagged(&self) -> usize {
        self.animals.iter().filter(|animal| animal.is_deceased()).count()
    }

    /// True if any live animal is currently infected.
    pub fn has_infected(&self) -> bool {
        self.animals
            .iter()
            .any(|animal| animal.is_alive() && animal.infected)
    }

    /// Adds an animal with a caller-chosen id.
    pub fn add(&mut self, animal: Animal) -> Result<AnimalId, ModelError> {
        let id = animal.id();
        if !self.ids.insert(id) {
            return Err(ModelError::DuplicateAnimal(id));
        }
        self.next_id = self.next_id.max(id.0 + 1);
        self.animals.push(animal);
        Ok(id)
    }

    /// Adds a new animal and assigns it the next free id.
    pub fn spawn(&mut self, sex: Sex, age_weeks: u32, cell: CellId) -> AnimalId {
        let id = self.allocate_id();
        self.ids.insert(id);
        self.animals.push(Animal::new(id, sex, age_weeks, cell));
        id
    }

    /// Appends the newborns produced during this tick's weekly activities, in the order given.
    /// `on_infected` is called for every newborn that is infected at birth.
    pub fn merge_newborns(
        &mut self,
        births: &[Birth],
        mut on_infected: impl FnMut(AnimalId),
    ) -> Vec<AnimalId> {
        let mut added = Vec::with_capacity(births.len());
        for birth in births {
            let id = self.allocate_id();
            self.ids.insert(id);
            let animal = Animal::from_birth(id, birth);
            if animal.infected {
                on_infected(id);
            }
            self.animals.push(animal);
            added.push(id);
        }
        if !added.is_empty() {
            trace!("merged {} newborns", added.len());
        }
        added
    }

    /// Removes every animal flagged for death, preserving the order of the survivors.
    /// Returns the number removed.
    pub fn remove_deceased(&mut self) -> usize {
        let before = self.animals.len();
        let (dead, alive): (Vec<Animal>, Vec<Animal>) = std::mem::take(&mut self.animals)
            .into_iter()
            .partition(Animal::is_deceased);
        self.animals = alive;
        for animal in &dead {
            self.ids.remove(&animal.id());
        }
        if self.keep_dead {
            self.deceased.extend(dead);
        }
        before - self.animals.len()
    }

    pub fn scramble_order<R: Rng>(&mut self, rng: &mut R) {
        self.animals.shuffle(rng);
    }

    fn allocate_id(&mut self) -> AnimalId {
        let id = AnimalId(self.next_id);
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn population_of(n: u32) -> Population {
        let mut population = Population::new();
        for i in 0..n {
            let sex = if i % 2 == 0 { Sex::Female } else { Sex::Male };
            population.spawn(sex, i * 10, CellId(i % 3));
        }
        population
    }

    #[test]
    fn spawn_assigns_sequential_ids() {
        let population = population_of(3);
        let ids: Vec<_> = population.iter().map(Animal::id).collect();
        assert_eq!(ids, vec![AnimalId(0), AnimalId(1), AnimalId(2)]);
    }

    #[test]
    fn add_rejects_duplicate_ids_and_bumps_next_id() {
        let mut population = Population::new();
        population
            .add(Animal::new(AnimalId(10), Sex::Male, 0, CellId(0)))
            .unwrap();
        assert!(matches!(
            population.add(Animal::new(AnimalId(10), Sex::Female, 0, CellId(0))),
            Err(ModelError::DuplicateAnimal(AnimalId(10)))
        ));
        assert_eq!(population.spawn(Sex::Female, 0, CellId(0)), AnimalId(11));
    }

    #[test]
    fn filter_by_sex_skips_dead() {
        let mut population = population_of(6);
        population.get_mut(0).unwrap().kill();
        assert_eq!(population.indices_by_sex(Sex::Female), vec![2, 4]);
        assert_eq!(population.indices_by_sex(Sex::Male), vec![1, 3, 5]);
        assert_eq!(population.count_by_sex(Sex::Female), 2);
    }

    #[test]
    fn merge_newborns_reports_infected() {
        let mut population = population_of(2);
        let births = vec![
            Birth {
                mother: AnimalId(0),
                sex: Sex::Male,
                cell: CellId(0),
                infected: false,
            },
            Birth {
                mother: AnimalId(0),
                sex: Sex::Female,
                cell: CellId(0),
                infected: true,
            },
        ];
        let mut infected = Vec::new();
        let added = population.merge_newborns(&births, |id| infected.push(id));
        assert_eq!(added, vec![AnimalId(2), AnimalId(3)]);
        assert_eq!(infected, vec![AnimalId(3)]);
        assert_eq!(population.len(), 4);
        assert_eq!(population.get(3).unwrap().mother, Some(AnimalId(0)));
    }

    #[test]
    fn remove_deceased_keeps_order_and_archives() {
        let mut population = population_of(5);
        population.set_keep_dead(true);
        population.get_mut(1).unwrap().mark_for_death();
        population.get_mut(3).unwrap().kill();
        assert_eq!(population.count_flagged(), 2);

        assert_eq!(population.remove_deceased(), 2);
        let ids: Vec<_> = population.iter().map(Animal::id).collect();
        assert_eq!(ids, vec![AnimalId(0), AnimalId(2), AnimalId(4)]);
        let archived: Vec<_> = population.deceased().iter().map(Animal::id).collect();
        assert_eq!(archived, vec![AnimalId(1), AnimalId(3)]);
        assert_eq!(population.count_flagged(), 0);
    }

    #[test]
    fn removal_discards_without_archive() {
        let mut population = population_of(3);
        population.get_mut(0).unwrap().mark_for_death();
        population.remove_deceased();
        assert!(population.deceased().is_empty());
        // A removed id may be reused by an explicit add.
        population
            .add(Animal::new(AnimalId(0), Sex::Female, 0, CellId(0)))
            .unwrap();
    }

    #[test]
    fn scramble_is_a_permutation() {
        let mut population = population_of(50);
        let mut rng = SmallRng::seed_from_u64(3);
        population.scramble_order(&mut rng);
        let mut ids: Vec<_> = population.iter().map(|a| a.id().0).collect();
        assert_ne!(ids, (0..50).collect::<Vec<_>>());
        ids.sort_unstable();
        assert_eq!(ids, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn has_infected_ignores_dead() {
        let mut population = population_of(2);
        assert!(!population.has_infected());
        let animal = population.get_mut(1).unwrap();
        animal.infected = true;
        assert!(population.has_infected());
        population.get_mut(1).unwrap().kill();
        assert!(!population.has_infected());
    }
}
