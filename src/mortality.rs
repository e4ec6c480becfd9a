//! Age-stratified weekly mortality.
//!
//! Each week, for each sex and each age bracket, the selector converts the bracket's annual
//! mortality rate into a weekly death target, draws the actual number of deaths from a tolerance
//! band around that target, and flags that many animals picked uniformly at random from the
//! bracket. Animals already flagged (by an earlier phase or an earlier draw) are never counted
//! twice: a pick that lands on one is redrawn.
//!
//! The tolerance band is ±5% for females and ±10% for males.

use log::{debug, trace};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::animal::{Animal, Sex, AGE_BRACKETS};
use crate::error::ModelError;
use crate::population::Population;
use crate::random::UniformIntExt;
use crate::time::WEEKS_PER_YEAR;

pub const FEMALE_TOLERANCE: f64 = 0.05;
pub const MALE_TOLERANCE: f64 = 0.10;

// After this many consecutive misses per bracket member, picks are made from the unflagged
// members directly.
const RESAMPLE_LIMIT_FACTOR: usize = 32;

/// Annual mortality rates per sex, indexed by age bracket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MortalityTable {
    female: [f64; AGE_BRACKETS],
    male: [f64; AGE_BRACKETS],
}

impl MortalityTable {
    pub fn new(
        female: [f64; AGE_BRACKETS],
        male: [f64; AGE_BRACKETS],
    ) -> Result<MortalityTable, ModelError> {
        let table = MortalityTable { female, male };
        table.validate()?;
        Ok(table)
    }

    /// Checks every rate is finite and non-negative. Tables read from configuration files are
    /// deserialized directly and must be validated before use.
    pub fn validate(&self) -> Result<(), ModelError> {
        for (name, rates) in [("female_mortality", &self.female), ("male_mortality", &self.male)] {
            if let Some((bracket, rate)) = rates
                .iter()
                .enumerate()
                .find(|(_, rate)| !rate.is_finite() || **rate < 0.0)
            {
                return Err(ModelError::illegal(
                    name,
                    format!("rate {rate} for age bracket {bracket} is negative or not finite"),
                ));
            }
        }
        Ok(())
    }

    pub fn rate(&self, sex: Sex, bracket: usize) -> f64 {
        match sex {
            Sex::Female => self.female[bracket],
            Sex::Male => self.male[bracket],
        }
    }
}

pub fn tolerance(sex: Sex) -> f64 {
    match sex {
        Sex::Female => FEMALE_TOLERANCE,
        Sex::Male => MALE_TOLERANCE,
    }
}

/// `floor(bracket_size * annual_rate / 52)`
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn weekly_target(bracket_size: usize, annual_rate: f64) -> usize {
    (bracket_size as f64 * annual_rate / f64::from(WEEKS_PER_YEAR)).floor() as usize
}

/// The inclusive range `[floor(target * (1 - tol)), floor(target * (1 + tol))]`.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn tolerance_band(target: usize, tolerance: f64) -> (usize, usize) {
    let target = target as f64;
    (
        (target * (1.0 - tolerance)).floor() as usize,
        (target * (1.0 + tolerance)).floor() as usize,
    )
}

/// The outcome of selection in one sex/age bracket.
#[derive(Clone, Debug, PartialEq)]
pub struct BracketSelection {
    pub sex: Sex,
    pub bracket: usize,
    pub bracket_size: usize,
    pub target: usize,
    /// The number drawn from the tolerance band.
    pub drawn: usize,
    /// The number newly flagged. Less than `drawn` only when the bracket ran out of unflagged
    /// animals.
    pub flagged: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MortalityReport {
    /// One entry per bracket with a non-zero target, females first, youngest first.
    pub selections: Vec<BracketSelection>,
}

impl MortalityReport {
    pub fn total_flagged(&self) -> usize {
        self.selections.iter().map(|s| s.flagged).sum()
    }

    pub fn get(&self, sex: Sex, bracket: usize) -> Option<&BracketSelection> {
        self.selections
            .iter()
            .find(|s| s.sex == sex && s.bracket == bracket)
    }
}

#[derive(Clone, Debug)]
pub struct MortalitySelector {
    table: MortalityTable,
}

impl MortalitySelector {
    pub fn new(table: MortalityTable) -> MortalitySelector {
        MortalitySelector { table }
    }

    pub fn table(&self) -> &MortalityTable {
        &self.table
    }

    /// Flags this week's deaths in `population`.
    pub fn select_will_die_animals<R: Rng>(
        &self,
        population: &mut Population,
        rng: &mut R,
    ) -> MortalityReport {
        let mut report = MortalityReport::default();
        for sex in Sex::ALL {
            let mut brackets: [Vec<usize>; AGE_BRACKETS] = Default::default();
            for index in population.indices_by_sex(sex) {
                if let Some(animal) = population.get(index) {
                    brackets[animal.age_bracket()].push(index);
                }
            }

            for (bracket, members) in brackets.iter().enumerate() {
                if members.is_empty() {
                    continue;
                }
                let target = weekly_target(members.len(), self.table.rate(sex, bracket));
                if target == 0 {
                    continue;
                }
                let (low, high) = tolerance_band(target, tolerance(sex));
                #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
                let drawn = rng.int_value(low as i64, high as i64) as usize;
                let flagged = flag_members(population.as_mut_slice(), members, drawn, rng);
                trace!(
                    "{sex:?} bracket {bracket}: size={} target={target} drawn={drawn} \
                     flagged={flagged}",
                    members.len()
                );
                report.selections.push(BracketSelection {
                    sex,
                    bracket,
                    bracket_size: members.len(),
                    target,
                    drawn,
                    flagged,
                });
            }
        }
        debug!("mortality selection flagged {} animals", report.total_flagged());
        report
    }
}

/// Flags up to `count` unflagged animals among `members`, picking uniformly with redraws.
/// Returns the number flagged.
fn flag_members<R: Rng>(
    animals: &mut [Animal],
    members: &[usize],
    count: usize,
    rng: &mut R,
) -> usize {
    let miss_limit = members.len() * RESAMPLE_LIMIT_FACTOR;
    flag_members_with_limit(animals, members, count, miss_limit, rng)
}

/// After `miss_limit` consecutive redraws of flagged animals, picks among the unflagged ones
/// directly.
fn flag_members_with_limit<R: Rng>(
    animals: &mut [Animal],
    members: &[usize],
    count: usize,
    miss_limit: usize,
    rng: &mut R,
) -> usize {
    let unflagged = members.iter().filter(|&&i| !animals[i].will_die()).count();
    let wanted = count.min(unflagged);

    let mut flagged = 0;
    let mut misses = 0;
    while flagged < wanted {
        let mut pick = members[rng.random_range(0..members.len())];
        if animals[pick].will_die() {
            misses += 1;
            if misses < miss_limit {
                continue;
            }
            let remaining: Vec<usize> = members
                .iter()
                .copied()
                .filter(|&i| !animals[i].will_die())
                .collect();
            pick = remaining[rng.random_range(0..remaining.len())];
        }
        animals[pick].mark_for_death();
        flagged += 1;
        misses = 0;
    }
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellId;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn flat_table(female: f64, male: f64) -> MortalityTable {
        MortalityTable::new([female; AGE_BRACKETS], [male; AGE_BRACKETS]).unwrap()
    }

    fn population_of(sex: Sex, n: usize, age_weeks: u32) -> Population {
        let mut population = Population::new();
        for _ in 0..n {
            population.spawn(sex, age_weeks, CellId(0));
        }
        population
    }

    #[test]
    fn rate_converts_to_weekly_target() {
        assert_eq!(weekly_target(100, 52.0), 100);
        assert_eq!(weekly_target(520, 0.5), 5);
        assert_eq!(weekly_target(10, 0.5), 0);
        assert_eq!(tolerance_band(100, FEMALE_TOLERANCE), (95, 105));
        assert_eq!(tolerance_band(100, MALE_TOLERANCE), (90, 110));
        assert_eq!(tolerance_band(5, FEMALE_TOLERANCE), (4, 5));
    }

    #[test]
    fn invalid_rates_are_rejected() {
        let mut female = [0.1; AGE_BRACKETS];
        female[3] = -0.5;
        assert!(MortalityTable::new(female, [0.1; AGE_BRACKETS]).is_err());
        let mut male = [0.1; AGE_BRACKETS];
        male[7] = f64::NAN;
        assert!(MortalityTable::new([0.1; AGE_BRACKETS], male).is_err());
    }

    #[test]
    fn near_total_cull_of_hundred_females() {
        let mut female = [0.0; AGE_BRACKETS];
        female[0] = 52.0;
        let selector = MortalitySelector::new(MortalityTable::new(female, [0.0; 8]).unwrap());
        let mut population = population_of(Sex::Female, 100, 10);
        let mut rng = SmallRng::seed_from_u64(42);

        let report = selector.select_will_die_animals(&mut population, &mut rng);
        let selection = report.get(Sex::Female, 0).unwrap();
        assert_eq!(selection.bracket_size, 100);
        assert_eq!(selection.target, 100);
        assert!((95..=105).contains(&selection.drawn));
        assert_eq!(selection.flagged, selection.drawn.min(100));
        assert_eq!(population.count_flagged(), selection.flagged);
    }

    #[test]
    fn flagged_counts_stay_in_band() {
        let selector = MortalitySelector::new(flat_table(0.5, 0.5));
        for seed in 0..50 {
            let mut population = population_of(Sex::Female, 1040, 60);
            for _ in 0..1040 {
                population.spawn(Sex::Male, 60, CellId(0));
            }
            let mut rng = SmallRng::seed_from_u64(seed);
            let report = selector.select_will_die_animals(&mut population, &mut rng);

            // target = floor(1040 * 0.5 / 52) = 10
            let female = report.get(Sex::Female, 1).unwrap();
            assert_eq!(female.target, 10);
            assert!((9..=10).contains(&female.flagged));
            let male = report.get(Sex::Male, 1).unwrap();
            assert!((9..=11).contains(&male.flagged));
            assert_eq!(population.count_flagged(), female.flagged + male.flagged);
        }
    }

    #[test]
    fn already_flagged_animals_are_not_counted_again() {
        let selector = MortalitySelector::new(flat_table(52.0, 0.0));
        let mut population = population_of(Sex::Female, 100, 0);
        for index in 0..30 {
            population.get_mut(index).unwrap().mark_for_death();
        }
        let mut rng = SmallRng::seed_from_u64(5);
        let report = selector.select_will_die_animals(&mut population, &mut rng);
        let selection = report.get(Sex::Female, 0).unwrap();
        // At least 95 drawn but only 70 are left to flag.
        assert_eq!(selection.flagged, 70);
        assert_eq!(population.count_flagged(), 100);
    }

    #[test]
    fn zero_target_and_empty_brackets_are_skipped() {
        let selector = MortalitySelector::new(flat_table(0.5, 0.5));
        let mut population = population_of(Sex::Male, 20, 3 * 52);
        let mut rng = SmallRng::seed_from_u64(1);
        let report = selector.select_will_die_animals(&mut population, &mut rng);
        assert!(report.selections.is_empty());
        assert_eq!(population.count_flagged(), 0);
    }

    #[test]
    fn old_animals_use_last_bracket() {
        let mut male = [0.0; AGE_BRACKETS];
        male[7] = 52.0;
        let selector = MortalitySelector::new(MortalityTable::new([0.0; 8], male).unwrap());
        let mut population = population_of(Sex::Male, 10, 12 * 52);
        let mut rng = SmallRng::seed_from_u64(1);
        let report = selector.select_will_die_animals(&mut population, &mut rng);
        assert_eq!(report.selections.len(), 1);
        assert_eq!(report.selections[0].bracket, 7);
        assert_eq!(report.selections[0].target, 10);
    }

    #[test]
    fn dead_animals_are_not_in_any_bracket() {
        let selector = MortalitySelector::new(flat_table(52.0, 52.0));
        let mut population = population_of(Sex::Female, 10, 0);
        population.get_mut(0).unwrap().kill();
        let mut rng = SmallRng::seed_from_u64(1);
        let report = selector.select_will_die_animals(&mut population, &mut rng);
        assert_eq!(report.get(Sex::Female, 0).unwrap().bracket_size, 9);
    }

    #[test]
    fn exhausted_redraws_pick_among_unflagged() {
        let mut population = population_of(Sex::Female, 10, 60);
        let members: Vec<usize> = (0..10).collect();
        for animal in &mut population.as_mut_slice()[..6] {
            animal.mark_for_death();
        }
        let mut rng = SmallRng::seed_from_u64(5);

        let animals = population.as_mut_slice();
        assert_eq!(flag_members_with_limit(animals, &members, 3, 1, &mut rng), 3);
        assert_eq!(animals.iter().filter(|a| a.will_die()).count(), 9);
        assert_eq!(flag_members_with_limit(animals, &members, 5, 0, &mut rng), 1);
        assert!(animals.iter().all(Animal::will_die));
    }
}
