//! The weekly driver of the model.
//!
//! A [`Simulation`] owns every collaborator of a run: the clock, the population and its cells,
//! the animals' weekly behaviour, the optional mortality table, the scheduled strategies, the
//! disease monitor, the observers and the random streams. [`Simulation::run_model`] drives it from
//! week 1 of year 0 to week 52 of the last year. Each tick runs these phases, in this order and
//! never overlapping:
//!
//! 1. every live animal's weekly behaviour (in parallel when more than one worker is configured)
//! 2. newborns are appended to the population, then mortality selection flags this week's deaths
//! 3. strategies scheduled for this tick are applied
//! 4. observers are told the tick is about to be cleaned up, and may abort
//! 5. animals flagged for death are removed
//! 6. observers are told cleanup happened, and may abort
//! 7. the population is optionally shuffled, and the clock advances
//!
//! An abort ends the run on the spot: nothing later in the tick happens and the clock stays put.
//! The last tick never advances the clock; processing it completes the run.

use std::fmt;

use log::{debug, info, trace, warn};
use serde::Serialize;

use crate::animal::{Animal, AnimalId, Sex};
use crate::behavior::{WeekEnv, WeeklyBehavior};
use crate::cell::{CellId, CellList};
use crate::define_rng;
use crate::disease::DiseaseMonitor;
use crate::dispatch::ActivityDispatcher;
use crate::error::ModelError;
use crate::execution_stats::{ExecutionStatistics, ExecutionStatsCollector};
use crate::mortality::{MortalityReport, MortalitySelector, MortalityTable};
use crate::notification::{Checkpoint, NotificationChannel, WeeklyUpdateEvent};
use crate::population::Population;
use crate::random::RandomStreams;
use crate::strategy::{Strategy, StrategyList, StrategyTarget};
use crate::time::{Tick, Timeline};

define_rng!(MortalityRng);
define_rng!(StrategyRng);
define_rng!(ScrambleRng);

/// How a run ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every tick up to week 52 of the last year was processed.
    Completed,
    /// An observer asked to stop at `checkpoint` of `tick`.
    Aborted { tick: Tick, checkpoint: Checkpoint },
    /// The disease had been seen but no animal was infected at the start of `year`.
    DiseaseDisappeared { year: u32 },
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed => write!(f, "completed"),
            RunOutcome::Aborted { tick, checkpoint } => {
                write!(f, "aborted {checkpoint} at {tick}")
            }
            RunOutcome::DiseaseDisappeared { year } => {
                write!(f, "disease disappeared before year {year}")
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Terminated(RunOutcome),
}

pub struct Simulation {
    name: String,
    timeline: Timeline,
    cells: CellList,
    population: Population,
    behavior: Box<dyn WeeklyBehavior>,
    mortality: Option<MortalitySelector>,
    strategies: StrategyList,
    disease: DiseaseMonitor,
    notifications: NotificationChannel,
    streams: RandomStreams,
    dispatcher: ActivityDispatcher,
    scramble_order: bool,
    abort_on_disease_disappearance: bool,
    prevent_incest: bool,
    weekly_events_run: bool,
    state: RunState,
    stats: ExecutionStatsCollector,
    final_stats: Option<ExecutionStatistics>,
    last_mortality: Option<MortalityReport>,
}

impl Simulation {
    /// Creates an idle simulation of `years` years with no cells, no animals and no strategies.
    pub fn new(
        name: impl Into<String>,
        years: u32,
        behavior: impl WeeklyBehavior + 'static,
    ) -> Result<Simulation, ModelError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ModelError::illegal("name", "must not be empty"));
        }
        Ok(Simulation {
            name,
            timeline: Timeline::new(years)?,
            cells: CellList::new(),
            population: Population::new(),
            behavior: Box::new(behavior),
            mortality: None,
            strategies: StrategyList::new(),
            disease: DiseaseMonitor::new(),
            notifications: NotificationChannel::new(),
            streams: RandomStreams::default(),
            dispatcher: ActivityDispatcher::new(1)?,
            scramble_order: false,
            abort_on_disease_disappearance: true,
            prevent_incest: false,
            weekly_events_run: false,
            state: RunState::Idle,
            stats: ExecutionStatsCollector::new(),
            final_stats: None,
            last_mortality: None,
        })
    }

    /// Reseeds every random stream from `base_seed`.
    pub fn init_random(&mut self, base_seed: u64) {
        trace!("initializing random module with seed {base_seed}");
        self.streams.reseed(base_seed);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn current_tick(&self) -> Tick {
        self.timeline.current_tick()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn cells(&self) -> &CellList {
        &self.cells
    }

    pub fn add_cell(&mut self, id: CellId) -> Result<(), ModelError> {
        self.cells.add(id)
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn population_mut(&mut self) -> &mut Population {
        &mut self.population
    }

    /// Adds an animal with a chosen id. Its cell must already be known.
    pub fn add_animal(&mut self, animal: Animal) -> Result<AnimalId, ModelError> {
        if !self.cells.contains(animal.cell) {
            return Err(ModelError::UnknownCell(animal.cell));
        }
        self.population.add(animal)
    }

    /// Adds an animal with the next free id. Its cell must already be known.
    pub fn spawn_animal(
        &mut self,
        sex: Sex,
        age_weeks: u32,
        cell: CellId,
    ) -> Result<AnimalId, ModelError> {
        if !self.cells.contains(cell) {
            return Err(ModelError::UnknownCell(cell));
        }
        Ok(self.population.spawn(sex, age_weeks, cell))
    }

    pub fn set_mortality_table(&mut self, table: MortalityTable) -> Result<(), ModelError> {
        table.validate()?;
        self.mortality = Some(MortalitySelector::new(table));
        Ok(())
    }

    pub fn mortality_table(&self) -> Option<&MortalityTable> {
        self.mortality.as_ref().map(MortalitySelector::table)
    }

    /// The selection made by the most recent tick, if mortality is configured.
    pub fn last_mortality_report(&self) -> Option<&MortalityReport> {
        self.last_mortality.as_ref()
    }

    pub fn add_strategy(&mut self, strategy: impl Strategy + 'static) {
        self.strategies.add(strategy);
    }

    pub fn strategies(&self) -> &StrategyList {
        &self.strategies
    }

    pub fn disease_present(&self) -> bool {
        self.disease.disease_present()
    }

    pub fn set_scramble_order(&mut self, scramble_order: bool) {
        self.scramble_order = scramble_order;
    }

    pub fn set_abort_on_disease_disappearance(&mut self, abort: bool) {
        self.abort_on_disease_disappearance = abort;
    }

    pub fn set_prevent_incest(&mut self, prevent_incest: bool) {
        self.prevent_incest = prevent_incest;
    }

    pub fn set_keep_dead(&mut self, keep_dead: bool) {
        self.population.set_keep_dead(keep_dead);
    }

    pub fn set_workers(&mut self, workers: usize) -> Result<(), ModelError> {
        self.dispatcher = ActivityDispatcher::new(workers)?;
        Ok(())
    }

    pub fn workers(&self) -> usize {
        self.dispatcher.workers()
    }

    pub fn subscribe_before_removing_dead(
        &mut self,
        observer: impl FnMut(&Simulation, &mut WeeklyUpdateEvent) + 'static,
    ) {
        self.notifications
            .subscribe(Checkpoint::BeforeRemovingDead, observer);
    }

    pub fn subscribe_after_removing_dead(
        &mut self,
        observer: impl FnMut(&Simulation, &mut WeeklyUpdateEvent) + 'static,
    ) {
        self.notifications
            .subscribe(Checkpoint::AfterRemovingDead, observer);
    }

    /// True once the weekly events of the current tick have run, until the clock advances.
    pub fn have_run_weekly_events(&self) -> bool {
        self.weekly_events_run
    }

    /// Statistics of the run so far, or of the finished run.
    pub fn execution_statistics(&self) -> ExecutionStatistics {
        match &self.final_stats {
            Some(stats) => stats.clone(),
            None => self.stats.compute_final_statistics(self.population.len()),
        }
    }

    /// Prepares a run: sorts the strategies by schedule and rewinds their cursor. Called by
    /// [`Simulation::run_model`]; hosts that drive ticks with [`Simulation::weekly_calls`] call it
    /// once first.
    pub fn begin_run(&mut self) -> Result<(), ModelError> {
        if self.state != RunState::Idle {
            return Err(ModelError::ModelError(format!(
                "simulation `{}` has already been run",
                self.name
            )));
        }
        self.start_run();
        Ok(())
    }

    fn start_run(&mut self) {
        self.strategies.sort();
        self.strategies.reset();
        if self.population.has_infected() {
            self.disease.record_infection();
        }
        self.stats = ExecutionStatsCollector::new();
        self.state = RunState::Running;
        info!(
            "{}: starting run of {} years with {} animals in {} cells and {} strategies",
            self.name,
            self.timeline.n_years(),
            self.population.len(),
            self.cells.len(),
            self.strategies.len()
        );
    }

    /// Runs the model to its horizon, or until it is aborted or the disease disappears.
    pub fn run_model(&mut self) -> Result<RunOutcome, ModelError> {
        self.begin_run()?;
        let outcome = self.run_ticks();
        self.finish(outcome);
        Ok(outcome)
    }

    fn run_ticks(&mut self) -> RunOutcome {
        loop {
            if self.timeline.current_week() == 1 && self.disease_disappeared() {
                return RunOutcome::DiseaseDisappeared {
                    year: self.timeline.current_year(),
                };
            }
            if let Some(outcome) = self.run_tick(true) {
                return outcome;
            }
        }
    }

    fn disease_disappeared(&self) -> bool {
        self.abort_on_disease_disappearance
            && self.disease.disease_present()
            && !self.population.has_infected()
    }

    fn finish(&mut self, outcome: RunOutcome) {
        self.state = RunState::Terminated(outcome);
        let stats = self.stats.compute_final_statistics(self.population.len());
        info!("{}: run {outcome}", self.name);
        self.final_stats = Some(stats);
    }

    /// Processes the current tick. Returns `false` once the run is over, either because an
    /// observer aborted it or because the last tick has been processed.
    ///
    /// With `advance_time` unset the clock stays on the current tick and
    /// [`Simulation::have_run_weekly_events`] stays true afterwards. The last tick is never
    /// advanced past, whatever `advance_time` says.
    pub fn weekly_calls(&mut self, advance_time: bool) -> bool {
        match self.state {
            RunState::Idle => self.start_run(),
            RunState::Running => {}
            RunState::Terminated(outcome) => {
                warn!("{}: weekly calls after the run {outcome}", self.name);
                return false;
            }
        }
        match self.run_tick(advance_time) {
            Some(outcome) => {
                self.finish(outcome);
                false
            }
            None => true,
        }
    }

    fn run_tick(&mut self, advance_time: bool) -> Option<RunOutcome> {
        let tick = self.timeline.current_tick();
        if tick.week == 1 {
            info!("{}: starting year {}", self.name, tick.year);
        }

        let env = WeekEnv {
            tick,
            prevent_incest: self.prevent_incest,
        };
        let n_animals = self.population.len();
        let activity = self.dispatcher.run_weekly_activities(
            self.population.as_mut_slice(),
            0..n_animals,
            self.behavior.as_ref(),
            &env,
            &self.streams,
        );
        if !activity.infections.is_empty() {
            self.disease.record_infection();
        }

        let disease = &mut self.disease;
        let newborns = self
            .population
            .merge_newborns(&activity.births, |_| disease.record_infection());
        self.stats.record_births(newborns.len());

        if let Some(selector) = &self.mortality {
            let report = selector
                .select_will_die_animals(&mut self.population, self.streams.rng(MortalityRng));
            self.stats.record_mortality_flagged(report.total_flagged());
            self.last_mortality = Some(report);
        }

        let mut target = StrategyTarget {
            population: &mut self.population,
            rng: self.streams.rng(StrategyRng),
            tick,
        };
        let applied = self.strategies.apply_due(&mut target);
        self.stats.record_strategies_applied(applied);

        self.weekly_events_run = true;
        self.stats.record_tick();

        if !self.notify(tick, Checkpoint::BeforeRemovingDead) {
            return Some(RunOutcome::Aborted {
                tick,
                checkpoint: Checkpoint::BeforeRemovingDead,
            });
        }

        let removed = self.population.remove_deceased();
        self.stats.record_removed(removed);

        if !self.notify(tick, Checkpoint::AfterRemovingDead) {
            return Some(RunOutcome::Aborted {
                tick,
                checkpoint: Checkpoint::AfterRemovingDead,
            });
        }

        if self.scramble_order {
            self.population
                .scramble_order(self.streams.rng(ScrambleRng));
        }

        debug!(
            "{tick}: {} animals, {} births, {removed} removed, {applied} strategies applied",
            self.population.len(),
            newborns.len()
        );

        if self.timeline.is_last_tick() {
            return Some(RunOutcome::Completed);
        }
        if advance_time && self.timeline.advance() {
            self.weekly_events_run = false;
        }
        None
    }

    /// Calls every observer of `checkpoint`, then reports whether the run may go on.
    fn notify(&mut self, tick: Tick, checkpoint: Checkpoint) -> bool {
        let mut observers = self.notifications.take(checkpoint);
        let mut event = WeeklyUpdateEvent::new(tick, checkpoint);
        for observer in &mut observers {
            observer(&*self, &mut event);
        }
        self.notifications.restore(checkpoint, observers);

        if event.abort_requested() {
            warn!("{}: abort requested {checkpoint} at {tick}", self.name);
            return false;
        }
        true
    }
}
