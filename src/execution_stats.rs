use std::time::{Duration, Instant};

use humantime::format_duration;
use log::info;
use serde::Serialize;

/// Counters gathered over one run of a [`crate::simulation::Simulation`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ExecutionStatistics {
    pub ticks_processed: u64,
    pub births: u64,
    pub removed: u64,
    pub mortality_flagged: u64,
    pub strategies_applied: u64,
    pub final_population: usize,
    pub wall_time: Duration,
}

/// Accumulates [`ExecutionStatistics`] while a run is in progress.
#[derive(Debug)]
pub(crate) struct ExecutionStatsCollector {
    start_time: Instant,
    stats: ExecutionStatistics,
}

impl ExecutionStatsCollector {
    pub fn new() -> ExecutionStatsCollector {
        ExecutionStatsCollector {
            start_time: Instant::now(),
            stats: ExecutionStatistics::default(),
        }
    }

    pub fn record_tick(&mut self) {
        self.stats.ticks_processed += 1;
    }

    pub fn record_births(&mut self, count: usize) {
        self.stats.births += count as u64;
    }

    pub fn record_removed(&mut self, count: usize) {
        self.stats.removed += count as u64;
    }

    pub fn record_mortality_flagged(&mut self, count: usize) {
        self.stats.mortality_flagged += count as u64;
    }

    pub fn record_strategies_applied(&mut self, count: usize) {
        self.stats.strategies_applied += count as u64;
    }

    /// A snapshot of the counters, with the wall time measured up to now.
    pub fn compute_final_statistics(&self, population: usize) -> ExecutionStatistics {
        ExecutionStatistics {
            final_population: population,
            wall_time: self.start_time.elapsed(),
            ..self.stats.clone()
        }
    }
}

/// Prints execution statistics to the console.
pub fn print_execution_statistics(summary: &ExecutionStatistics) {
    println!("━━━━ Execution Summary ━━━━");
    println!("{:<25}{}", "Ticks processed:", summary.ticks_processed);
    println!("{:<25}{}", "Births:", summary.births);
    println!("{:<25}{}", "Animals removed:", summary.removed);
    println!("{:<25}{}", "Mortality flags:", summary.mortality_flagged);
    println!("{:<25}{}", "Strategies applied:", summary.strategies_applied);
    println!("{:<25}{}", "Final population:", summary.final_population);
    println!("{:<25}{}", "Wall time:", format_duration(summary.wall_time));
}

/// Logs execution statistics with the logging system.
pub fn log_execution_statistics(stats: &ExecutionStatistics) {
    info!("Execution complete.");
    info!(
        "{} ticks, {} births, {} removed ({} by mortality selection), {} strategies applied",
        stats.ticks_processed,
        stats.births,
        stats.removed,
        stats.mortality_flagged,
        stats.strategies_applied
    );
    info!("Final population: {}", stats.final_population);
    info!("Wall time: {}", format_duration(stats.wall_time));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let mut collector = ExecutionStatsCollector::new();
        collector.record_tick();
        collector.record_tick();
        collector.record_births(4);
        collector.record_births(1);
        collector.record_removed(3);
        collector.record_mortality_flagged(2);
        collector.record_strategies_applied(1);

        let stats = collector.compute_final_statistics(42);
        assert_eq!(stats.ticks_processed, 2);
        assert_eq!(stats.births, 5);
        assert_eq!(stats.removed, 3);
        assert_eq!(stats.mortality_flagged, 2);
        assert_eq!(stats.strategies_applied, 1);
        assert_eq!(stats.final_population, 42);
    }

    #[test]
    fn statistics_serialize_to_json() {
        let stats = ExecutionStatsCollector::new().compute_final_statistics(0);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["ticks_processed"], 0);
        assert!(json.get("wall_time").is_some());
    }
}
