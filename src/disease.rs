/// Remembers whether the disease has ever been seen in the population.
///
/// The flag only goes from `false` to `true`. A fresh [`crate::simulation::Simulation`] starts
/// with a fresh monitor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiseaseMonitor {
    present: bool,
}

impl DiseaseMonitor {
    pub fn new() -> DiseaseMonitor {
        DiseaseMonitor::default()
    }

    /// Called whenever an animal is reported as newly infected.
    pub fn record_infection(&mut self) {
        self.present = true;
    }

    /// True once any infection has been recorded.
    pub fn disease_present(&self) -> bool {
        self.present
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_is_sticky() {
        let mut monitor = DiseaseMonitor::new();
        assert!(!monitor.disease_present());
        monitor.record_infection();
        monitor.record_infection();
        assert!(monitor.disease_present());
    }
}
