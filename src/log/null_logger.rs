/*!

A "logger" used when the `logging` feature is disabled. It outputs nothing anywhere but satisfies
the public API, so level changes still gate the `log` macros.

*/

use crate::log::LogConfiguration;

impl LogConfiguration {
    /// Sets the global max level to conform to this `LogConfiguration`.
    pub(in crate::log) fn set_config(&mut self) {
        log::set_max_level(self.global_log_level);
    }
}
