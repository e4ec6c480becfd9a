pub use crate::animal::{Animal, AnimalId, Birth, Sex};
pub use crate::behavior::{StandardBehavior, WeekEnv, WeeklyBehavior};
pub use crate::cell::{CellId, CellList};
pub use crate::config::{load_config, ModelConfig};
pub use crate::error::ModelError;
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::mortality::MortalityTable;
pub use crate::notification::{Checkpoint, WeeklyUpdateEvent};
pub use crate::population::Population;
pub use crate::random::{RandomStreams, UniformIntExt};
pub use crate::simulation::{RunOutcome, RunState, Simulation};
pub use crate::strategy::{CellLevels, CullStrategy, FertilityStrategy, Strategy, StrategyTarget};
pub use crate::time::{Tick, WEEKS_PER_YEAR};
pub use crate::define_rng;
