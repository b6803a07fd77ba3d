pub mod config;
pub mod random;
pub mod scenario;
pub mod task;

pub use random::{RandomSource, SequenceSource};
pub use task::{Activation, ActivationSpan, TaskKind};

pub use config::{ConfigError, SimConfig, TaskParameters};
pub use scenario::{ParameterOverride, SimConfigOverride, TestAction, TestAssertion, TestScenario};
