pub mod engine;
pub mod generator;
pub mod machine;
pub mod pacer;

#[cfg(feature = "tui")]
pub mod tui;

pub mod scenario_runner;
pub mod trace;
pub mod window;

pub use engine::Simulator;
pub use generator::SeededSource;
pub use machine::{TaskMachine, Transition};
pub use trace::{SimulationReport, TaskUtilization};
pub use window::SimulationWindow;
