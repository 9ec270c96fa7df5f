//! Runtime backends - the calloop headless runtime and the simulated
//! engines it drives.

pub mod headless;
pub mod simulated;

pub use headless::{run, RuntimeOptions};
pub use simulated::SimulatedGazeMode;
