//! Command implementations for isoctl CLI

pub mod levels;
pub mod reset;
pub mod scenario;

pub use levels::run_levels;
pub use reset::run_reset;
pub use scenario::{run_all, run_scenario};
