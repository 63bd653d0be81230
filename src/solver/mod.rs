// Solver adapters: concrete engines behind the domain's `Engine` trait

pub mod factory;
#[cfg(any(feature = "microlp", feature = "cbc"))]
pub mod good_lp_engine;
#[cfg(feature = "highs")]
pub mod highs_engine;
pub mod staged;

pub use factory::{BackendEngine, SolverFactory};
#[cfg(any(feature = "microlp", feature = "cbc"))]
pub use good_lp_engine::GoodLpEngine;
#[cfg(feature = "highs")]
pub use highs_engine::HighsEngine;
