// Application module: strategies, normalization and the dispatcher

pub mod constraint_programming;
pub mod dispatcher;
pub mod linear;
pub mod normalizer;
pub mod strategy;
pub mod vehicle_routing;

#[cfg(test)]
pub(crate) mod testing;

pub use constraint_programming::ConstraintProgramming;
pub use dispatcher::Dispatcher;
pub use linear::{LinearProgramming, MixedIntegerProgramming};
pub use normalizer::{normalize, unified_status};
pub use strategy::{PreparedProblem, RawOutcome, SolvingStrategy, Strategy};
pub use vehicle_routing::{RoutingPlan, VehicleRouting};
