// Domain layer: model description, expressions, engine capability
pub mod domain;

// Application layer: solving strategies, normalization and dispatch
pub mod application;

// Infrastructure layer: command line and logging
pub mod infrastructure;

// Solver adapters: concrete implementations of Engine
pub mod solver;

// Re-export commonly used types
pub use domain::{
    parse_linear_expression, Constraint, ConstraintSense, Engine, EngineSolver, EngineStatus,
    LinearExpr, Location, ModelDescription, Objective, ObjectiveSense, ProblemType, Route,
    SolveConfig, SolveError, SolveResult, SolveStatus, SolverBackend, Variable, VariableKind,
};

pub use application::{Dispatcher, Strategy};

pub use solver::{BackendEngine, SolverFactory};
