// Engine capability: the contract a mathematical-programming backend must offer.
// Strategies only talk to these traits; concrete backends live in `crate::solver`.

use super::expression::{ExpressionError, LinearExpr};
use super::value_objects::{ConstraintSense, ObjectiveSense, ProblemType, SolverBackend};
use std::fmt;

/// Error types for solving a model
#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error("Unsupported problem type: {0}")]
    UnsupportedProblemType(ProblemType),

    #[error("Solver not available: {0}")]
    EngineUnavailable(String),

    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("Malformed term '{term}': {reason}")]
    MalformedTerm { term: String, reason: String },

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Solver execution failed: {0}")]
    EngineFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ExpressionError> for SolveError {
    fn from(err: ExpressionError) -> Self {
        match err {
            ExpressionError::UnknownVariable(name) => SolveError::UnknownVariable(name),
            ExpressionError::MalformedTerm { term, reason } => {
                SolveError::MalformedTerm { term, reason }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, SolveError>;

/// Handle to a variable created inside one engine solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Status constants reported by an engine after `solve`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Optimal,
    /// A solution was found but not proven optimal (e.g. time limit)
    Feasible,
    Infeasible,
    Unbounded,
    /// The engine stopped for a reason it could not recover from
    Abnormal,
    ModelInvalid,
    NotSolved,
}

impl EngineStatus {
    pub fn has_solution(self) -> bool {
        matches!(self, EngineStatus::Optimal | EngineStatus::Feasible)
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineStatus::Optimal => write!(f, "OPTIMAL"),
            EngineStatus::Feasible => write!(f, "FEASIBLE"),
            EngineStatus::Infeasible => write!(f, "INFEASIBLE"),
            EngineStatus::Unbounded => write!(f, "UNBOUNDED"),
            EngineStatus::Abnormal => write!(f, "ABNORMAL"),
            EngineStatus::ModelInvalid => write!(f, "MODEL_INVALID"),
            EngineStatus::NotSolved => write!(f, "NOT_SOLVED"),
        }
    }
}

/// One solver instance, exclusively owned by a single solve.
///
/// Variables, constraints and the objective are added first; `solve` is
/// called once; solution accessors are only meaningful when the returned
/// status carries a solution.
pub trait EngineSolver: Send {
    /// Backend actually serving this solver
    fn backend(&self) -> SolverBackend;

    fn infinity(&self) -> f64 {
        f64::INFINITY
    }

    fn num_var(&mut self, lower: f64, upper: f64, name: &str) -> VarId;

    fn int_var(&mut self, lower: f64, upper: f64, name: &str) -> VarId;

    fn bool_var(&mut self, name: &str) -> VarId;

    fn add_constraint(&mut self, expr: LinearExpr<VarId>, sense: ConstraintSense, rhs: f64);

    fn set_objective(&mut self, expr: LinearExpr<VarId>, sense: ObjectiveSense);

    fn set_time_limit_ms(&mut self, millis: u64);

    fn set_threads(&mut self, threads: u32);

    fn set_random_seed(&mut self, seed: u64);

    fn set_gap_tolerance(&mut self, gap: f64);

    fn solve(&mut self) -> EngineStatus;

    fn value(&self, var: VarId) -> f64;

    fn objective_value(&self) -> f64;

    /// Relative optimality gap of the last MIP solve, when the backend knows it
    fn mip_gap(&self) -> Option<f64>;
}

/// Factory for solver instances; shared across concurrent solves
pub trait Engine: Send + Sync {
    /// Create a fresh solver for `backend`, or `EngineUnavailable`
    fn create_solver(&self, backend: SolverBackend) -> Result<Box<dyn EngineSolver>>;

    fn name(&self) -> &str;
}
