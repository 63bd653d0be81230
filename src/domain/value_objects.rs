// Domain value objects: the closed vocabularies a model description is written in

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of decision variable in the optimization problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableKind {
    /// Continuous real number (x ∈ ℝ)
    #[default]
    Continuous,
    /// Integer number (x ∈ ℤ)
    Integer,
    /// Binary variable (x ∈ {0, 1})
    Binary,
}

/// Comparison between a constraint's expression and its right-hand side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintSense {
    /// Equal (=)
    #[serde(rename = "EQ")]
    Equal,
    /// Less than or equal (≤)
    #[serde(rename = "LE")]
    LessThanOrEqual,
    /// Greater than or equal (≥)
    #[serde(rename = "GE")]
    GreaterThanOrEqual,
}

impl ConstraintSense {
    /// Whether `lhs` satisfies `lhs <sense> rhs` within `tolerance`.
    pub fn holds(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            ConstraintSense::Equal => (lhs - rhs).abs() <= tolerance,
            ConstraintSense::LessThanOrEqual => lhs <= rhs + tolerance,
            ConstraintSense::GreaterThanOrEqual => lhs >= rhs - tolerance,
        }
    }
}

/// Direction of optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectiveSense {
    /// Minimize the objective function
    #[default]
    Minimize,
    /// Maximize the objective function
    Maximize,
}

/// Problem family a model declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemType {
    LinearProgramming,
    MixedIntegerProgramming,
    ConstraintProgramming,
    VehicleRouting,
    /// Declared by the model schema; no solving strategy exists for it
    JobShopScheduling,
    /// Declared by the model schema; no solving strategy exists for it
    BinPacking,
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemType::LinearProgramming => write!(f, "LINEAR_PROGRAMMING"),
            ProblemType::MixedIntegerProgramming => write!(f, "MIXED_INTEGER_PROGRAMMING"),
            ProblemType::ConstraintProgramming => write!(f, "CONSTRAINT_PROGRAMMING"),
            ProblemType::VehicleRouting => write!(f, "VEHICLE_ROUTING"),
            ProblemType::JobShopScheduling => write!(f, "JOB_SHOP_SCHEDULING"),
            ProblemType::BinPacking => write!(f, "BIN_PACKING"),
        }
    }
}

/// Unified status of a solve, shared by every problem family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    /// Found optimal solution
    Optimal,
    /// Found feasible solution (may not be optimal)
    Feasible,
    /// Problem has no feasible solution
    Infeasible,
    /// Objective can be improved infinitely
    Unbounded,
    /// The solve failed; the result carries a message
    Error,
}

impl SolveStatus {
    /// Whether results with this status carry a solution.
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "OPTIMAL"),
            SolveStatus::Feasible => write!(f, "FEASIBLE"),
            SolveStatus::Infeasible => write!(f, "INFEASIBLE"),
            SolveStatus::Unbounded => write!(f, "UNBOUNDED"),
            SolveStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Solver backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverBackend {
    /// Automatically select best solver
    #[default]
    Auto,
    /// Pure-Rust microlp solver
    #[serde(rename = "MICROLP")]
    MicroLp,
    /// COIN-OR CBC solver
    CoinCbc,
    /// HiGHS solver
    Highs,
}

impl fmt::Display for SolverBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverBackend::Auto => write!(f, "Auto"),
            SolverBackend::MicroLp => write!(f, "microlp"),
            SolverBackend::CoinCbc => write!(f, "COIN-OR CBC"),
            SolverBackend::Highs => write!(f, "HiGHS"),
        }
    }
}

/// Verbosity requested by a solve configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Off,
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warning => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}
