use super::engine::{Result, SolveError};
use super::value_objects::{
    ConstraintSense, LogLevel, ObjectiveSense, ProblemType, SolveStatus, SolverBackend,
    VariableKind,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Decision variable in an optimization problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: VariableKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<f64>,
}

impl Variable {
    fn of_kind(name: impl Into<String>, kind: VariableKind) -> Self {
        Self {
            name: name.into(),
            kind,
            lower_bound: None,
            upper_bound: None,
            initial_value: None,
        }
    }

    pub fn continuous(name: impl Into<String>) -> Self {
        Self::of_kind(name, VariableKind::Continuous)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::of_kind(name, VariableKind::Integer)
    }

    pub fn binary(name: impl Into<String>) -> Self {
        Self::of_kind(name, VariableKind::Binary)
    }

    pub fn with_bounds(mut self, lower: Option<f64>, upper: Option<f64>) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    pub fn with_lower_bound(mut self, lower: f64) -> Self {
        self.lower_bound = Some(lower);
        self
    }

    pub fn with_upper_bound(mut self, upper: f64) -> Self {
        self.upper_bound = Some(upper);
        self
    }

    /// Lower bound, `-∞` when undeclared.
    pub fn lower(&self) -> f64 {
        self.lower_bound.unwrap_or(f64::NEG_INFINITY)
    }

    /// Upper bound, `+∞` when undeclared.
    pub fn upper(&self) -> f64 {
        self.upper_bound.unwrap_or(f64::INFINITY)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.kind, VariableKind::Integer | VariableKind::Binary)
    }

    /// Whether the variable ranges over a finite set of integers.
    pub fn has_finite_domain(&self) -> bool {
        match self.kind {
            VariableKind::Binary => true,
            VariableKind::Integer => self.lower().is_finite() && self.upper().is_finite(),
            VariableKind::Continuous => false,
        }
    }
}

/// Linear constraint `expression <sense> rhs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(default)]
    pub name: String,
    pub expression: String,
    #[serde(rename = "type")]
    pub sense: ConstraintSense,
    pub rhs: f64,
}

impl Constraint {
    pub fn new(expression: impl Into<String>, sense: ConstraintSense, rhs: f64) -> Self {
        Self {
            name: String::new(),
            expression: expression.into(),
            sense,
            rhs,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Objective function to minimize or maximize
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Objective {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sense: ObjectiveSense,
    #[serde(default)]
    pub expression: String,
}

impl Objective {
    pub fn minimize(expression: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            sense: ObjectiveSense::Minimize,
            expression: expression.into(),
        }
    }

    pub fn maximize(expression: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            sense: ObjectiveSense::Maximize,
            expression: expression.into(),
        }
    }
}

/// Point visited by a vehicle routing model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub x: f64,
    pub y: f64,
}

impl Location {
    pub fn new(x: f64, y: f64) -> Self {
        Self { name: None, x, y }
    }

    pub fn distance_to(&self, other: &Location) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Complete declarative model, as read from a model file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescription {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub problem_type: ProblemType,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub objective: Objective,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicles: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depot: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_matrix: Option<Vec<Vec<f64>>>,
}

impl ModelDescription {
    pub fn new(problem_type: ProblemType, objective: Objective) -> Self {
        Self {
            name: String::new(),
            problem_type,
            variables: Vec::new(),
            constraints: Vec::new(),
            objective,
            locations: Vec::new(),
            vehicles: None,
            depot: None,
            distance_matrix: None,
        }
    }

    /// Routing model over `locations`, starting and ending at `depot`.
    pub fn routing(locations: Vec<Location>, vehicles: usize, depot: usize) -> Self {
        let mut model = Self::new(ProblemType::VehicleRouting, Objective::default());
        model.locations = locations;
        model.vehicles = Some(vehicles);
        model.depot = Some(depot);
        model
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn add_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn add_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_distance_matrix(mut self, matrix: Vec<Vec<f64>>) -> Self {
        self.distance_matrix = Some(matrix);
        self
    }

    pub fn num_integer_variables(&self) -> usize {
        self.variables.iter().filter(|v| v.is_integer()).count()
    }

    /// Structural checks every strategy relies on: unique names and sane bounds.
    ///
    /// Expression references are checked later by the parser.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for var in &self.variables {
            if var.name.trim().is_empty() {
                errors.push("Variable names must not be empty".to_string());
            } else if !seen.insert(var.name.as_str()) {
                errors.push(format!("Duplicate variable '{}'", var.name));
            }

            if var.lower_bound.is_some_and(f64::is_nan) || var.upper_bound.is_some_and(f64::is_nan)
            {
                errors.push(format!("Variable '{}' has a NaN bound", var.name));
            } else if var.kind != VariableKind::Binary && var.lower() > var.upper() {
                errors.push(format!(
                    "Variable '{}' has lower bound ({}) > upper bound ({})",
                    var.name,
                    var.lower(),
                    var.upper()
                ));
            }
        }

        for (i, constraint) in self.constraints.iter().enumerate() {
            if !constraint.rhs.is_finite() {
                errors.push(format!(
                    "Constraint {} '{}' has a non-finite right-hand side",
                    i, constraint.name
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SolveError::InvalidModel(errors.join("; ")))
        }
    }
}

/// Caller-supplied solve settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveConfig {
    /// Time limit in seconds. `None` means no limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
    /// Relative MIP gap at which the engine may stop early.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap_tolerance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
    #[serde(default)]
    pub backend: SolverBackend,
}

impl SolveConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(s: &str) -> std::result::Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    pub fn with_threads(mut self, threads: u32) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_gap_tolerance(mut self, gap: f64) -> Self {
        self.gap_tolerance = Some(gap);
        self
    }

    pub fn with_backend(mut self, backend: SolverBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Time limit in the engine's native unit, rounded up to at least 1 ms.
    pub fn time_limit_ms(&self) -> Option<u64> {
        self.time_limit
            .map(|secs| (secs * 1000.0).ceil().max(1.0) as u64)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if let Some(limit) = self.time_limit {
            if !limit.is_finite() || limit <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "timeLimit must be a positive number of seconds, got {limit}"
                )));
            }
        }
        if self.threads == Some(0) {
            return Err(ConfigError::Invalid("threads must be at least 1".into()));
        }
        if let Some(gap) = self.gap_tolerance {
            if !gap.is_finite() || gap < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "gapTolerance must be a non-negative number, got {gap}"
                )));
            }
        }
        Ok(())
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// One vehicle's tour, starting and ending at the depot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub vehicle: usize,
    pub stops: Vec<usize>,
    pub distance: f64,
}

/// Unified result of a solve, whatever the problem family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResult {
    pub status: SolveStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<Vec<Route>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub solve_time: f64,
}

impl SolveResult {
    /// Result without a solution (INFEASIBLE, UNBOUNDED).
    pub fn without_solution(status: SolveStatus) -> Self {
        Self {
            status,
            objective_value: None,
            variables: None,
            gap: None,
            routes: None,
            message: None,
            solve_time: 0.0,
        }
    }

    pub fn with_solution(
        status: SolveStatus,
        objective_value: f64,
        variables: BTreeMap<String, f64>,
    ) -> Self {
        Self {
            objective_value: Some(objective_value),
            variables: Some(variables),
            ..Self::without_solution(status)
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::without_solution(SolveStatus::Error)
        }
    }

    pub fn with_solve_time(mut self, seconds: f64) -> Self {
        self.solve_time = seconds;
        self
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    pub fn is_feasible(&self) -> bool {
        self.status.has_solution()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCTION_PLANNING: &str = r#"{
        "name": "production_planning",
        "type": "LINEAR_PROGRAMMING",
        "variables": [
            {"name": "x1", "type": "CONTINUOUS", "lowerBound": 0},
            {"name": "x2", "type": "CONTINUOUS", "lowerBound": 0}
        ],
        "constraints": [
            {"name": "material", "expression": "2*x1 + x2", "type": "LE", "rhs": 100},
            {"name": "labor", "expression": "x1 + 3*x2", "type": "LE", "rhs": 90}
        ],
        "objective": {"name": "profit", "expression": "3*x1 + 2*x2", "sense": "MAXIMIZE"}
    }"#;

    #[test]
    fn parses_model_file() {
        let model = ModelDescription::from_json_str(PRODUCTION_PLANNING).unwrap();
        assert_eq!(model.problem_type, ProblemType::LinearProgramming);
        assert_eq!(model.variables.len(), 2);
        assert_eq!(model.variables[0].lower_bound, Some(0.0));
        assert_eq!(model.variables[0].upper(), f64::INFINITY);
        assert_eq!(model.constraints[1].sense, ConstraintSense::LessThanOrEqual);
        assert_eq!(model.objective.sense, ObjectiveSense::Maximize);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn routing_payload_and_defaults() {
        let model = ModelDescription::from_json_str(
            r#"{"type": "VEHICLE_ROUTING",
                "locations": [{"x": 0, "y": 0}, {"name": "a", "x": 3, "y": 4}],
                "vehicles": 1, "depot": 0}"#,
        )
        .unwrap();
        assert!(model.variables.is_empty());
        assert_eq!(model.objective, Objective::default());
        assert_eq!(model.locations[0].distance_to(&model.locations[1]), 5.0);
        assert_eq!(model.vehicles, Some(1));
    }

    #[test]
    fn unknown_problem_type_is_a_parse_error() {
        let err = ModelDescription::from_json_str(r#"{"type": "QUADRATIC"}"#).unwrap_err();
        assert!(matches!(err, SolveError::Json(_)));
    }

    #[test]
    fn validate_reports_every_problem() {
        let model = ModelDescription::new(ProblemType::LinearProgramming, Objective::default())
            .add_variable(Variable::continuous("x").with_bounds(Some(5.0), Some(1.0)))
            .add_variable(Variable::continuous("x"))
            .add_constraint(Constraint::new("x", ConstraintSense::Equal, f64::NAN));

        let SolveError::InvalidModel(message) = model.validate().unwrap_err() else {
            panic!("expected InvalidModel");
        };
        assert!(message.contains("lower bound (5) > upper bound (1)"));
        assert!(message.contains("Duplicate variable 'x'"));
        assert!(message.contains("non-finite right-hand side"));
    }

    #[test]
    fn binary_bounds_are_not_checked() {
        let model = ModelDescription::new(ProblemType::MixedIntegerProgramming, Objective::default())
            .add_variable(Variable::binary("b").with_bounds(Some(3.0), Some(-3.0)));
        assert!(model.validate().is_ok());
    }

    #[test]
    fn config_parsing_and_validation() {
        let config =
            SolveConfig::from_json_str(r#"{"timeLimit": 1.5, "logLevel": "ERROR", "backend": "HIGHS"}"#)
                .unwrap();
        assert_eq!(config.time_limit_ms(), Some(1500));
        assert_eq!(config.log_level, Some(LogLevel::Error));
        assert_eq!(config.backend, SolverBackend::Highs);

        assert!(SolveConfig::from_json_str("{}").unwrap() == SolveConfig::default());
        assert!(matches!(
            SolveConfig::from_json_str(r#"{"timeLimit": -1}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SolveConfig::from_json_str(r#"{"threads": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SolveConfig::from_json_str("not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn sub_millisecond_limits_round_up() {
        let config = SolveConfig::from_json_str(r#"{"timeLimit": 0.0004}"#).unwrap();
        assert_eq!(config.time_limit_ms(), Some(1));
        assert_eq!(SolveConfig::default().with_time_limit(0.0015).time_limit_ms(), Some(2));
        assert_eq!(SolveConfig::default().time_limit_ms(), None);
    }

    #[test]
    fn absent_fields_are_omitted() {
        let json = SolveResult::without_solution(SolveStatus::Infeasible)
            .with_solve_time(0.25)
            .to_json()
            .unwrap();
        assert_eq!(json, r#"{"status":"INFEASIBLE","solveTime":0.25}"#);

        let json = SolveResult::with_solution(
            SolveStatus::Optimal,
            10.0,
            BTreeMap::from([("x".to_string(), 10.0)]),
        )
        .to_json()
        .unwrap();
        assert_eq!(
            json,
            r#"{"status":"OPTIMAL","objectiveValue":10.0,"variables":{"x":10.0},"solveTime":0.0}"#
        );
    }
}
