//! Solving strategies: one per problem family, all behind the same two-step
//! contract. `build` turns a model description into engine variables, rows
//! and an objective; `solve` runs the engine and reads back a raw outcome for
//! the normalizer.

use super::constraint_programming::ConstraintProgramming;
use super::linear::{LinearProgramming, MixedIntegerProgramming};
use super::vehicle_routing::{RoutingPlan, VehicleRouting};
use crate::domain::{
    engine::{Engine, EngineSolver, EngineStatus, Result, VarId},
    expression::parse_linear_expression,
    models::{ModelDescription, Route, SolveConfig},
    value_objects::ProblemType,
};
use std::collections::{BTreeMap, HashMap};

/// Contract every problem family implements
pub trait SolvingStrategy {
    fn build(
        &self,
        model: &ModelDescription,
        engine: &dyn Engine,
        config: &SolveConfig,
    ) -> Result<PreparedProblem>;

    fn solve(&self, prepared: PreparedProblem, config: &SolveConfig) -> Result<RawOutcome>;
}

/// A model loaded into its own engine solver, ready to run
pub struct PreparedProblem {
    pub(crate) solver: Box<dyn EngineSolver>,
    /// Declared variables in model order
    pub(crate) variables: Vec<(String, VarId)>,
    pub(crate) routing: Option<RoutingPlan>,
}

impl PreparedProblem {
    pub(crate) fn new(solver: Box<dyn EngineSolver>, variables: Vec<(String, VarId)>) -> Self {
        Self {
            solver,
            variables,
            routing: None,
        }
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Run the engine and read back whatever its status allows
    pub(crate) fn run(&mut self) -> RawOutcome {
        let status = self.solver.solve();
        if !status.has_solution() {
            return RawOutcome::from_status(status);
        }

        let values = self
            .variables
            .iter()
            .map(|(name, var)| (name.clone(), self.solver.value(*var)))
            .collect();

        RawOutcome {
            status,
            objective_value: Some(self.solver.objective_value()),
            values: Some(values),
            gap: None,
            routes: None,
        }
    }
}

/// Engine-level outcome of a strategy, before normalization
#[derive(Debug, Clone, PartialEq)]
pub struct RawOutcome {
    pub status: EngineStatus,
    pub objective_value: Option<f64>,
    pub values: Option<BTreeMap<String, f64>>,
    pub gap: Option<f64>,
    pub routes: Option<Vec<Route>>,
}

impl RawOutcome {
    pub fn from_status(status: EngineStatus) -> Self {
        Self {
            status,
            objective_value: None,
            values: None,
            gap: None,
            routes: None,
        }
    }
}

/// Closed set of strategies, selected by declared problem type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    LinearProgramming(LinearProgramming),
    MixedIntegerProgramming(MixedIntegerProgramming),
    ConstraintProgramming(ConstraintProgramming),
    VehicleRouting(VehicleRouting),
}

impl Strategy {
    /// Strategy registered for `problem_type`, if any
    pub fn for_problem_type(problem_type: ProblemType) -> Option<Self> {
        match problem_type {
            ProblemType::LinearProgramming => Some(Strategy::LinearProgramming(LinearProgramming)),
            ProblemType::MixedIntegerProgramming => {
                Some(Strategy::MixedIntegerProgramming(MixedIntegerProgramming))
            }
            ProblemType::ConstraintProgramming => {
                Some(Strategy::ConstraintProgramming(ConstraintProgramming))
            }
            ProblemType::VehicleRouting => Some(Strategy::VehicleRouting(VehicleRouting)),
            ProblemType::JobShopScheduling | ProblemType::BinPacking => None,
        }
    }

    pub fn problem_type(&self) -> ProblemType {
        match self {
            Strategy::LinearProgramming(_) => ProblemType::LinearProgramming,
            Strategy::MixedIntegerProgramming(_) => ProblemType::MixedIntegerProgramming,
            Strategy::ConstraintProgramming(_) => ProblemType::ConstraintProgramming,
            Strategy::VehicleRouting(_) => ProblemType::VehicleRouting,
        }
    }
}

impl SolvingStrategy for Strategy {
    fn build(
        &self,
        model: &ModelDescription,
        engine: &dyn Engine,
        config: &SolveConfig,
    ) -> Result<PreparedProblem> {
        match self {
            Strategy::LinearProgramming(s) => s.build(model, engine, config),
            Strategy::MixedIntegerProgramming(s) => s.build(model, engine, config),
            Strategy::ConstraintProgramming(s) => s.build(model, engine, config),
            Strategy::VehicleRouting(s) => s.build(model, engine, config),
        }
    }

    fn solve(&self, prepared: PreparedProblem, config: &SolveConfig) -> Result<RawOutcome> {
        match self {
            Strategy::LinearProgramming(s) => s.solve(prepared, config),
            Strategy::MixedIntegerProgramming(s) => s.solve(prepared, config),
            Strategy::ConstraintProgramming(s) => s.solve(prepared, config),
            Strategy::VehicleRouting(s) => s.solve(prepared, config),
        }
    }
}

/// Parse every constraint and the objective against `handles` and hand them to the engine
pub(crate) fn add_rows_and_objective(
    model: &ModelDescription,
    solver: &mut dyn EngineSolver,
    handles: &HashMap<String, VarId>,
) -> Result<()> {
    for constraint in &model.constraints {
        let expr = parse_linear_expression(&constraint.expression, handles)?;
        solver.add_constraint(expr, constraint.sense, constraint.rhs);
    }

    let objective = parse_linear_expression(&model.objective.expression, handles)?;
    solver.set_objective(objective, model.objective.sense);
    Ok(())
}

/// Options every family honours
pub(crate) fn apply_common_options(solver: &mut dyn EngineSolver, config: &SolveConfig) {
    if let Some(threads) = config.threads {
        solver.set_threads(threads);
    }
    if let Some(seed) = config.random_seed {
        solver.set_random_seed(seed);
    }
}
