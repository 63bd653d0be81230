// good_lp adapter: serves the pure-Rust microlp backend and, with the `cbc`
// feature, COIN-OR CBC. Translates a staged model into a good_lp problem.

use super::staged::StagedModel;
use crate::domain::{
    engine::{Engine, EngineSolver, EngineStatus, Result, SolveError, VarId},
    expression::LinearExpr,
    value_objects::{ConstraintSense, ObjectiveSense, SolverBackend, VariableKind},
};
use good_lp::{
    variable, variables, Expression, ResolutionError, Solution as GoodLpSolutionTrait,
    SolutionStatus as GoodLpStatus, SolverModel, Variable as GoodLpVariable,
};
use tracing::{debug, warn};

/// Engine handing out good_lp-backed solvers
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpEngine;

impl GoodLpEngine {
    pub fn new() -> Self {
        Self
    }

    /// Backends this build can serve, best first
    pub fn available_backends() -> Vec<SolverBackend> {
        let mut backends = Vec::new();
        if cfg!(feature = "cbc") {
            backends.push(SolverBackend::CoinCbc);
        }
        if cfg!(feature = "microlp") {
            backends.push(SolverBackend::MicroLp);
        }
        backends
    }
}

impl Engine for GoodLpEngine {
    fn create_solver(&self, backend: SolverBackend) -> Result<Box<dyn EngineSolver>> {
        let resolved = match backend {
            SolverBackend::Auto => Self::available_backends()
                .first()
                .copied()
                .ok_or_else(|| SolveError::EngineUnavailable("no good_lp backend compiled in".into()))?,
            other => other,
        };

        if !Self::available_backends().contains(&resolved) {
            return Err(SolveError::EngineUnavailable(format!(
                "{resolved} is not available through good_lp in this build"
            )));
        }

        debug!(backend = %resolved, "created good_lp solver");
        Ok(Box::new(GoodLpSolver::new(resolved)))
    }

    fn name(&self) -> &str {
        "good_lp"
    }
}

/// One good_lp solve: a staged model plus the values read back from the backend
pub struct GoodLpSolver {
    backend: SolverBackend,
    model: StagedModel,
    values: Vec<f64>,
    gap: Option<f64>,
}

impl GoodLpSolver {
    fn new(backend: SolverBackend) -> Self {
        Self {
            backend,
            model: StagedModel::default(),
            values: Vec::new(),
            gap: None,
        }
    }

    fn to_expression(expr: &LinearExpr<VarId>, lp_variables: &[GoodLpVariable]) -> Expression {
        let mut out: Expression = 0.into();
        for &(var, coeff) in expr.terms() {
            if coeff != 0.0 {
                out += coeff * lp_variables[var.index()];
            }
        }
        out
    }

    fn to_constraints(&self, lp_variables: &[GoodLpVariable]) -> Vec<good_lp::Constraint> {
        self.model
            .constraints
            .iter()
            .map(|row| {
                let lhs = Self::to_expression(&row.expr, lp_variables);
                match row.sense {
                    ConstraintSense::LessThanOrEqual => lhs.leq(row.rhs),
                    ConstraintSense::Equal => lhs.eq(row.rhs),
                    ConstraintSense::GreaterThanOrEqual => lhs.geq(row.rhs),
                }
            })
            .collect()
    }

    /// Classify a finished good_lp solve and keep its column values
    fn absorb<S: GoodLpSolutionTrait>(
        &mut self,
        outcome: std::result::Result<&S, &ResolutionError>,
        lp_variables: &[GoodLpVariable],
    ) -> EngineStatus {
        match outcome {
            Ok(sol) => {
                self.values = lp_variables.iter().map(|&var| sol.value(var)).collect();
                let status = match sol.status() {
                    GoodLpStatus::Optimal => EngineStatus::Optimal,
                    _ => EngineStatus::Feasible,
                };
                if status == EngineStatus::Feasible && !self.model.is_feasible(&self.values) {
                    self.values.clear();
                    return EngineStatus::NotSolved;
                }
                status
            }
            Err(ResolutionError::Infeasible) => EngineStatus::Infeasible,
            Err(ResolutionError::Unbounded) => EngineStatus::Unbounded,
            Err(e) => {
                warn!(backend = %self.backend, error = ?e, "good_lp solve failed");
                EngineStatus::Abnormal
            }
        }
    }

    #[cfg(feature = "microlp")]
    fn solve_microlp<P>(&mut self, problem: P, lp_variables: &[GoodLpVariable]) -> EngineStatus
    where
        P: SolverModel<Error = ResolutionError>,
    {
        let options = &self.model.options;
        if options.time_limit_ms.is_some()
            || options.threads.is_some()
            || options.random_seed.is_some()
            || options.gap_tolerance.is_some()
        {
            warn!(backend = %self.backend, "engine options are not supported by microlp; ignoring");
        }

        // microlp clamps open integer columns to the i32 range instead of
        // reporting unboundedness, so the relaxation decides
        if self.model.has_unbounded_integer_column() && self.relaxation_is_unbounded() {
            debug!(backend = %self.backend, "continuous relaxation is unbounded");
            return EngineStatus::Unbounded;
        }

        let constraints = self.to_constraints(lp_variables);
        let result = solve_with(problem, constraints);
        let status = self.absorb(result.as_ref(), lp_variables);

        // microlp only stops once branch and bound has closed the tree
        if status == EngineStatus::Optimal && self.model.is_integer() {
            self.gap = Some(0.0);
        }
        status
    }

    /// Solve the model with every column continuous and report whether microlp finds it unbounded
    #[cfg(feature = "microlp")]
    fn relaxation_is_unbounded(&self) -> bool {
        let mut vars = variables!();
        let columns: Vec<GoodLpVariable> = self
            .model
            .variables
            .iter()
            .map(|def| vars.add(variable().min(def.lower).max(def.upper)))
            .collect();

        let objective = Self::to_expression(&self.model.objective, &columns);
        let relaxed = match self.model.sense {
            ObjectiveSense::Maximize => vars.maximise(objective),
            ObjectiveSense::Minimize => vars.minimise(objective),
        };
        let result = solve_with(
            relaxed.using(good_lp::solvers::microlp::microlp),
            self.to_constraints(&columns),
        );
        matches!(result, Err(ResolutionError::Unbounded))
    }

    #[cfg(feature = "cbc")]
    fn solve_cbc(
        &mut self,
        mut problem: good_lp::solvers::coin_cbc::CoinCbcProblem,
        lp_variables: &[GoodLpVariable],
    ) -> EngineStatus {
        problem.set_parameter("log", "0");

        let options = self.model.options.clone();
        if let Some(secs) = options.time_limit_secs() {
            problem.set_parameter("seconds", &secs.to_string());
        }
        if let Some(threads) = options.threads {
            problem.set_parameter("threads", &threads.to_string());
        }
        if let Some(seed) = options.random_seed {
            problem.set_parameter("randomCbcSeed", &seed.to_string());
        }
        if let Some(gap) = options.gap_tolerance {
            problem.set_parameter("ratioGap", &gap.to_string());
        }

        let constraints = self.to_constraints(lp_variables);
        let result = solve_with(problem, constraints);
        let status = self.absorb(result.as_ref(), lp_variables);

        if status.has_solution() && self.model.is_integer() {
            if let Ok(sol) = &result {
                let raw = sol.model();
                let incumbent = raw.obj_value();
                let bound = raw.best_possible_value();
                self.gap = Some((incumbent - bound).abs() / incumbent.abs().max(1e-10));
            }
        }
        status
    }
}

fn solve_with<P>(
    mut problem: P,
    constraints: Vec<good_lp::Constraint>,
) -> std::result::Result<P::Solution, ResolutionError>
where
    P: SolverModel<Error = ResolutionError>,
{
    for constraint in constraints {
        problem.add_constraint(constraint);
    }
    problem.solve()
}

impl EngineSolver for GoodLpSolver {
    fn backend(&self) -> SolverBackend {
        self.backend
    }

    fn num_var(&mut self, lower: f64, upper: f64, name: &str) -> VarId {
        self.model
            .add_variable(name, VariableKind::Continuous, lower, upper)
    }

    fn int_var(&mut self, lower: f64, upper: f64, name: &str) -> VarId {
        self.model.add_variable(name, VariableKind::Integer, lower, upper)
    }

    fn bool_var(&mut self, name: &str) -> VarId {
        self.model.add_variable(name, VariableKind::Binary, 0.0, 1.0)
    }

    fn add_constraint(&mut self, expr: LinearExpr<VarId>, sense: ConstraintSense, rhs: f64) {
        self.model.add_constraint(expr, sense, rhs);
    }

    fn set_objective(&mut self, expr: LinearExpr<VarId>, sense: ObjectiveSense) {
        self.model.set_objective(expr, sense);
    }

    fn set_time_limit_ms(&mut self, millis: u64) {
        self.model.options.time_limit_ms = Some(millis);
    }

    fn set_threads(&mut self, threads: u32) {
        self.model.options.threads = Some(threads);
    }

    fn set_random_seed(&mut self, seed: u64) {
        self.model.options.random_seed = Some(seed);
    }

    fn set_gap_tolerance(&mut self, gap: f64) {
        self.model.options.gap_tolerance = Some(gap);
    }

    fn solve(&mut self) -> EngineStatus {
        self.values.clear();
        self.gap = None;

        // Build variables using good_lp
        let mut vars = variables!();
        let lp_variables: Vec<GoodLpVariable> = self
            .model
            .variables
            .iter()
            .map(|def| match def.kind {
                VariableKind::Binary => vars.add(variable().binary()),
                VariableKind::Integer => vars.add(variable().integer().min(def.lower).max(def.upper)),
                VariableKind::Continuous => vars.add(variable().min(def.lower).max(def.upper)),
            })
            .collect();

        let objective = Self::to_expression(&self.model.objective, &lp_variables);
        let unsolved = match self.model.sense {
            ObjectiveSense::Maximize => vars.maximise(objective),
            ObjectiveSense::Minimize => vars.minimise(objective),
        };

        debug!(
            backend = %self.backend,
            variables = self.model.variables.len(),
            constraints = self.model.constraints.len(),
            "solving with good_lp"
        );

        match self.backend {
            #[cfg(feature = "microlp")]
            SolverBackend::MicroLp => self.solve_microlp(
                unsolved.using(good_lp::solvers::microlp::microlp),
                &lp_variables,
            ),
            #[cfg(feature = "cbc")]
            SolverBackend::CoinCbc => self.solve_cbc(
                unsolved.using(good_lp::solvers::coin_cbc::coin_cbc),
                &lp_variables,
            ),
            other => {
                warn!(backend = %other, "backend not served by good_lp");
                EngineStatus::ModelInvalid
            }
        }
    }

    fn value(&self, var: VarId) -> f64 {
        self.values.get(var.index()).copied().unwrap_or(0.0)
    }

    fn objective_value(&self) -> f64 {
        self.model.objective_at(&self.values)
    }

    fn mip_gap(&self) -> Option<f64> {
        self.gap
    }
}
