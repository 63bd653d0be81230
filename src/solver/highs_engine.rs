// HiGHS adapter
// Translates a staged model into a HiGHS RowProblem (columns first, then rows)

use super::staged::StagedModel;
use crate::domain::{
    engine::{Engine, EngineSolver, EngineStatus, Result, SolveError, VarId},
    expression::LinearExpr,
    value_objects::{ConstraintSense, ObjectiveSense, SolverBackend, VariableKind},
};
use highs::{HighsModelStatus, RowProblem, Sense};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct HighsEngine;

impl HighsEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Engine for HighsEngine {
    fn create_solver(&self, backend: SolverBackend) -> Result<Box<dyn EngineSolver>> {
        match backend {
            SolverBackend::Auto | SolverBackend::Highs => Ok(Box::new(HighsSolver::new())),
            other => Err(SolveError::EngineUnavailable(format!(
                "{other} is not served by the HiGHS engine"
            ))),
        }
    }

    fn name(&self) -> &str {
        "HiGHS"
    }
}

pub struct HighsSolver {
    model: StagedModel,
    values: Vec<f64>,
    gap: Option<f64>,
}

impl HighsSolver {
    pub fn new() -> Self {
        Self {
            model: StagedModel::default(),
            values: Vec::new(),
            gap: None,
        }
    }

    fn build(&self) -> RowProblem {
        let mut pb = RowProblem::default();
        let objective = self.model.objective_coefficients();

        let cols: Vec<_> = self
            .model
            .variables
            .iter()
            .zip(objective)
            .map(|(var, obj_coeff)| match var.kind {
                VariableKind::Binary => pb.add_integer_column(obj_coeff, 0.0..=1.0),
                VariableKind::Integer => pb.add_integer_column(obj_coeff, var.lower..=var.upper),
                VariableKind::Continuous => pb.add_column(obj_coeff, var.lower..=var.upper),
            })
            .collect();

        for row in &self.model.constraints {
            let terms: Vec<_> = row
                .expr
                .terms()
                .iter()
                .filter(|(_, coeff)| *coeff != 0.0)
                .map(|&(var, coeff)| (cols[var.index()], coeff))
                .collect();

            match row.sense {
                ConstraintSense::LessThanOrEqual => pb.add_row(..=row.rhs, &terms),
                ConstraintSense::Equal => pb.add_row(row.rhs..=row.rhs, &terms),
                ConstraintSense::GreaterThanOrEqual => pb.add_row(row.rhs.., &terms),
            };
        }

        pb
    }
}

impl Default for HighsSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineSolver for HighsSolver {
    fn backend(&self) -> SolverBackend {
        SolverBackend::Highs
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

        let sense = match self.model.sense {
            ObjectiveSense::Maximize => Sense::Maximise,
            ObjectiveSense::Minimize => Sense::Minimise,
        };

        let mut highs_model = self.build().optimise(sense);
        highs_model.set_option("output_flag", false);

        let options = &self.model.options;
        if let Some(secs) = options.time_limit_secs() {
            highs_model.set_option("time_limit", secs);
        }
        if let Some(threads) = options.threads {
            highs_model.set_option("threads", threads as i32);
        }
        if let Some(seed) = options.random_seed {
            highs_model.set_option("random_seed", (seed % i32::MAX as u64) as i32);
        }
        if let Some(gap) = options.gap_tolerance {
            highs_model.set_option("mip_rel_gap", gap);
        }

        debug!(
            variables = self.model.variables.len(),
            constraints = self.model.constraints.len(),
            "solving with HiGHS"
        );

        let solved = match highs_model.try_solve() {
            Ok(solved) => solved,
            Err(status) => {
                warn!(?status, "HiGHS rejected the model");
                return EngineStatus::ModelInvalid;
            }
        };

        let status = engine_status(solved.status());

        if !status.has_solution() {
            return status;
        }

        let values = solved.get_solution().columns().to_vec();
        if status == EngineStatus::Feasible && !self.model.is_feasible(&values) {
            // limit reached before any incumbent was found
            return EngineStatus::NotSolved;
        }
        self.values = values;

        if self.model.is_integer() && status == EngineStatus::Optimal {
            self.gap = Some(0.0);
        }
        status
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

/// Only a definite HiGHS verdict maps onto a definite engine status
fn engine_status(status: HighsModelStatus) -> EngineStatus {
    match status {
        HighsModelStatus::Optimal | HighsModelStatus::ModelEmpty => EngineStatus::Optimal,
        HighsModelStatus::Infeasible => EngineStatus::Infeasible,
        HighsModelStatus::Unbounded => EngineStatus::Unbounded,
        HighsModelStatus::ReachedTimeLimit | HighsModelStatus::ReachedIterationLimit => {
            EngineStatus::Feasible
        }
        other => {
            warn!(status = ?other, "HiGHS stopped without a usable solution");
            EngineStatus::Abnormal
        }
    }
}
