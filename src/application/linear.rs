// Linear and mixed-integer strategies: the two families that map a model
// one-to-one onto engine columns and rows.

use super::strategy::{
    add_rows_and_objective, apply_common_options, PreparedProblem, RawOutcome, SolvingStrategy,
};
use crate::domain::{
    engine::{Engine, EngineSolver, Result, VarId},
    models::{ModelDescription, SolveConfig, Variable},
    value_objects::VariableKind,
};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Every variable continuous; no time limit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinearProgramming;

/// Variable types honoured; time limit and gap applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MixedIntegerProgramming;

/// Create one engine variable per declared variable, in model order
pub(crate) fn declare_variables<F>(
    model: &ModelDescription,
    solver: &mut dyn EngineSolver,
    mut create: F,
) -> (Vec<(String, VarId)>, HashMap<String, VarId>)
where
    F: FnMut(&mut dyn EngineSolver, &Variable) -> VarId,
{
    let mut ordered = Vec::with_capacity(model.variables.len());
    let mut handles = HashMap::with_capacity(model.variables.len());
    for var in &model.variables {
        let id = create(&mut *solver, var);
        ordered.push((var.name.clone(), id));
        handles.insert(var.name.clone(), id);
    }
    (ordered, handles)
}

fn bounds(solver: &dyn EngineSolver, var: &Variable) -> (f64, f64) {
    let inf = solver.infinity();
    (
        var.lower_bound.unwrap_or(-inf),
        var.upper_bound.unwrap_or(inf),
    )
}

impl SolvingStrategy for LinearProgramming {
    fn build(
        &self,
        model: &ModelDescription,
        engine: &dyn Engine,
        config: &SolveConfig,
    ) -> Result<PreparedProblem> {
        let mut solver = engine.create_solver(config.backend)?;

        let ignored = model
            .variables
            .iter()
            .filter(|v| v.kind != VariableKind::Continuous)
            .count();
        if ignored > 0 {
            warn!(
                count = ignored,
                "linear programs relax integer and binary variables to continuous"
            );
        }

        let (ordered, handles) = declare_variables(model, solver.as_mut(), |s, var| {
            let (lower, upper) = bounds(s, var);
            s.num_var(lower, upper, &var.name)
        });
        add_rows_and_objective(model, solver.as_mut(), &handles)?;

        debug!(
            backend = %solver.backend(),
            variables = ordered.len(),
            constraints = model.constraints.len(),
            "built linear program"
        );
        Ok(PreparedProblem::new(solver, ordered))
    }

    fn solve(&self, mut prepared: PreparedProblem, config: &SolveConfig) -> Result<RawOutcome> {
        apply_common_options(prepared.solver.as_mut(), config);
        Ok(prepared.run())
    }
}

impl SolvingStrategy for MixedIntegerProgramming {
    fn build(
        &self,
        model: &ModelDescription,
        engine: &dyn Engine,
        config: &SolveConfig,
    ) -> Result<PreparedProblem> {
        let mut solver = engine.create_solver(config.backend)?;

        let (ordered, handles) =
            declare_variables(model, solver.as_mut(), |s, var| match var.kind {
                VariableKind::Continuous => {
                    let (lower, upper) = bounds(s, var);
                    s.num_var(lower, upper, &var.name)
                }
                VariableKind::Integer => {
                    let (lower, upper) = bounds(s, var);
                    s.int_var(lower, upper, &var.name)
                }
                // binaries ignore declared bounds
                VariableKind::Binary => s.bool_var(&var.name),
            });
        add_rows_and_objective(model, solver.as_mut(), &handles)?;

        debug!(
            backend = %solver.backend(),
            variables = ordered.len(),
            integer_variables = model.num_integer_variables(),
            constraints = model.constraints.len(),
            "built mixed-integer program"
        );
        Ok(PreparedProblem::new(solver, ordered))
    }

    fn solve(&self, mut prepared: PreparedProblem, config: &SolveConfig) -> Result<RawOutcome> {
        let solver = prepared.solver.as_mut();
        apply_common_options(solver, config);
        if let Some(millis) = config.time_limit_ms() {
            solver.set_time_limit_ms(millis);
        }
        if let Some(gap) = config.gap_tolerance {
            solver.set_gap_tolerance(gap);
        }

        let mut outcome = prepared.run();
        if outcome.status.has_solution() {
            outcome.gap = prepared.solver.mip_gap();
        }
        Ok(outcome)
    }
}
