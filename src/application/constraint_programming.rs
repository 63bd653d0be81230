// Constraint programming over finite integer domains.
// Each variable is a domain (a bounded integer range or a boolean); the
// declared linear constraints prune the domains and the engine's integer
// search enumerates what is left.

use super::linear::declare_variables;
use super::strategy::{
    add_rows_and_objective, apply_common_options, PreparedProblem, RawOutcome, SolvingStrategy,
};
use crate::domain::{
    engine::{Engine, Result, SolveError},
    models::{ModelDescription, SolveConfig},
    value_objects::VariableKind,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstraintProgramming;

impl ConstraintProgramming {
    fn check_domains(model: &ModelDescription) -> Result<()> {
        let offending: Vec<_> = model
            .variables
            .iter()
            .filter(|v| !v.has_finite_domain())
            .map(|v| format!("'{}'", v.name))
            .collect();

        if offending.is_empty() {
            Ok(())
        } else {
            Err(SolveError::InvalidModel(format!(
                "constraint programming needs integer variables with finite bounds or binaries; \
                 {} {} not",
                offending.join(", "),
                if offending.len() == 1 { "is" } else { "are" }
            )))
        }
    }
}

impl SolvingStrategy for ConstraintProgramming {
    fn build(
        &self,
        model: &ModelDescription,
        engine: &dyn Engine,
        config: &SolveConfig,
    ) -> Result<PreparedProblem> {
        Self::check_domains(model)?;
        let mut solver = engine.create_solver(config.backend)?;

        let (ordered, handles) = declare_variables(model, solver.as_mut(), |s, var| match var.kind {
            VariableKind::Binary => s.bool_var(&var.name),
            _ => s.int_var(var.lower(), var.upper(), &var.name),
        });
        add_rows_and_objective(model, solver.as_mut(), &handles)?;

        let domain_size: f64 = model
            .variables
            .iter()
            .map(|v| match v.kind {
                VariableKind::Binary => 2.0,
                _ => v.upper() - v.lower() + 1.0,
            })
            .product();
        debug!(
            backend = %solver.backend(),
            variables = ordered.len(),
            constraints = model.constraints.len(),
            search_space = domain_size,
            satisfaction = model.objective.expression.trim().is_empty(),
            "built constraint program"
        );
        Ok(PreparedProblem::new(solver, ordered))
    }

    fn solve(&self, mut prepared: PreparedProblem, config: &SolveConfig) -> Result<RawOutcome> {
        let solver = prepared.solver.as_mut();
        apply_common_options(solver, config);
        if let Some(millis) = config.time_limit_ms() {
            solver.set_time_limit_ms(millis);
        }
        Ok(prepared.run())
    }
}
