//! Dispatcher: the single entry point that turns a model description and a
//! config into a [`SolveResult`].
//!
//! Every failure below this point (validation, parsing, engine errors and
//! panics) becomes an `ERROR` result here, and every result is stamped with
//! the wall-clock time of the whole call.

use super::normalizer::normalize;
use super::strategy::{RawOutcome, SolvingStrategy, Strategy};
use crate::domain::{
    engine::{Engine, Result, SolveError},
    models::{ConfigError, ModelDescription, SolveConfig, SolveResult},
};
use futures::future::join_all;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Routes models to the strategy registered for their problem type
#[derive(Clone)]
pub struct Dispatcher {
    engine: Arc<dyn Engine>,
}

impl Dispatcher {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    /// Solve `model` with `config`. Never fails: errors come back as `ERROR` results.
    pub fn solve(&self, model: &ModelDescription, config: &SolveConfig) -> SolveResult {
        self.timed(|| self.run(model, config))
    }

    /// Read and solve a model file; reading and parsing count towards `solveTime`
    pub fn solve_file(&self, path: impl AsRef<Path>, config: &SolveConfig) -> SolveResult {
        let path = path.as_ref();
        self.timed(|| {
            let model = ModelDescription::from_json_file(path)?;
            self.run(&model, config)
        })
    }

    /// Solve on a blocking worker so async callers are not stalled
    pub async fn solve_async(&self, model: ModelDescription, config: SolveConfig) -> SolveResult {
        let start = Instant::now();
        let dispatcher = self.clone();
        match tokio::task::spawn_blocking(move || dispatcher.solve(&model, &config)).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "solver worker lost");
                SolveResult::error(format!("Solver worker failed: {err}"))
                    .with_solve_time(start.elapsed().as_secs_f64())
            }
        }
    }

    /// Solve independent jobs concurrently; results come back in job order
    pub async fn solve_all<I>(&self, jobs: I) -> Vec<SolveResult>
    where
        I: IntoIterator<Item = (ModelDescription, SolveConfig)>,
    {
        join_all(
            jobs.into_iter()
                .map(|(model, config)| self.solve_async(model, config)),
        )
        .await
    }

    fn run(&self, model: &ModelDescription, config: &SolveConfig) -> Result<RawOutcome> {
        info!(
            event = "solve_start",
            model = %model.name,
            problem_type = %model.problem_type,
            variables = model.variables.len(),
            constraints = model.constraints.len(),
            backend = %config.backend,
            time_limit_secs = ?config.time_limit,
        );

        config.validate().map_err(invalid_config)?;
        model.validate()?;
        let strategy = Strategy::for_problem_type(model.problem_type)
            .ok_or(SolveError::UnsupportedProblemType(model.problem_type))?;

        let prepared = strategy.build(model, self.engine.as_ref(), config)?;
        strategy.solve(prepared, config)
    }

    fn timed<F>(&self, attempt: F) -> SolveResult
    where
        F: FnOnce() -> Result<RawOutcome>,
    {
        let start = Instant::now();
        let result = match panic::catch_unwind(AssertUnwindSafe(attempt)) {
            Ok(Ok(outcome)) => normalize(outcome),
            Ok(Err(err)) => {
                warn!(error = %err, "solve failed");
                SolveResult::error(err.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(panic = %message, "solver panicked");
                SolveResult::error(format!("Solver panicked: {message}"))
            }
        };

        let elapsed = start.elapsed();
        info!(
            event = "solve_end",
            status = %result.status,
            objective = ?result.objective_value,
            duration_ms = elapsed.as_millis(),
        );
        result.with_solve_time(elapsed.as_secs_f64())
    }
}

fn invalid_config(err: ConfigError) -> SolveError {
    match err {
        ConfigError::Invalid(message) => SolveError::InvalidConfig(message),
        other => SolveError::InvalidConfig(other.to_string()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{Call, ScriptedEngine};
    use crate::domain::{
        engine::EngineStatus,
        models::{Constraint, Objective, Variable},
        value_objects::{ConstraintSense, ProblemType, SolveStatus},
    };

    fn max_x(problem_type: ProblemType) -> ModelDescription {
        ModelDescription::new(problem_type, Objective::maximize("x"))
            .add_variable(Variable::continuous("x").with_lower_bound(0.0))
            .add_constraint(Constraint::new("x", ConstraintSense::LessThanOrEqual, 10.0))
    }

    fn dispatcher(engine: &ScriptedEngine) -> Dispatcher {
        Dispatcher::new(Arc::new(engine.clone()))
    }

    #[test]
    fn optimal_outcome_is_normalized_and_timed() {
        let engine = ScriptedEngine::new(EngineStatus::Optimal).with_values(vec![10.0]);
        let result = dispatcher(&engine).solve(
            &max_x(ProblemType::LinearProgramming),
            &SolveConfig::default(),
        );

        assert_eq!(result.status, SolveStatus::Optimal);
        assert_eq!(result.objective_value, Some(10.0));
        assert_eq!(result.variables.unwrap()["x"], 10.0);
        assert!(result.solve_time >= 0.0);
    }

    #[test]
    fn unsupported_types_never_reach_the_engine() {
        let engine = ScriptedEngine::new(EngineStatus::Optimal);
        for problem_type in [ProblemType::JobShopScheduling, ProblemType::BinPacking] {
            let result = dispatcher(&engine).solve(&max_x(problem_type), &SolveConfig::default());
            assert_eq!(result.status, SolveStatus::Error);
            assert_eq!(
                result.message.unwrap(),
                format!("Unsupported problem type: {problem_type}")
            );
        }
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn build_errors_become_error_results() {
        let engine = ScriptedEngine::new(EngineStatus::Optimal);
        let model = max_x(ProblemType::LinearProgramming)
            .add_constraint(Constraint::new("x + ghost", ConstraintSense::Equal, 1.0));
        let result = dispatcher(&engine).solve(&model, &SolveConfig::default());

        assert_eq!(result.status, SolveStatus::Error);
        assert_eq!(result.message.as_deref(), Some("Unknown variable 'ghost'"));
        assert!(result.variables.is_none());
        assert!(!engine.calls().contains(&Call::Solve));
    }

    #[test]
    fn invalid_config_and_model_are_rejected_up_front() {
        let engine = ScriptedEngine::new(EngineStatus::Optimal);
        let d = dispatcher(&engine);

        let result = d.solve(
            &max_x(ProblemType::MixedIntegerProgramming),
            &SolveConfig::default().with_time_limit(-1.0),
        );
        assert_eq!(result.status, SolveStatus::Error);
        assert!(result.message.unwrap().starts_with("Invalid configuration: timeLimit"));

        let model = max_x(ProblemType::LinearProgramming).add_variable(Variable::continuous("x"));
        let result = d.solve(&model, &SolveConfig::default());
        assert!(result.message.unwrap().contains("Duplicate variable 'x'"));
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn engine_unavailable_is_reported() {
        let engine = ScriptedEngine::unavailable();
        let result = dispatcher(&engine).solve(
            &max_x(ProblemType::LinearProgramming),
            &SolveConfig::default(),
        );
        assert_eq!(result.status, SolveStatus::Error);
        assert!(result.message.unwrap().starts_with("Solver not available"));
    }

    #[test]
    fn panics_are_caught() {
        let engine = ScriptedEngine::panicking();
        let result = dispatcher(&engine).solve(
            &max_x(ProblemType::LinearProgramming),
            &SolveConfig::default(),
        );
        assert_eq!(result.status, SolveStatus::Error);
        assert_eq!(
            result.message.as_deref(),
            Some("Solver panicked: scripted engine crashed")
        );
        assert!(result.solve_time >= 0.0);
    }

    #[test]
    fn engine_failure_statuses_become_errors() {
        let engine = ScriptedEngine::new(EngineStatus::Abnormal);
        let result = dispatcher(&engine).solve(
            &max_x(ProblemType::MixedIntegerProgramming),
            &SolveConfig::default(),
        );
        assert_eq!(result.status, SolveStatus::Error);
        assert_eq!(
            result.message.as_deref(),
            Some("Solver failed with status ABNORMAL")
        );
    }

    #[test]
    fn missing_model_file_is_an_error_result() {
        let engine = ScriptedEngine::new(EngineStatus::Optimal);
        let result = dispatcher(&engine)
            .solve_file("/definitely/not/here/model.json", &SolveConfig::default());
        assert_eq!(result.status, SolveStatus::Error);
        assert!(result.message.unwrap().starts_with("IO error"));
        assert!(result.solve_time >= 0.0);
    }

    #[tokio::test]
    async fn solve_all_keeps_job_order() {
        let engine = ScriptedEngine::new(EngineStatus::Infeasible);
        let jobs = vec![
            (max_x(ProblemType::LinearProgramming), SolveConfig::default()),
            (max_x(ProblemType::BinPacking), SolveConfig::default()),
            (max_x(ProblemType::MixedIntegerProgramming), SolveConfig::default()),
        ];

        let results = dispatcher(&engine).solve_all(jobs).await;
        let statuses: Vec<_> = results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![SolveStatus::Infeasible, SolveStatus::Error, SolveStatus::Infeasible]
        );
    }
}
