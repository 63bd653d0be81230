// Engine outcomes into the one result shape every caller sees

use super::strategy::RawOutcome;
use crate::domain::{
    engine::EngineStatus,
    models::SolveResult,
    value_objects::SolveStatus,
};

/// Unified status for an engine status; `None` for statuses that are failures
pub fn unified_status(status: EngineStatus) -> Option<SolveStatus> {
    match status {
        EngineStatus::Optimal => Some(SolveStatus::Optimal),
        EngineStatus::Feasible => Some(SolveStatus::Feasible),
        EngineStatus::Infeasible => Some(SolveStatus::Infeasible),
        EngineStatus::Unbounded => Some(SolveStatus::Unbounded),
        EngineStatus::Abnormal | EngineStatus::ModelInvalid | EngineStatus::NotSolved => None,
    }
}

/// Build the result record, solution fields present iff the status carries a solution
pub fn normalize(outcome: RawOutcome) -> SolveResult {
    let Some(status) = unified_status(outcome.status) else {
        return SolveResult::error(format!("Solver failed with status {}", outcome.status));
    };
    if !status.has_solution() {
        return SolveResult::without_solution(status);
    }

    match (outcome.objective_value, outcome.values) {
        (Some(objective), Some(values)) => SolveResult {
            gap: outcome.gap,
            routes: outcome.routes,
            ..SolveResult::with_solution(status, objective, values)
        },
        _ => SolveResult::error(format!(
            "Solver reported {} without a solution",
            outcome.status
        )),
    }
}
