// Scripted engine for strategy and dispatcher tests: records every call and
// answers `solve` with a fixed status.

use crate::domain::{
    engine::{Engine, EngineSolver, EngineStatus, Result, SolveError, VarId},
    expression::LinearExpr,
    value_objects::{ConstraintSense, ObjectiveSense, SolverBackend},
};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    NumVar(String, f64, f64),
    IntVar(String, f64, f64),
    BoolVar(String),
    Constraint(Vec<(usize, f64)>, ConstraintSense, f64),
    Objective(Vec<(usize, f64)>, ObjectiveSense),
    TimeLimit(u64),
    Threads(u32),
    RandomSeed(u64),
    GapTolerance(f64),
    Solve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behaviour {
    Answer,
    Unavailable,
    Panic,
}

#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    status: EngineStatus,
    gap: Option<f64>,
    values: Vec<f64>,
    behaviour: Behaviour,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedEngine {
    pub fn new(status: EngineStatus) -> Self {
        Self {
            status,
            gap: None,
            values: Vec::new(),
            behaviour: Behaviour::Answer,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Refuses to create solvers
    pub fn unavailable() -> Self {
        Self {
            behaviour: Behaviour::Unavailable,
            ..Self::new(EngineStatus::NotSolved)
        }
    }

    /// Panics inside `solve`
    pub fn panicking() -> Self {
        Self {
            behaviour: Behaviour::Panic,
            ..Self::new(EngineStatus::NotSolved)
        }
    }

    pub fn with_gap(mut self, gap: f64) -> Self {
        self.gap = Some(gap);
        self
    }

    /// Variable values by creation order; missing ones read as 0
    pub fn with_values(mut self, values: Vec<f64>) -> Self {
        self.values = values;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Engine for ScriptedEngine {
    fn create_solver(&self, backend: SolverBackend) -> Result<Box<dyn EngineSolver>> {
        if self.behaviour == Behaviour::Unavailable {
            return Err(SolveError::EngineUnavailable(format!("{backend} is scripted away")));
        }
        Ok(Box::new(ScriptedSolver {
            engine: self.clone(),
            backend,
            num_vars: 0,
            objective: LinearExpr::new(),
        }))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct ScriptedSolver {
    engine: ScriptedEngine,
    backend: SolverBackend,
    num_vars: usize,
    objective: LinearExpr<VarId>,
}

impl ScriptedSolver {
    fn record(&self, call: Call) {
        if let Ok(mut calls) = self.engine.calls.lock() {
            calls.push(call);
        }
    }

    fn next_var(&mut self, call: Call) -> VarId {
        self.record(call);
        self.num_vars += 1;
        VarId(self.num_vars - 1)
    }
}

fn indexed(expr: &LinearExpr<VarId>) -> Vec<(usize, f64)> {
    expr.terms().iter().map(|(v, c)| (v.index(), *c)).collect()
}

impl EngineSolver for ScriptedSolver {
    fn backend(&self) -> SolverBackend {
        self.backend
    }

    fn num_var(&mut self, lower: f64, upper: f64, name: &str) -> VarId {
        self.next_var(Call::NumVar(name.into(), lower, upper))
    }

    fn int_var(&mut self, lower: f64, upper: f64, name: &str) -> VarId {
        self.next_var(Call::IntVar(name.into(), lower, upper))
    }

    fn bool_var(&mut self, name: &str) -> VarId {
        self.next_var(Call::BoolVar(name.into()))
    }

    fn add_constraint(&mut self, expr: LinearExpr<VarId>, sense: ConstraintSense, rhs: f64) {
        self.record(Call::Constraint(indexed(&expr), sense, rhs));
    }

    fn set_objective(&mut self, expr: LinearExpr<VarId>, sense: ObjectiveSense) {
        self.record(Call::Objective(indexed(&expr), sense));
        self.objective = expr;
    }

    fn set_time_limit_ms(&mut self, millis: u64) {
        self.record(Call::TimeLimit(millis));
    }

    fn set_threads(&mut self, threads: u32) {
        self.record(Call::Threads(threads));
    }

    fn set_random_seed(&mut self, seed: u64) {
        self.record(Call::RandomSeed(seed));
    }

    fn set_gap_tolerance(&mut self, gap: f64) {
        self.record(Call::GapTolerance(gap));
    }

    fn solve(&mut self) -> EngineStatus {
        self.record(Call::Solve);
        if self.engine.behaviour == Behaviour::Panic {
            panic!("scripted engine crashed");
        }
        self.engine.status
    }

    fn value(&self, var: VarId) -> f64 {
        self.engine.values.get(var.index()).copied().unwrap_or(0.0)
    }

    fn objective_value(&self) -> f64 {
        self.objective.evaluate(|v| self.value(*v))
    }

    fn mip_gap(&self) -> Option<f64> {
        self.engine.gap
    }
}
