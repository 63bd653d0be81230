// Staged model: what a strategy declared, buffered until the backend builds its own problem.
// Both adapters need the objective before they create columns, so nothing reaches
// the backend until `solve`.

use crate::domain::{ConstraintSense, LinearExpr, ObjectiveSense, VarId, VariableKind};

/// Feasibility tolerance used when a backend result has to be checked by hand
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct StagedVariable {
    pub name: String,
    pub kind: VariableKind,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone)]
pub struct StagedConstraint {
    pub expr: LinearExpr<VarId>,
    pub sense: ConstraintSense,
    pub rhs: f64,
}

/// Options that only take effect when the backend supports them
#[derive(Debug, Clone, Default)]
pub struct StagedOptions {
    pub time_limit_ms: Option<u64>,
    pub threads: Option<u32>,
    pub random_seed: Option<u64>,
    pub gap_tolerance: Option<f64>,
}

impl StagedOptions {
    pub fn time_limit_secs(&self) -> Option<f64> {
        self.time_limit_ms.map(|ms| ms as f64 / 1000.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StagedModel {
    pub variables: Vec<StagedVariable>,
    pub constraints: Vec<StagedConstraint>,
    pub objective: LinearExpr<VarId>,
    pub sense: ObjectiveSense,
    pub options: StagedOptions,
}

impl StagedModel {
    pub fn add_variable(&mut self, name: &str, kind: VariableKind, lower: f64, upper: f64) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(StagedVariable {
            name: name.to_string(),
            kind,
            lower,
            upper,
        });
        id
    }

    pub fn add_constraint(&mut self, expr: LinearExpr<VarId>, sense: ConstraintSense, rhs: f64) {
        self.constraints.push(StagedConstraint { expr, sense, rhs });
    }

    pub fn set_objective(&mut self, expr: LinearExpr<VarId>, sense: ObjectiveSense) {
        self.objective = expr;
        self.sense = sense;
    }

    pub fn is_integer(&self) -> bool {
        self.variables
            .iter()
            .any(|v| !matches!(v.kind, VariableKind::Continuous))
    }

    /// Objective coefficient of every column, in column order
    pub fn objective_coefficients(&self) -> Vec<f64> {
        let mut coefficients = vec![0.0; self.variables.len()];
        for &(var, c) in self.objective.terms() {
            coefficients[var.index()] += c;
        }
        coefficients
    }

    /// Objective value of `values`; an empty objective is +0
    pub fn objective_at(&self, values: &[f64]) -> f64 {
        self.objective
            .evaluate(|var| values.get(var.index()).copied().unwrap_or(0.0))
            + 0.0
    }

    /// Integer columns left open on either side
    pub fn has_unbounded_integer_column(&self) -> bool {
        self.variables.iter().any(|v| {
            v.kind != VariableKind::Continuous && !(v.lower.is_finite() && v.upper.is_finite())
        })
    }

    /// Largest bound, row or integrality violation of `values`
    pub fn max_violation(&self, values: &[f64]) -> f64 {
        if values.len() != self.variables.len() {
            return f64::INFINITY;
        }

        let mut worst: f64 = 0.0;
        for (var, &value) in self.variables.iter().zip(values) {
            if !value.is_finite() {
                return f64::INFINITY;
            }
            worst = worst.max(var.lower - value).max(value - var.upper);
            if var.kind != VariableKind::Continuous {
                worst = worst.max((value - value.round()).abs());
            }
        }

        for row in &self.constraints {
            let lhs = row.expr.evaluate(|var| values[var.index()]);
            let violation = match row.sense {
                ConstraintSense::Equal => (lhs - row.rhs).abs(),
                ConstraintSense::LessThanOrEqual => lhs - row.rhs,
                ConstraintSense::GreaterThanOrEqual => row.rhs - lhs,
            };
            worst = worst.max(violation);
        }

        worst
    }

    pub fn is_feasible(&self, values: &[f64]) -> bool {
        self.max_violation(values) <= FEASIBILITY_TOLERANCE
    }
}
