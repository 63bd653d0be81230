//! Vehicle routing as a mixed-integer program.
//!
//! The routing payload (`locations`, `vehicles`, `depot`, optional
//! `distanceMatrix`) is compiled into an ordinary model description:
//!
//! * `x_i_j` binary, 1 when a vehicle drives from location `i` to `j`;
//! * `u_i` continuous in `[1, n-1]`, the visiting order of customer `i`;
//! * every customer is entered and left exactly once;
//! * at most `vehicles` arcs leave the depot and as many return;
//! * Miller–Tucker–Zemlin rows `u_i + -1*u_j + (n-1)*x_i_j <= n-2` rule out
//!   tours that skip the depot;
//! * minimize the total distance driven.
//!
//! The compiled model is solved by the mixed-integer strategy and the routes
//! are read back from the arc values.

use super::linear::MixedIntegerProgramming;
use super::strategy::{PreparedProblem, RawOutcome, SolvingStrategy};
use crate::domain::{
    engine::{Engine, EngineStatus, Result, SolveError},
    models::{Constraint, ModelDescription, Objective, Route, SolveConfig, Variable},
    value_objects::{ConstraintSense, ProblemType},
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Arcs with a value above this are driven
const ARC_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VehicleRouting;

/// What the routing strategy needs after the engine has solved
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingPlan {
    pub depot: usize,
    pub vehicles: usize,
    pub distances: Vec<Vec<f64>>,
}

impl RoutingPlan {
    /// Validate the routing payload of `model` and settle its distances
    pub fn from_model(model: &ModelDescription) -> Result<Self> {
        let vehicles = model
            .vehicles
            .ok_or_else(|| invalid("vehicle routing requires 'vehicles'"))?;
        let depot = model
            .depot
            .ok_or_else(|| invalid("vehicle routing requires 'depot'"))?;
        if vehicles == 0 {
            return Err(invalid("vehicle routing requires at least one vehicle"));
        }

        let distances = match &model.distance_matrix {
            Some(matrix) => {
                if !model.locations.is_empty() && model.locations.len() != matrix.len() {
                    return Err(invalid(format!(
                        "distanceMatrix has {} rows but there are {} locations",
                        matrix.len(),
                        model.locations.len()
                    )));
                }
                check_matrix(matrix)?;
                matrix.clone()
            }
            None => model
                .locations
                .iter()
                .map(|from| model.locations.iter().map(|to| from.distance_to(to)).collect())
                .collect(),
        };

        if distances.is_empty() {
            return Err(invalid("vehicle routing requires at least one location"));
        }
        if depot >= distances.len() {
            return Err(invalid(format!(
                "depot {} is not one of the {} locations",
                depot,
                distances.len()
            )));
        }

        Ok(Self {
            depot,
            vehicles,
            distances,
        })
    }

    pub fn num_locations(&self) -> usize {
        self.distances.len()
    }

    pub fn customers(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.num_locations()).filter(move |&i| i != self.depot)
    }

    /// Routing model written in the textual expression grammar
    pub fn compile(&self) -> ModelDescription {
        let n = self.num_locations();
        let d = self.depot;
        let m = n.saturating_sub(1) as f64;

        let mut objective_terms = Vec::new();
        let mut model = ModelDescription::new(ProblemType::MixedIntegerProgramming, Objective::default())
            .with_name("vehicle_routing");

        for i in 0..n {
            for j in (0..n).filter(|&j| j != i) {
                model = model.add_variable(Variable::binary(arc_name(i, j)));
                objective_terms.push(format!("{}*{}", self.distances[i][j], arc_name(i, j)));
            }
        }
        for i in self.customers() {
            model = model.add_variable(
                Variable::continuous(order_name(i)).with_bounds(Some(1.0), Some(m)),
            );
        }

        for j in self.customers() {
            let entering = sum((0..n).filter(|&i| i != j).map(|i| arc_name(i, j)));
            model = model.add_constraint(
                Constraint::new(entering, ConstraintSense::Equal, 1.0).with_name(format!("enter_{j}")),
            );
        }
        for i in self.customers() {
            let leaving = sum((0..n).filter(|&j| j != i).map(|j| arc_name(i, j)));
            model = model.add_constraint(
                Constraint::new(leaving, ConstraintSense::Equal, 1.0).with_name(format!("leave_{i}")),
            );
        }

        let departures: Vec<String> = self.customers().map(|j| arc_name(d, j)).collect();
        let returns: Vec<String> = self.customers().map(|i| format!("-1*{}", arc_name(i, d))).collect();
        model = model
            .add_constraint(
                Constraint::new(
                    sum(departures.iter().cloned()),
                    ConstraintSense::LessThanOrEqual,
                    self.vehicles as f64,
                )
                .with_name("fleet_size"),
            )
            .add_constraint(
                Constraint::new(
                    sum(departures.into_iter().chain(returns)),
                    ConstraintSense::Equal,
                    0.0,
                )
                .with_name("depot_balance"),
            );

        for i in self.customers() {
            for j in self.customers().filter(|&j| j != i) {
                let expr = format!(
                    "{} + -1*{} + {}*{}",
                    order_name(i),
                    order_name(j),
                    m,
                    arc_name(i, j)
                );
                model = model.add_constraint(
                    Constraint::new(expr, ConstraintSense::LessThanOrEqual, m - 1.0)
                        .with_name(format!("order_{i}_{j}")),
                );
            }
        }

        model.objective = Objective::minimize(sum(objective_terms.into_iter()));
        model
    }

    /// Follow driven arcs out of the depot, one route per departing vehicle
    pub fn extract_routes(&self, values: &BTreeMap<String, f64>) -> Result<Vec<Route>> {
        let n = self.num_locations();
        let driven = |i: usize, j: usize| {
            values
                .get(&arc_name(i, j))
                .is_some_and(|&v| v > ARC_THRESHOLD)
        };

        let successor: HashMap<usize, usize> = self
            .customers()
            .filter_map(|i| (0..n).find(|&j| j != i && driven(i, j)).map(|j| (i, j)))
            .collect();

        let mut routes = Vec::new();
        let mut visited = 0;
        for first in self.customers().filter(|&j| driven(self.depot, j)) {
            let mut stops = vec![self.depot, first];
            let mut current = first;
            while current != self.depot {
                let next = *successor.get(&current).ok_or_else(|| {
                    SolveError::EngineFailure(format!("route stops at location {current}"))
                })?;
                stops.push(next);
                current = next;
                if stops.len() > n + 1 {
                    return Err(SolveError::EngineFailure(
                        "route does not return to the depot".into(),
                    ));
                }
            }
            visited += stops.len() - 2;
            let distance = stops
                .windows(2)
                .map(|leg| self.distances[leg[0]][leg[1]])
                .sum();
            routes.push(Route {
                vehicle: routes.len(),
                stops,
                distance,
            });
        }

        if visited != n - 1 {
            return Err(SolveError::EngineFailure(format!(
                "routes visit {} of {} customers",
                visited,
                n - 1
            )));
        }
        Ok(routes)
    }
}

fn invalid(message: impl Into<String>) -> SolveError {
    SolveError::InvalidModel(message.into())
}

fn check_matrix(matrix: &[Vec<f64>]) -> Result<()> {
    let n = matrix.len();
    for (i, row) in matrix.iter().enumerate() {
        if row.len() != n {
            return Err(invalid(format!(
                "distanceMatrix row {} has {} entries, expected {}",
                i,
                row.len(),
                n
            )));
        }
        if let Some(bad) = row.iter().find(|d| !d.is_finite() || **d < 0.0) {
            return Err(invalid(format!(
                "distanceMatrix row {i} contains invalid distance {bad}"
            )));
        }
    }
    Ok(())
}

fn arc_name(i: usize, j: usize) -> String {
    format!("x_{i}_{j}")
}

fn order_name(i: usize) -> String {
    format!("u_{i}")
}

fn sum(terms: impl Iterator<Item = String>) -> String {
    terms.collect::<Vec<_>>().join(" + ")
}

impl SolvingStrategy for VehicleRouting {
    fn build(
        &self,
        model: &ModelDescription,
        engine: &dyn Engine,
        config: &SolveConfig,
    ) -> Result<PreparedProblem> {
        let plan = RoutingPlan::from_model(model)?;
        if !model.variables.is_empty() || !model.constraints.is_empty() {
            warn!(
                variables = model.variables.len(),
                constraints = model.constraints.len(),
                "vehicle routing ignores declared variables and constraints"
            );
        }

        let compiled = plan.compile();
        debug!(
            locations = plan.num_locations(),
            vehicles = plan.vehicles,
            depot = plan.depot,
            variables = compiled.variables.len(),
            constraints = compiled.constraints.len(),
            "compiled routing model"
        );

        let mut prepared = MixedIntegerProgramming.build(&compiled, engine, config)?;
        prepared.routing = Some(plan);
        Ok(prepared)
    }

    fn solve(&self, mut prepared: PreparedProblem, config: &SolveConfig) -> Result<RawOutcome> {
        let plan = prepared
            .routing
            .take()
            .ok_or_else(|| invalid("routing problem was prepared without a routing plan"))?;

        // only the depot: nothing to drive
        if plan.num_locations() == 1 {
            return Ok(RawOutcome {
                status: EngineStatus::Optimal,
                objective_value: Some(0.0),
                values: Some(BTreeMap::new()),
                gap: Some(0.0),
                routes: Some(Vec::new()),
            });
        }

        let mut outcome = MixedIntegerProgramming.solve(prepared, config)?;
        if let Some(values) = &outcome.values {
            outcome.routes = Some(plan.extract_routes(values)?);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::normalizer::normalize;
    use crate::application::testing::{Call, ScriptedEngine};
    use crate::domain::models::Location;
    use crate::domain::parse_linear_expression;
    use crate::domain::value_objects::SolveStatus;

    fn square() -> ModelDescription {
        ModelDescription::routing(
            vec![
                Location::new(0.0, 0.0),
                Location::new(0.0, 3.0),
                Location::new(4.0, 3.0),
                Location::new(4.0, 0.0),
            ],
            2,
            0,
        )
    }

    #[test]
    fn euclidean_distances_by_default() {
        let plan = RoutingPlan::from_model(&square()).unwrap();
        assert_eq!(plan.distances[0][2], 5.0);
        assert_eq!(plan.distances[3][1], 5.0);
        assert_eq!(plan.customers().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn payload_is_validated() {
        let mut model = square();
        model.depot = Some(7);
        assert!(matches!(
            RoutingPlan::from_model(&model),
            Err(SolveError::InvalidModel(_))
        ));

        let mut model = square();
        model.vehicles = Some(0);
        assert!(RoutingPlan::from_model(&model).is_err());

        let model = square().with_distance_matrix(vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        assert!(RoutingPlan::from_model(&model).is_err());

        let mut model = ModelDescription::routing(Vec::new(), 1, 0)
            .with_distance_matrix(vec![vec![0.0, -1.0], vec![1.0, 0.0]]);
        assert!(RoutingPlan::from_model(&model).is_err());
        model.distance_matrix = Some(vec![vec![0.0, 2.0], vec![2.0, 0.0]]);
        assert_eq!(RoutingPlan::from_model(&model).unwrap().num_locations(), 2);
    }

    #[test]
    fn compiled_model_parses_against_its_own_variables() {
        let plan = RoutingPlan::from_model(&square()).unwrap();
        let compiled = plan.compile();
        // 12 arcs + 3 order variables
        assert_eq!(compiled.variables.len(), 15);
        // enter + leave per customer, fleet, balance, 6 ordering rows
        assert_eq!(compiled.constraints.len(), 3 + 3 + 2 + 6);
        assert!(compiled.validate().is_ok());

        let handles: HashMap<String, usize> = compiled
            .variables
            .iter()
            .enumerate()
            .map(|(i, v)| (v.name.clone(), i))
            .collect();
        for constraint in &compiled.constraints {
            parse_linear_expression(&constraint.expression, &handles).unwrap();
        }
        let objective = parse_linear_expression(&compiled.objective.expression, &handles).unwrap();
        assert_eq!(objective.coefficient(handles["x_0_2"]), Some(5.0));
    }

    #[test]
    fn routes_follow_driven_arcs() {
        let plan = RoutingPlan::from_model(&square()).unwrap();
        let values: BTreeMap<String, f64> = [("x_0_1", 1.0), ("x_1_2", 1.0), ("x_2_0", 1.0), ("x_0_3", 1.0), ("x_3_0", 1.0), ("x_1_3", 0.0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        let routes = plan.extract_routes(&values).unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].stops, vec![0, 1, 2, 0]);
        assert_eq!(routes[0].distance, 3.0 + 4.0 + 5.0);
        assert_eq!(routes[1].stops, vec![0, 3, 0]);
        assert_eq!(routes[1].vehicle, 1);
    }

    #[test]
    fn infeasible_routing_carries_no_routes() {
        let engine = ScriptedEngine::new(EngineStatus::Infeasible).with_gap(0.0);
        let config = SolveConfig::default().with_time_limit(2.0);
        let prepared = VehicleRouting.build(&square(), &engine, &config).unwrap();
        let outcome = VehicleRouting.solve(prepared, &config).unwrap();

        assert_eq!(outcome, RawOutcome::from_status(EngineStatus::Infeasible));
        assert!(engine.calls().contains(&Call::TimeLimit(2000)));

        let result = normalize(outcome);
        assert_eq!(result.status, SolveStatus::Infeasible);
        assert!(result.objective_value.is_none());
        assert!(result.variables.is_none());
        assert!(result.routes.is_none());
        assert!(result.gap.is_none());
    }

    #[test]
    fn incomplete_routes_are_engine_failures() {
        let plan = RoutingPlan::from_model(&square()).unwrap();
        let values: BTreeMap<String, f64> = [("x_0_1", 1.0), ("x_1_0", 1.0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert!(matches!(
            plan.extract_routes(&values),
            Err(SolveError::EngineFailure(_))
        ));
    }
}
