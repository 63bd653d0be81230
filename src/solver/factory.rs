use crate::domain::{
    engine::{Engine, EngineSolver, Result, SolveError},
    value_objects::SolverBackend,
};
use std::sync::Arc;
use tracing::debug;

#[cfg(any(feature = "microlp", feature = "cbc"))]
use crate::solver::GoodLpEngine;
#[cfg(feature = "highs")]
use crate::solver::HighsEngine;

/// Engine that routes each backend name to the adapter compiled in for it
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendEngine;

impl BackendEngine {
    pub fn new() -> Self {
        Self
    }

    /// Backend `Auto` stands for: HiGHS, then CBC, then microlp
    pub fn resolve(backend: SolverBackend) -> Option<SolverBackend> {
        match backend {
            SolverBackend::Auto => Self::available_backends().first().copied(),
            other => Some(other),
        }
    }

    /// Backends compiled into this build, best first
    pub fn available_backends() -> Vec<SolverBackend> {
        let mut backends = Vec::new();
        if cfg!(feature = "highs") {
            backends.push(SolverBackend::Highs);
        }
        if cfg!(feature = "cbc") {
            backends.push(SolverBackend::CoinCbc);
        }
        if cfg!(feature = "microlp") {
            backends.push(SolverBackend::MicroLp);
        }
        backends
    }
}

impl Engine for BackendEngine {
    fn create_solver(&self, backend: SolverBackend) -> Result<Box<dyn EngineSolver>> {
        let resolved = Self::resolve(backend)
            .ok_or_else(|| SolveError::EngineUnavailable("no solver backend compiled in".into()))?;
        debug!(requested = %backend, resolved = %resolved, "selecting solver backend");

        match resolved {
            #[cfg(feature = "highs")]
            SolverBackend::Highs => HighsEngine::new().create_solver(resolved),
            #[cfg(any(feature = "microlp", feature = "cbc"))]
            SolverBackend::MicroLp | SolverBackend::CoinCbc => {
                GoodLpEngine::new().create_solver(resolved)
            }
            other => Err(SolveError::EngineUnavailable(format!(
                "{other} support is not compiled into this build"
            ))),
        }
    }

    fn name(&self) -> &str {
        "letsopt"
    }
}

/// Factory for the engine handed to a dispatcher
pub struct SolverFactory;

impl SolverFactory {
    /// Engine serving every backend compiled into this build
    pub fn default_engine() -> Arc<dyn Engine> {
        Arc::new(BackendEngine::new())
    }
}
