//! FILENAME: engine/src/solver.rs
//! PURPOSE: The seam between the table workspace and numeric computation.
//! CONTEXT: The workspace owns data and orchestration; the actual power
//! flow, optimization, and equivalencing algorithms live behind the
//! `Solver` trait. The default `NullSolver` accepts every request and
//! reports success, which keeps the data layer fully testable without a
//! numeric backend.

use crate::collection::TableCollection;
use crate::error::{EngineError, EngineResult};

/// Steady-state calculation switches, parsed from the compact flag string
/// accepted at the boundary. Each letter toggles one switch; letters may
/// appear in any order and combination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalcParams {
    /// `p`: start from a flat voltage profile.
    pub flat_start: bool,
    /// `z`: skip the starting-point algorithm.
    pub no_start_algorithm: bool,
    /// `c`: skip data control.
    pub no_data_control: bool,
    /// `r`: skip data preparation.
    pub no_data_prep: bool,
    /// `i`: initialize only, without iterating.
    pub initialize_only: bool,
}

impl CalcParams {
    /// Parses a flag string. Any character outside `p z c r i` fails with
    /// `InvalidArgument` before any calculation starts.
    pub fn parse(flags: &str) -> EngineResult<Self> {
        let mut params = CalcParams::default();
        for ch in flags.chars() {
            match ch {
                'p' => params.flat_start = true,
                'z' => params.no_start_algorithm = true,
                'c' => params.no_data_control = true,
                'r' => params.no_data_prep = true,
                'i' => params.initialize_only = true,
                other => {
                    return Err(EngineError::InvalidArgument(format!(
                        "Unknown calculation flag: '{}' (expected p, z, c, r, i)",
                        other
                    )))
                }
            }
        }
        Ok(params)
    }
}

/// Terminal state of a calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcOutcome {
    /// Converged normally.
    Ok,
    /// The model cannot be balanced.
    CannotBalance,
    /// Weighting reached its limit state.
    WeightingComplete,
}

/// Numeric backend interface. Every method receives the full table
/// collection; implementations read and write model tables directly.
/// Defaults succeed without touching anything.
pub trait Solver {
    /// Steady-state power flow.
    fn steady_state(
        &mut self,
        _tables: &mut TableCollection,
        _params: CalcParams,
    ) -> EngineResult<CalcOutcome> {
        Ok(CalcOutcome::Ok)
    }

    /// Optimal power flow.
    fn optimal_power_flow(
        &mut self,
        _tables: &mut TableCollection,
        _params: CalcParams,
    ) -> EngineResult<CalcOutcome> {
        Ok(CalcOutcome::Ok)
    }

    /// Reactive power optimization.
    fn reactive_optimization(
        &mut self,
        _tables: &mut TableCollection,
        _params: CalcParams,
    ) -> EngineResult<CalcOutcome> {
        Ok(CalcOutcome::Ok)
    }

    /// Network equivalencing.
    fn equivalence(
        &mut self,
        _tables: &mut TableCollection,
        _params: CalcParams,
    ) -> EngineResult<CalcOutcome> {
        Ok(CalcOutcome::Ok)
    }

    /// Model data control (consistency checks).
    fn data_control(
        &mut self,
        _tables: &mut TableCollection,
        _params: CalcParams,
    ) -> EngineResult<CalcOutcome> {
        Ok(CalcOutcome::Ok)
    }

    /// Rebuild the weighting control form from the controlled-values
    /// table.
    fn form_control(&mut self, _tables: &mut TableCollection) -> EngineResult<CalcOutcome> {
        Ok(CalcOutcome::Ok)
    }

    /// One step of regime weighting. `params.initialize_only` asks the
    /// backend to initialize the trajectory instead of stepping.
    fn weighting_step(
        &mut self,
        _tables: &mut TableCollection,
        _params: CalcParams,
    ) -> EngineResult<CalcOutcome> {
        Ok(CalcOutcome::Ok)
    }

    /// Regime weighting to the limit state.
    fn weighting(
        &mut self,
        _tables: &mut TableCollection,
        _params: CalcParams,
    ) -> EngineResult<CalcOutcome> {
        Ok(CalcOutcome::Ok)
    }

    /// Current limits for the selected branches at the given conductor
    /// temperature, degrees Celsius.
    fn current_limits(
        &mut self,
        _tables: &mut TableCollection,
        _temperature: f64,
        _selection: &str,
    ) -> EngineResult<CalcOutcome> {
        Ok(CalcOutcome::Ok)
    }
}

/// Backend that performs no computation. Used until a real solver is
/// attached, and throughout the data-layer tests.
#[derive(Default)]
pub struct NullSolver;

impl Solver for NullSolver {}
