//! FILENAME: engine/src/workspace.rs
//! PURPOSE: The top-level facade: tables, events, checkpointing, and
//! calculation entry points.
//! CONTEXT: A workspace is the in-memory dataset, analogous to an open
//! document. It owns the table collection, the shared event hub, the
//! commit/rollback journal, and a pluggable numeric backend. Every
//! calculation entry point validates its flag string locally before the
//! solver is touched.

use std::rc::Rc;

use crate::collection::TableCollection;
use crate::column::PropertyValue;
use crate::error::{EngineError, EngineResult};
use crate::events::{EventHub, EventListener, EventLock, LogListener, LogSeverity};
use crate::solver::{CalcOutcome, CalcParams, NullSolver, Solver};
use crate::table::Table;
use crate::value::{CellValue, ColumnKind, ValueKind};

/// Name of the controlled-values table maintained for weighting.
pub const CONTROL_TABLE: &str = "control_values";

/// Weighting settings addressed by code, mirroring the four parameter
/// slots of the weighting procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightingParam {
    /// Recalculate the control form before each step.
    FormControl,
    /// Add increment values instead of replacing them.
    AddValues,
    /// Trajectory kind.
    Kind,
    /// Procedure status word.
    Status,
}

/// The four weighting settings with their engine defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightingSettings {
    pub form_control: bool,
    pub add_values: bool,
    pub kind: i64,
    pub status: i64,
}

impl Default for WeightingSettings {
    fn default() -> Self {
        WeightingSettings {
            form_control: true,
            add_values: false,
            kind: 0,
            status: 0,
        }
    }
}

impl WeightingSettings {
    pub fn get(&self, param: WeightingParam) -> PropertyValue {
        match param {
            WeightingParam::FormControl => PropertyValue::Bool(self.form_control),
            WeightingParam::AddValues => PropertyValue::Bool(self.add_values),
            WeightingParam::Kind => PropertyValue::Int(self.kind),
            WeightingParam::Status => PropertyValue::Int(self.status),
        }
    }

    pub fn set(&mut self, param: WeightingParam, value: PropertyValue) -> EngineResult<()> {
        match (param, value) {
            (WeightingParam::FormControl, PropertyValue::Bool(b)) => self.form_control = b,
            (WeightingParam::AddValues, PropertyValue::Bool(b)) => self.add_values = b,
            (WeightingParam::Kind, PropertyValue::Int(i)) => self.kind = i,
            (WeightingParam::Status, PropertyValue::Int(i)) => self.status = i,
            (param, value) => {
                return Err(EngineError::InvalidArgument(format!(
                    "Weighting parameter {:?} does not accept {:?}",
                    param, value
                )))
            }
        }
        Ok(())
    }
}

/// The in-memory dataset and its orchestration surface.
pub struct Workspace {
    pub tables: TableCollection,
    events: EventHub,
    journal: crate::journal::Journal,
    solver: Box<dyn Solver>,
    weighting: WeightingSettings,
    /// Forward engine log events to registered listeners.
    pub log_enabled: bool,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    /// An empty workspace with the default logging listener and no-op
    /// solver attached.
    pub fn new() -> Self {
        let events = EventHub::new();
        events.add_listener(Rc::new(LogListener));
        Workspace {
            tables: TableCollection::with_events(events.clone()),
            events,
            journal: crate::journal::Journal::new(),
            solver: Box::new(NullSolver),
            weighting: WeightingSettings::default(),
            log_enabled: true,
        }
    }

    /// Replaces the numeric backend.
    pub fn set_solver(&mut self, solver: Box<dyn Solver>) {
        self.solver = solver;
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn add_listener(&self, listener: Rc<dyn EventListener>) {
        self.events.add_listener(listener);
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Suppresses the data-changed stream for the guard's lifetime.
    /// Dropping the guard restores the previous state and flushes one
    /// whole-table notification per table touched while locked.
    pub fn lock_events(&self) -> EventLock {
        self.events.lock()
    }

    /// Emits a protocol message through the event hub.
    pub fn print_protocol(&self, message: &str) {
        self.events.protocol(message);
        if self.log_enabled {
            self.events.log(LogSeverity::Message, message);
        }
    }

    // ------------------------------------------------------------------
    // Change tracking
    // ------------------------------------------------------------------

    /// Accepts all changes since the last checkpoint.
    pub fn commit(&mut self) {
        self.journal.commit(&self.tables);
        self.events.history_changed("commit");
    }

    /// Discards changes back to the last checkpoint. Without a prior
    /// commit this is a no-op and reports false.
    pub fn rollback(&mut self) -> bool {
        match self.journal.rollback() {
            Some(tables) => {
                self.tables = tables;
                self.events.undo("rollback", 1);
                self.events.history_changed("rollback");
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Calculation entry points
    // ------------------------------------------------------------------

    /// Steady-state power flow.
    pub fn steady_state(&mut self, flags: &str) -> EngineResult<CalcOutcome> {
        let params = CalcParams::parse(flags)?;
        self.events.command("steady_state", flags, "");
        self.solver.steady_state(&mut self.tables, params)
    }

    /// Optimal power flow.
    pub fn optimal_power_flow(&mut self, flags: &str) -> EngineResult<CalcOutcome> {
        let params = CalcParams::parse(flags)?;
        self.events.command("optimal_power_flow", flags, "");
        self.solver.optimal_power_flow(&mut self.tables, params)
    }

    /// Reactive power optimization.
    pub fn reactive_optimization(&mut self, flags: &str) -> EngineResult<CalcOutcome> {
        let params = CalcParams::parse(flags)?;
        self.events.command("reactive_optimization", flags, "");
        self.solver.reactive_optimization(&mut self.tables, params)
    }

    /// Network equivalencing.
    pub fn equivalence(&mut self, flags: &str) -> EngineResult<CalcOutcome> {
        let params = CalcParams::parse(flags)?;
        self.events.command("equivalence", flags, "");
        self.solver.equivalence(&mut self.tables, params)
    }

    /// Model data control.
    pub fn data_control(&mut self, flags: &str) -> EngineResult<CalcOutcome> {
        let params = CalcParams::parse(flags)?;
        self.events.command("data_control", flags, "");
        self.solver.data_control(&mut self.tables, params)
    }

    /// One weighting step. The `i` flag asks the backend to initialize
    /// the trajectory instead of stepping.
    pub fn weighting_step(&mut self, flags: &str) -> EngineResult<CalcOutcome> {
        let params = CalcParams::parse(flags)?;
        self.events.command("weighting_step", flags, "");
        self.solver.weighting_step(&mut self.tables, params)
    }

    /// Weighting to the limit state.
    pub fn weighting(&mut self, flags: &str) -> EngineResult<CalcOutcome> {
        let params = CalcParams::parse(flags)?;
        self.events.command("weighting", flags, "");
        self.solver.weighting(&mut self.tables, params)
    }

    /// Permissible-current calculation for the branches matched by
    /// `selection`, at `temperature` degrees Celsius.
    pub fn current_limits(&mut self, temperature: f64, selection: &str) -> EngineResult<CalcOutcome> {
        if !temperature.is_finite() {
            return Err(EngineError::InvalidArgument(format!(
                "Conductor temperature must be finite, got {}",
                temperature
            )));
        }
        self.events.command("current_limits", &temperature.to_string(), selection);
        self.solver.current_limits(&mut self.tables, temperature, selection)
    }

    // ------------------------------------------------------------------
    // Weighting support
    // ------------------------------------------------------------------

    /// Rebuilds the control form from the controlled-values table.
    pub fn form_control(&mut self) -> EngineResult<CalcOutcome> {
        self.events.command("form_control", "", "");
        self.solver.form_control(&mut self.tables)
    }

    pub fn weighting_param(&self, param: WeightingParam) -> PropertyValue {
        self.weighting.get(param)
    }

    pub fn set_weighting_param(
        &mut self,
        param: WeightingParam,
        value: PropertyValue,
    ) -> EngineResult<()> {
        self.weighting.set(param, value)
    }

    /// Empties the controlled-values table, creating it if absent.
    pub fn clear_control(&mut self) -> EngineResult<()> {
        let table = self.control_table_mut()?;
        table.clear_selection();
        table.delete_rows()?;
        Ok(())
    }

    /// Registers a controlled value: the cell at `row` of column `name`
    /// in `table`, recorded by its re-identifying predicate so it
    /// survives row reordering. Only numeric cells can be controlled.
    pub fn add_control(&mut self, table: &str, name: &str, row: usize) -> EngineResult<()> {
        let (predicate, value) = {
            let source = self.tables.get(table)?;
            let predicate = source.row_predicate(row)?;
            let cell = source.get(row, name, ValueKind::NotScaled)?;
            let value = cell.as_f64().ok_or_else(|| {
                EngineError::InvalidArgument(format!(
                    "Controlled value {}.{} must be numeric, got '{}'",
                    table,
                    name,
                    cell.display()
                ))
            })?;
            (predicate, value)
        };
        let control = self.control_table_mut()?;
        let id = control.add_row();
        control.set(
            id,
            "name",
            CellValue::Str(format!("{}.{}", table, name)),
            ValueKind::NotScaled,
        )?;
        control.set(id, "row_key", CellValue::Str(predicate), ValueKind::NotScaled)?;
        control.set(id, "value", CellValue::Real(value), ValueKind::NotScaled)?;
        Ok(())
    }

    fn control_table_mut(&mut self) -> EngineResult<&mut Table> {
        if !self.tables.contains(CONTROL_TABLE) {
            let table = self.tables.add(CONTROL_TABLE)?;
            table.add_column("name", ColumnKind::Str)?;
            table.add_column("row_key", ColumnKind::Str)?;
            table.add_column("value", ColumnKind::Real)?;
        }
        self.tables.get_mut(CONTROL_TABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChangeScope;
    use std::cell::RefCell;

    fn workspace_with_node_table() -> Workspace {
        let mut ws = Workspace::new();
        let t = ws.tables.add("node").unwrap();
        t.add_column("ny", ColumnKind::Int).unwrap();
        t.add_column("pn", ColumnKind::Real).unwrap();
        t.set_keys(vec!["ny".to_string()]);
        for i in 0..3 {
            let row = t.add_row();
            t.set(row, "ny", CellValue::Int(i + 1), ValueKind::NotScaled).unwrap();
            t.set(row, "pn", CellValue::Real(10.0 * (i as f64 + 1.0)), ValueKind::NotScaled)
                .unwrap();
        }
        ws
    }

    #[test]
    fn flag_alphabet_is_enforced_before_the_solver() {
        let mut ws = workspace_with_node_table();
        assert!(matches!(
            ws.steady_state("px"),
            Err(EngineError::InvalidArgument(_))
        ));
        assert_eq!(ws.steady_state("pzc").unwrap(), CalcOutcome::Ok);
    }

    #[test]
    fn every_entry_point_validates_its_flag_string() {
        let mut ws = workspace_with_node_table();
        assert!(matches!(
            ws.optimal_power_flow("x"),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            ws.reactive_optimization("q"),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(ws.equivalence("e"), Err(EngineError::InvalidArgument(_))));
        assert!(matches!(ws.data_control("d"), Err(EngineError::InvalidArgument(_))));
        assert!(matches!(ws.weighting("w"), Err(EngineError::InvalidArgument(_))));
        assert!(matches!(ws.weighting_step("s"), Err(EngineError::InvalidArgument(_))));

        assert_eq!(ws.optimal_power_flow("pz").unwrap(), CalcOutcome::Ok);
        assert_eq!(ws.reactive_optimization("").unwrap(), CalcOutcome::Ok);
        assert_eq!(ws.equivalence("c").unwrap(), CalcOutcome::Ok);
        assert_eq!(ws.data_control("r").unwrap(), CalcOutcome::Ok);
        assert_eq!(ws.weighting("cr").unwrap(), CalcOutcome::Ok);
    }

    #[test]
    fn weighting_step_forwards_the_initialize_flag() {
        struct Recording {
            seen: Rc<RefCell<Vec<CalcParams>>>,
        }
        impl Solver for Recording {
            fn weighting_step(
                &mut self,
                _tables: &mut TableCollection,
                params: CalcParams,
            ) -> EngineResult<CalcOutcome> {
                self.seen.borrow_mut().push(params);
                Ok(CalcOutcome::Ok)
            }
        }

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut ws = workspace_with_node_table();
        ws.set_solver(Box::new(Recording { seen: seen.clone() }));

        ws.weighting_step("i").unwrap();
        ws.weighting_step("").unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].initialize_only);
        assert!(!seen[1].initialize_only);
    }

    #[test]
    fn solver_outcome_passes_through() {
        struct Unbalanced;
        impl Solver for Unbalanced {
            fn steady_state(
                &mut self,
                _tables: &mut TableCollection,
                _params: CalcParams,
            ) -> EngineResult<CalcOutcome> {
                Ok(CalcOutcome::CannotBalance)
            }
        }

        let mut ws = workspace_with_node_table();
        ws.set_solver(Box::new(Unbalanced));
        assert_eq!(ws.steady_state("").unwrap(), CalcOutcome::CannotBalance);
    }

    #[test]
    fn commit_then_rollback_restores_tables() {
        let mut ws = workspace_with_node_table();
        ws.commit();

        let t = ws.tables.get_mut("node").unwrap();
        t.add_row();
        t.add_row();
        assert_eq!(ws.tables.get("node").unwrap().full_size(), 5);

        assert!(ws.rollback());
        assert_eq!(ws.tables.get("node").unwrap().full_size(), 3);
    }

    #[test]
    fn rollback_reports_an_undo_event() {
        struct Recorder {
            undos: RefCell<Vec<(String, i64)>>,
        }
        impl EventListener for Recorder {
            fn on_undo(&self, kind: &str, level: i64) {
                self.undos.borrow_mut().push((kind.to_string(), level));
            }
        }

        let mut ws = workspace_with_node_table();
        let rec = Rc::new(Recorder {
            undos: RefCell::new(Vec::new()),
        });
        ws.add_listener(rec.clone());

        ws.commit();
        ws.tables.get_mut("node").unwrap().add_row();
        assert!(ws.rollback());

        assert_eq!(*rec.undos.borrow(), vec![("rollback".to_string(), 1)]);
    }

    #[test]
    fn rollback_without_commit_reports_false() {
        let mut ws = workspace_with_node_table();
        assert!(!ws.rollback());
        assert_eq!(ws.tables.get("node").unwrap().full_size(), 3);
    }

    #[test]
    fn weighting_params_round_trip_with_type_checking() {
        let mut ws = Workspace::new();
        assert_eq!(
            ws.weighting_param(WeightingParam::FormControl),
            PropertyValue::Bool(true)
        );
        ws.set_weighting_param(WeightingParam::Kind, PropertyValue::Int(2)).unwrap();
        assert_eq!(ws.weighting_param(WeightingParam::Kind), PropertyValue::Int(2));
        assert!(ws
            .set_weighting_param(WeightingParam::Status, PropertyValue::Str("on".to_string()))
            .is_err());
    }

    #[test]
    fn control_table_is_created_and_cleared() {
        let mut ws = workspace_with_node_table();
        ws.add_control("node", "pn", 1).unwrap();
        ws.add_control("node", "pn", 2).unwrap();

        let control = ws.tables.get(CONTROL_TABLE).unwrap();
        assert_eq!(control.full_size(), 2);
        assert_eq!(
            control.get(0, "name", ValueKind::NotScaled).unwrap(),
            CellValue::Str("node.pn".to_string())
        );
        assert_eq!(
            control.get(0, "row_key", ValueKind::NotScaled).unwrap(),
            CellValue::Str("ny=2".to_string())
        );

        ws.clear_control().unwrap();
        assert_eq!(ws.tables.get(CONTROL_TABLE).unwrap().full_size(), 0);
    }

    #[test]
    fn non_numeric_cells_cannot_be_controlled() {
        let mut ws = workspace_with_node_table();
        let t = ws.tables.get_mut("node").unwrap();
        t.add_column("name", ColumnKind::Str).unwrap();
        t.set(0, "name", CellValue::Str("ТЭЦ-1".to_string()), ValueKind::NotScaled)
            .unwrap();

        assert!(matches!(
            ws.add_control("node", "name", 0),
            Err(EngineError::InvalidArgument(_))
        ));
        // The rejection happens before the control table is touched.
        assert!(!ws.tables.contains(CONTROL_TABLE));
    }

    #[test]
    fn listeners_registered_on_the_facade_see_table_events() {
        struct Recorder {
            seen: RefCell<Vec<ChangeScope>>,
        }
        impl EventListener for Recorder {
            fn on_data_change(
                &self,
                scope: ChangeScope,
                _table: &str,
                _column: &str,
                _row: Option<usize>,
            ) {
                self.seen.borrow_mut().push(scope);
            }
        }

        let mut ws = workspace_with_node_table();
        let rec = Rc::new(Recorder {
            seen: RefCell::new(Vec::new()),
        });
        ws.add_listener(rec.clone());

        ws.tables.get_mut("node").unwrap().add_row();
        assert!(rec.seen.borrow().contains(&ChangeScope::RowAdded));
    }

    #[test]
    fn lock_guard_batches_notifications() {
        struct Counter {
            count: RefCell<usize>,
        }
        impl EventListener for Counter {
            fn on_data_change(
                &self,
                _scope: ChangeScope,
                _table: &str,
                _column: &str,
                _row: Option<usize>,
            ) {
                *self.count.borrow_mut() += 1;
            }
        }

        let mut ws = workspace_with_node_table();
        let counter = Rc::new(Counter {
            count: RefCell::new(0),
        });
        ws.add_listener(counter.clone());

        {
            let _guard = ws.lock_events();
            let t = ws.tables.get_mut("node").unwrap();
            for row in 0..3 {
                t.set(row, "pn", CellValue::Real(0.0), ValueKind::NotScaled).unwrap();
            }
            assert_eq!(*counter.count.borrow(), 0);
        }
        // One whole-table flush for the touched table.
        assert_eq!(*counter.count.borrow(), 1);
    }

    #[test]
    fn non_finite_temperature_is_rejected() {
        let mut ws = workspace_with_node_table();
        assert!(matches!(
            ws.current_limits(f64::NAN, ""),
            Err(EngineError::InvalidArgument(_))
        ));
        assert_eq!(ws.current_limits(25.0, "ny>1").unwrap(), CalcOutcome::Ok);
    }
}
