//! FILENAME: engine/src/collection.rs
//! PURPOSE: The named, ordered set of tables owned by a workspace.
//! CONTEXT: Tables are addressed by unique name or by position, through the
//! same tagged-union dispatch the table layer uses for columns. The
//! collection hands every new table a clone of the workspace event hub, so
//! a single listener registration covers all tables.

use crate::error::{EngineError, EngineResult};
use crate::events::EventHub;
use crate::table::Table;

/// Table addressing: by unique name or by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRef {
    ByName(String),
    ByIndex(usize),
}

impl From<&str> for TableRef {
    fn from(name: &str) -> Self {
        TableRef::ByName(name.to_string())
    }
}

impl From<String> for TableRef {
    fn from(name: String) -> Self {
        TableRef::ByName(name)
    }
}

impl From<usize> for TableRef {
    fn from(index: usize) -> Self {
        TableRef::ByIndex(index)
    }
}

/// All tables of one workspace, in creation order.
#[derive(Clone, Default)]
pub struct TableCollection {
    tables: Vec<Table>,
    events: EventHub,
}

impl TableCollection {
    pub(crate) fn with_events(events: EventHub) -> Self {
        TableCollection {
            tables: Vec::new(),
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Creates an empty table with the given unique name.
    pub fn add(&mut self, name: impl Into<String>) -> EngineResult<&mut Table> {
        let name = name.into();
        if self.find(&name).is_some() {
            return Err(EngineError::DuplicateName(name));
        }
        self.tables.push(Table::with_events(name, self.events.clone()));
        let last = self.tables.len() - 1;
        Ok(&mut self.tables[last])
    }

    pub fn remove(&mut self, table: impl Into<TableRef>) -> EngineResult<()> {
        let index = self.resolve(&table.into())?;
        self.tables.remove(index);
        Ok(())
    }

    /// Position of the named table, if present.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.tables.iter().position(|t| t.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn get(&self, table: impl Into<TableRef>) -> EngineResult<&Table> {
        let index = self.resolve(&table.into())?;
        Ok(&self.tables[index])
    }

    pub fn get_mut(&mut self, table: impl Into<TableRef>) -> EngineResult<&mut Table> {
        let index = self.resolve(&table.into())?;
        Ok(&mut self.tables[index])
    }

    pub fn names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Table> {
        self.tables.iter_mut()
    }

    /// Drops every table.
    pub fn clear(&mut self) {
        self.tables.clear();
    }

    fn resolve(&self, table: &TableRef) -> EngineResult<usize> {
        match table {
            TableRef::ByName(name) => self
                .find(name)
                .ok_or_else(|| EngineError::UnknownTable(name.clone())),
            TableRef::ByIndex(index) => {
                if *index < self.tables.len() {
                    Ok(*index)
                } else {
                    Err(EngineError::UnknownTable(format!("#{}", index)))
                }
            }
        }
    }
}
