//! Testing utilities for the datalab workspace
//!
//! Shared fixtures: temporary plugin directories, probe mutators that
//! record what they saw, sample tables.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use datalab_plugin::{Capability, Implementations, InlineMutator, PluginError, PluginResult, Table};
use tempfile::TempDir;

/// Temporary plugin directory removed on drop
#[derive(Debug)]
pub struct PluginDir {
    dir: TempDir,
}

impl PluginDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write (or overwrite) a unit file
    pub fn write(&self, name: &str, text: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, text).unwrap();
        path
    }

    pub fn remove(&self, name: &str) {
        fs::remove_file(self.dir.path().join(name)).unwrap();
    }

    /// Shorthand manifest: `{name, mode, entry}` with an optional schema
    pub fn manifest(&self, file: &str, name: &str, mode: &[&str], entry: &str, schema: serde_json::Value) -> PathBuf {
        let text = serde_json::json!({
            "name": name,
            "mode": mode,
            "entry": entry,
            "schema": schema,
        });
        self.write(file, &text.to_string())
    }
}

impl Default for PluginDir {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared record of the tables a probe mutator was called with
#[derive(Debug, Clone, Default)]
pub struct Probe {
    seen: Arc<Mutex<Vec<Table>>>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn inputs(&self) -> Vec<Table> {
        self.seen.lock().unwrap().clone()
    }

    fn record(&self, table: &Table) {
        self.seen.lock().unwrap().push(table.clone());
    }
}

/// Records its input and adds `delta` to every value of `column`
#[derive(Debug, Clone)]
pub struct ShiftMutator {
    pub probe: Probe,
    pub column: String,
    pub delta: f64,
}

impl InlineMutator for ShiftMutator {
    fn process(&self, mut table: Table) -> PluginResult<Option<Table>> {
        self.probe.record(&table);
        let column = table
            .column_mut(&self.column)
            .ok_or_else(|| PluginError::MissingColumn(self.column.clone()))?;
        for value in column.iter_mut() {
            *value += self.delta;
        }
        Ok(Some(table))
    }
}

/// Records its input and fails
#[derive(Debug, Clone)]
pub struct FailingMutator {
    pub probe: Probe,
    pub message: String,
}

impl InlineMutator for FailingMutator {
    fn process(&self, table: Table) -> PluginResult<Option<Table>> {
        self.probe.record(&table);
        Err(PluginError::failed(self.message.clone()))
    }
}

/// Records its input and produces no value
#[derive(Debug, Clone)]
pub struct EmptyMutator {
    pub probe: Probe,
}

impl InlineMutator for EmptyMutator {
    fn process(&self, table: Table) -> PluginResult<Option<Table>> {
        self.probe.record(&table);
        Ok(None)
    }
}

pub fn shift_capability(probe: &Probe, column: &str, delta: f64) -> Capability {
    let mutator = ShiftMutator {
        probe: probe.clone(),
        column: column.to_string(),
        delta,
    };
    Capability::mutator(move |_| Ok(mutator.clone()))
}

pub fn failing_capability(probe: &Probe, message: &str) -> Capability {
    let mutator = FailingMutator {
        probe: probe.clone(),
        message: message.to_string(),
    };
    Capability::mutator(move |_| Ok(mutator.clone()))
}

pub fn empty_capability(probe: &Probe) -> Capability {
    let mutator = EmptyMutator { probe: probe.clone() };
    Capability::mutator(move |_| Ok(mutator.clone()))
}

/// Probes `a`, `b` and `c`: `a` adds 1 to `V`, `b` fails, `c` adds 100
pub fn abc_implementations() -> (Implementations, [Probe; 3]) {
    let probes = [Probe::new(), Probe::new(), Probe::new()];
    let implementations = Implementations::new()
        .with("a", shift_capability(&probes[0], "V", 1.0))
        .with("b", failing_capability(&probes[1], "b exploded"))
        .with("c", shift_capability(&probes[2], "V", 100.0));
    (implementations, probes)
}

/// Two-column table `t`, `V`
pub fn sample_table() -> Table {
    Table::from_columns([
        ("t", vec![0.0, 1.0, 2.0, 3.0]),
        ("V", vec![1.0, 3.0, 2.0, 5.0]),
    ])
    .unwrap()
}
