//! Table file readers and writers

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{PluginError, PluginResult};
use crate::table::Table;

/// Reads and writes tables on disk
pub trait TableStore: Send + Sync {
    /// Read a table
    ///
    /// # Errors
    /// Returns error if the file is missing or malformed
    fn read(&self, path: &Path) -> PluginResult<Table>;

    /// Write a table, creating parent directories
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    fn write(&self, path: &Path, table: &Table) -> PluginResult<()>;
}

fn ensure_parent(path: &Path) -> PluginResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PluginError::io(parent, e))?;
    }
    Ok(())
}

/// Tables as JSON objects of column arrays
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTableStore;

impl TableStore for JsonTableStore {
    fn read(&self, path: &Path) -> PluginResult<Table> {
        let text = fs::read_to_string(path).map_err(|e| PluginError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| PluginError::format(path, e.to_string()))
    }

    fn write(&self, path: &Path, table: &Table) -> PluginResult<()> {
        ensure_parent(path)?;
        let text = serde_json::to_string_pretty(table)
            .map_err(|e| PluginError::format(path, e.to_string()))?;
        fs::write(path, text).map_err(|e| PluginError::io(path, e))?;
        debug!(path = %path.display(), rows = table.row_count(), "wrote table");
        Ok(())
    }
}

/// Delimited text: `#` comment lines, a header row, then numeric rows
///
/// The delimiter is detected from the header: tab, then comma, then runs
/// of whitespace. Files are written tab-separated.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedTableStore;

impl DelimitedTableStore {
    fn split<'a>(line: &'a str, delimiter: Option<char>) -> Vec<&'a str> {
        match delimiter {
            Some(d) => line.split(d).map(str::trim).collect(),
            None => line.split_whitespace().collect(),
        }
    }
}

impl TableStore for DelimitedTableStore {
    fn read(&self, path: &Path) -> PluginResult<Table> {
        let text = fs::read_to_string(path).map_err(|e| PluginError::io(path, e))?;
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty() && !l.trim_start().starts_with('#'));

        let Some((_, header)) = lines.next() else {
            return Ok(Table::new());
        };
        let delimiter = ['\t', ','].into_iter().find(|d| header.contains(*d));
        let names = Self::split(header, delimiter);
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];

        for (number, line) in lines {
            let cells = Self::split(line, delimiter);
            if cells.len() != names.len() {
                return Err(PluginError::format(
                    path,
                    format!("line {}: expected {} cells, got {}", number + 1, names.len(), cells.len()),
                ));
            }
            for (column, cell) in columns.iter_mut().zip(cells) {
                let value = cell.parse::<f64>().map_err(|_| {
                    PluginError::format(path, format!("line {}: '{cell}' is not a number", number + 1))
                })?;
                column.push(value);
            }
        }

        Table::from_columns(names.into_iter().zip(columns))
    }

    fn write(&self, path: &Path, table: &Table) -> PluginResult<()> {
        ensure_parent(path)?;
        let mut out = table.column_names().join("\t");
        out.push('\n');
        let columns: Vec<&[f64]> = table.iter().map(|(_, v)| v).collect();
        for row in 0..table.row_count() {
            let cells: Vec<String> = columns.iter().map(|c| c[row].to_string()).collect();
            out.push_str(&cells.join("\t"));
            out.push('\n');
        }
        fs::write(path, out).map_err(|e| PluginError::io(path, e))?;
        debug!(path = %path.display(), rows = table.row_count(), "wrote table");
        Ok(())
    }
}

/// Chooses JSON for `.json` files and delimited text otherwise
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoTableStore;

impl AutoTableStore {
    fn pick(path: &Path) -> &'static dyn TableStore {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            &JsonTableStore
        } else {
            &DelimitedTableStore
        }
    }
}

impl TableStore for AutoTableStore {
    fn read(&self, path: &Path) -> PluginResult<Table> {
        Self::pick(path).read(path)
    }

    fn write(&self, path: &Path, table: &Table) -> PluginResult<()> {
        Self::pick(path).write(path, table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Table {
        Table::from_columns([("t", vec![0.0, 0.5]), ("V", vec![1.25, -2.0])]).unwrap()
    }

    #[test]
    fn json_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.json");

        JsonTableStore.write(&path, &sample()).unwrap();
        assert_eq!(JsonTableStore.read(&path).unwrap(), sample());
    }

    #[test]
    fn delimited_reads_comments_and_commas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.csv");
        fs::write(&path, "# sample: A\n\nt, V\n0, 1.25\n0.5, -2\n").unwrap();

        assert_eq!(DelimitedTableStore.read(&path).unwrap(), sample());
    }

    #[test]
    fn delimited_reports_bad_cell_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.dat");
        fs::write(&path, "t V\n0 1\n1 x\n").unwrap();

        let err = DelimitedTableStore.read(&path).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn auto_store_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("a.json");
        let dat = dir.path().join("a.dat");

        AutoTableStore.write(&json, &sample()).unwrap();
        AutoTableStore.write(&dat, &sample()).unwrap();

        assert!(fs::read_to_string(&json).unwrap().starts_with('{'));
        assert!(fs::read_to_string(&dat).unwrap().starts_with("t\tV"));
        assert_eq!(AutoTableStore.read(&dat).unwrap(), sample());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = JsonTableStore.read(Path::new("/nonexistent/x.json")).unwrap_err();
        assert!(matches!(err, PluginError::Io { .. }));
    }
}
