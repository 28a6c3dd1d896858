use std::cmp::Ordering;

use datalab_plugin::{InlineMutator, PluginResult, Table};
use datalab_schema::ValueTree;

use super::target_columns;

/// Stable sort of every row by the target columns, in order
#[derive(Debug, Clone)]
pub struct SortValues {
    keys: Vec<String>,
}

impl SortValues {
    /// Build from bound parameters
    #[must_use]
    pub fn from_params(params: &ValueTree) -> Self {
        Self {
            keys: target_columns(params),
        }
    }
}

impl InlineMutator for SortValues {
    fn process(&self, mut table: Table) -> PluginResult<Option<Table>> {
        if self.keys.is_empty() {
            return Ok(Some(table));
        }
        let keys = self
            .keys
            .iter()
            .map(|k| table.require(k))
            .collect::<PluginResult<Vec<_>>>()?;

        let mut order: Vec<usize> = (0..table.row_count()).collect();
        order.sort_by(|&a, &b| {
            keys.iter()
                .map(|column| column[a].total_cmp(&column[b]))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        table.permute_rows(&order)?;
        Ok(Some(table))
    }
}
