use datalab_plugin::{InlineMutator, PluginError, PluginResult, Table};
use datalab_schema::ValueTree;

use super::target_columns;

/// Replaces each target column with its mean, a horizontal line
#[derive(Debug, Clone)]
pub struct AverageLine {
    columns: Vec<String>,
}

impl AverageLine {
    /// Build from bound parameters
    #[must_use]
    pub fn from_params(params: &ValueTree) -> Self {
        Self {
            columns: target_columns(params),
        }
    }
}

impl InlineMutator for AverageLine {
    #[allow(clippy::cast_precision_loss)]
    fn process(&self, mut table: Table) -> PluginResult<Option<Table>> {
        for name in &self.columns {
            let column = table
                .column_mut(name)
                .ok_or_else(|| PluginError::MissingColumn(name.clone()))?;
            if column.is_empty() {
                continue;
            }
            let mean = column.iter().sum::<f64>() / column.len() as f64;
            column.fill(mean);
        }
        Ok(Some(table))
    }
}
