use datalab_plugin::{InlineMutator, PluginError, PluginResult, Table};
use datalab_schema::ValueTree;

use super::target_columns;

/// Scales target columns to `[0, 1]`; constant columns become `0.5`
#[derive(Debug, Clone)]
pub struct Normalize {
    columns: Vec<String>,
}

impl Normalize {
    /// Build from bound parameters
    #[must_use]
    pub fn from_params(params: &ValueTree) -> Self {
        Self {
            columns: target_columns(params),
        }
    }
}

impl InlineMutator for Normalize {
    fn process(&self, mut table: Table) -> PluginResult<Option<Table>> {
        for name in &self.columns {
            let column = table
                .column_mut(name)
                .ok_or_else(|| PluginError::MissingColumn(name.clone()))?;
            let (min, max) = column
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            let range = max - min;
            for v in column.iter_mut() {
                *v = if range > 0.0 { (*v - min) / range } else { 0.5 };
            }
        }
        Ok(Some(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datalab_schema::Scalar;
    use proptest::prelude::*;

    fn normalize(columns: &[&str]) -> Normalize {
        let names: Vec<Scalar> = columns.iter().map(|c| Scalar::from(*c)).collect();
        Normalize::from_params(&ValueTree::new().with("target_columns", names))
    }

    #[test]
    fn scales_to_unit_range() {
        let table = Table::from_columns([("V", vec![2.0, 4.0, 3.0]), ("t", vec![0.0, 1.0, 2.0])]).unwrap();
        let out = normalize(&["V"]).process(table).unwrap().unwrap();
        assert_eq!(out.column("V"), Some(&[0.0, 1.0, 0.5][..]));
        assert_eq!(out.column("t"), Some(&[0.0, 1.0, 2.0][..]));
    }

    #[test]
    fn constant_column_becomes_half() {
        let table = Table::from_columns([("V", vec![7.0, 7.0])]).unwrap();
        let out = normalize(&["V"]).process(table).unwrap().unwrap();
        assert_eq!(out.column("V"), Some(&[0.5, 0.5][..]));
    }

    #[test]
    fn missing_column_fails() {
        let table = Table::from_columns([("V", vec![1.0])]).unwrap();
        let err = normalize(&["I"]).process(table).unwrap_err();
        assert!(matches!(err, PluginError::MissingColumn(ref c) if c == "I"));
    }

    proptest! {
        #[test]
        fn output_stays_in_unit_range(values in prop::collection::vec(-1e6f64..1e6, 1..50)) {
            let table = Table::from_columns([("V", values)]).unwrap();
            let out = normalize(&["V"]).process(table).unwrap().unwrap();
            for v in out.column("V").unwrap() {
                prop_assert!((0.0..=1.0).contains(v));
            }
        }
    }
}
