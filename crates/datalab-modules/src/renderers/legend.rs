use datalab_plugin::{PluginResult, ResetSignal, StatefulRenderer, StyleSnapshot, Surface};
use datalab_schema::{Scalar, ValueTree};

use super::{apply_bindings, collect, Binding};

/// Surface property showing the legend
const LEGEND: &str = "legend";

const BINDINGS: [Binding; 5] = [
    ("loc", "legend.loc"),
    ("fontsize", "legend.fontsize"),
    ("frameon", "legend.frameon"),
    ("ncol", "legend.ncol"),
    ("title", "legend.title"),
];

/// Shows a legend; retracting removes it
#[derive(Debug, Clone)]
pub struct Legend {
    values: Vec<(&'static str, Scalar)>,
}

impl Legend {
    /// Build from bound parameters
    #[must_use]
    pub fn from_params(params: &ValueTree) -> Self {
        Self {
            values: collect(params, &BINDINGS),
        }
    }
}

impl StatefulRenderer for Legend {
    fn apply(&mut self, surface: &mut dyn Surface, style: &StyleSnapshot) -> PluginResult<()> {
        surface.set_property(LEGEND, Scalar::Bool(true));
        apply_bindings(surface, style, &BINDINGS, &self.values);
        Ok(())
    }

    fn retract(&mut self, surface: &mut dyn Surface, _style: &StyleSnapshot) -> ResetSignal {
        surface.clear_property(LEGEND);
        for (_, key) in BINDINGS {
            surface.clear_property(key);
        }
        ResetSignal::Keep
    }
}
