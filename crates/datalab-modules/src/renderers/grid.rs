use datalab_plugin::{PluginResult, ResetSignal, StatefulRenderer, StyleSnapshot, Surface};
use datalab_schema::{Scalar, ValueTree};
use tracing::debug;

use super::{apply_bindings, collect, restore_bindings, Binding};

/// Surface property switching the grid on
const GRID: &str = "grid";

const BINDINGS: [Binding; 6] = [
    ("alpha", "grid.alpha"),
    ("style", "grid.linestyle"),
    ("color", "grid.color"),
    ("lw", "grid.linewidth"),
    ("axes", "grid.axis"),
    ("which", "grid.which"),
];

/// Draws a configurable grid
#[derive(Debug, Clone)]
pub struct Grid {
    values: Vec<(&'static str, Scalar)>,
}

impl Grid {
    /// Build from bound parameters
    #[must_use]
    pub fn from_params(params: &ValueTree) -> Self {
        Self {
            values: collect(params, &BINDINGS),
        }
    }
}

impl StatefulRenderer for Grid {
    fn apply(&mut self, surface: &mut dyn Surface, style: &StyleSnapshot) -> PluginResult<()> {
        surface.set_property(GRID, Scalar::Bool(true));
        apply_bindings(surface, style, &BINDINGS, &self.values);
        Ok(())
    }

    fn retract(&mut self, surface: &mut dyn Surface, style: &StyleSnapshot) -> ResetSignal {
        surface.set_property(GRID, Scalar::Bool(false));
        restore_bindings(surface, style, &BINDINGS);
        debug!("grid restored to style defaults");
        ResetSignal::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datalab_plugin::MemorySurface;

    fn style() -> StyleSnapshot {
        StyleSnapshot::new().with("grid.color", "#b0b0b0").with("grid.alpha", 1.0)
    }

    #[test]
    fn applies_params_over_style() {
        let mut grid = Grid::from_params(&ValueTree::new().with("color", "red").with("lw", 2.0));
        let mut surface = MemorySurface::new();

        grid.apply(&mut surface, &style()).unwrap();

        assert_eq!(surface.property("grid"), Some(&Scalar::Bool(true)));
        assert_eq!(surface.property("grid.color"), Some(&Scalar::Text("red".into())));
        assert_eq!(surface.property("grid.linewidth"), Some(&Scalar::Float(2.0)));
        assert_eq!(surface.property("grid.alpha"), Some(&Scalar::Float(1.0)));
        assert_eq!(surface.property("grid.which"), None);
    }

    #[test]
    fn retract_restores_defaults() {
        let mut grid = Grid::from_params(&ValueTree::new().with("color", "red").with("which", "minor"));
        let mut surface = MemorySurface::new();
        grid.apply(&mut surface, &style()).unwrap();

        let signal = grid.retract(&mut surface, &style());

        assert!(!signal.is_reset());
        assert_eq!(surface.property("grid"), Some(&Scalar::Bool(false)));
        assert_eq!(surface.property("grid.color"), Some(&Scalar::Text("#b0b0b0".into())));
        assert_eq!(surface.property("grid.which"), None);
    }
}
