use datalab_plugin::{PluginResult, ResetSignal, StatefulRenderer, StyleSnapshot, Surface};
use datalab_schema::{Scalar, ValueTree};
use tracing::info;

/// Parameter naming the style sheet
const STYLE_NAME: &str = "style_name";

/// Snapshot key holding the style to return to
const STYLE_KEY: &str = "style";

/// Switches the surface style sheet
///
/// The style affects everything drawn afterwards, so activating and
/// retracting both ask for a full reset.
#[derive(Debug, Clone)]
pub struct PlotStyle {
    name: String,
}

impl PlotStyle {
    /// Build from bound parameters
    #[must_use]
    pub fn from_params(params: &ValueTree) -> Self {
        Self {
            name: params.text(STYLE_NAME).unwrap_or("default").to_string(),
        }
    }
}

impl StatefulRenderer for PlotStyle {
    fn initialize(&mut self, _style: &StyleSnapshot) -> ResetSignal {
        ResetSignal::Reset
    }

    fn apply(&mut self, surface: &mut dyn Surface, _style: &StyleSnapshot) -> PluginResult<()> {
        if surface.style() != self.name {
            surface.set_style(&self.name);
            info!(style = %self.name, "applied plot style");
        }
        Ok(())
    }

    fn retract(&mut self, surface: &mut dyn Surface, style: &StyleSnapshot) -> ResetSignal {
        let fallback = style.get(STYLE_KEY).and_then(Scalar::as_str).unwrap_or("default");
        surface.set_style(fallback);
        info!(style = fallback, "reverted plot style");
        ResetSignal::Reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datalab_plugin::MemorySurface;

    #[test]
    fn switches_and_reverts_style() {
        let snapshot = StyleSnapshot::new().with("style", "classic");
        let mut style = PlotStyle::from_params(&ValueTree::new().with("style_name", "ggplot"));
        let mut surface = MemorySurface::new();

        assert!(style.initialize(&snapshot).is_reset());
        style.apply(&mut surface, &snapshot).unwrap();
        assert_eq!(surface.style(), "ggplot");

        assert!(style.retract(&mut surface, &snapshot).is_reset());
        assert_eq!(surface.style(), "classic");
    }
}
