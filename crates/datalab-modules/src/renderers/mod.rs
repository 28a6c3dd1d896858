//! Stateful renderers
//!
//! Renderers translate their parameters into surface properties. Values a
//! user left unset fall back to the [`StyleSnapshot`] the session hands
//! them, so retracting can put the surface back the way the style had it.

mod grid;
mod legend;
mod scale;
mod style;

pub use grid::Grid;
pub use legend::Legend;
pub use scale::AxisScale;
pub use style::PlotStyle;

use datalab_plugin::{StyleSnapshot, Surface};
use datalab_schema::{Scalar, ValueTree};

/// Parameter name paired with the surface property it drives
type Binding = (&'static str, &'static str);

/// Parameter values keyed by surface property; blank text counts as unset
fn collect(params: &ValueTree, bindings: &[Binding]) -> Vec<(&'static str, Scalar)> {
    bindings
        .iter()
        .filter_map(|&(param, key)| {
            params
                .scalar(param)
                .filter(|v| !v.is_empty())
                .map(|v| (key, v.clone()))
        })
        .collect()
}

/// Set each bound property, using the style default when unset
fn apply_bindings(
    surface: &mut dyn Surface,
    style: &StyleSnapshot,
    bindings: &[Binding],
    values: &[(&'static str, Scalar)],
) {
    for &(_, key) in bindings {
        let value = values
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
            .or_else(|| style.get(key));
        if let Some(value) = value {
            surface.set_property(key, value.clone());
        }
    }
}

/// Put each bound property back to its style default, or clear it
fn restore_bindings(surface: &mut dyn Surface, style: &StyleSnapshot, bindings: &[Binding]) {
    for &(_, key) in bindings {
        match style.get(key) {
            Some(default) => surface.set_property(key, default.clone()),
            None => surface.clear_property(key),
        }
    }
}
