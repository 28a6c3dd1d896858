//! Built-in Plugins for datalab
//!
//! Implementations behind the manifests shipped in `plugins/`. Register
//! them with [`builtin_implementations`]; manifests refer to them by the
//! entry names below.
//!
//! | Entry | Contract | Module |
//! |-------|----------|--------|
//! | `normalize` | mutator | [`Normalize`] |
//! | `average_line` | mutator | [`AverageLine`] |
//! | `sort_values` | mutator | [`SortValues`] |
//! | `linear_fit` | mutator | [`LinearFit`] |
//! | `savgol_filter` | mutator | [`SavgolFilter`] |
//! | `extract_columns` | transformer | [`ExtractColumns`] |
//! | `grid` | renderer | [`Grid`] |
//! | `legend` | renderer | [`Legend`] |
//! | `style` | renderer | [`PlotStyle`] |
//! | `axis_scale` | renderer | [`AxisScale`] |

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod mutators;
pub mod renderers;
pub mod transformers;

pub use mutators::{
    savgol_coefficients, with_uncertainty, AverageLine, LineFit, LinearFit, Normalize, SavgolFilter,
    SortValues,
};
pub use renderers::{AxisScale, Grid, Legend, PlotStyle};
pub use transformers::{ColumnExpression, ExtractColumns};

use datalab_plugin::{Capability, Implementations};

/// Implementations table with every built-in entry
#[must_use]
pub fn builtin_implementations() -> Implementations {
    Implementations::new()
        .with("normalize", Capability::mutator(|p| Ok(Normalize::from_params(p))))
        .with("average_line", Capability::mutator(|p| Ok(AverageLine::from_params(p))))
        .with("sort_values", Capability::mutator(|p| Ok(SortValues::from_params(p))))
        .with("linear_fit", Capability::mutator(LinearFit::from_params))
        .with("savgol_filter", Capability::mutator(SavgolFilter::from_params))
        .with("extract_columns", Capability::transformer(ExtractColumns::new))
        .with("grid", Capability::renderer(|p| Ok(Grid::from_params(p))))
        .with("legend", Capability::renderer(|p| Ok(Legend::from_params(p))))
        .with("style", Capability::renderer(|p| Ok(PlotStyle::from_params(p))))
        .with("axis_scale", Capability::renderer(AxisScale::from_params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use datalab_plugin::CapabilityKind;

    #[test]
    fn every_entry_has_its_contract() {
        let implementations = builtin_implementations();
        let kind = |entry: &str| implementations.get(entry).map(Capability::kind);

        assert_eq!(implementations.len(), 10);
        assert_eq!(kind("savgol_filter"), Some(CapabilityKind::Mutator));
        assert_eq!(kind("extract_columns"), Some(CapabilityKind::Transformer));
        assert_eq!(kind("style"), Some(CapabilityKind::Renderer));
    }
}
