use datalab_plugin::{PluginError, PluginResult, ResetSignal, StatefulRenderer, StyleSnapshot, Surface};
use datalab_schema::{Scalar, ValueTree};
use tracing::debug;

/// Accepted scale types
const SCALE_TYPES: [&str; 4] = ["linear", "log", "symlog", "logit"];

const AXES: [(&str, &str); 2] = [("x_scale_type", "xscale"), ("y_scale_type", "yscale")];

/// Sets the x and y axis scale types
#[derive(Debug, Clone)]
pub struct AxisScale {
    scales: [String; 2],
}

impl AxisScale {
    /// Build from bound parameters; unset axes are linear
    ///
    /// # Errors
    /// Returns [`PluginError::InvalidParam`] for an unknown scale type
    pub fn from_params(params: &ValueTree) -> PluginResult<Self> {
        let pick = |param: &str| -> PluginResult<String> {
            let scale = params.text(param).filter(|s| !s.is_empty()).unwrap_or("linear");
            if SCALE_TYPES.contains(&scale) {
                Ok(scale.to_string())
            } else {
                Err(PluginError::invalid_param(param, format!("unknown scale type '{scale}'")))
            }
        };
        Ok(Self {
            scales: [pick(AXES[0].0)?, pick(AXES[1].0)?],
        })
    }
}

impl StatefulRenderer for AxisScale {
    fn apply(&mut self, surface: &mut dyn Surface, _style: &StyleSnapshot) -> PluginResult<()> {
        for ((_, key), scale) in AXES.iter().zip(&self.scales) {
            if surface.property(key).and_then(Scalar::as_str) != Some(scale.as_str()) {
                surface.set_property(key, Scalar::Text(scale.clone()));
                debug!(axis = key, scale = %scale, "set axis scale");
            }
        }
        Ok(())
    }

    fn retract(&mut self, surface: &mut dyn Surface, _style: &StyleSnapshot) -> ResetSignal {
        for (_, key) in AXES {
            surface.clear_property(key);
        }
        ResetSignal::Keep
    }
}
