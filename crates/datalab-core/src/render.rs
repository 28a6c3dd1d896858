//! Render sessions
//!
//! A [`RenderSession`] owns the active renderer instances for one surface.
//! Replacing the active set retracts every outgoing renderer, initializes
//! every incoming one, and resets the surface once if any of them asked
//! for it. Apply failures are logged and collected; the other renderers
//! still run.

use datalab_plugin::{
    Capability, CapabilityKind, ResetSignal, Stage, StatefulRenderer, StyleSnapshot, Surface,
};
use datalab_registry::Catalog;
use datalab_schema::{bind, ValueTree};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{EngineError, EngineResult, ResolutionError, StageError};
use crate::pipeline::resolve;

/// Exported plot configuration
///
/// Both keys are required on import.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Active module names in order
    pub active_modules: Vec<String>,
    /// Parameters per module name
    pub configurations: IndexMap<String, ValueTree>,
}

impl PlotConfig {
    /// Serialize as pretty JSON
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::config(format!("cannot export plot configuration: {e}")))
    }

    /// Parse an exported configuration
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] if the document is malformed or
    /// lacks `active_modules` or `configurations`
    pub fn from_json(json: &str) -> EngineResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::config(format!("invalid plot configuration: {e}")))
    }

    /// `(name, params)` for each active module; unconfigured ones get
    /// empty parameters
    #[must_use]
    pub fn selection(&self) -> Vec<(String, ValueTree)> {
        self.active_modules
            .iter()
            .map(|name| {
                let params = self.configurations.get(name).cloned().unwrap_or_default();
                (name.clone(), params)
            })
            .collect()
    }
}

/// Renderer that could not be activated or applied
#[derive(Debug)]
pub struct RenderFailure {
    /// Module name
    pub module: String,
    /// What went wrong
    pub error: EngineError,
}

/// Outcome of changing or refreshing the active set
#[derive(Debug, Default)]
pub struct RenderReport {
    /// Whether the surface was reset
    pub reset: bool,
    /// Per-module failures
    pub failures: Vec<RenderFailure>,
}

impl RenderReport {
    /// Whether every renderer activated and applied cleanly
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, module: &str, error: EngineError) {
        error!(module, error = %error, "plot module failed");
        self.failures.push(RenderFailure {
            module: module.to_string(),
            error,
        });
    }
}

struct Active {
    params: ValueTree,
    renderer: Box<dyn StatefulRenderer>,
}

/// Active renderers for one surface
pub struct RenderSession {
    style: StyleSnapshot,
    active: IndexMap<String, Active>,
}

impl std::fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession")
            .field("style", &self.style)
            .field("active", &self.active.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RenderSession {
    /// Session with no active renderers
    #[must_use]
    pub fn new(style: StyleSnapshot) -> Self {
        Self {
            style,
            active: IndexMap::new(),
        }
    }

    /// Style defaults handed to renderers
    #[inline]
    #[must_use]
    pub fn style(&self) -> &StyleSnapshot {
        &self.style
    }

    /// Active module names in order
    #[must_use]
    pub fn active_names(&self) -> Vec<&str> {
        self.active.keys().map(String::as_str).collect()
    }

    /// Whether a module is active
    #[inline]
    #[must_use]
    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains_key(name)
    }

    /// Bound parameters of an active module
    #[must_use]
    pub fn configuration(&self, name: &str) -> Option<&ValueTree> {
        self.active.get(name).map(|a| &a.params)
    }

    /// Replace the active set
    ///
    /// Every current renderer is retracted and every selected one is
    /// instantiated and initialized; the surface is reset once if any
    /// signal asked for it, then the new set is applied. Modules that
    /// fail to resolve, bind or instantiate are skipped and reported.
    pub fn set_active(
        &mut self,
        selection: &[(String, ValueTree)],
        catalog: &Catalog,
        surface: &mut dyn Surface,
    ) -> RenderReport {
        let mut report = RenderReport::default();
        let mut signal = ResetSignal::Keep;

        for (name, mut outgoing) in self.active.drain(..) {
            let retracted = outgoing.renderer.retract(surface, &self.style);
            debug!(module = %name, reset = retracted.is_reset(), "retracted plot module");
            signal |= retracted;
        }

        for (name, params) in selection {
            if self.active.contains_key(name) {
                warn!(module = %name, "plot module selected twice");
                continue;
            }
            match instantiate(catalog, name, params) {
                Ok(mut active) => {
                    let initialized = active.renderer.initialize(&self.style);
                    debug!(module = %name, reset = initialized.is_reset(), "initialized plot module");
                    signal |= initialized;
                    self.active.insert(name.clone(), active);
                }
                Err(e) => report.fail(name, e),
            }
        }

        if signal.is_reset() {
            info!("resetting surface");
            surface.reset();
            report.reset = true;
        }
        let applied = self.refresh(surface);
        report.failures.extend(applied.failures);
        report
    }

    /// Apply every active renderer to the surface
    pub fn refresh(&mut self, surface: &mut dyn Surface) -> RenderReport {
        let mut report = RenderReport::default();
        for (name, active) in &mut self.active {
            debug!(module = %name, "applying plot module");
            if let Err(e) = active.renderer.apply(surface, &self.style) {
                report.fail(name, StageError::new(Stage::Process, name, e).into());
            }
        }
        report
    }

    /// Export the active set and its parameters
    #[must_use]
    pub fn export(&self) -> PlotConfig {
        PlotConfig {
            active_modules: self.active.keys().cloned().collect(),
            configurations: self
                .active
                .iter()
                .map(|(name, a)| (name.clone(), a.params.clone()))
                .collect(),
        }
    }

    /// Activate an imported configuration
    pub fn import(
        &mut self,
        config: &PlotConfig,
        catalog: &Catalog,
        surface: &mut dyn Surface,
    ) -> RenderReport {
        self.set_active(&config.selection(), catalog, surface)
    }
}

fn instantiate(catalog: &Catalog, name: &str, params: &ValueTree) -> EngineResult<Active> {
    let descriptor = resolve(catalog, name, CapabilityKind::Renderer)?;
    let Capability::Renderer(factory) = &descriptor.capability else {
        return Err(ResolutionError::WrongKind {
            module: name.to_string(),
            expected: CapabilityKind::Renderer,
            actual: descriptor.kind(),
        }
        .into());
    };
    let params = bind(&descriptor.schema, params).map_err(|e| EngineError::validation(name, e))?;
    let renderer = factory(&params).map_err(|e| StageError::new(Stage::Instantiate, name, e))?;
    Ok(Active { params, renderer })
}
