//! Capabilities and the implementations table
//!
//! A [`Capability`] is the tagged lifecycle contract of a plugin type
//! together with the factory that instantiates it. Manifests refer to
//! implementations by entry name; [`Implementations`] resolves those names.

use std::fmt;
use std::sync::Arc;

use datalab_schema::ValueTree;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PluginResult;
use crate::lifecycle::{InlineMutator, StatefulRenderer, Transformer, TransformerInit};

/// Builds a transformer for one invocation
pub type TransformerFactory =
    Arc<dyn Fn(TransformerInit) -> PluginResult<Box<dyn Transformer>> + Send + Sync>;

/// Builds a mutator from bound parameters
pub type MutatorFactory =
    Arc<dyn Fn(&ValueTree) -> PluginResult<Box<dyn InlineMutator>> + Send + Sync>;

/// Builds a renderer from bound parameters
pub type RendererFactory =
    Arc<dyn Fn(&ValueTree) -> PluginResult<Box<dyn StatefulRenderer>> + Send + Sync>;

/// Lifecycle contract without the factory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    /// One-shot load/process/persist
    Transformer,
    /// In-place table transform
    Mutator,
    /// Stateful initialize/apply/retract
    Renderer,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transformer => "transformer",
            Self::Mutator => "mutator",
            Self::Renderer => "renderer",
        })
    }
}

/// Lifecycle contract plus factory
#[derive(Clone)]
pub enum Capability {
    /// See [`Transformer`]
    Transformer(TransformerFactory),
    /// See [`InlineMutator`]
    Mutator(MutatorFactory),
    /// See [`StatefulRenderer`]
    Renderer(RendererFactory),
}

impl Capability {
    /// Wrap a transformer constructor
    pub fn transformer<F, T>(build: F) -> Self
    where
        F: Fn(TransformerInit) -> PluginResult<T> + Send + Sync + 'static,
        T: Transformer + 'static,
    {
        Self::Transformer(Arc::new(move |init: TransformerInit| {
            Ok(Box::new(build(init)?) as Box<dyn Transformer>)
        }))
    }

    /// Wrap a mutator constructor
    pub fn mutator<F, T>(build: F) -> Self
    where
        F: Fn(&ValueTree) -> PluginResult<T> + Send + Sync + 'static,
        T: InlineMutator + 'static,
    {
        Self::Mutator(Arc::new(move |params: &ValueTree| {
            Ok(Box::new(build(params)?) as Box<dyn InlineMutator>)
        }))
    }

    /// Wrap a renderer constructor
    pub fn renderer<F, T>(build: F) -> Self
    where
        F: Fn(&ValueTree) -> PluginResult<T> + Send + Sync + 'static,
        T: StatefulRenderer + 'static,
    {
        Self::Renderer(Arc::new(move |params: &ValueTree| {
            Ok(Box::new(build(params)?) as Box<dyn StatefulRenderer>)
        }))
    }

    /// Contract of this capability
    #[inline]
    #[must_use]
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Self::Transformer(_) => CapabilityKind::Transformer,
            Self::Mutator(_) => CapabilityKind::Mutator,
            Self::Renderer(_) => CapabilityKind::Renderer,
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Capability").field(&self.kind()).finish()
    }
}

/// Entry name → capability
#[derive(Debug, Clone, Default)]
pub struct Implementations {
    entries: IndexMap<String, Capability>,
}

impl Implementations {
    /// Create an empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an implementation; a later registration replaces an
    /// earlier one with the same entry name
    pub fn register(&mut self, entry: impl Into<String>, capability: Capability) {
        let entry = entry.into();
        if let Some(previous) = self.entries.insert(entry.clone(), capability) {
            warn!(entry = %entry, kind = %previous.kind(), "implementation entry replaced");
        }
    }

    /// Builder-style [`register`](Self::register)
    #[inline]
    #[must_use]
    pub fn with(mut self, entry: impl Into<String>, capability: Capability) -> Self {
        self.register(entry, capability);
        self
    }

    /// Merge another table into this one
    pub fn extend(&mut self, other: Self) {
        for (entry, capability) in other.entries {
            self.register(entry, capability);
        }
    }

    /// Look up an entry
    #[inline]
    #[must_use]
    pub fn get(&self, entry: &str) -> Option<&Capability> {
        self.entries.get(entry)
    }

    /// Whether an entry exists
    #[inline]
    #[must_use]
    pub fn contains(&self, entry: &str) -> bool {
        self.entries.contains_key(entry)
    }

    /// Entry names in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
