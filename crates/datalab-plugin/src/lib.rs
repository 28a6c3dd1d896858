//! Plugin Contracts for datalab
//!
//! Everything a plugin implementation needs to plug into the engine.
//!
//! # Lifecycle Contracts
//!
//! - **[`Transformer`]**: one-shot `load` → `process` → `persist` over an
//!   input file, writing results under an output root
//! - **[`InlineMutator`]**: pure `process(table) -> table'` driven by its
//!   bound parameters
//! - **[`StatefulRenderer`]**: `initialize` / `apply` / `retract` against a
//!   [`Surface`], escalating through [`ResetSignal`]
//!
//! # Registration
//!
//! A [`Capability`] pairs a contract with a factory. Capabilities are
//! chosen when the implementation is registered in an [`Implementations`]
//! table; the engine never probes types at run time.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod capability;
pub mod error;
pub mod lifecycle;
pub mod store;
pub mod surface;
pub mod table;

pub use capability::{
    Capability, CapabilityKind, Implementations, MutatorFactory, RendererFactory,
    TransformerFactory,
};
pub use error::{PluginError, PluginResult};
pub use lifecycle::{
    dataset_name_from_path, InlineMutator, DATASET_PARAM, ResetSignal, Stage, StatefulRenderer, Transformer,
    TransformerInit,
};
pub use store::{AutoTableStore, DelimitedTableStore, JsonTableStore, TableStore};
pub use surface::{MemorySurface, StyleSnapshot, Surface};
pub use table::Table;
