//! datalab Engine
//!
//! Drives discovered plugins through their lifecycles.
//!
//! # Components
//!
//! - **[`Pipeline`]**: ordered mutator steps, re-resolved on every
//!   application and run over a private copy of the input
//! - **[`run_transformer`] / [`run_batch`] / [`run_config`]**: one-shot
//!   transformer invocations
//! - **[`RenderSession`]**: active renderer set with a single reset per
//!   change
//! - **[`EngineConfig`]**: plugin directories, output roots and style
//!   defaults

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod runner;

pub use config::{default_style, EngineConfig, OutputRoots, PluginCategory, PluginDirs};
pub use error::{EngineError, EngineResult, PipelineError, ResolutionError, StageError};
pub use pipeline::{resolve, Pipeline, PipelineStep};
pub use render::{PlotConfig, RenderFailure, RenderReport, RenderSession};
pub use runner::{run_batch, run_config, run_transformer, BatchReport, INPUT_KEY, MODULE_KEY};
