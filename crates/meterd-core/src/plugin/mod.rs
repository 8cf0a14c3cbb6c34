//! Plugin capability interfaces.
//!
//! A transform plugin implements [`Processor`]; a source plugin implements
//! [`Input`]. Plugins are looked up by name in a [`Registry`] built once by
//! the binary's composition root; nothing registers itself implicitly.
//!
//! ```text
//! main()
//!   |
//!   v
//! ProcessorRegistry::new() + builtin::register_builtins(&mut registry)
//! InputRegistry::new()     + builtin::register_builtin_inputs(&mut inputs)
//!   |
//!   |  create("add-tag", options) --> Box<dyn Processor>
//!   |  create("counter", options) --> Box<dyn Input>
//!   v
//! Shim::add_processor(processor) --> Shim::run_processor()
//! Shim::add_input(input)         --> Shim::run_input()
//! ```

pub mod builtin;
pub mod registry;

use crate::sample::Sample;

pub use registry::{
    Factory, InputFactory, InputRegistry, PluginKind, ProcessorFactory, ProcessorRegistry,
    Registry, RegistryError,
};

/// A transform plugin failed on one sample.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ProcessorError(pub String);

impl ProcessorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A transform: zero or more output samples per input sample.
///
/// `apply` is only ever called sequentially, so implementations may keep
/// mutable state without synchronization.
pub trait Processor: Send {
    /// One-line human description.
    fn description(&self) -> &str;

    /// Example TOML options for this processor.
    fn sample_config(&self) -> &str {
        ""
    }

    /// Transform one sample. Returning an empty vector drops it.
    fn apply(&mut self, sample: Sample) -> Result<Vec<Sample>, ProcessorError>;
}

/// A source plugin failed to gather.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InputError(pub String);

impl InputError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A source: produces a batch of samples each time it is asked.
pub trait Input: Send {
    fn description(&self) -> &str;

    fn sample_config(&self) -> &str {
        ""
    }

    /// Collect the current samples. An empty vector is a valid result.
    fn gather(&mut self) -> Result<Vec<Sample>, InputError>;
}

impl PluginKind for dyn Processor {
    const KIND: &'static str = "processor";
}

impl PluginKind for dyn Input {
    const KIND: &'static str = "input";
}
