//! Out-of-process plugin engine for the meterd metrics agent.
//!
//! A pipeline stage can run as a separate OS process that speaks the line
//! protocol over its stdin/stdout. The host side of that conversation is the
//! [`Supervisor`]; the guest side, linked into the external program, is the
//! [`Shim`].
//!
//! ```text
//!  host (meterd)                               external process
//!  ─────────────                               ────────────────
//!  Supervisor::submit ──encode──> stdin  ───>  Shim: decode
//!                                                │
//!                                             Processor::apply
//!                                                │
//!  Reader task <──decode── stdout  <───────────  encode
//!      │
//!  Accumulator::add_sample
//!
//!  Monitor task: wait for exit -> restart delay -> next generation
//!  Supervisor::trigger_flush: SIGHUP / SIGUSR1 / SIGUSR2 / "\n" on stdin
//! ```

pub mod accumulator;
pub mod codec;
pub mod config;
pub mod error;
pub mod plugin;
pub mod process;
pub mod sample;
pub mod shim;
pub mod supervisor;
pub mod trigger;

pub use accumulator::Accumulator;
pub use codec::{Decoded, LineProtocol, SampleCodec};
pub use config::ExecdConfig;
pub use error::{ConfigError, ExecdError, ShimError, SignalError};
pub use plugin::{Input, InputRegistry, Processor, ProcessorRegistry};
pub use sample::{FieldValue, Sample};
pub use shim::Shim;
pub use supervisor::{Supervisor, SupervisorState};
pub use trigger::TriggerSignal;
