//! Runtime core: admission, execution and shutdown.
//!
//! This module contains the embedded implementation of the promptvisor
//! runtime. The public API from this module is [`Engine`] plus its
//! configuration and the process-safety types hosts wire into shutdown.
//!
//! Internal modules:
//! - [`attempt`]: executes one subprocess attempt with capture ceilings,
//!   timeout and cancellation;
//! - [`engine`]: validates, admits and retries task requests;
//! - [`queue`]: bounded-concurrency FIFO admission gate;
//! - [`registry`]: table of live subprocesses, drained on shutdown;
//! - [`shutdown`]: cross-platform shutdown signal handling;
//! - [`config`]: centralized engine settings.

mod attempt;
mod config;
mod engine;
mod queue;
mod registry;
mod shutdown;

pub use config::EngineConfig;
pub use engine::Engine;
pub use queue::{AdmissionQueue, SlotGuard};
pub use registry::{ProcessGuard, ProcessRegistry};
