// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the commands, using
//! `tokio::process::Command`, and reporting back to the orchestration
//! runtime through a [`CommandObserver`].
//!
//! - [`executor_loop`] owns the main loop that starts one supervisor per
//!   dispatched command.
//! - [`supervisor`] drives a single process: spawn, log, wait, exit.
//! - [`output`] fans each child stream out to its sinks.
//! - [`parent`] owns the run's own stdout/stderr writers.
//! - [`registry`] tracks live processes for the shutdown coordinator.
//! - [`observer`] defines the lifecycle notification interface.
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `RealExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod executor_loop;
pub mod observer;
pub mod output;
pub mod parent;
pub mod registry;
pub mod supervisor;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;
pub use observer::{ChannelObserver, CommandObserver};
pub use output::{OutputRouter, OutputSink};
pub use parent::{ParentOutput, ParentWriters};
pub use registry::{KillHandle, KillRequest, LiveProcesses};
pub use supervisor::{supervise, SupervisorContext};
