//! Collaborator contract between the harness and a test suite.
//!
//! ## Contents
//! - [`Suite`] server lifecycle and test execution for one suite
//! - [`ServerHandle`] the per-worker server instance a suite hands out
//! - [`TaskDescriptor`] immutable `(name, suite)` pair
//! - [`WorkerContext`] identity and working directory of the worker asking
//!
//! Discovery, `.ini` parsing and the concrete server process live outside
//! this crate; they reach the scheduler only through [`Suite`].

mod context;
mod contract;
mod task;

pub use context::WorkerContext;
pub use contract::{ServerHandle, Suite};
pub use task::TaskDescriptor;
