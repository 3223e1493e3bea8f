//! Lifecycle management for the supervised service.
//!
//! This module is split into focused submodules so each concern remains small and
//! testable:
//! - [`types`] defines the user-facing command models and IO helpers.
//! - [`error`] captures the error surface exposed to the CLI.
//! - [`probe`] answers whether a recorded pid is still alive.
//! - [`store`] persists the service handle record.
//! - [`process`] spawns, signals, and waits on the service process.
//! - [`collaborators`] runs the toolchain check, asset compiler, and build.
//! - [`supervisor`] implements the start/stop/status state machine.
//! - [`controller`] wires the production pieces together and renders results.

mod collaborators;
mod controller;
mod error;
mod files;
mod interrupt;
mod lock;
mod probe;
mod process;
mod store;
mod supervisor;
mod types;

pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

pub use controller::SystemLifecycle;
pub use error::LifecycleError;
pub use types::{LifecycleCommand, LifecycleContext, LifecycleOutput};
