//! Building addons.
//!
//! A build resolves a revision into a [`BuildPlan`], materializes it into a
//! fresh workspace, runs the toolchain there and hands back either a
//! [`BuildResult`] pointing at the artifact or an error. Failed and timed-out
//! builds never leave a workspace behind unless debug mode asks for it.
//!
//! # Submodules
//!
//! - [`workspace`] - workspace ids, registry and materialization
//! - [`invoke`] - toolchain resolution and the detached build task
//! - [`artifact`] - download and purge
//! - [`manifest`] - the `package.json` written for the toolchain

pub mod artifact;
pub mod invoke;
pub mod manifest;
mod types;
pub mod workspace;

pub use invoke::Builder;
pub use manifest::Manifest;
pub use types::*;
pub use workspace::{BuildPlan, WorkspaceEntry, WorkspaceHandle, WorkspaceId, WorkspaceRegistry};
