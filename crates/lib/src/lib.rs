//! flightdeck-lib: revision model and build pipeline for FlightDeck
//!
//! - `package`: packages (addons and libraries) and the catalog that names them
//! - `revision`: append-only revision histories, edits, dependencies
//! - `content`: content-addressed module sources and attachment uploads
//! - `sdk`: the SDK registry
//! - `build`: workspaces, the toolchain invoker and artifact access
//! - `gc`: the janitor for stale workspaces and unreferenced blobs

pub mod build;
pub mod config;
pub mod consts;
pub mod content;
pub mod error;
pub mod gc;
pub mod package;
pub mod platform;
pub mod revision;
pub mod sdk;
pub mod store_lock;
pub mod util;
