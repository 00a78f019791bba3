//! Crate-wide constants.

pub const APP_NAME: &str = "flightdeck";

/// Id handed to the first package ever created; later ids count up from here.
pub const FIRST_PACKAGE_ID: u64 = 1_000_000;

/// Filename (without extension) of the module used as the build entry point.
pub const MAIN_MODULE: &str = "main";

/// Extension given to every module written into a workspace.
pub const MODULE_EXT: &str = "js";

/// Extension of the artifact produced by the toolchain.
pub const ARTIFACT_EXT: &str = "xpi";

/// Default wall-clock limit for a single toolchain invocation, in seconds.
pub const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 120;

/// How many fresh workspace ids are tried before giving up on a collision.
pub const WORKSPACE_ID_ATTEMPTS: usize = 5;

/// Environment variable names.
pub mod env {
  pub const ROOT: &str = "FLIGHTDECK_ROOT";
  pub const WORKSPACES: &str = "FLIGHTDECK_WORKSPACES";
  pub const TOOLCHAIN: &str = "FLIGHTDECK_TOOLCHAIN";
  pub const BUILD_TIMEOUT: &str = "FLIGHTDECK_BUILD_TIMEOUT";
  pub const DEBUG: &str = "FLIGHTDECK_DEBUG";
  pub const CORE_LIBRARY: &str = "FLIGHTDECK_CORE_LIBRARY";
  pub const USER: &str = "FLIGHTDECK_USER";
}
