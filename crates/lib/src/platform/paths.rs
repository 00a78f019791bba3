use std::path::PathBuf;

use crate::consts::{APP_NAME, env};

fn var_path(name: &str) -> Option<PathBuf> {
  std::env::var_os(name).filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn home() -> PathBuf {
  let name = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
  var_path(name).unwrap_or_else(std::env::temp_dir)
}

/// Per-user data root: `%APPDATA%` or `$XDG_DATA_HOME`, falling back under home.
fn data_base() -> PathBuf {
  if cfg!(windows) {
    var_path("APPDATA").unwrap_or_else(home)
  } else {
    var_path("XDG_DATA_HOME").unwrap_or_else(|| home().join(".local").join("share"))
  }
}

fn cache_base() -> PathBuf {
  if cfg!(windows) {
    var_path("LOCALAPPDATA").unwrap_or_else(home).join(APP_NAME).join("Cache")
  } else {
    var_path("XDG_CACHE_HOME")
      .unwrap_or_else(|| home().join(".cache"))
      .join(APP_NAME)
  }
}

/// Root of the persistent store (packages, revisions, content, uploads).
///
/// `FLIGHTDECK_ROOT` overrides the platform data directory.
pub fn store_dir() -> PathBuf {
  var_path(env::ROOT).unwrap_or_else(|| data_base().join(APP_NAME))
}

/// Root under which build workspaces are created. `FLIGHTDECK_WORKSPACES` wins.
pub fn workspaces_dir() -> PathBuf {
  var_path(env::WORKSPACES).unwrap_or_else(|| cache_base().join("workspaces"))
}

#[cfg(test)]
#[cfg(not(windows))]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn store_falls_back_to_home_share() {
    temp_env::with_vars(
      [
        (env::ROOT, None::<&str>),
        ("XDG_DATA_HOME", None),
        ("HOME", Some("/home/user")),
      ],
      || {
        assert_eq!(store_dir(), PathBuf::from("/home/user/.local/share").join(APP_NAME));
      },
    );
  }

  #[test]
  #[serial]
  fn env_var_overrides_default_paths() {
    temp_env::with_vars(
      [
        (env::ROOT, Some("/custom/root")),
        (env::WORKSPACES, Some("/custom/workspaces")),
      ],
      || {
        assert_eq!(store_dir(), PathBuf::from("/custom/root"));
        assert_eq!(workspaces_dir(), PathBuf::from("/custom/workspaces"));
      },
    );
  }

  #[test]
  #[serial]
  fn empty_override_is_ignored() {
    temp_env::with_vars(
      [
        (env::WORKSPACES, Some("")),
        ("XDG_CACHE_HOME", Some("/tmp/cache")),
      ],
      || {
        assert_eq!(
          workspaces_dir(),
          PathBuf::from("/tmp/cache").join(APP_NAME).join("workspaces")
        );
      },
    );
  }
}
