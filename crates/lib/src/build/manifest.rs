//! The `package.json` handed to the toolchain.

use serde::{Deserialize, Serialize};

use crate::consts::MAIN_MODULE;
use crate::package::{Package, PackageId};
use crate::revision::Revision;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
  pub id: PackageId,
  pub name: String,
  pub full_name: String,
  pub version: String,
  #[serde(default)]
  pub description: String,
  pub author: String,
  /// Entry point module name, without extension.
  pub main: String,
  /// Names of the direct dependency libraries, in edge order.
  #[serde(default)]
  pub dependencies: Vec<String>,
}

impl Manifest {
  pub fn for_revision(package: &Package, revision: &Revision) -> Self {
    Manifest {
      id: package.id,
      name: package.name.clone(),
      full_name: package.full_name.clone(),
      version: version_label(revision),
      description: package.description.clone(),
      author: revision.author.to_string(),
      main: MAIN_MODULE.to_string(),
      dependencies: revision.dependencies.iter().map(|d| d.name.clone()).collect(),
    }
  }

  pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec_pretty(self)
  }

  pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
    serde_json::from_slice(bytes)
  }
}

/// The release name, or `<number>.0` for an unreleased revision.
pub fn version_label(revision: &Revision) -> String {
  match &revision.version_name {
    Some(name) => name.clone(),
    None => format!("{}.0", revision.number),
  }
}

/// Plain-text description written next to the manifest.
pub fn readme(package: &Package) -> String {
  if package.description.is_empty() {
    format!("# {}\n", package.full_name)
  } else {
    format!("# {}\n\n{}\n", package.full_name, package.description)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::package::{PackageKind, UserId};
  use crate::revision::DependencyEdge;

  fn package() -> Package {
    Package {
      id: PackageId(1_000_000),
      kind: PackageKind::Addon,
      full_name: "My Addon".to_string(),
      name: "my-addon".to_string(),
      description: "Does things".to_string(),
      author: UserId::from("alice"),
      active: true,
      created_at: 0,
    }
  }

  fn revision() -> Revision {
    Revision {
      package: PackageId(1_000_000),
      number: 3,
      version_name: None,
      message: String::new(),
      author: UserId::from("alice"),
      sdk: None,
      modules: Vec::new(),
      attachments: Vec::new(),
      dependencies: vec![
        DependencyEdge {
          package: PackageId(1_000_001),
          revision: 1,
          name: "widgets".to_string(),
        },
        DependencyEdge {
          package: PackageId(1_000_002),
          revision: 4,
          name: "timers".to_string(),
        },
      ],
      created_at: 0,
      origin: None,
    }
  }

  #[test]
  fn round_trip_preserves_dependency_order() {
    let manifest = Manifest::for_revision(&package(), &revision());
    let parsed = Manifest::from_bytes(&manifest.to_bytes().unwrap()).unwrap();

    assert_eq!(parsed, manifest);
    assert_eq!(parsed.dependencies, vec!["widgets", "timers"]);
    assert_eq!(parsed.main, "main");
  }

  #[test]
  fn uses_camel_case_keys() {
    let manifest = Manifest::for_revision(&package(), &revision());
    let json: serde_json::Value = serde_json::from_slice(&manifest.to_bytes().unwrap()).unwrap();

    assert_eq!(json["fullName"], "My Addon");
    assert_eq!(json["id"], 1_000_000);
    assert_eq!(json["version"], "3.0");
  }

  #[test]
  fn released_revision_uses_version_name() {
    let mut revision = revision();
    revision.version_name = Some("1.2 beta".to_string());
    assert_eq!(version_label(&revision), "1.2 beta");
  }

  #[test]
  fn readme_includes_description() {
    assert_eq!(readme(&package()), "# My Addon\n\nDoes things\n");
  }
}
