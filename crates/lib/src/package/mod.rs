//! Packages: the named, authored containers that own revision histories.

mod catalog;
mod types;

pub use catalog::Catalog;
pub use types::*;
