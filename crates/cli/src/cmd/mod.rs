mod attachment;
pub mod build;
mod dep;
mod gc;
mod module;
mod package;
mod revision;
mod sdk;

pub use attachment::{AttachmentCommand, cmd_attachment};
pub use build::{cmd_build, cmd_download, cmd_purge};
pub use dep::{DepCommand, cmd_dep};
pub use gc::cmd_gc;
pub use module::{ModuleCommand, cmd_module};
pub use package::{PackageCommand, cmd_package};
pub use revision::{RevisionCommand, cmd_revision};
pub use sdk::{SdkCommand, cmd_sdk};
