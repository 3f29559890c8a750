//! Project layout, build options and the host runtime installation.

pub mod bootstrap;
pub mod layout;
pub mod options;

pub use bootstrap::{InstallOutcome, RuntimeInstaller};
pub use layout::OutputLayout;
pub use options::{
    BuildOptions, BundleEntry, BundleOptions, CommandSpec, ExtensionRewrite, HostOptions,
    PatchOptions, SubtreeRule, TranspileSettings,
};
