//! overlaykit builds a browser overlay, injects it into a packaged host
//! runtime, and drives a watch-and-relaunch dev loop around the host.
//!
//! - [`build`]: the staged pipeline producing the overlay tree
//! - [`runtime`]: options, output layout and runtime installation
//! - [`collab`]: external transpiler, preprocessor, bundler, unpacker and
//!   patcher seams
//! - [`host`]: host process launch and close
//! - [`dev`]: the dev loop controller

pub mod build;
pub mod collab;
pub mod dev;
pub mod host;
pub mod logging;
pub mod pipeline;
pub mod runtime;
pub mod util;

pub use build::{BuildOrchestrator, BuildSummary, OverlayBuilder};
pub use collab::Collaborators;
pub use dev::{DevLoop, DevState, NotifyWatcher, SourceWatcher};
pub use host::{HostHandle, HostLauncher, LaunchSpec, SubprocessLauncher};
pub use logging::init_logging;
pub use runtime::{BuildOptions, OutputLayout, RuntimeInstaller};

pub use overlaykit_shared::{
    BuildError, OverlayError, OverlayResult, PatchError, ProcessError, StageError,
};
