//! Types shared across overlaykit crates.

pub mod errors;

pub use errors::{
    BuildError, OverlayError, OverlayResult, PatchError, ProcessError, StageError,
};
