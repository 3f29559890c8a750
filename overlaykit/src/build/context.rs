//! Shared, read-only context handed to every build task.

use crate::collab::Collaborators;
use crate::runtime::{BuildOptions, OutputLayout};
use std::sync::Arc;

pub struct BuildContext {
    pub options: BuildOptions,
    pub layout: OutputLayout,
    pub collaborators: Collaborators,
}

impl BuildContext {
    pub fn new(options: BuildOptions, collaborators: Collaborators) -> Self {
        let layout = OutputLayout::new(&options);
        Self {
            options,
            layout,
            collaborators,
        }
    }
}

/// Tasks never mutate the context, so no lock is needed.
pub type BuildCtx = Arc<BuildContext>;
