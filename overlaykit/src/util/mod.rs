//! Small platform helpers.

#[cfg(unix)]
pub mod process;
