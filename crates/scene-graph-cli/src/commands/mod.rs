//! CLI command implementations.

pub mod analyze;
pub mod config;
pub mod diagram;
#[cfg(feature = "native-viz")]
pub mod view;
