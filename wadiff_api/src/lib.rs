//! Shared wadiff data models consumed by the core pipeline and collaborator crates.

pub mod change;
pub mod options;
pub mod report;
pub mod revision;

pub use change::*;
pub use options::*;
pub use report::*;
pub use revision::*;
