//! Utilities shared by the node's binaries.

pub mod logging;
