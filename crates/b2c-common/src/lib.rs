//! Shared plumbing for the B2C integration workspace.

pub mod logging;

pub use logging::{init_default_logging, init_logging};
