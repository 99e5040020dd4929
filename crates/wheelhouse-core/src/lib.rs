pub mod config;
pub mod error;
pub mod index;
pub mod local;
pub mod metadata;
pub mod store;
pub mod sync;

pub mod reporter;

pub use error::{Error, ErrorKind, Result};
pub use reporter::{NullReporter, Reporter, TerminalReporter};

/// User Agent string for store requests
pub const USER_AGENT: &str = concat!("wheelhouse/", env!("CARGO_PKG_VERSION"));
