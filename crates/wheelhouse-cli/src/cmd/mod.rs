//! Subcommand implementations.

pub mod index;
pub mod sync;
