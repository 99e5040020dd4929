//! Shared types for wheelhouse.
//!
//! This crate holds the leaf vocabulary every other crate speaks: the wheel
//! filename grammar ([`WheelFilename`]), normalized package identity
//! ([`PackageName`]) and content digests ([`Sha256Digest`]).

pub mod hash;
pub mod name;
pub mod wheel;

// Re-exports
pub use hash::Sha256Digest;
pub use name::PackageName;
pub use wheel::{NameError, WHEEL_EXTENSION, WheelFilename};

/// Suffix of the sidecar file that carries a wheel's extracted metadata record.
pub const METADATA_SUFFIX: &str = ".metadata";
