//! Configuration: the render guard policy and the file it is read from.
//!
//! # Invariants
//! - A policy is an immutable snapshot; reload replaces it wholesale.
//! - A failed reload never leaves a half-applied policy behind.

mod policy;
mod store;

pub use policy::{GuardPolicy, OptionDoc};
pub use store::{ConfigError, ConfigStore};
