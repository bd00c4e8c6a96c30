//! Shared value types: object identifiers and the targets handed to a render call.
//!
//! # Invariants
//! - A `RenderTarget` has no identity beyond the call that draws it.
//! - Types here carry no behavior that touches graphics state.

mod types;

pub use types::{BlockState, EntityId, ItemStack, ObjectTypeId, RenderKind, RenderTarget};
